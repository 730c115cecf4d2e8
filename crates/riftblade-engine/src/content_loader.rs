//! Actor content loading and lookup.
//!
//! This module provides:
//! - Loading actor definitions from assets/actors/*.toml and *.ron
//! - Validation on load (schema version, skills, bindings, AI sections)
//! - An actor registry with lookup by id, name and role

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use riftblade_combat::{ActorDef, ActorRole, ContentError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default asset path for actor definitions.
pub const DEFAULT_CONTENT_PATH: &str = "assets/actors";

/// Errors that can occur during content loading.
#[derive(Debug, Error)]
pub enum ContentLoadError {
    /// Content directory not found.
    #[error("Content path not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read content file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse actor TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse actor RON: {0}")]
    RonError(#[from] ron::error::SpannedError),

    /// File extension is neither `toml` nor `ron`.
    #[error("Unsupported content file: {0}")]
    UnsupportedFormat(PathBuf),

    /// Definition failed validation.
    #[error("Actor validation error: {0}")]
    ValidationError(#[from] ContentError),

    /// Duplicate actor id.
    #[error("Duplicate actor ID: {0}")]
    DuplicateId(String),

    /// No actor with this id.
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// Actor exists but can't fill the requested role.
    #[error("Actor '{id}' is a {found:?}, expected {expected:?}")]
    WrongRole {
        /// Actor id
        id: String,
        /// Role asked for
        expected: ActorRole,
        /// Role in the definition
        found: ActorRole,
    },
}

/// Result type for content loading operations.
pub type ContentLoadResult<T> = Result<T, ContentLoadError>;

/// On-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ContentFormat {
    /// Picks the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "ron" => Some(Self::Ron),
            _ => None,
        }
    }

    /// Parses one actor definition.
    pub fn parse(self, text: &str) -> ContentLoadResult<ActorDef> {
        Ok(match self {
            Self::Toml => toml::from_str(text)?,
            Self::Ron => ron::from_str(text)?,
        })
    }
}

/// Actor registry with fast lookup.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    /// Definitions by id.
    by_id: BTreeMap<String, ActorDef>,
    /// Ids by display name (lowercase).
    by_name: HashMap<String, String>,
    /// Ids by role.
    by_role: HashMap<ActorRole, Vec<String>>,
}

impl ActorRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Validates and registers a definition.
    pub fn register(&mut self, def: ActorDef) -> ContentLoadResult<()> {
        def.validate()?;
        if self.by_id.contains_key(&def.id) {
            return Err(ContentLoadError::DuplicateId(def.id));
        }

        let id = def.id.clone();
        self.by_role.entry(def.role).or_default().push(id.clone());
        self.by_name.insert(def.name.to_lowercase(), id.clone());
        self.by_id.insert(id, def);
        Ok(())
    }

    /// Gets a definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ActorDef> {
        self.by_id.get(id)
    }

    /// Gets a definition by display name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ActorDef> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    /// All definitions with a role, in id order.
    #[must_use]
    pub fn get_by_role(&self, role: ActorRole) -> Vec<&ActorDef> {
        let mut defs: Vec<&ActorDef> = self
            .by_role
            .get(&role)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// A player-controlled definition.
    pub fn player(&self, id: &str) -> ContentLoadResult<&ActorDef> {
        let def = self.require(id)?;
        if def.role == ActorRole::Player {
            Ok(def)
        } else {
            Err(ContentLoadError::WrongRole {
                id: id.to_string(),
                expected: ActorRole::Player,
                found: def.role,
            })
        }
    }

    /// An AI-controlled definition (enemy or boss).
    pub fn enemy(&self, id: &str) -> ContentLoadResult<&ActorDef> {
        let def = self.require(id)?;
        if def.role == ActorRole::Player {
            Err(ContentLoadError::WrongRole {
                id: id.to_string(),
                expected: ActorRole::Enemy,
                found: def.role,
            })
        } else {
            Ok(def)
        }
    }

    fn require(&self, id: &str) -> ContentLoadResult<&ActorDef> {
        self.get(id)
            .ok_or_else(|| ContentLoadError::UnknownActor(id.to_string()))
    }

    /// Returns an iterator over all definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorDef> {
        self.by_id.values()
    }

    /// Clears the registry.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        self.by_role.clear();
    }
}

/// Loads actor files from a directory into a registry.
#[derive(Debug)]
pub struct ContentLoader {
    /// Base path for actor files.
    base_path: PathBuf,
    /// Actor registry.
    registry: ActorRegistry,
    /// Files that failed to load and why.
    failures: Vec<(PathBuf, String)>,
}

impl ContentLoader {
    /// Creates a new loader.
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            registry: ActorRegistry::new(),
            failures: Vec::new(),
        }
    }

    /// Creates a loader with the default path.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_CONTENT_PATH)
    }

    /// Returns a reference to the registry.
    #[must_use]
    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// Consumes the loader, keeping the registry.
    #[must_use]
    pub fn into_registry(self) -> ActorRegistry {
        self.registry
    }

    /// Files skipped by the last [`load_all`](Self::load_all).
    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failures
    }

    /// Loads every `.toml` and `.ron` file under the base path.
    ///
    /// Files are visited in name order. A file that fails to parse or
    /// validate is skipped with a warning and recorded in
    /// [`failures`](Self::failures).
    pub fn load_all(&mut self) -> ContentLoadResult<usize> {
        let path = &self.base_path;
        if !path.is_dir() {
            return Err(ContentLoadError::NotFound(path.clone()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if ContentFormat::from_path(&file_path).is_some() {
                files.push(file_path);
            }
        }
        files.sort();

        self.failures.clear();
        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(id) => {
                    count += 1;
                    debug!("Loaded actor '{}' from {:?}", id, file_path);
                },
                Err(e) => {
                    warn!("Failed to load actor file {:?}: {}", file_path, e);
                    self.failures.push((file_path, e.to_string()));
                },
            }
        }

        info!("Loaded {} actors total", count);
        Ok(count)
    }

    /// Loads one actor file and returns its id.
    pub fn load_file(&mut self, path: &Path) -> ContentLoadResult<String> {
        let format = ContentFormat::from_path(path)
            .ok_or_else(|| ContentLoadError::UnsupportedFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path)?;
        let def = format.parse(&content)?;
        let id = def.id.clone();
        self.registry.register(def)?;
        Ok(id)
    }

    /// Clears the registry and loads everything again.
    pub fn reload(&mut self) -> ContentLoadResult<usize> {
        self.registry.clear();
        self.load_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GRUNT_TOML: &str = r#"
        id = "grunt"
        name = "Grunt"
        role = "enemy"
        max_health = 40.0
        walk_speed = 80.0
        exp_reward = 25

        [basic_attack]
        damage = 6.0
        cooldown_ms = 900.0
        shapes = [{ width = 40.0, height = 40.0, offset_x = 24.0 }]

        [controller]
        detect_range = 300.0
        attack_range = 50.0
        patrol_range = 80.0
    "#;

    const ADEPT_RON: &str = r#"(
        id: "adept",
        name: "Adept",
        role: player,
        max_health: 90.0,
        max_mana: 80.0,
        walk_speed: 150.0,
        basic_attack: (
            damage: 5.0,
            cooldown_ms: 300.0,
            shapes: [(width: 40.0, height: 40.0, offset_x: 20.0)],
        ),
        exp_reward: 0,
    )"#;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).expect("write content");
        path
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ContentFormat::from_path(Path::new("a/grunt.toml")),
            Some(ContentFormat::Toml)
        );
        assert_eq!(
            ContentFormat::from_path(Path::new("adept.ron")),
            Some(ContentFormat::Ron)
        );
        assert_eq!(ContentFormat::from_path(Path::new("notes.md")), None);
    }

    #[test]
    fn test_load_toml_and_ron() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "grunt.toml", GRUNT_TOML);
        write(&dir, "adept.ron", ADEPT_RON);
        write(&dir, "README.md", "not content");

        let mut loader = ContentLoader::new(dir.path());
        assert_eq!(loader.load_all().expect("load"), 2);
        assert!(loader.failures().is_empty());

        let registry = loader.registry();
        let adept = registry.player("adept").expect("adept");
        assert_eq!(adept.max_mana, 80.0);
        assert_eq!(adept.basic_attack.shapes[0].offset_x, 20.0);
        assert_eq!(registry.get_by_name("GRUNT").map(|d| d.id.as_str()), Some("grunt"));
        assert_eq!(registry.get_by_role(ActorRole::Enemy).len(), 1);
    }

    #[test]
    fn test_invalid_file_is_skipped_and_recorded() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "grunt.toml", GRUNT_TOML);
        let broken = write(
            &dir,
            "zombie.toml",
            &GRUNT_TOML
                .replace("\"grunt\"", "\"zombie\"")
                .replace("max_health = 40.0", "max_health = 0.0"),
        );

        let mut loader = ContentLoader::new(dir.path());
        assert_eq!(loader.load_all().expect("load"), 1);
        assert_eq!(loader.failures().len(), 1);
        assert_eq!(loader.failures()[0].0, broken);
        assert!(loader.registry().get("zombie").is_none());
    }

    #[test]
    fn test_duplicate_id() {
        let dir = TempDir::new().expect("temp dir");
        let first = write(&dir, "a.toml", GRUNT_TOML);
        let second = write(&dir, "b.toml", GRUNT_TOML);

        let mut loader = ContentLoader::new(dir.path());
        loader.load_file(&first).expect("first");
        assert!(matches!(
            loader.load_file(&second),
            Err(ContentLoadError::DuplicateId(id)) if id == "grunt"
        ));
    }

    #[test]
    fn test_role_lookup() {
        let mut registry = ActorRegistry::new();
        let def: ActorDef = toml::from_str(GRUNT_TOML).expect("parse");
        registry.register(def).expect("register");

        assert!(registry.enemy("grunt").is_ok());
        assert!(matches!(
            registry.player("grunt"),
            Err(ContentLoadError::WrongRole { found: ActorRole::Enemy, .. })
        ));
        assert!(matches!(
            registry.enemy("dragon"),
            Err(ContentLoadError::UnknownActor(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let mut loader = ContentLoader::new("/nonexistent/riftblade/actors");
        assert!(matches!(loader.load_all(), Err(ContentLoadError::NotFound(_))));
    }

    #[test]
    fn test_reload_picks_up_new_files() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "grunt.toml", GRUNT_TOML);
        let mut loader = ContentLoader::new(dir.path());
        assert_eq!(loader.load_all().expect("load"), 1);

        write(&dir, "adept.ron", ADEPT_RON);
        assert_eq!(loader.reload().expect("reload"), 2);
        assert_eq!(loader.registry().len(), 2);
    }
}
