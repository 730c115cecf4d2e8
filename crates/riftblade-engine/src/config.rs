//! Engine configuration.
//!
//! Simulation, content, arena and output settings plus the combat tuning
//! overrides. Configuration can be loaded from and saved to a TOML file.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use riftblade_combat::CombatTuning;
use riftblade_common::{RiftbladeError, RiftbladeResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content_loader::DEFAULT_CONTENT_PATH;

/// Configuration file name.
const CONFIG_FILE: &str = "riftblade.toml";

/// Environment variable that overrides the config file location.
const CONFIG_ENV: &str = "RIFTBLADE_CONFIG";

/// Default tracing directive.
pub const DEFAULT_LOG_FILTER: &str = "riftblade=info";

/// An enemy placed in the encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Actor id in the content registry
    pub actor: String,
    /// Horizontal spawn position
    pub x: f32,
}

impl SpawnConfig {
    /// Creates a spawn entry.
    #[must_use]
    pub fn new(actor: impl Into<String>, x: f32) -> Self {
        Self {
            actor: actor.into(),
            x,
        }
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config schema version
    pub version: String,

    // === Simulation ===
    /// Fixed simulation ticks per second
    pub tick_rate: u32,
    /// Encounter time limit in seconds
    pub max_duration_secs: f32,
    /// Pace ticks against the wall clock instead of running flat out
    pub realtime: bool,
    /// Seed for the scripted pilot (None = random)
    pub seed: Option<u64>,

    // === Content ===
    /// Directory holding actor definitions
    pub content_path: PathBuf,
    /// Player actor id
    pub player: String,
    /// Player spawn position
    pub player_x: f32,
    /// Enemies to spawn
    pub encounter: Vec<SpawnConfig>,

    // === Arena ===
    /// Floor surface
    pub floor_y: f32,
    /// Gravity in pixels per second squared
    pub gravity: f32,
    /// Event bus capacity
    pub event_capacity: usize,

    // === Output ===
    /// Tracing filter directive (RUST_LOG wins when set)
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Where to write the JSON encounter report
    pub report_path: Option<PathBuf>,

    // === Combat ===
    /// Lock durations and hitbox timing
    pub tuning: CombatTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::ENGINE_CONFIG.to_string(),

            // Simulation
            tick_rate: 60,
            max_duration_secs: 90.0,
            realtime: false,
            seed: None,

            // Content
            content_path: PathBuf::from(DEFAULT_CONTENT_PATH),
            player: "knight".to_string(),
            player_x: 0.0,
            encounter: vec![
                SpawnConfig::new("grunt", 260.0),
                SpawnConfig::new("grunt", -220.0),
                SpawnConfig::new("warlord", 520.0),
            ],

            // Arena
            floor_y: 0.0,
            gravity: 1400.0,
            event_capacity: 4096,

            // Output
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
            report_path: None,

            // Combat
            tuning: CombatTuning::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::read_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Reads and parses a config file, reporting why it couldn't be used.
    pub fn read_from<P: AsRef<Path>>(path: P) -> RiftbladeResult<Self> {
        let mut contents = String::new();
        fs::File::open(path.as_ref())?.read_to_string(&mut contents)?;
        toml::from_str(&contents).map_err(|e| RiftbladeError::Serialization(e.to_string()))
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> RiftbladeResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| RiftbladeError::Serialization(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// The config file location: `$RIFTBLADE_CONFIG`, else `riftblade.toml`
    /// in the working directory.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.max_duration_secs = self.max_duration_secs.clamp(1.0, 3600.0);
        self.gravity = self.gravity.clamp(0.0, 10_000.0);
        self.event_capacity = self.event_capacity.clamp(64, 65_536);
        self.tuning.sequence_grace_ms = self.tuning.sequence_grace_ms.max(0.0);

        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        }
    }

    /// Checks the file's schema version against the one this build reads.
    pub fn check_version(&self) -> RiftbladeResult<()> {
        let found = SchemaVersion::parse(&self.version);
        match found {
            Some(found) if SchemaVersion::ENGINE_CONFIG.is_compatible_with(&found) => Ok(()),
            _ => Err(RiftbladeError::VersionMismatch {
                expected: SchemaVersion::ENGINE_CONFIG.to_string(),
                actual: self.version.clone(),
            }),
        }
    }

    /// Milliseconds per simulation tick.
    #[must_use]
    pub fn tick_ms(&self) -> f32 {
        1000.0 / self.tick_rate.max(1) as f32
    }

    /// Tick budget for the encounter.
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        (self.max_duration_secs * self.tick_rate as f32).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riftblade_combat::ActorState;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.player, "knight");
        assert_eq!(config.encounter.len(), 3);
        assert!(config.check_version().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.tick_rate = 1;
        config.max_duration_secs = 0.0;
        config.log_filter = "  ".to_string();

        config.validate();

        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.max_duration_secs, 1.0);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.max_ticks(), 10);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("riftblade.toml");

        let mut config = EngineConfig::default();
        config.tick_rate = 120;
        config.seed = Some(7);
        config.encounter = vec![SpawnConfig::new("grunt", 90.0)];
        config.tuning.lock_durations.set(ActorState::Attack, 450.0);

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.tick_rate, 120);
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.encounter, vec![SpawnConfig::new("grunt", 90.0)]);
        assert_eq!(
            loaded.tuning.lock_durations.max_duration_ms(ActorState::Attack),
            Some(450.0)
        );
    }

    #[test]
    fn test_read_errors_are_typed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("riftblade.toml");
        fs::write(&config_path, "tick_rate = \"fast\"\n").expect("write");

        assert!(matches!(
            EngineConfig::read_from(&config_path),
            Err(RiftbladeError::Serialization(_))
        ));
        assert!(matches!(
            EngineConfig::read_from(temp_dir.path().join("missing.toml")),
            Err(RiftbladeError::Io(_))
        ));
        // The lenient loader falls back to defaults for the same file.
        assert_eq!(EngineConfig::load_from(&config_path).tick_rate, 60);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/riftblade.toml");
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("riftblade.toml");
        fs::write(&config_path, "player = \"ranger\"\nrealtime = true\n").expect("write");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.player, "ranger");
        assert!(config.realtime);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_incompatible_version() {
        let mut config = EngineConfig::default();
        config.version = "2.0.0".to_string();
        assert!(matches!(
            config.check_version(),
            Err(RiftbladeError::VersionMismatch { .. })
        ));
        config.version = "garbage".to_string();
        assert!(config.check_version().is_err());
    }
}
