//! Data-driven actor classes.
//!
//! An [`ActorDef`] describes everything that differs between classes:
//! vitals, animation namespace and clips, basic attack, skills, key bindings
//! and AI settings. Actors are composed from these definitions at spawn time.

use std::collections::BTreeMap;

use ahash::AHashSet;
use riftblade_common::{SchemaVersion, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hitbox::{HitboxConfig, HitboxShape, TargetType};
use crate::input::CombatKey;
use crate::renderer::AnimationClip;
use crate::skill::{SkillDef, SkillKind};
use crate::state_lock::LockTable;

/// Errors found while validating content.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    /// A field has an unusable value
    #[error("{actor}: invalid {field}: {reason}")]
    InvalidValue {
        /// Actor id
        actor: String,
        /// Offending field
        field: String,
        /// What is wrong
        reason: String,
    },

    /// Two skills share a name
    #[error("{actor}: duplicate skill '{skill}'")]
    DuplicateSkill {
        /// Actor id
        actor: String,
        /// Skill name
        skill: String,
    },

    /// A binding names a skill the actor doesn't have
    #[error("{actor}: key {key:?} bound to unknown skill '{skill}'")]
    UnknownBinding {
        /// Actor id
        actor: String,
        /// Bound key
        key: CombatKey,
        /// Skill name
        skill: String,
    },

    /// Enemy or boss without AI settings
    #[error("{0}: enemies need a [controller] section")]
    MissingController(String),

    /// Boss without phases
    #[error("{0}: bosses need at least one phase")]
    MissingBossPhases(String),

    /// Content written for an incompatible schema
    #[error("{actor}: schema version {found} is not compatible with {expected}")]
    IncompatibleVersion {
        /// Actor id
        actor: String,
        /// Version in the file
        found: String,
        /// Version supported
        expected: SchemaVersion,
    },
}

/// What drives an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Controlled by input
    Player,
    /// Regular enemy AI
    Enemy,
    /// Phase-aware boss AI
    Boss,
}

fn default_basic_active_ms() -> f32 {
    150.0
}

/// Basic attack used by the `attack`/`air_attack` states and by enemy melee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAttackDef {
    /// Fixed damage per hit
    pub damage: f32,
    /// Time between attacks
    pub cooldown_ms: f32,
    /// Delay from the swing to the hitbox
    #[serde(default)]
    pub hitbox_delay_ms: f32,
    /// How long the hitbox stays live
    #[serde(default = "default_basic_active_ms")]
    pub active_ms: f32,
    /// Hitbox shapes
    pub shapes: Vec<HitboxShape>,
    /// Knockback (x mirrored by facing)
    #[serde(default)]
    pub knockback: Vec2,
    /// Single or multi target
    #[serde(default)]
    pub target_type: TargetType,
}

impl BasicAttackDef {
    /// Creates a basic attack with one shape.
    #[must_use]
    pub fn new(damage: f32, cooldown_ms: f32, shape: HitboxShape) -> Self {
        Self {
            damage,
            cooldown_ms,
            hitbox_delay_ms: 0.0,
            active_ms: default_basic_active_ms(),
            shapes: vec![shape],
            knockback: Vec2::ZERO,
            target_type: TargetType::default(),
        }
    }

    /// Hitbox configuration for the attack.
    #[must_use]
    pub fn hitbox_config(&self) -> HitboxConfig {
        HitboxConfig {
            shapes: self.shapes.clone(),
            damage: self.damage,
            knockback: self.knockback,
            effects: Vec::new(),
            target_type: self.target_type,
            duration_ms: self.active_ms,
            sequence: Vec::new(),
        }
    }
}

/// AI movement settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Targets further than this are ignored
    pub detect_range: f32,
    /// Stop and attack within this distance
    pub attack_range: f32,
    /// Bosses run (instead of walk) within this distance
    #[serde(default)]
    pub run_range: Option<f32>,
    /// Patrol half-width around the spawn point
    #[serde(default)]
    pub patrol_range: f32,
}

/// One boss phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossPhaseDef {
    /// Health at the start of the phase
    pub max_health: f32,
    /// HP bar tint (0xRRGGBB)
    #[serde(default)]
    pub tint: Option<u32>,
}

/// Boss settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    /// Phases in order; the first one's health is the boss's starting health
    pub phases: Vec<BossPhaseDef>,
}

fn default_content_version() -> String {
    SchemaVersion::ACTOR_CONTENT.to_string()
}

fn default_size() -> Vec2 {
    Vec2::new(32.0, 48.0)
}

/// A data-driven actor class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDef {
    /// Content schema version
    #[serde(default = "default_content_version")]
    pub version: String,
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Who drives the actor
    pub role: ActorRole,
    /// Animation namespace (defaults to the id)
    #[serde(default)]
    pub namespace: Option<String>,
    /// Maximum health (bosses use their first phase instead)
    pub max_health: f32,
    /// Maximum mana
    #[serde(default)]
    pub max_mana: f32,
    /// Mana regained per second
    #[serde(default)]
    pub mana_regen_per_sec: f32,
    /// Body size
    #[serde(default = "default_size")]
    pub size: Vec2,
    /// Walk speed in pixels per second
    pub walk_speed: f32,
    /// Run speed in pixels per second
    #[serde(default)]
    pub run_speed: Option<f32>,
    /// Jump impulse
    #[serde(default)]
    pub jump_velocity: f32,
    /// Basic attack
    pub basic_attack: BasicAttackDef,
    /// Skills
    #[serde(default)]
    pub skills: Vec<SkillDef>,
    /// Key to skill name
    #[serde(default)]
    pub bindings: BTreeMap<CombatKey, String>,
    /// AI settings
    #[serde(default)]
    pub controller: Option<ControllerConfig>,
    /// Boss phases
    #[serde(default)]
    pub boss: Option<BossConfig>,
    /// Experience granted on defeat
    #[serde(default)]
    pub exp_reward: u32,
    /// Animation clips, keyed without the namespace
    #[serde(default)]
    pub animations: Vec<AnimationClip>,
}

impl ActorDef {
    /// Creates a definition with no skills, bindings or animations.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        role: ActorRole,
        max_health: f32,
        basic_attack: BasicAttackDef,
    ) -> Self {
        let id = id.into();
        Self {
            version: default_content_version(),
            name: id.clone(),
            id,
            role,
            namespace: None,
            max_health,
            max_mana: 0.0,
            mana_regen_per_sec: 0.0,
            size: default_size(),
            walk_speed: 100.0,
            run_speed: None,
            jump_velocity: 0.0,
            basic_attack,
            skills: Vec::new(),
            bindings: BTreeMap::new(),
            controller: None,
            boss: None,
            exp_reward: 0,
            animations: Vec::new(),
        }
    }

    /// Animation namespace.
    #[must_use]
    pub fn animation_namespace(&self) -> String {
        self.namespace.clone().unwrap_or_else(|| self.id.clone())
    }

    /// Clips with their keys namespaced, ready to register with a renderer.
    #[must_use]
    pub fn namespaced_clips(&self) -> Vec<AnimationClip> {
        let ns = self.animation_namespace();
        self.animations
            .iter()
            .map(|clip| {
                let mut clip = clip.clone();
                if !clip.key.starts_with(&format!("{ns}_")) {
                    clip.key = format!("{ns}_{}", clip.key);
                }
                clip
            })
            .collect()
    }

    /// Health at spawn.
    #[must_use]
    pub fn starting_health(&self) -> f32 {
        self.boss
            .as_ref()
            .and_then(|b| b.phases.first())
            .map_or(self.max_health, |p| p.max_health)
    }

    /// Run speed, falling back to walk speed.
    #[must_use]
    pub fn run_speed(&self) -> f32 {
        self.run_speed.unwrap_or(self.walk_speed)
    }

    /// Validates the definition.
    pub fn validate(&self) -> Result<(), ContentError> {
        let invalid = |field: &str, reason: &str| ContentError::InvalidValue {
            actor: self.id.clone(),
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let found = SchemaVersion::parse(&self.version).ok_or_else(|| invalid("version", "not a semantic version"))?;
        if !SchemaVersion::ACTOR_CONTENT.is_compatible_with(&found) {
            return Err(ContentError::IncompatibleVersion {
                actor: self.id.clone(),
                found: self.version.clone(),
                expected: SchemaVersion::ACTOR_CONTENT,
            });
        }

        if self.id.trim().is_empty() {
            return Err(invalid("id", "must not be empty"));
        }
        if self.max_health <= 0.0 {
            return Err(invalid("max_health", "must be positive"));
        }
        if self.walk_speed < 0.0 {
            return Err(invalid("walk_speed", "must not be negative"));
        }
        if self.basic_attack.shapes.is_empty() {
            return Err(invalid("basic_attack.shapes", "needs at least one shape"));
        }
        if self.basic_attack.cooldown_ms < 0.0 {
            return Err(invalid("basic_attack.cooldown_ms", "must not be negative"));
        }

        let mut names = AHashSet::new();
        for skill in &self.skills {
            if !names.insert(skill.name.as_str()) {
                return Err(ContentError::DuplicateSkill {
                    actor: self.id.clone(),
                    skill: skill.name.clone(),
                });
            }
            self.validate_skill(skill)?;
        }

        for (key, skill) in &self.bindings {
            if !names.contains(skill.as_str()) {
                return Err(ContentError::UnknownBinding {
                    actor: self.id.clone(),
                    key: *key,
                    skill: skill.clone(),
                });
            }
        }

        match self.role {
            ActorRole::Player => {}
            ActorRole::Enemy | ActorRole::Boss if self.controller.is_none() => {
                return Err(ContentError::MissingController(self.id.clone()));
            }
            ActorRole::Enemy => {}
            ActorRole::Boss => {
                if self.boss.as_ref().map_or(true, |b| b.phases.is_empty()) {
                    return Err(ContentError::MissingBossPhases(self.id.clone()));
                }
            }
        }
        Ok(())
    }

    fn validate_skill(&self, skill: &SkillDef) -> Result<(), ContentError> {
        let invalid = |reason: &str| ContentError::InvalidValue {
            actor: self.id.clone(),
            field: format!("skills.{}", skill.name),
            reason: reason.to_string(),
        };

        if skill.cooldown_ms < 0.0 {
            return Err(invalid("cooldown_ms must not be negative"));
        }
        if skill.cost.mana.is_some_and(|m| m < 0.0) {
            return Err(invalid("mana cost must not be negative"));
        }
        if !skill.kind.is_movement() && !skill.state.is_lock_state() {
            return Err(invalid("state must be a locking skill state"));
        }
        if let Some(hitbox) = skill.kind.hitbox() {
            if hitbox.shapes.is_empty() && hitbox.sequence.is_empty() {
                return Err(invalid("hitbox needs shapes or a sequence"));
            }
        }
        match &skill.kind {
            SkillKind::Movement { .. } if skill.duration_ms.is_none() => {
                Err(invalid("movement skills need duration_ms"))
            }
            SkillKind::Channeling { channel, .. } if channel.tick_interval_ms <= 0.0 => {
                Err(invalid("tick_interval_ms must be positive"))
            }
            SkillKind::Buff { duration_ms, .. } if *duration_ms <= 0.0 => {
                Err(invalid("buff duration must be positive"))
            }
            SkillKind::Projectile { projectile, .. } if projectile.speed <= 0.0 => {
                Err(invalid("projectile speed must be positive"))
            }
            _ => Ok(()),
        }
    }
}

fn default_sequence_grace() -> f32 {
    100.0
}

/// Global combat tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Maximum lock duration per locking state
    pub lock_durations: LockTable,
    /// Grace after the last sequence step before a sequence hitbox closes
    #[serde(default = "default_sequence_grace")]
    pub sequence_grace_ms: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            lock_durations: LockTable::default(),
            sequence_grace_ms: default_sequence_grace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNIGHT: &str = r#"
        id = "knight"
        name = "Knight"
        role = "player"
        max_health = 120
        max_mana = 60
        walk_speed = 160
        run_speed = 260
        jump_velocity = 520

        [basic_attack]
        damage = 8
        cooldown_ms = 350
        shapes = [{ width = 50, height = 40, offset_x = 30 }]

        [bindings]
        q = "cleave"

        [[skills]]
        name = "cleave"
        cooldown_ms = 1000
        cost = { mana = 20 }
        [skills.kind]
        type = "melee"
        [skills.kind.hitbox]
        damage = 20
        shapes = [{ width = 80, height = 50, offset_x = 40 }]

        [[animations]]
        key = "attack"
        frame_count = 6
        frame_rate = 12
    "#;

    fn knight() -> ActorDef {
        toml::from_str(KNIGHT).expect("valid knight")
    }

    #[test]
    fn test_parse_and_validate() {
        let def = knight();
        def.validate().expect("valid");
        assert_eq!(def.bindings.get(&CombatKey::Q).map(String::as_str), Some("cleave"));
        assert_eq!(def.namespaced_clips()[0].key, "knight_attack");
        assert_eq!(def.size, Vec2::new(32.0, 48.0));
    }

    #[test]
    fn test_unknown_binding() {
        let mut def = knight();
        def.bindings.insert(CombatKey::W, "whirlwind".into());
        assert!(matches!(
            def.validate(),
            Err(ContentError::UnknownBinding { key: CombatKey::W, .. })
        ));
    }

    #[test]
    fn test_duplicate_skill() {
        let mut def = knight();
        def.skills.push(def.skills[0].clone());
        assert!(matches!(
            def.validate(),
            Err(ContentError::DuplicateSkill { .. })
        ));
    }

    #[test]
    fn test_enemy_needs_controller() {
        let mut def = knight();
        def.role = ActorRole::Enemy;
        assert_eq!(
            def.validate(),
            Err(ContentError::MissingController("knight".into()))
        );
    }

    #[test]
    fn test_boss_starting_health_from_first_phase() {
        let mut def = knight();
        def.role = ActorRole::Boss;
        def.controller = Some(ControllerConfig {
            detect_range: 400.0,
            attack_range: 60.0,
            run_range: Some(200.0),
            patrol_range: 0.0,
        });
        assert_eq!(
            def.validate(),
            Err(ContentError::MissingBossPhases("knight".into()))
        );
        def.boss = Some(BossConfig {
            phases: vec![
                BossPhaseDef {
                    max_health: 300.0,
                    tint: None,
                },
                BossPhaseDef {
                    max_health: 450.0,
                    tint: Some(0xff_40_40),
                },
            ],
        });
        def.validate().expect("valid boss");
        assert_eq!(def.starting_health(), 300.0);
    }

    #[test]
    fn test_incompatible_version() {
        let mut def = knight();
        def.version = "2.0.0".into();
        assert!(matches!(
            def.validate(),
            Err(ContentError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_tuning_defaults() {
        let tuning: CombatTuning = toml::from_str("sequence_grace_ms = 50").expect("valid");
        assert_eq!(tuning.sequence_grace_ms, 50.0);
        assert_eq!(
            tuning
                .lock_durations
                .max_duration_ms(crate::state_machine::ActorState::RSkill),
            Some(3000.0)
        );
    }
}
