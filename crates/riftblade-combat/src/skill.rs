//! Skill definitions and per-skill runtime state.
//!
//! A skill is *used* (mana paid, marked active) and later *completed*
//! (inactive, cooldown starts). Cooldown is charged against the moment the
//! skill resolves, never the button press.

use ahash::AHashMap;
use riftblade_common::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::buff::BuffStat;
use crate::channeling::ChannelConfig;
use crate::hitbox::HitboxConfig;
use crate::projectile::ProjectileConfig;
use crate::state_machine::ActorState;

/// Index of a skill within its actor's skill set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillSlot(u16);

impl SkillSlot {
    /// Creates a slot from a list index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u16::try_from(index).unwrap_or(u16::MAX))
    }

    /// Position in the skill list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reasons a skill can't be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkillError {
    /// No skill with that name
    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    /// Cooldown still running
    #[error("skill on cooldown ({remaining_ms:.0} ms left)")]
    OnCooldown {
        /// Remaining cooldown
        remaining_ms: f32,
    },

    /// The skill is already in use
    #[error("skill already active")]
    AlreadyActive,

    /// Not enough mana
    #[error("not enough mana: need {required}, have {available}")]
    InsufficientMana {
        /// Mana cost
        required: f32,
        /// Mana available
        available: f32,
    },

    /// Skill needs ground contact
    #[error("skill requires ground contact")]
    RequiresGround,

    /// Skill can't be used in the air
    #[error("skill is not usable in the air")]
    NotAirEligible,

    /// Another state holds the lock
    #[error("actor is locked in {0:?}")]
    StateLocked(ActorState),

    /// The actor is dead
    #[error("actor is defeated")]
    Defeated,
}

/// Resource cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillCost {
    /// Mana paid on use
    #[serde(default)]
    pub mana: Option<f32>,
}

/// Hints used by the AI skill selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiHints {
    /// Maximum distance to the target
    #[serde(default)]
    pub range: Option<f32>,
    /// Higher is preferred
    #[serde(default)]
    pub priority: i32,
    /// Minimum distance (movement skills only)
    #[serde(default)]
    pub min_distance: Option<f32>,
}

/// Per-kind skill behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillKind {
    /// Close-range hitbox
    Melee {
        /// Hitbox
        hitbox: HitboxConfig,
        /// Delay from use to hitbox activation
        #[serde(default)]
        hitbox_delay_ms: f32,
    },
    /// Moving collider
    Projectile {
        /// Projectile
        projectile: ProjectileConfig,
        /// Delay from use to launch
        #[serde(default)]
        launch_delay_ms: f32,
    },
    /// Velocity impulse for the skill's duration
    Movement {
        /// Impulse (x mirrored by facing)
        velocity: Vec2,
        /// Ignore incoming hits while moving
        #[serde(default)]
        invincible: bool,
        /// Optional hitbox carried along
        #[serde(default)]
        hitbox: Option<HitboxConfig>,
    },
    /// Hold-to-cast
    Channeling {
        /// Drain settings
        channel: ChannelConfig,
        /// Hitbox re-armed on every drain tick
        #[serde(default)]
        hitbox: Option<HitboxConfig>,
    },
    /// Immediate effect, optional hitbox
    Instant {
        /// Hitbox
        #[serde(default)]
        hitbox: Option<HitboxConfig>,
        /// Delay from use to hitbox activation
        #[serde(default)]
        hitbox_delay_ms: f32,
    },
    /// Area attack, optionally telegraphed
    Aoe {
        /// Explosion hitbox
        hitbox: HitboxConfig,
        /// Warning shown before the explosion; `None` detonates at once
        #[serde(default)]
        warning_ms: Option<f32>,
    },
    /// Timed multiplier
    Buff {
        /// Stat scaled
        stat: BuffStat,
        /// Multiplier
        multiplier: f32,
        /// Buff length
        duration_ms: f32,
    },
}

impl SkillKind {
    /// Lowercase kind name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Melee { .. } => "melee",
            Self::Projectile { .. } => "projectile",
            Self::Movement { .. } => "movement",
            Self::Channeling { .. } => "channeling",
            Self::Instant { .. } => "instant",
            Self::Aoe { .. } => "aoe",
            Self::Buff { .. } => "buff",
        }
    }

    /// The hitbox owned by this kind, if any.
    #[must_use]
    pub fn hitbox(&self) -> Option<&HitboxConfig> {
        match self {
            Self::Melee { hitbox, .. } | Self::Aoe { hitbox, .. } => Some(hitbox),
            Self::Movement { hitbox, .. }
            | Self::Channeling { hitbox, .. }
            | Self::Instant { hitbox, .. } => hitbox.as_ref(),
            Self::Projectile { .. } | Self::Buff { .. } => None,
        }
    }

    /// Whether the actor may keep moving while the skill is active.
    #[must_use]
    pub const fn is_movement(&self) -> bool {
        matches!(self, Self::Movement { .. })
    }
}

fn default_skill_state() -> ActorState {
    ActorState::QSkill
}

/// Immutable skill configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    /// Unique name within the actor
    pub name: String,
    /// Behaviour
    pub kind: SkillKind,
    /// Resource cost
    #[serde(default)]
    pub cost: SkillCost,
    /// Cooldown started on completion
    pub cooldown_ms: f32,
    /// Fixed duration; without an animation the skill auto-completes after it
    #[serde(default)]
    pub duration_ms: Option<f32>,
    /// Must be grounded to use
    #[serde(default)]
    pub requires_ground: bool,
    /// May be used in the air
    #[serde(default)]
    pub air_eligible: bool,
    /// Animation played on use (namespaced per actor)
    #[serde(default)]
    pub animation: Option<String>,
    /// Animation frame rate override
    #[serde(default)]
    pub frame_rate: Option<f32>,
    /// State entered on use
    #[serde(default = "default_skill_state")]
    pub state: ActorState,
    /// AI selection hints
    #[serde(default)]
    pub ai: AiHints,
}

impl SkillDef {
    /// Creates a definition with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SkillKind, cooldown_ms: f32) -> Self {
        Self {
            name: name.into(),
            kind,
            cost: SkillCost::default(),
            cooldown_ms,
            duration_ms: None,
            requires_ground: false,
            air_eligible: false,
            animation: None,
            frame_rate: None,
            state: default_skill_state(),
            ai: AiHints::default(),
        }
    }

    /// Sets the mana cost.
    #[must_use]
    pub fn with_mana_cost(mut self, mana: f32) -> Self {
        self.cost.mana = Some(mana);
        self
    }

    /// Sets a fixed duration.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the animation key.
    #[must_use]
    pub fn with_animation(mut self, key: impl Into<String>) -> Self {
        self.animation = Some(key.into());
        self
    }

    /// Sets the state entered on use.
    #[must_use]
    pub fn with_state(mut self, state: ActorState) -> Self {
        self.state = state;
        self
    }

    /// Requires ground contact.
    #[must_use]
    pub fn grounded_only(mut self) -> Self {
        self.requires_ground = true;
        self
    }

    /// Allows use in the air.
    #[must_use]
    pub fn usable_in_air(mut self) -> Self {
        self.air_eligible = true;
        self
    }

    /// Sets the AI hints.
    #[must_use]
    pub fn with_ai(mut self, ai: AiHints) -> Self {
        self.ai = ai;
        self
    }
}

/// UI view of one skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStatus {
    /// Skill name
    pub name: String,
    /// Remaining cooldown as a fraction of the full cooldown
    pub cooldown_percent: f32,
    /// Cooldown running
    pub is_on_cooldown: bool,
    /// Skill in use
    pub is_active: bool,
}

/// Runtime state of one skill.
#[derive(Debug, Clone)]
pub struct Skill {
    def: SkillDef,
    slot: SkillSlot,
    cooldown_remaining_ms: f32,
    active: bool,
    channeling: bool,
    pending_cooldown: bool,
    active_start_ms: f64,
    active_elapsed_ms: f32,
    activation: u64,
}

impl Skill {
    /// Creates a ready skill.
    #[must_use]
    pub fn new(slot: SkillSlot, def: SkillDef) -> Self {
        Self {
            def,
            slot,
            cooldown_remaining_ms: 0.0,
            active: false,
            channeling: false,
            pending_cooldown: false,
            active_start_ms: 0.0,
            active_elapsed_ms: 0.0,
            activation: 0,
        }
    }

    /// Definition.
    #[must_use]
    pub fn def(&self) -> &SkillDef {
        &self.def
    }

    /// Name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Slot within the actor's skill set.
    #[must_use]
    pub fn slot(&self) -> SkillSlot {
        self.slot
    }

    /// Remaining cooldown.
    #[must_use]
    pub fn cooldown_remaining_ms(&self) -> f32 {
        self.cooldown_remaining_ms
    }

    /// Whether the skill is in use.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a channel is running.
    #[must_use]
    pub fn is_channeling(&self) -> bool {
        self.channeling
    }

    /// Whether completion will start the cooldown.
    #[must_use]
    pub fn pending_cooldown(&self) -> bool {
        self.pending_cooldown
    }

    /// Scheduler time of the last use.
    #[must_use]
    pub fn active_start_ms(&self) -> f64 {
        self.active_start_ms
    }

    /// Generation of the current (or last) use.
    #[must_use]
    pub fn activation(&self) -> u64 {
        self.activation
    }

    /// Whether the skill completes on its own after `duration_ms`.
    #[must_use]
    pub fn is_duration_driven(&self) -> bool {
        self.def.duration_ms.is_some()
            && self.def.animation.is_none()
            && !matches!(self.def.kind, SkillKind::Channeling { .. })
    }

    /// Checks every use condition.
    pub fn check(&self, mana: f32, grounded: bool) -> Result<(), SkillError> {
        if self.cooldown_remaining_ms > 0.0 {
            return Err(SkillError::OnCooldown {
                remaining_ms: self.cooldown_remaining_ms,
            });
        }
        if self.active {
            return Err(SkillError::AlreadyActive);
        }
        if let Some(required) = self.def.cost.mana {
            if mana < required {
                return Err(SkillError::InsufficientMana {
                    required,
                    available: mana,
                });
            }
        }
        if self.def.requires_ground && !grounded {
            return Err(SkillError::RequiresGround);
        }
        Ok(())
    }

    /// Whether the skill can be used now.
    #[must_use]
    pub fn can_use(&self, mana: f32, grounded: bool) -> bool {
        self.check(mana, grounded).is_ok()
    }

    /// Uses the skill: pays mana, marks it active and arms the cooldown.
    ///
    /// Returns the activation generation.
    pub fn activate(
        &mut self,
        mana: &mut f32,
        grounded: bool,
        now_ms: f64,
    ) -> Result<u64, SkillError> {
        self.check(*mana, grounded)?;
        if let Some(cost) = self.def.cost.mana {
            *mana -= cost;
        }
        self.active = true;
        self.pending_cooldown = true;
        self.channeling = matches!(self.def.kind, SkillKind::Channeling { .. });
        self.active_start_ms = now_ms;
        self.active_elapsed_ms = 0.0;
        self.activation += 1;
        debug!(skill = %self.def.name, activation = self.activation, "skill activated");
        Ok(self.activation)
    }

    /// Ends the skill and starts the cooldown. A second call is a no-op.
    ///
    /// Returns `true` if the skill was active.
    pub fn complete(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.channeling = false;
        if self.pending_cooldown {
            self.pending_cooldown = false;
            self.cooldown_remaining_ms = self.def.cooldown_ms.max(0.0);
        }
        debug!(skill = %self.def.name, cooldown_ms = self.cooldown_remaining_ms, "skill completed");
        true
    }

    /// Cuts the skill short. The full cooldown still applies from now.
    pub fn interrupt(&mut self) -> bool {
        self.complete()
    }

    /// Ticks the cooldown and auto-completes duration-driven skills.
    ///
    /// Returns `true` if this tick completed the skill.
    pub fn update(&mut self, delta_ms: f32) -> bool {
        let delta_ms = delta_ms.max(0.0);
        self.cooldown_remaining_ms = (self.cooldown_remaining_ms - delta_ms).max(0.0);

        if !self.active {
            return false;
        }
        self.active_elapsed_ms += delta_ms;
        match self.def.duration_ms {
            Some(duration) if self.is_duration_driven() && self.active_elapsed_ms >= duration => {
                self.complete()
            }
            _ => false,
        }
    }

    /// Remaining cooldown as a fraction of the full cooldown.
    #[must_use]
    pub fn cooldown_percent(&self) -> f32 {
        if self.def.cooldown_ms <= 0.0 {
            return 0.0;
        }
        (self.cooldown_remaining_ms / self.def.cooldown_ms).clamp(0.0, 1.0)
    }

    /// UI view.
    #[must_use]
    pub fn status(&self) -> SkillStatus {
        SkillStatus {
            name: self.def.name.clone(),
            cooldown_percent: self.cooldown_percent(),
            is_on_cooldown: self.cooldown_remaining_ms > 0.0,
            is_active: self.active,
        }
    }
}

/// The skills of one actor, addressable by slot or name.
#[derive(Debug, Clone, Default)]
pub struct SkillSet {
    skills: Vec<Skill>,
    by_name: AHashMap<String, SkillSlot>,
}

impl SkillSet {
    /// Builds runtime skills from definitions, in order.
    #[must_use]
    pub fn from_defs(defs: &[SkillDef]) -> Self {
        let mut set = Self::default();
        for def in defs {
            let slot = SkillSlot::from_index(set.skills.len());
            set.by_name.insert(def.name.clone(), slot);
            set.skills.push(Skill::new(slot, def.clone()));
        }
        set
    }

    /// Slot of the skill called `name`.
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<SkillSlot> {
        self.by_name.get(name).copied()
    }

    /// Skill by slot.
    #[must_use]
    pub fn get(&self, slot: SkillSlot) -> Option<&Skill> {
        self.skills.get(slot.index())
    }

    /// Mutable skill by slot.
    pub fn get_mut(&mut self, slot: SkillSlot) -> Option<&mut Skill> {
        self.skills.get_mut(slot.index())
    }

    /// Skill by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Skill> {
        self.slot_of(name).and_then(|slot| self.get(slot))
    }

    /// All skills in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter()
    }

    /// All skills, mutable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Skill> {
        self.skills.iter_mut()
    }

    /// Number of skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Returns true with no skills.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitbox::{HitboxShape, TargetType};
    use proptest::prelude::*;

    fn instant(cooldown_ms: f32) -> SkillDef {
        SkillDef::new(
            "spark",
            SkillKind::Instant {
                hitbox: Some(
                    HitboxConfig::new(HitboxShape::new(40.0, 40.0), 10.0)
                        .with_target_type(TargetType::Single),
                ),
                hitbox_delay_ms: 0.0,
            },
            cooldown_ms,
        )
    }

    #[test]
    fn test_insufficient_mana_leaves_mana_unchanged() {
        let mut skill = Skill::new(SkillSlot::from_index(0), instant(1000.0).with_mana_cost(20.0));
        let mut mana = 10.0;
        let err = skill.activate(&mut mana, true, 0.0).unwrap_err();
        assert!(matches!(err, SkillError::InsufficientMana { .. }));
        assert_eq!(mana, 10.0);
        assert!(!skill.is_active());
    }

    #[test]
    fn test_cooldown_starts_on_complete_only() {
        let mut skill = Skill::new(SkillSlot::from_index(0), instant(1000.0).with_mana_cost(5.0));
        let mut mana = 50.0;
        skill.activate(&mut mana, true, 0.0).expect("usable");
        assert_eq!(mana, 45.0);
        assert!(skill.pending_cooldown());
        assert_eq!(skill.cooldown_remaining_ms(), 0.0);

        skill.update(400.0);
        assert_eq!(skill.cooldown_remaining_ms(), 0.0);

        assert!(skill.complete());
        assert_eq!(skill.cooldown_remaining_ms(), 1000.0);
        assert!(!skill.complete());
        assert_eq!(skill.cooldown_remaining_ms(), 1000.0);
    }

    #[test]
    fn test_interrupt_pays_full_cooldown() {
        let mut skill = Skill::new(SkillSlot::from_index(0), instant(1500.0));
        let mut mana = 0.0;
        skill.activate(&mut mana, true, 0.0).expect("usable");
        skill.update(50.0);
        assert!(skill.interrupt());
        assert_eq!(skill.cooldown_remaining_ms(), 1500.0);
        assert!(skill.status().is_on_cooldown);
        assert!((skill.cooldown_percent() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_duration_driven_auto_completes() {
        let def = SkillDef::new(
            "dash",
            SkillKind::Movement {
                velocity: Vec2::new(600.0, 0.0),
                invincible: true,
                hitbox: None,
            },
            800.0,
        )
        .with_duration(250.0);
        let mut skill = Skill::new(SkillSlot::from_index(1), def);
        let mut mana = 0.0;
        skill.activate(&mut mana, true, 0.0).expect("usable");

        assert!(!skill.update(200.0));
        assert!(skill.update(50.0));
        assert!(!skill.is_active());
        assert_eq!(skill.cooldown_remaining_ms(), 800.0);
    }

    #[test]
    fn test_animation_driven_skill_waits_for_complete() {
        let def = instant(500.0).with_duration(100.0).with_animation("spark");
        let mut skill = Skill::new(SkillSlot::from_index(0), def);
        let mut mana = 0.0;
        skill.activate(&mut mana, true, 0.0).expect("usable");
        assert!(!skill.update(1000.0));
        assert!(skill.is_active());
    }

    #[test]
    fn test_skill_set_lookup() {
        let set = SkillSet::from_defs(&[instant(100.0), instant(200.0).with_state(ActorState::WSkill)]);
        assert_eq!(set.len(), 2);
        // Later definitions win the name index.
        assert_eq!(set.slot_of("spark"), Some(SkillSlot::from_index(1)));
        assert!(set.by_name("nova").is_none());
    }

    #[test]
    fn test_requires_ground() {
        let skill = Skill::new(SkillSlot::from_index(0), instant(0.0).grounded_only());
        assert_eq!(skill.check(0.0, false), Err(SkillError::RequiresGround));
        assert!(skill.can_use(0.0, true));
    }

    #[test]
    fn test_skill_def_from_toml() {
        let def: SkillDef = toml::from_str(
            r#"
            name = "cleave"
            cooldown_ms = 1200
            state = "w_skill"
            cost = { mana = 15 }

            [kind]
            type = "melee"
            hitbox_delay_ms = 120

            [kind.hitbox]
            damage = 25
            target_type = "multi"
            shapes = [{ width = 80, height = 50, offset_x = 45 }]
            "#,
        )
        .expect("valid skill");
        assert_eq!(def.state, ActorState::WSkill);
        assert_eq!(def.cost.mana, Some(15.0));
        assert_eq!(def.kind.name(), "melee");
        assert_eq!(def.kind.hitbox().map(|h| h.damage), Some(25.0));
    }

    proptest! {
        #[test]
        fn prop_cooldown_monotonic_and_non_negative(
            cooldown in 0.0f32..5000.0,
            deltas in proptest::collection::vec(0.0f32..400.0, 1..40),
        ) {
            let mut skill = Skill::new(SkillSlot::from_index(0), instant(cooldown));
            let mut mana = 0.0;
            skill.activate(&mut mana, true, 0.0).expect("usable");
            skill.complete();

            let mut last = skill.cooldown_remaining_ms();
            for delta in deltas {
                skill.update(delta);
                let now = skill.cooldown_remaining_ms();
                prop_assert!(now <= last);
                prop_assert!(now >= 0.0);
                last = now;
            }
        }

        #[test]
        fn prop_use_fails_while_cooling_or_active(mana in 0.0f32..1000.0, used in any::<bool>()) {
            let mut skill = Skill::new(SkillSlot::from_index(0), instant(1000.0));
            let mut pool = mana;
            skill.activate(&mut pool, true, 0.0).expect("first use");
            if used {
                skill.complete();
            }
            let mut pool = mana;
            prop_assert!(!skill.can_use(pool, true));
            prop_assert!(skill.activate(&mut pool, true, 0.0).is_err());
        }
    }
}
