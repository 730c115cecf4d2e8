//! Scripted player input for headless encounters.
//!
//! The pilot walks toward the nearest live enemy, swings when in reach and
//! fires bound skills on a jittered timer. Channel skills are held for a
//! random stretch. All randomness comes from one seeded [`fastrand::Rng`],
//! so a fixed seed replays the same run.

use riftblade_combat::{ActorDef, CombatInput, CombatKey, SkillKind};
use riftblade_common::Vec2;
use tracing::debug;

/// Every key the pilot may touch.
const KEYS: [CombatKey; 10] = [
    CombatKey::Left,
    CombatKey::Right,
    CombatKey::Run,
    CombatKey::Jump,
    CombatKey::Attack,
    CombatKey::Q,
    CombatKey::W,
    CombatKey::E,
    CombatKey::R,
    CombatKey::S,
];

/// Distance beyond which the pilot runs instead of walking.
const RUN_DISTANCE: f32 = 220.0;

/// What the pilot can see this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PilotView {
    /// Player center
    pub position: Vec2,
    /// Whether the player stands on the floor
    pub grounded: bool,
    /// Center of the nearest live enemy
    pub target: Option<Vec2>,
}

#[derive(Debug, Clone, Copy)]
struct BoundSkill {
    key: CombatKey,
    channel: bool,
}

/// Seeded input script.
#[derive(Debug, Clone)]
pub struct ScriptedPilot {
    rng: fastrand::Rng,
    skills: Vec<BoundSkill>,
    reach: f32,
    next_skill_ms: f64,
    channel: Option<(CombatKey, f64)>,
    attack_down: bool,
    jump_chance: f32,
}

impl ScriptedPilot {
    /// Builds a pilot for a player definition.
    #[must_use]
    pub fn new(seed: Option<u64>, def: &ActorDef) -> Self {
        let rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let skills = def
            .bindings
            .iter()
            .filter_map(|(key, name)| {
                let skill = def.skills.iter().find(|s| &s.name == name)?;
                Some(BoundSkill {
                    key: *key,
                    channel: matches!(skill.kind, SkillKind::Channeling { .. }),
                })
            })
            .collect();
        let reach = def
            .basic_attack
            .shapes
            .iter()
            .map(|s| s.offset_x.abs() + s.width * 0.5)
            .fold(0.0_f32, f32::max);

        Self {
            rng,
            skills,
            reach: reach.max(24.0),
            next_skill_ms: 0.0,
            channel: None,
            attack_down: false,
            jump_chance: 0.004,
        }
    }

    /// How close the pilot gets before swinging.
    #[must_use]
    pub fn reach(&self) -> f32 {
        self.reach
    }

    /// Whether a channel key is being held.
    #[must_use]
    pub fn is_channeling(&self) -> bool {
        self.channel.is_some()
    }

    /// Writes this frame's key states into `input`.
    pub fn drive(&mut self, now_ms: f64, view: &PilotView, input: &mut CombatInput) {
        let mut down: Vec<CombatKey> = Vec::with_capacity(4);
        self.decide(now_ms, view, &mut down);
        for key in KEYS {
            input.set(key, down.contains(&key));
        }
    }

    fn decide(&mut self, now_ms: f64, view: &PilotView, down: &mut Vec<CombatKey>) {
        if let Some((key, until)) = self.channel {
            if now_ms < until {
                down.push(key);
                return;
            }
            debug!(?key, "pilot releases channel");
            self.channel = None;
            return;
        }

        let Some(target) = view.target else {
            self.attack_down = false;
            return;
        };

        let dx = target.x - view.position.x;
        let distance = dx.abs();
        if distance > self.reach * 0.6 {
            down.push(if dx < 0.0 { CombatKey::Left } else { CombatKey::Right });
            if distance > RUN_DISTANCE {
                down.push(CombatKey::Run);
            }
        }

        if view.grounded && self.rng.f32() < self.jump_chance {
            down.push(CombatKey::Jump);
        }

        if distance > self.reach * 2.5 {
            self.attack_down = false;
            return;
        }

        if now_ms >= self.next_skill_ms && !self.skills.is_empty() {
            let skill = self.skills[self.rng.usize(..self.skills.len())];
            down.push(skill.key);
            if skill.channel {
                let hold = 600.0 + self.rng.f64() * 900.0;
                self.channel = Some((skill.key, now_ms + hold));
            }
            self.next_skill_ms = now_ms + 1200.0 + self.rng.f64() * 1600.0;
            debug!(key = ?skill.key, "pilot casts");
            return;
        }

        // Tap attack every other frame so each press registers
        self.attack_down = !self.attack_down && distance <= self.reach;
        if self.attack_down {
            down.push(CombatKey::Attack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riftblade_combat::{ActorRole, BasicAttackDef, ChannelConfig, HitboxShape, SkillDef};

    fn adept() -> ActorDef {
        let mut shape = HitboxShape::new(40.0, 40.0);
        shape.offset_x = 30.0;
        let mut def = ActorDef::new(
            "adept",
            ActorRole::Player,
            100.0,
            BasicAttackDef::new(5.0, 300.0, shape),
        );
        def.skills = vec![SkillDef::new(
            "beam",
            SkillKind::Channeling {
                channel: ChannelConfig {
                    mana_per_tick: 2.0,
                    tick_interval_ms: 100.0,
                },
                hitbox: None,
            },
            1000.0,
        )];
        def.bindings.insert(CombatKey::E, "beam".to_string());
        def
    }

    fn view(target_x: Option<f32>) -> PilotView {
        PilotView {
            position: Vec2::ZERO,
            grounded: false,
            target: target_x.map(|x| Vec2::new(x, 0.0)),
        }
    }

    #[test]
    fn test_reach_from_basic_attack() {
        let pilot = ScriptedPilot::new(Some(1), &adept());
        assert_eq!(pilot.reach(), 50.0);
    }

    #[test]
    fn test_walks_and_runs_toward_target() {
        let mut pilot = ScriptedPilot::new(Some(1), &adept());
        let mut input = CombatInput::new();

        pilot.drive(0.0, &view(Some(200.0)), &mut input);
        assert!(input.is_held(CombatKey::Right));
        assert!(!input.is_held(CombatKey::Run));

        pilot.drive(20.0, &view(Some(-400.0)), &mut input);
        assert!(input.is_held(CombatKey::Left));
        assert!(input.is_held(CombatKey::Run));
        assert!(input.just_released(CombatKey::Right));
    }

    #[test]
    fn test_holds_channel_then_releases() {
        let mut pilot = ScriptedPilot::new(Some(7), &adept());
        let mut input = CombatInput::new();

        pilot.drive(0.0, &view(Some(20.0)), &mut input);
        assert!(input.just_pressed(CombatKey::E));
        assert!(pilot.is_channeling());
        input.end_frame();

        pilot.drive(500.0, &view(Some(20.0)), &mut input);
        assert!(input.is_held(CombatKey::E));

        pilot.drive(1600.0, &view(Some(20.0)), &mut input);
        assert!(!pilot.is_channeling());
        assert!(input.just_released(CombatKey::E));
    }

    #[test]
    fn test_idle_without_target() {
        let mut pilot = ScriptedPilot::new(Some(3), &adept());
        let mut input = CombatInput::new();
        input.press(CombatKey::Left);
        pilot.drive(0.0, &view(None), &mut input);
        for key in KEYS {
            assert!(!input.is_held(key));
        }
    }

    #[test]
    fn test_same_seed_same_script() {
        let def = adept();
        let mut a = ScriptedPilot::new(Some(42), &def);
        let mut b = ScriptedPilot::new(Some(42), &def);
        let (mut ia, mut ib) = (CombatInput::new(), CombatInput::new());
        for frame in 0..200 {
            let now = f64::from(frame) * 20.0;
            let v = PilotView {
                grounded: true,
                ..view(Some(30.0))
            };
            a.drive(now, &v, &mut ia);
            b.drive(now, &v, &mut ib);
            for key in KEYS {
                assert_eq!(ia.is_held(key), ib.is_held(key));
            }
            ia.end_frame();
            ib.end_frame();
        }
    }
}
