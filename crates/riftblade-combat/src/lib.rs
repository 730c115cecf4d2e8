//! # Riftblade Combat
//!
//! Combat execution engine for Riftblade.
//!
//! This crate provides the combat core and the contracts it runs against:
//! - Collaborator traits (renderer, physics, scheduler) with in-memory impls
//! - State machine with timed state locks
//! - Skills (cooldown, mana, animation-coupled completion)
//! - Hitboxes (single and timed sequences), projectiles, channeling, buffs
//! - Player and AI skill systems, enemy and boss controllers
//! - Hit resolution, progress tracking and the encounter arena
//! - Data-driven actor definitions
//! - Event bus for UI, audio and progression

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod animation;
pub mod arena;
pub mod boss;
pub mod buff;
pub mod channeling;
pub mod collision;
pub mod content;
pub mod context;
pub mod controller;
pub mod enemy_skill_system;
pub mod events;
pub mod hitbox;
pub mod input;
pub mod physics;
pub mod progress;
pub mod projectile;
pub mod renderer;
pub mod scheduler;
pub mod skill;
pub mod skill_system;
pub mod state_lock;
pub mod state_machine;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::animation::*;
    pub use crate::arena::*;
    pub use crate::boss::*;
    pub use crate::buff::*;
    pub use crate::channeling::*;
    pub use crate::collision::*;
    pub use crate::content::*;
    pub use crate::context::*;
    pub use crate::controller::*;
    pub use crate::enemy_skill_system::*;
    pub use crate::events::*;
    pub use crate::hitbox::*;
    pub use crate::input::*;
    pub use crate::physics::*;
    pub use crate::progress::*;
    pub use crate::projectile::*;
    pub use crate::renderer::*;
    pub use crate::scheduler::*;
    pub use crate::skill::*;
    pub use crate::skill_system::*;
    pub use crate::state_lock::*;
    pub use crate::state_machine::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use riftblade_common::Vec2;

    #[test]
    fn test_stage_context_shares_clock() {
        let mut stage = Stage::new();
        stage.timers.advance(250.0);
        let ctx = stage.ctx();
        assert_eq!(ctx.now_ms(), 250.0);
    }

    #[test]
    fn test_buff_skill_applies_and_expires() {
        let mut def = ActorDef::new(
            "mystic",
            ActorRole::Player,
            50.0,
            BasicAttackDef::new(5.0, 300.0, HitboxShape::new(20.0, 20.0)),
        );
        def.skills = vec![SkillDef::new(
            "focus",
            SkillKind::Buff {
                stat: BuffStat::Damage,
                multiplier: 1.5,
                duration_ms: 1000.0,
            },
            3000.0,
        )
        .with_state(ActorState::RSkill)];
        def.bindings.insert(CombatKey::R, "focus".to_string());

        let mut stage = Stage::new();
        let mut arena = Arena::new(
            &mut stage,
            &def,
            Vec2::ZERO,
            CombatTuning::default(),
            ProgressTracker::new(),
        )
        .expect("valid");
        let mut input = CombatInput::new();
        input.press(CombatKey::R);
        arena.update(&mut stage, 20.0, &input);
        input.release(CombatKey::R);
        input.end_frame();
        assert_eq!(
            arena.player().combatant.buffs.multiplier(BuffStat::Damage),
            1.5
        );

        for _ in 0..60 {
            arena.update(&mut stage, 20.0, &input);
            input.end_frame();
        }
        assert_eq!(
            arena.player().combatant.buffs.multiplier(BuffStat::Damage),
            1.0
        );
        assert!(arena.player().combatant.state.is_locked());

        // No clip: the r_skill lock (3000 ms) falls back to its timeout and
        // the skill to its fallback timer at the same moment.
        for _ in 0..100 {
            arena.update(&mut stage, 20.0, &input);
            input.end_frame();
        }
        assert!(!arena.player().combatant.state.is_locked());
        let status = arena.player().skills.get_skill("focus").expect("focus");
        assert!(!status.is_active);
        assert!(status.is_on_cooldown);
    }
}
