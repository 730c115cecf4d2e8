//! Actors composed from data.
//!
//! Every actor is a [`Combatant`] (vitals, state machine, buffs) plus the
//! skill system that drives it. Player and enemy differ only in which skill
//! system and which brain they carry.

use riftblade_common::{EntityId, Facing, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boss::BossController;
use crate::buff::{BuffSet, BuffStat};
use crate::content::{ActorDef, ActorRole, CombatTuning, ContentError};
use crate::context::CombatContext;
use crate::controller::{Decision, EnemyController, TargetInfo};
use crate::enemy_skill_system::EnemySkillSystem;
use crate::input::{CombatInput, CombatKey};
use crate::physics::Body;
use crate::renderer::AnimationSignal;
use crate::scheduler::TimerKind;
use crate::skill_system::{SkillExecutor, SkillSystem};
use crate::state_machine::{ActorState, StateMachine};

/// Health and mana.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Current health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Current mana
    pub mana: f32,
    /// Maximum mana
    pub max_mana: f32,
    /// Mana regained per second
    pub mana_regen_per_sec: f32,
}

impl Vitals {
    /// Full health and mana.
    #[must_use]
    pub fn new(max_health: f32, max_mana: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            mana_regen_per_sec: 0.0,
        }
    }

    /// Sets mana regeneration.
    #[must_use]
    pub fn with_regen(mut self, per_sec: f32) -> Self {
        self.mana_regen_per_sec = per_sec;
        self
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn health_percent(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Removes health. Dead actors and non-positive amounts are ignored.
    ///
    /// Returns the damage actually applied.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || amount <= 0.0 {
            return 0.0;
        }
        let applied = amount.min(self.health);
        self.health -= applied;
        applied
    }

    /// Sets a new maximum and refills health to it.
    pub fn reset_health(&mut self, max_health: f32) {
        self.max_health = max_health;
        self.health = max_health;
    }

    /// Regenerates mana.
    pub fn regen(&mut self, delta_ms: f32) {
        self.mana = (self.mana + self.mana_regen_per_sec * delta_ms / 1000.0).min(self.max_mana);
    }
}

/// The parts every actor shares.
#[derive(Debug, Clone)]
pub struct Combatant {
    /// Runtime id
    pub id: EntityId,
    /// Content id of the actor class
    pub def_id: String,
    /// Health and mana
    pub vitals: Vitals,
    /// State graph
    pub state: StateMachine,
    /// Active buffs
    pub buffs: BuffSet,
    /// Ignores incoming hits
    pub invincible: bool,
    /// Walk speed
    pub walk_speed: f32,
    /// Run speed
    pub run_speed: f32,
    stunned_until_ms: f64,
}

impl Combatant {
    /// Builds a combatant from its class definition.
    #[must_use]
    pub fn from_def(id: EntityId, def: &ActorDef, tuning: &CombatTuning) -> Self {
        let vitals =
            Vitals::new(def.starting_health(), def.max_mana).with_regen(def.mana_regen_per_sec);
        Self {
            id,
            def_id: def.id.clone(),
            vitals,
            state: StateMachine::new(
                id,
                Some(def.animation_namespace()),
                tuning.lock_durations.clone(),
            ),
            buffs: BuffSet::new(),
            invincible: false,
            walk_speed: def.walk_speed,
            run_speed: def.run_speed(),
            stunned_until_ms: 0.0,
        }
    }

    /// A body of the class's size at `position`.
    #[must_use]
    pub fn body(def: &ActorDef, position: Vec2) -> Body {
        Body::new(position, def.size)
    }

    /// Whether the actor is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }

    /// Whether the actor is stunned at `now_ms`.
    #[must_use]
    pub fn is_stunned(&self, now_ms: f64) -> bool {
        now_ms < self.stunned_until_ms
    }

    /// Stuns until `now_ms + duration_ms` (never shortens a running stun).
    pub fn stun(&mut self, now_ms: f64, duration_ms: f32) {
        self.stunned_until_ms = self.stunned_until_ms.max(now_ms + f64::from(duration_ms));
    }

    /// Move speed after buffs.
    #[must_use]
    pub fn move_speed(&self, running: bool) -> f32 {
        let base = if running {
            self.run_speed
        } else {
            self.walk_speed
        };
        base * self.buffs.multiplier(BuffStat::MoveSpeed)
    }

    /// Collision bounds.
    #[must_use]
    pub fn bounds(&self, ctx: &CombatContext<'_>) -> Option<Rect> {
        ctx.physics.bounds(self.id)
    }

    /// Drops every buff, lock and pending timer.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.state.destroy(ctx);
        self.buffs.clear(ctx.scheduler);
        let cancelled = ctx.scheduler.cancel_owner(self.id);
        debug!(actor = %self.id, cancelled, "combatant destroyed");
    }
}

fn route_timer(
    combatant: &mut Combatant,
    executor: &mut SkillExecutor,
    kind: TimerKind,
    ctx: &mut CombatContext<'_>,
) {
    match kind {
        TimerKind::StateLockTimeout { generation } => {
            combatant.state.on_lock_timeout(generation, ctx);
        }
        other => {
            executor.on_timer(other, combatant, ctx);
        }
    }
}

fn route_signal(
    combatant: &mut Combatant,
    executor: &mut SkillExecutor,
    signal: &AnimationSignal,
    ctx: &mut CombatContext<'_>,
) {
    executor.on_animation_signal(signal, combatant, ctx);
    combatant.state.on_animation_signal(signal, ctx);
}

/// The player character.
#[derive(Debug, Clone)]
pub struct PlayerActor {
    /// Shared combat parts
    pub combatant: Combatant,
    /// Key-bound skills
    pub skills: SkillSystem,
    jump_velocity: f32,
}

impl PlayerActor {
    /// Builds the player from its class definition.
    #[must_use]
    pub fn new(id: EntityId, def: &ActorDef, tuning: &CombatTuning) -> Self {
        Self {
            combatant: Combatant::from_def(id, def, tuning),
            skills: SkillSystem::new(id, def, tuning),
            jump_velocity: def.jump_velocity,
        }
    }

    /// Runtime id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.combatant.id
    }

    /// Input, skills, then locomotion.
    pub fn update(&mut self, delta_ms: f32, input: &CombatInput, ctx: &mut CombatContext<'_>) {
        let stunned = self.combatant.is_stunned(ctx.now_ms());
        if self.combatant.is_alive() && !stunned {
            self.skills.handle_input(input, &mut self.combatant, ctx);
        }
        self.skills.update(delta_ms, input, &mut self.combatant, ctx);
        if stunned {
            ctx.physics.set_velocity_x(self.combatant.id, 0.0);
            return;
        }
        self.locomote(input, ctx);
    }

    fn locomote(&mut self, input: &CombatInput, ctx: &mut CombatContext<'_>) {
        let id = self.combatant.id;
        if !self.combatant.is_alive()
            || self.combatant.state.is_locked()
            || self.skills.executor().is_busy()
        {
            return;
        }

        let axis = input.move_axis();
        let running = input.is_held(CombatKey::Run);
        if axis == 0.0 {
            ctx.physics.set_velocity_x(id, 0.0);
        } else {
            let facing = Facing::from_delta(axis, ctx.physics.facing(id));
            ctx.physics.set_facing(id, facing);
            ctx.physics
                .set_velocity_x(id, axis * self.combatant.move_speed(running));
        }

        let grounded = ctx.grounded(id);
        if grounded && self.jump_velocity > 0.0 && input.just_pressed(CombatKey::Jump) {
            let vx = ctx.physics.velocity(id).x;
            ctx.physics.set_velocity(id, Vec2::new(vx, -self.jump_velocity));
            self.combatant.state.change_state(ActorState::Jump, ctx);
            return;
        }

        let next = if !grounded {
            ActorState::Jump
        } else if axis == 0.0 {
            ActorState::Idle
        } else if running {
            ActorState::Run
        } else {
            ActorState::Walk
        };
        self.combatant.state.change_state(next, ctx);
    }

    /// Routes a fired timer.
    pub fn on_timer(&mut self, kind: TimerKind, ctx: &mut CombatContext<'_>) {
        route_timer(&mut self.combatant, self.skills.executor_mut(), kind, ctx);
    }

    /// Routes an animation signal.
    pub fn on_animation_signal(&mut self, signal: &AnimationSignal, ctx: &mut CombatContext<'_>) {
        route_signal(&mut self.combatant, self.skills.executor_mut(), signal, ctx);
    }

    /// Cuts the running skill short.
    pub fn interrupt(&mut self, ctx: &mut CombatContext<'_>) -> bool {
        self.skills.interrupt(&mut self.combatant, ctx)
    }

    /// Tears the player down.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.skills.destroy(ctx);
        self.combatant.destroy(ctx);
    }
}

/// Enemy behaviour.
#[derive(Debug, Clone)]
pub enum Brain {
    /// Regular enemy: chase, attack, patrol
    Enemy(EnemyController),
    /// Boss: range bands, skill selection, phases
    Boss(BossController),
}

impl Brain {
    /// Builds the brain an enemy definition asks for.
    pub fn from_def(def: &ActorDef, spawn: Vec2) -> Result<Self, ContentError> {
        let controller = def
            .controller
            .ok_or_else(|| ContentError::MissingController(def.id.clone()))?;
        match (def.role, def.boss.as_ref()) {
            (ActorRole::Boss, Some(boss)) => Ok(Self::Boss(BossController::new(controller, boss, spawn))),
            (ActorRole::Boss, None) => Err(ContentError::MissingBossPhases(def.id.clone())),
            _ => Ok(Self::Enemy(EnemyController::new(controller, spawn))),
        }
    }

    /// Movement controller.
    pub fn controller_mut(&mut self) -> &mut EnemyController {
        match self {
            Self::Enemy(controller) => controller,
            Self::Boss(boss) => boss.controller_mut(),
        }
    }

    /// Whether this is a boss.
    #[must_use]
    pub fn is_boss(&self) -> bool {
        matches!(self, Self::Boss(_))
    }
}

/// An AI-driven actor.
#[derive(Debug, Clone)]
pub struct EnemyActor {
    /// Shared combat parts
    pub combatant: Combatant,
    /// AI-selected skills
    pub skills: EnemySkillSystem,
    /// Decision loop
    pub brain: Brain,
    exp_reward: u32,
    rewarded: bool,
}

impl EnemyActor {
    /// Builds an enemy spawned at `spawn`.
    pub fn new(
        id: EntityId,
        def: &ActorDef,
        tuning: &CombatTuning,
        spawn: Vec2,
    ) -> Result<Self, ContentError> {
        Ok(Self {
            combatant: Combatant::from_def(id, def, tuning),
            skills: EnemySkillSystem::new(id, def, tuning),
            brain: Brain::from_def(def, spawn)?,
            exp_reward: def.exp_reward,
            rewarded: false,
        })
    }

    /// Runtime id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.combatant.id
    }

    /// Experience granted on defeat.
    #[must_use]
    pub fn exp_reward(&self) -> u32 {
        self.exp_reward
    }

    /// Marks the reward as granted. Returns `false` if it already was.
    pub fn claim_reward(&mut self) -> bool {
        !std::mem::replace(&mut self.rewarded, true)
    }

    /// Skills, then one think step.
    pub fn update(&mut self, delta_ms: f32, targets: &[TargetInfo], ctx: &mut CombatContext<'_>) {
        self.skills.update(delta_ms, &mut self.combatant, ctx);
        self.think(targets, ctx);
    }

    /// Runs the brain and carries out its decision.
    pub fn think(&mut self, targets: &[TargetInfo], ctx: &mut CombatContext<'_>) {
        let id = self.combatant.id;
        if !self.combatant.is_alive() {
            return;
        }
        if self.combatant.is_stunned(ctx.now_ms()) {
            ctx.physics.set_velocity_x(id, 0.0);
            return;
        }
        if self.combatant.state.is_locked() || self.skills.is_busy() {
            return;
        }
        let Some(position) = ctx.physics.position(id) else {
            return;
        };
        let facing = ctx.physics.facing(id);
        let decision = self.brain.controller_mut().think(position, facing, targets);

        match decision {
            Decision::Idle => {
                ctx.physics.set_velocity_x(id, 0.0);
                self.combatant.state.return_to_rest(ctx);
            }
            Decision::Patrol { direction } => {
                self.walk(direction, false, ctx);
            }
            Decision::Advance {
                direction,
                running,
                distance,
            } => {
                ctx.physics.set_facing(id, direction);
                if self.try_skill(distance, ctx) {
                    return;
                }
                self.walk(direction, running, ctx);
            }
            Decision::Attack {
                direction,
                distance,
            } => {
                ctx.physics.set_facing(id, direction);
                ctx.physics.set_velocity_x(id, 0.0);
                if self.try_skill(distance, ctx) {
                    return;
                }
                if !self.skills.basic_attack(&mut self.combatant, ctx) {
                    self.combatant.state.return_to_rest(ctx);
                }
            }
        }
    }

    fn try_skill(&mut self, distance: f32, ctx: &mut CombatContext<'_>) -> bool {
        self.brain.is_boss()
            && self
                .skills
                .try_use_best(distance, &mut self.combatant, ctx)
                .is_some()
    }

    fn walk(&mut self, direction: Facing, running: bool, ctx: &mut CombatContext<'_>) {
        let id = self.combatant.id;
        ctx.physics.set_facing(id, direction);
        ctx.physics
            .set_velocity_x(id, direction.sign() * self.combatant.move_speed(running));
        let state = if running {
            ActorState::Run
        } else {
            ActorState::Walk
        };
        self.combatant.state.change_state(state, ctx);
    }

    /// Routes a fired timer.
    pub fn on_timer(&mut self, kind: TimerKind, ctx: &mut CombatContext<'_>) {
        route_timer(&mut self.combatant, self.skills.executor_mut(), kind, ctx);
    }

    /// Routes an animation signal.
    pub fn on_animation_signal(&mut self, signal: &AnimationSignal, ctx: &mut CombatContext<'_>) {
        route_signal(&mut self.combatant, self.skills.executor_mut(), signal, ctx);
    }

    /// Tears the enemy down.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.skills.destroy(ctx);
        self.combatant.destroy(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_ignored_when_dead() {
        let mut v = Vitals::new(10.0, 0.0);
        assert_eq!(v.take_damage(25.0), 10.0);
        assert!(!v.is_alive());
        assert_eq!(v.take_damage(5.0), 0.0);
        assert_eq!(v.health, 0.0);
    }

    #[test]
    fn test_regen_caps_at_max() {
        let mut v = Vitals::new(10.0, 50.0).with_regen(10.0);
        v.mana = 45.0;
        v.regen(1000.0);
        assert_eq!(v.mana, 50.0);
    }

    #[test]
    fn test_reset_health() {
        let mut v = Vitals::new(100.0, 0.0);
        v.take_damage(100.0);
        v.reset_health(250.0);
        assert!(v.is_alive());
        assert_eq!(v.health_percent(), 1.0);
    }
}
