//! Actor state graph.
//!
//! The state machine owns the actor's coarse state (idle, walk, attack,
//! skill states...) and couples each transition to an animation and, for
//! locking states, to a [`StateLockManager`] lock.

use riftblade_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::animation::{AnimationController, PlayedAnimation};
use crate::context::CombatContext;
use crate::events::CombatEvent;
use crate::renderer::{AnimationSignal, AnimationSignalKind};
use crate::state_lock::{LockTable, StateLockManager, UnlockTrigger};

/// Coarse actor states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    /// Standing still
    #[default]
    Idle,
    /// Walking
    Walk,
    /// Running
    Run,
    /// Airborne
    Jump,
    /// Grounded basic attack
    Attack,
    /// Airborne basic attack
    AirAttack,
    /// Skill slot Q
    QSkill,
    /// Skill slot W
    WSkill,
    /// Skill slot E
    ESkill,
    /// Skill slot R
    RSkill,
    /// Skill slot S
    SSkill,
    /// Defeated
    Dead,
}

impl ActorState {
    /// All states.
    pub const ALL: [Self; 12] = [
        Self::Idle,
        Self::Walk,
        Self::Run,
        Self::Jump,
        Self::Attack,
        Self::AirAttack,
        Self::QSkill,
        Self::WSkill,
        Self::ESkill,
        Self::RSkill,
        Self::SSkill,
        Self::Dead,
    ];

    /// Animation key of the state (before namespacing).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Attack => "attack",
            Self::AirAttack => "air_attack",
            Self::QSkill => "q_skill",
            Self::WSkill => "w_skill",
            Self::ESkill => "e_skill",
            Self::RSkill => "r_skill",
            Self::SSkill => "s_skill",
            Self::Dead => "dead",
        }
    }

    /// Parses a state from its key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Whether entering this state locks the actor.
    #[must_use]
    pub const fn is_lock_state(self) -> bool {
        matches!(
            self,
            Self::Attack
                | Self::AirAttack
                | Self::QSkill
                | Self::WSkill
                | Self::ESkill
                | Self::RSkill
                | Self::SSkill
        )
    }
}

/// Optional animation override for a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest<'k> {
    /// Key to play instead of the state's own key
    pub key: &'k str,
    /// Frame rate override
    pub frame_rate: Option<f32>,
}

/// A transition that was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State left
    pub previous: ActorState,
    /// Animation that started, if it could be played
    pub animation: Option<PlayedAnimation>,
}

/// One actor's state machine.
#[derive(Debug, Clone)]
pub struct StateMachine {
    owner: EntityId,
    current: ActorState,
    previous: ActorState,
    lock: StateLockManager,
    animation: AnimationController,
    lock_table: LockTable,
}

impl StateMachine {
    /// Creates a state machine in `Idle`.
    #[must_use]
    pub fn new(owner: EntityId, namespace: Option<String>, lock_table: LockTable) -> Self {
        Self {
            owner,
            current: ActorState::Idle,
            previous: ActorState::Idle,
            lock: StateLockManager::new(owner),
            animation: AnimationController::new(owner, namespace),
            lock_table,
        }
    }

    /// Owning actor.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> ActorState {
        self.current
    }

    /// State before the last transition.
    #[must_use]
    pub fn previous(&self) -> ActorState {
        self.previous
    }

    /// Whether the actor is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// The lock manager (read-only).
    #[must_use]
    pub fn lock(&self) -> &StateLockManager {
        &self.lock
    }

    /// The animation controller.
    #[must_use]
    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    /// Maximum lock duration configured for `state`.
    #[must_use]
    pub fn max_lock_ms(&self, state: ActorState) -> Option<f32> {
        self.lock_table.max_duration_ms(state)
    }

    /// Mutable animation controller, for animations outside the state graph.
    pub fn animation_mut(&mut self) -> &mut AnimationController {
        &mut self.animation
    }

    /// Transitions to `next` playing the state's own animation.
    ///
    /// Returns `false` when rejected: `next` equals the current state, or the
    /// actor is locked.
    pub fn change_state(&mut self, next: ActorState, ctx: &mut CombatContext<'_>) -> bool {
        self.enter(next, None, ctx).is_some()
    }

    /// Transitions to `next`, optionally playing a different animation.
    pub fn enter(
        &mut self,
        next: ActorState,
        animation: Option<AnimationRequest<'_>>,
        ctx: &mut CombatContext<'_>,
    ) -> Option<Transition> {
        if next == self.current || self.lock.is_locked() {
            return None;
        }

        let previous = self.current;
        self.previous = previous;
        self.current = next;

        let (key, frame_rate) = animation.map_or((next.key(), None), |a| (a.key, a.frame_rate));
        let played = self.animation.play(key, frame_rate, ctx.renderer);

        debug!(owner = %self.owner, ?previous, ?next, "state changed");
        ctx.events.publish(CombatEvent::StateChanged {
            actor: self.owner,
            previous,
            next,
        });

        self.setup_state_lock(next, played.as_ref(), ctx);

        Some(Transition {
            previous,
            animation: played,
        })
    }

    /// Clears any existing lock and, for locking states, arms a new one.
    ///
    /// The animation listener is only armed when the animation actually
    /// started and will complete on its own; otherwise the timeout is the
    /// sole unlock path.
    pub fn setup_state_lock(
        &mut self,
        state: ActorState,
        played: Option<&PlayedAnimation>,
        ctx: &mut CombatContext<'_>,
    ) {
        self.lock.clear(ctx.scheduler);
        let Some(max_ms) = self.lock_table.max_duration_ms(state) else {
            return;
        };
        let listener = played
            .filter(|p| p.duration_ms.is_some())
            .map(|p| (p.key.clone(), p.playback));
        if listener.is_none() {
            debug!(owner = %self.owner, ?state, max_ms, "lock without animation listener");
        }
        self.lock.arm(state, listener, max_ms, ctx.scheduler);
    }

    /// Routes an animation signal to the lock listener.
    ///
    /// Returns `true` if the signal released the lock.
    pub fn on_animation_signal(
        &mut self,
        signal: &AnimationSignal,
        ctx: &mut CombatContext<'_>,
    ) -> bool {
        if signal.actor != self.owner || signal.kind != AnimationSignalKind::Complete {
            return false;
        }
        match self
            .lock
            .release_on_animation(&signal.key, signal.playback, ctx.scheduler)
        {
            Some(state) => {
                self.released(state, UnlockTrigger::AnimationComplete, ctx);
                true
            }
            None => false,
        }
    }

    /// Handles a fired lock timeout.
    ///
    /// Returns `true` if the timeout released the lock; a timeout from an
    /// older lock is ignored.
    pub fn on_lock_timeout(&mut self, generation: u64, ctx: &mut CombatContext<'_>) -> bool {
        match self.lock.release_on_timeout(generation) {
            Some(state) => {
                self.released(state, UnlockTrigger::Timeout, ctx);
                true
            }
            None => false,
        }
    }

    /// Replaces the lock timeout with `duration_ms` from now.
    pub fn override_lock_duration(
        &mut self,
        duration_ms: f32,
        ctx: &mut CombatContext<'_>,
    ) -> bool {
        self.lock.rearm_timeout(duration_ms, ctx.scheduler)
    }

    /// Drops the lock and returns to rest.
    pub fn force_unlock(&mut self, ctx: &mut CombatContext<'_>) {
        self.lock.clear(ctx.scheduler);
        self.return_to_rest(ctx);
    }

    /// Returns to `Idle` on the ground, `Jump` in the air.
    pub fn return_to_rest(&mut self, ctx: &mut CombatContext<'_>) {
        if self.current == ActorState::Dead {
            return;
        }
        let rest = if ctx.grounded(self.owner) {
            ActorState::Idle
        } else {
            ActorState::Jump
        };
        self.change_state(rest, ctx);
    }

    /// Enters `Dead`, overriding any lock.
    pub fn kill(&mut self, ctx: &mut CombatContext<'_>) {
        self.lock.clear(ctx.scheduler);
        self.change_state(ActorState::Dead, ctx);
    }

    /// Clears the lock and its timer.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        self.lock.clear(ctx.scheduler);
    }

    fn released(&mut self, state: ActorState, trigger: UnlockTrigger, ctx: &mut CombatContext<'_>) {
        if trigger == UnlockTrigger::Timeout {
            warn!(owner = %self.owner, ?state, "state lock timed out, forcing unlock");
        } else {
            debug!(owner = %self.owner, ?state, "state lock released by animation");
        }
        if self.current == state {
            self.return_to_rest(ctx);
        }
    }
}
