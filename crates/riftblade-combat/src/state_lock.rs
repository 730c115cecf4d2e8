//! Timed state locks.
//!
//! A lock has two independent release paths: the one-shot animation listener
//! and the safety-net timeout. Arming always clears the previous lock first,
//! and every lock carries a generation so a timeout from an older lock can
//! never release a newer one.

use std::collections::BTreeMap;

use riftblade_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::renderer::PlaybackId;
use crate::scheduler::{CombatTimer, Scheduler, TimerHandle, TimerKind};
use crate::state_machine::ActorState;

/// Maximum lock duration per locked state, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockTable(BTreeMap<ActorState, f32>);

impl Default for LockTable {
    fn default() -> Self {
        Self(BTreeMap::from([
            (ActorState::Attack, 600.0),
            (ActorState::AirAttack, 600.0),
            (ActorState::QSkill, 1200.0),
            (ActorState::WSkill, 1500.0),
            (ActorState::ESkill, 2500.0),
            (ActorState::RSkill, 3000.0),
            (ActorState::SSkill, 1000.0),
        ]))
    }
}

impl LockTable {
    /// Fallback when a lock state has no entry.
    pub const FALLBACK_MS: f32 = 1000.0;

    /// Maximum lock duration for `state`, if it is a locking state.
    #[must_use]
    pub fn max_duration_ms(&self, state: ActorState) -> Option<f32> {
        if !state.is_lock_state() {
            return None;
        }
        Some(self.0.get(&state).copied().unwrap_or(Self::FALLBACK_MS))
    }

    /// Overrides one entry.
    pub fn set(&mut self, state: ActorState, max_ms: f32) {
        self.0.insert(state, max_ms.max(0.0));
    }
}

/// How a lock was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockTrigger {
    /// The armed animation completed
    AnimationComplete,
    /// The safety-net timeout fired
    Timeout,
}

#[derive(Debug, Clone)]
struct ArmedLock {
    state: ActorState,
    listener: Option<(String, PlaybackId)>,
    timeout: Option<TimerHandle>,
    generation: u64,
}

/// Arms and clears the lock flag on one actor's state.
#[derive(Debug, Clone)]
pub struct StateLockManager {
    owner: EntityId,
    armed: Option<ArmedLock>,
    generation: u64,
}

impl StateLockManager {
    /// Creates an unlocked manager.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            armed: None,
            generation: 0,
        }
    }

    /// Whether the actor is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.armed.is_some()
    }

    /// The state holding the lock.
    #[must_use]
    pub fn locked_state(&self) -> Option<ActorState> {
        self.armed.as_ref().map(|a| a.state)
    }

    /// Generation of the current (or last) lock.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the lock currently has an animation listener.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.armed.as_ref().is_some_and(|a| a.listener.is_some())
    }

    /// Whether the lock currently has a pending timeout.
    #[must_use]
    pub fn has_timeout(&self) -> bool {
        self.armed.as_ref().is_some_and(|a| a.timeout.is_some())
    }

    /// Locks `state`, clearing any previous lock first.
    ///
    /// `listener` is the exact animation (key and playback) whose completion
    /// releases the lock; `None` leaves only the timeout.
    pub fn arm(
        &mut self,
        state: ActorState,
        listener: Option<(String, PlaybackId)>,
        max_duration_ms: f32,
        scheduler: &mut dyn Scheduler,
    ) -> u64 {
        self.clear(scheduler);
        self.generation += 1;
        let generation = self.generation;

        let timeout = scheduler.schedule_once(
            max_duration_ms,
            CombatTimer::new(self.owner, TimerKind::StateLockTimeout { generation }),
        );
        trace!(owner = %self.owner, ?state, generation, max_duration_ms, "state lock armed");

        self.armed = Some(ArmedLock {
            state,
            listener,
            timeout: Some(timeout),
            generation,
        });
        generation
    }

    /// Drops the listener and cancels the timeout. Safe to call when unlocked.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(armed) = self.armed.take() {
            if let Some(handle) = armed.timeout {
                scheduler.cancel(handle);
            }
        }
    }

    /// Replaces the pending timeout with one `duration_ms` from now.
    ///
    /// Used when a skill configures an explicit duration. Returns `false`
    /// when unlocked.
    pub fn rearm_timeout(&mut self, duration_ms: f32, scheduler: &mut dyn Scheduler) -> bool {
        let owner = self.owner;
        let Some(armed) = self.armed.as_mut() else {
            return false;
        };
        if let Some(handle) = armed.timeout.take() {
            scheduler.cancel(handle);
        }
        armed.timeout = Some(scheduler.schedule_once(
            duration_ms,
            CombatTimer::new(
                owner,
                TimerKind::StateLockTimeout {
                    generation: armed.generation,
                },
            ),
        ));
        true
    }

    /// Releases the lock if `key`/`playback` is the armed animation.
    ///
    /// The pending timeout is cancelled, so it can no longer fire.
    pub fn release_on_animation(
        &mut self,
        key: &str,
        playback: PlaybackId,
        scheduler: &mut dyn Scheduler,
    ) -> Option<ActorState> {
        let matches = self.armed.as_ref().is_some_and(|armed| {
            armed
                .listener
                .as_ref()
                .is_some_and(|(k, p)| k == key && *p == playback)
        });
        if !matches {
            return None;
        }
        let state = self.locked_state();
        self.clear(scheduler);
        state
    }

    /// Releases the lock if `generation` is the armed lock's timeout.
    pub fn release_on_timeout(&mut self, generation: u64) -> Option<ActorState> {
        if self.armed.as_ref().map(|a| a.generation) != Some(generation) {
            return None;
        }
        // The timer already fired; dropping the record disarms the listener.
        self.armed.take().map(|armed| armed.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerQueue;

    fn fire_all(queue: &mut TimerQueue, lock: &mut StateLockManager) -> Vec<ActorState> {
        let mut released = Vec::new();
        for fired in queue.take_due() {
            if let TimerKind::StateLockTimeout { generation } = fired.timer.kind {
                released.extend(lock.release_on_timeout(generation));
            }
        }
        released
    }

    #[test]
    fn test_default_table() {
        let table = LockTable::default();
        assert_eq!(table.max_duration_ms(ActorState::Attack), Some(600.0));
        assert_eq!(table.max_duration_ms(ActorState::ESkill), Some(2500.0));
        assert_eq!(table.max_duration_ms(ActorState::Idle), None);
    }

    #[test]
    fn test_animation_first_disarms_timeout() {
        let mut queue = TimerQueue::new();
        let mut lock = StateLockManager::new(EntityId::new());
        let playback = PlaybackId::from_raw(7);
        lock.arm(
            ActorState::Attack,
            Some(("hero_attack".into(), playback)),
            600.0,
            &mut queue,
        );
        assert!(lock.is_locked());

        assert_eq!(
            lock.release_on_animation("hero_attack", playback, &mut queue),
            Some(ActorState::Attack)
        );
        assert!(!lock.is_locked());
        assert!(queue.is_empty());

        queue.advance(1000.0);
        assert!(fire_all(&mut queue, &mut lock).is_empty());
    }

    #[test]
    fn test_timeout_first_disarms_listener() {
        let mut queue = TimerQueue::new();
        let mut lock = StateLockManager::new(EntityId::new());
        let playback = PlaybackId::from_raw(1);
        lock.arm(
            ActorState::Attack,
            Some(("hero_attack".into(), playback)),
            600.0,
            &mut queue,
        );

        queue.advance(600.0);
        assert_eq!(fire_all(&mut queue, &mut lock), vec![ActorState::Attack]);
        assert!(lock
            .release_on_animation("hero_attack", playback, &mut queue)
            .is_none());
    }

    #[test]
    fn test_stale_playback_is_ignored() {
        let mut queue = TimerQueue::new();
        let mut lock = StateLockManager::new(EntityId::new());
        lock.arm(
            ActorState::QSkill,
            Some(("hero_q".into(), PlaybackId::from_raw(2))),
            1200.0,
            &mut queue,
        );
        assert!(lock
            .release_on_animation("hero_q", PlaybackId::from_raw(1), &mut queue)
            .is_none());
        assert!(lock.is_locked());
    }

    #[test]
    fn test_rearm_clears_previous_timeout() {
        let mut queue = TimerQueue::new();
        let mut lock = StateLockManager::new(EntityId::new());
        lock.arm(ActorState::Attack, None, 600.0, &mut queue);
        lock.arm(ActorState::ESkill, None, 2500.0, &mut queue);
        assert_eq!(queue.len(), 1);

        queue.advance(600.0);
        assert!(fire_all(&mut queue, &mut lock).is_empty());
        assert_eq!(lock.locked_state(), Some(ActorState::ESkill));
    }

    #[test]
    fn test_rearm_timeout_moves_deadline() {
        let mut queue = TimerQueue::new();
        let mut lock = StateLockManager::new(EntityId::new());
        lock.arm(ActorState::WSkill, None, 1500.0, &mut queue);
        assert!(lock.rearm_timeout(300.0, &mut queue));
        assert_eq!(queue.len(), 1);

        queue.advance(300.0);
        assert_eq!(fire_all(&mut queue, &mut lock), vec![ActorState::WSkill]);
    }
}
