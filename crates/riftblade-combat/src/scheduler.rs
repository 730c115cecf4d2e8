//! Deferred callbacks for the combat core.
//!
//! Timers carry a typed payload ([`CombatTimer`]) instead of a closure. When a
//! timer fires, the owner of the queue hands the payload back to the actor
//! that scheduled it, which keeps all mutation on the single game-loop thread
//! and makes cancellation a matter of dropping a handle.

use riftblade_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buff::BuffId;
use crate::hitbox::HitboxSlot;
use crate::skill::SkillSlot;

/// Handle returned by [`Scheduler::schedule_once`], used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a fired timer means to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Safety-net unlock for a locked state.
    StateLockTimeout {
        /// Lock generation the timeout was armed for
        generation: u64,
    },
    /// Delayed hitbox activation (`hitbox_delay_ms`).
    HitboxActivate {
        /// Hitbox to activate
        slot: HitboxSlot,
        /// Skill/attack activation that requested it
        activation: u64,
    },
    /// End of a hitbox's active window.
    HitboxDeactivate {
        /// Hitbox to deactivate
        slot: HitboxSlot,
        /// Hitbox activation cycle being closed
        cycle: u64,
    },
    /// A sequence step becomes live.
    SequenceStepSpawn {
        /// Owning hitbox
        slot: HitboxSlot,
        /// Hitbox activation cycle
        cycle: u64,
        /// Step index
        step: usize,
    },
    /// A sequence step's duration elapsed.
    SequenceStepExpire {
        /// Owning hitbox
        slot: HitboxSlot,
        /// Hitbox activation cycle
        cycle: u64,
        /// Step index
        step: usize,
    },
    /// Complete a skill that has no animation hook.
    SkillFallbackComplete {
        /// Skill to complete
        skill: SkillSlot,
        /// Skill activation generation
        activation: u64,
    },
    /// End of a movement skill's impulse.
    MovementEnd {
        /// Movement skill
        skill: SkillSlot,
        /// Skill activation generation
        activation: u64,
    },
    /// Telegraphed area attack detonates.
    AoeDetonate {
        /// Area skill
        skill: SkillSlot,
        /// Skill activation generation
        activation: u64,
    },
    /// Delayed projectile launch.
    ProjectileLaunch {
        /// Projectile skill
        skill: SkillSlot,
        /// Skill activation generation
        activation: u64,
    },
    /// A timed buff runs out.
    BuffExpire {
        /// Buff to remove
        buff: BuffId,
    },
}

/// A scheduled payload addressed to one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTimer {
    /// Actor that scheduled the timer and receives it
    pub owner: EntityId,
    /// Meaning of the timer
    pub kind: TimerKind,
}

impl CombatTimer {
    /// Creates a new timer payload.
    #[must_use]
    pub const fn new(owner: EntityId, kind: TimerKind) -> Self {
        Self { owner, kind }
    }
}

/// Scheduler contract consumed by the combat core.
pub trait Scheduler {
    /// Current scheduler time in milliseconds.
    fn now_ms(&self) -> f64;

    /// Schedules `timer` to fire once after `delay_ms`.
    fn schedule_once(&mut self, delay_ms: f32, timer: CombatTimer) -> TimerHandle;

    /// Cancels a pending timer. Returns `false` if it already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Cancels every pending timer owned by `owner`. Returns how many were removed.
    fn cancel_owner(&mut self, owner: EntityId) -> usize;
}

/// A timer that has come due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    /// Handle the timer was scheduled under
    pub handle: TimerHandle,
    /// Payload
    pub timer: CombatTimer,
}

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    fire_at_ms: f64,
    timer: CombatTimer,
}

/// Cooperative timer queue driven by the frame loop.
///
/// Time only moves in [`TimerQueue::advance`]; [`TimerQueue::take_due`] then
/// yields everything due, ordered by fire time and then scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now_ms: f64,
    next_handle: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    /// Creates an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending timers owned by `owner`.
    #[must_use]
    pub fn pending_for(&self, owner: EntityId) -> usize {
        self.pending
            .iter()
            .filter(|t| t.timer.owner == owner)
            .count()
    }

    /// Moves the clock forward.
    pub fn advance(&mut self, delta_ms: f32) {
        self.now_ms += f64::from(delta_ms.max(0.0));
    }

    /// Removes and returns all timers due at the current time.
    pub fn take_due(&mut self) -> Vec<FiredTimer> {
        let now = self.now_ms;
        let (mut due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.fire_at_ms <= now);
        self.pending = keep;

        due.sort_by(|a, b| {
            a.fire_at_ms
                .total_cmp(&b.fire_at_ms)
                .then(a.handle.cmp(&b.handle))
        });

        due.into_iter()
            .map(|t| FiredTimer {
                handle: t.handle,
                timer: t.timer,
            })
            .collect()
    }

    /// Milliseconds until the next timer is due, if any.
    #[must_use]
    pub fn next_due_in(&self) -> Option<f64> {
        self.pending
            .iter()
            .map(|t| (t.fire_at_ms - self.now_ms).max(0.0))
            .min_by(f64::total_cmp)
    }
}

impl Scheduler for TimerQueue {
    fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn schedule_once(&mut self, delay_ms: f32, timer: CombatTimer) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let fire_at_ms = self.now_ms + f64::from(delay_ms.max(0.0));
        trace!(?handle, ?timer, fire_at_ms, "timer scheduled");
        self.pending.push(PendingTimer {
            handle,
            fire_at_ms,
            timer,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        before != self.pending.len()
    }

    fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|t| t.timer.owner != owner);
        before - self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_timer(owner: EntityId, generation: u64) -> CombatTimer {
        CombatTimer::new(owner, TimerKind::StateLockTimeout { generation })
    }

    #[test]
    fn test_timers_fire_in_time_order() {
        let owner = EntityId::new();
        let mut queue = TimerQueue::new();
        queue.schedule_once(300.0, lock_timer(owner, 3));
        queue.schedule_once(100.0, lock_timer(owner, 1));
        queue.schedule_once(200.0, lock_timer(owner, 2));

        queue.advance(250.0);
        let fired: Vec<_> = queue.take_due().into_iter().map(|f| f.timer).collect();
        assert_eq!(fired, vec![lock_timer(owner, 1), lock_timer(owner, 2)]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_same_time_keeps_schedule_order() {
        let owner = EntityId::new();
        let mut queue = TimerQueue::new();
        let a = queue.schedule_once(50.0, lock_timer(owner, 1));
        let b = queue.schedule_once(50.0, lock_timer(owner, 2));

        queue.advance(50.0);
        let fired = queue.take_due();
        assert_eq!(fired[0].handle, a);
        assert_eq!(fired[1].handle, b);
    }

    #[test]
    fn test_cancel() {
        let owner = EntityId::new();
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_once(10.0, lock_timer(owner, 1));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));

        queue.advance(20.0);
        assert!(queue.take_due().is_empty());
    }

    #[test]
    fn test_cancel_owner_leaves_others() {
        let a = EntityId::new();
        let b = EntityId::new();
        let mut queue = TimerQueue::new();
        queue.schedule_once(10.0, lock_timer(a, 1));
        queue.schedule_once(10.0, lock_timer(a, 2));
        queue.schedule_once(10.0, lock_timer(b, 1));

        assert_eq!(queue.cancel_owner(a), 2);
        assert_eq!(queue.pending_for(a), 0);
        assert_eq!(queue.pending_for(b), 1);
    }

    #[test]
    fn test_zero_delay_is_due_immediately() {
        let owner = EntityId::new();
        let mut queue = TimerQueue::new();
        queue.schedule_once(0.0, lock_timer(owner, 1));
        assert_eq!(queue.take_due().len(), 1);
        assert_eq!(queue.next_due_in(), None);
    }
}
