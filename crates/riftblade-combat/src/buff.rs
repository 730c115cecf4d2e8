//! Timed stat multipliers.

use riftblade_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scheduler::{CombatTimer, Scheduler, TimerHandle, TimerKind};

/// Identifies one applied buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuffId(u64);

/// Stat a buff scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffStat {
    /// Outgoing damage
    Damage,
    /// Incoming damage is divided by this
    Defense,
    /// Walk/run speed
    MoveSpeed,
}

#[derive(Debug, Clone)]
struct ActiveBuff {
    id: BuffId,
    stat: BuffStat,
    multiplier: f32,
    timer: TimerHandle,
}

/// Buffs currently applied to one actor. Multipliers of the same stat stack
/// multiplicatively.
#[derive(Debug, Clone, Default)]
pub struct BuffSet {
    active: Vec<ActiveBuff>,
    next_id: u64,
}

impl BuffSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a buff and schedules its expiry.
    pub fn apply(
        &mut self,
        owner: EntityId,
        stat: BuffStat,
        multiplier: f32,
        duration_ms: f32,
        scheduler: &mut dyn Scheduler,
    ) -> BuffId {
        self.next_id += 1;
        let id = BuffId(self.next_id);
        let timer = scheduler.schedule_once(
            duration_ms,
            CombatTimer::new(owner, TimerKind::BuffExpire { buff: id }),
        );
        debug!(%owner, ?stat, multiplier, duration_ms, "buff applied");
        self.active.push(ActiveBuff {
            id,
            stat,
            multiplier,
            timer,
        });
        id
    }

    /// Removes an expired buff. Returns `false` if it was already gone.
    pub fn expire(&mut self, id: BuffId) -> bool {
        let before = self.active.len();
        self.active.retain(|b| b.id != id);
        before != self.active.len()
    }

    /// Combined multiplier for `stat` (1.0 with no buffs).
    #[must_use]
    pub fn multiplier(&self, stat: BuffStat) -> f32 {
        self.active
            .iter()
            .filter(|b| b.stat == stat)
            .map(|b| b.multiplier)
            .product()
    }

    /// Number of active buffs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns true with no active buffs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Removes every buff and cancels the expiry timers.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler) {
        for buff in self.active.drain(..) {
            scheduler.cancel(buff.timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerQueue;

    #[test]
    fn test_multipliers_stack() {
        let mut queue = TimerQueue::new();
        let mut buffs = BuffSet::new();
        let owner = EntityId::new();
        assert_eq!(buffs.multiplier(BuffStat::Damage), 1.0);

        buffs.apply(owner, BuffStat::Damage, 1.5, 1000.0, &mut queue);
        buffs.apply(owner, BuffStat::Damage, 2.0, 500.0, &mut queue);
        buffs.apply(owner, BuffStat::Defense, 3.0, 500.0, &mut queue);
        assert!((buffs.multiplier(BuffStat::Damage) - 3.0).abs() < f32::EPSILON);
        assert_eq!(buffs.multiplier(BuffStat::MoveSpeed), 1.0);
    }

    #[test]
    fn test_expiry_by_timer() {
        let mut queue = TimerQueue::new();
        let mut buffs = BuffSet::new();
        let owner = EntityId::new();
        buffs.apply(owner, BuffStat::MoveSpeed, 1.3, 400.0, &mut queue);

        queue.advance(400.0);
        for fired in queue.take_due() {
            if let TimerKind::BuffExpire { buff } = fired.timer.kind {
                assert!(buffs.expire(buff));
                assert!(!buffs.expire(buff));
            }
        }
        assert!(buffs.is_empty());
    }

    #[test]
    fn test_clear_cancels_timers() {
        let mut queue = TimerQueue::new();
        let mut buffs = BuffSet::new();
        buffs.apply(EntityId::new(), BuffStat::Damage, 2.0, 400.0, &mut queue);
        buffs.clear(&mut queue);
        assert!(queue.is_empty());
        assert_eq!(buffs.len(), 0);
    }
}
