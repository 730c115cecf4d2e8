//! Hold-to-cast skills.
//!
//! While the channel key is held the manager drains mana once per
//! `tick_interval_ms` of scheduler time, independent of frame rate. Release,
//! or a tick the actor can't pay for, ends the session.

use riftblade_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::CombatContext;
use crate::events::ChannelStopReason;
use crate::skill::SkillSlot;

/// Drain settings of a channeling skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Mana drained per tick
    pub mana_per_tick: f32,
    /// Time between ticks
    pub tick_interval_ms: f32,
}

/// A running channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSession {
    /// Channeled skill
    pub skill: SkillSlot,
    /// Scheduler time the channel started
    pub started_ms: f64,
    /// Scheduler time of the last drain tick (start time before the first)
    pub last_tick_ms: f64,
    /// Drain ticks so far
    pub ticks: u32,
}

/// Outcome of one [`ChannelingManager::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelUpdate {
    /// Drain ticks paid this update
    pub ticks: u32,
    /// Set when the session ended
    pub stopped: Option<ChannelStopReason>,
}

/// Drives the channel session of one actor.
#[derive(Debug, Clone)]
pub struct ChannelingManager {
    owner: EntityId,
    session: Option<ChannelSession>,
}

impl ChannelingManager {
    /// Creates an idle manager.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            session: None,
        }
    }

    /// The running session.
    #[must_use]
    pub fn session(&self) -> Option<&ChannelSession> {
        self.session.as_ref()
    }

    /// Whether a channel is running.
    #[must_use]
    pub fn is_channeling(&self) -> bool {
        self.session.is_some()
    }

    /// Starts a session, replacing any previous one.
    pub fn start(&mut self, skill: SkillSlot, now_ms: f64) {
        debug!(owner = %self.owner, ?skill, "channel started");
        self.session = Some(ChannelSession {
            skill,
            started_ms: now_ms,
            last_tick_ms: now_ms,
            ticks: 0,
        });
    }

    /// Ends the session. Returns the skill that was channeled.
    pub fn stop(&mut self) -> Option<SkillSlot> {
        self.session.take().map(|s| s.skill)
    }

    /// Advances the session.
    ///
    /// Release is checked before draining. While held, every full interval
    /// since the last tick drains `mana_per_tick`; a tick that can't be paid
    /// ends the session. Horizontal velocity is zeroed while `locked`.
    pub fn update(
        &mut self,
        held: bool,
        mana: &mut f32,
        config: &ChannelConfig,
        locked: bool,
        ctx: &mut CombatContext<'_>,
    ) -> ChannelUpdate {
        if self.session.is_none() {
            return ChannelUpdate::default();
        }
        if !held {
            self.session = None;
            return ChannelUpdate {
                ticks: 0,
                stopped: Some(ChannelStopReason::Released),
            };
        }

        if locked {
            ctx.physics.set_velocity_x(self.owner, 0.0);
        }

        let now = ctx.now_ms();
        let interval = f64::from(config.tick_interval_ms.max(1.0));
        let mut update = ChannelUpdate::default();
        while let Some(session) = self.session.as_mut() {
            if now - session.last_tick_ms < interval {
                break;
            }
            if *mana < config.mana_per_tick {
                self.session = None;
                update.stopped = Some(ChannelStopReason::OutOfMana);
                break;
            }
            *mana -= config.mana_per_tick;
            session.last_tick_ms += interval;
            session.ticks += 1;
            update.ticks += 1;
        }
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Stage;
    use crate::physics::{Body, PhysicsWorld};
    use riftblade_common::Vec2;

    const CONFIG: ChannelConfig = ChannelConfig {
        mana_per_tick: 5.0,
        tick_interval_ms: 200.0,
    };

    fn setup() -> (Stage, ChannelingManager, EntityId) {
        let mut stage = Stage::new();
        let owner = EntityId::new();
        stage
            .physics
            .insert(owner, Body::new(Vec2::ZERO, Vec2::new(20.0, 40.0)));
        let mut manager = ChannelingManager::new(owner);
        manager.start(SkillSlot::from_index(0), 0.0);
        (stage, manager, owner)
    }

    #[test]
    fn test_drain_is_time_based() {
        let (mut stage, mut manager, _) = setup();
        let mut mana = 100.0;

        // Sixty 10 ms frames = 600 ms = three ticks.
        for _ in 0..60 {
            stage.timers.advance(10.0);
            manager.update(true, &mut mana, &CONFIG, true, &mut stage.ctx());
        }
        assert_eq!(mana, 85.0);

        // One 600 ms frame drains the same.
        let (mut stage, mut manager, _) = setup();
        let mut mana = 100.0;
        stage.timers.advance(600.0);
        let update = manager.update(true, &mut mana, &CONFIG, true, &mut stage.ctx());
        assert_eq!(update.ticks, 3);
        assert_eq!(mana, 85.0);
    }

    #[test]
    fn test_release_stops_drain() {
        let (mut stage, mut manager, _) = setup();
        let mut mana = 100.0;
        stage.timers.advance(500.0);
        let update = manager.update(false, &mut mana, &CONFIG, true, &mut stage.ctx());
        assert_eq!(update.stopped, Some(ChannelStopReason::Released));
        assert_eq!(mana, 100.0);
        assert!(!manager.is_channeling());

        stage.timers.advance(500.0);
        let update = manager.update(true, &mut mana, &CONFIG, true, &mut stage.ctx());
        assert_eq!(update, ChannelUpdate::default());
        assert_eq!(mana, 100.0);
    }

    #[test]
    fn test_out_of_mana_stops() {
        let (mut stage, mut manager, _) = setup();
        let mut mana = 7.0;
        stage.timers.advance(400.0);
        let update = manager.update(true, &mut mana, &CONFIG, true, &mut stage.ctx());
        assert_eq!(update.ticks, 1);
        assert_eq!(update.stopped, Some(ChannelStopReason::OutOfMana));
        assert_eq!(mana, 2.0);
    }

    #[test]
    fn test_locked_channel_zeroes_horizontal_velocity() {
        let (mut stage, mut manager, owner) = setup();
        stage.physics.set_velocity(owner, Vec2::new(120.0, -30.0));
        let mut mana = 100.0;
        manager.update(true, &mut mana, &CONFIG, true, &mut stage.ctx());
        assert_eq!(stage.physics.velocity(owner), Vec2::new(0.0, -30.0));
    }
}
