//! Event bus for combat notifications consumed by UI, audio and progression.

use crossbeam_channel::{bounded, Receiver, Sender};
use riftblade_common::{EntityId, Vec2};
use serde::{Deserialize, Serialize};

use crate::hitbox::HitEffect;
use crate::state_machine::ActorState;

/// Why a channel ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStopReason {
    /// The channel key was released
    Released,
    /// Not enough mana for the next tick
    OutOfMana,
    /// Interrupted by the actor's systems (destroy, interrupt)
    Interrupted,
}

/// Event types published by the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// State machine transition
    StateChanged {
        /// Actor
        actor: EntityId,
        /// State left
        previous: ActorState,
        /// State entered
        next: ActorState,
    },
    /// A skill was used successfully
    SkillUsed {
        /// Actor
        actor: EntityId,
        /// Skill name
        skill: String,
    },
    /// A skill finished and its cooldown started
    SkillCompleted {
        /// Actor
        actor: EntityId,
        /// Skill name
        skill: String,
    },
    /// Remaining cooldown changed
    SkillCooldownUpdated {
        /// Actor
        actor: EntityId,
        /// Skill name
        skill: String,
        /// Remaining cooldown in milliseconds
        remaining_ms: f32,
    },
    /// A channel ended
    ChannelStopped {
        /// Actor
        actor: EntityId,
        /// Skill name
        skill: String,
        /// Why it ended
        reason: ChannelStopReason,
    },
    /// A hitbox or projectile connected
    Hit {
        /// Attacker
        attacker: EntityId,
        /// Target
        target: EntityId,
        /// Damage applied
        damage: f32,
        /// Knockback applied
        knockback: Vec2,
        /// Extra effects carried by the hit
        effects: Vec<HitEffect>,
    },
    /// An enemy died and its reward was granted
    EnemyDefeated {
        /// Enemy
        enemy: EntityId,
        /// Experience granted
        exp_reward: u32,
    },
    /// The player died
    PlayerDefeated {
        /// Player
        player: EntityId,
    },
    /// A boss moved to a new phase
    PhaseChanged {
        /// Boss
        boss: EntityId,
        /// Phase entered
        phase: u8,
        /// HP bar tint for the new phase (0xRRGGBB)
        tint: Option<u32>,
    },
}

/// Event bus for broadcasting combat events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: CombatEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let actor = EntityId::new();
        bus.publish(CombatEvent::SkillUsed {
            actor,
            skill: "slash".into(),
        });
        assert_eq!(bus.pending_count(), 1);

        let events = bus.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let enemy = EntityId::new();
        bus.publish(CombatEvent::EnemyDefeated {
            enemy,
            exp_reward: 1,
        });
        bus.publish(CombatEvent::EnemyDefeated {
            enemy,
            exp_reward: 2,
        });
        assert_eq!(bus.drain().len(), 1);
    }
}
