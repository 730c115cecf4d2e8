//! Collaborator bundle passed through every combat call.

use riftblade_common::EntityId;

use crate::events::EventBus;
use crate::physics::{BodyStore, PhysicsWorld};
use crate::renderer::{RecordingRenderer, Renderer};
use crate::scheduler::{Scheduler, TimerQueue};

/// Borrowed collaborators for one tick or one dispatched callback.
pub struct CombatContext<'a> {
    /// Animation playback, debug shapes and effects
    pub renderer: &'a mut dyn Renderer,
    /// Body queries and velocity writes
    pub physics: &'a mut dyn PhysicsWorld,
    /// Deferred callbacks
    pub scheduler: &'a mut dyn Scheduler,
    /// Outgoing notifications
    pub events: &'a EventBus,
}

impl<'a> CombatContext<'a> {
    /// Bundles the collaborators.
    pub fn new(
        renderer: &'a mut dyn Renderer,
        physics: &'a mut dyn PhysicsWorld,
        scheduler: &'a mut dyn Scheduler,
        events: &'a EventBus,
    ) -> Self {
        Self {
            renderer,
            physics,
            scheduler,
            events,
        }
    }

    /// Current scheduler time.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    /// Whether `actor` is standing on the ground.
    #[must_use]
    pub fn grounded(&self, actor: EntityId) -> bool {
        self.physics.is_grounded(actor)
    }
}

/// Owned in-memory collaborators: recording renderer, body store, timer
/// queue and event bus.
#[derive(Debug, Default)]
pub struct Stage {
    /// Renderer
    pub renderer: RecordingRenderer,
    /// Bodies
    pub physics: BodyStore,
    /// Timers
    pub timers: TimerQueue,
    /// Events
    pub events: EventBus,
}

impl Stage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the stage as a [`CombatContext`].
    pub fn ctx(&mut self) -> CombatContext<'_> {
        CombatContext::new(
            &mut self.renderer,
            &mut self.physics,
            &mut self.timers,
            &self.events,
        )
    }
}
