//! Encounter composition root.
//!
//! The arena owns the player, the enemies, the collision resolver and the
//! progress tracker. It drives one frame at a time against a [`Stage`] and
//! routes fired timers and animation signals to the actor that owns them.
//!
//! Frame order:
//! 1. advance the timer clock and dispatch everything due
//! 2. advance animations and dispatch their signals
//! 3. player input and skills, then enemy brains and skills
//! 4. physics step
//! 5. hit resolution
//! 6. dispatch timers scheduled with zero delay during the frame

use riftblade_common::{EntityId, Vec2};
use tracing::{debug, info};

use crate::actor::{Combatant, EnemyActor, PlayerActor};
use crate::collision::{CombatCollisionResolver, ResolveStats};
use crate::content::{ActorDef, CombatTuning, ContentError};
use crate::context::{CombatContext, Stage};
use crate::controller::TargetInfo;
use crate::input::CombatInput;
use crate::progress::{ProgressTracker, SessionSummary};
use crate::renderer::AnimationSignal;
use crate::scheduler::{FiredTimer, Scheduler};
use crate::state_machine::ActorState;

/// Upper bound on timer dispatch passes per pump, so zero-delay timers that
/// reschedule themselves can't stall a frame.
const MAX_TIMER_PASSES: usize = 16;

/// One encounter.
#[derive(Debug)]
pub struct Arena {
    tuning: CombatTuning,
    player: PlayerActor,
    enemies: Vec<EnemyActor>,
    resolver: CombatCollisionResolver,
    progress: ProgressTracker,
    frames: u64,
}

impl Arena {
    /// Spawns the player at `position` and builds the arena around it.
    pub fn new(
        stage: &mut Stage,
        player_def: &ActorDef,
        position: Vec2,
        tuning: CombatTuning,
        progress: ProgressTracker,
    ) -> Result<Self, ContentError> {
        player_def.validate()?;
        let id = EntityId::new();
        stage.renderer.register_clips(player_def.namespaced_clips());
        stage.physics.insert(id, Combatant::body(player_def, position));
        let mut player = PlayerActor::new(id, player_def, &tuning);
        {
            let mut ctx = stage.ctx();
            player.combatant.state.animation_mut().play(
                ActorState::Idle.key(),
                None,
                ctx.renderer,
            );
        }
        info!(player = %id, class = %player_def.id, "arena created");
        Ok(Self {
            tuning,
            player,
            enemies: Vec::new(),
            resolver: CombatCollisionResolver::new(),
            progress,
            frames: 0,
        })
    }

    /// Spawns an enemy or boss at `position`.
    pub fn spawn_enemy(
        &mut self,
        stage: &mut Stage,
        def: &ActorDef,
        position: Vec2,
    ) -> Result<EntityId, ContentError> {
        def.validate()?;
        let id = EntityId::new();
        let mut enemy = EnemyActor::new(id, def, &self.tuning, position)?;
        stage.renderer.register_clips(def.namespaced_clips());
        stage.physics.insert(id, Combatant::body(def, position));
        {
            let mut ctx = stage.ctx();
            enemy
                .combatant
                .state
                .animation_mut()
                .play(ActorState::Idle.key(), None, ctx.renderer);
        }
        debug!(enemy = %id, class = %def.id, boss = enemy.brain.is_boss(), "enemy spawned");
        self.enemies.push(enemy);
        Ok(id)
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &PlayerActor {
        &self.player
    }

    /// Mutable player.
    pub fn player_mut(&mut self) -> &mut PlayerActor {
        &mut self.player
    }

    /// Live and defeated enemies not yet despawned.
    #[must_use]
    pub fn enemies(&self) -> &[EnemyActor] {
        &self.enemies
    }

    /// An enemy by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&EnemyActor> {
        self.enemies.iter().find(|e| e.id() == id)
    }

    /// Mutable enemy by id.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut EnemyActor> {
        self.enemies.iter_mut().find(|e| e.id() == id)
    }

    /// The progress tracker.
    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Hit totals.
    #[must_use]
    pub fn resolver(&self) -> &CombatCollisionResolver {
        &self.resolver
    }

    /// Frames run so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether every enemy is defeated.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.enemies.iter().all(|e| !e.combatant.is_alive())
    }

    /// Whether the player is dead.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        !self.player.combatant.is_alive()
    }

    /// Starts the progress session.
    pub fn begin(&mut self, stage: &Stage) -> bool {
        self.progress.begin_session(stage.timers.now_ms())
    }

    /// Ends the progress session and hands the tracker back.
    pub fn finish(mut self, stage: &Stage) -> (Option<SessionSummary>, ProgressTracker) {
        let summary = self.progress.end_session(stage.timers.now_ms());
        (summary, self.progress)
    }

    /// Routes a fired timer to its owner. Timers for unknown owners are
    /// dropped.
    pub fn dispatch_timer(&mut self, fired: FiredTimer, ctx: &mut CombatContext<'_>) -> bool {
        let owner = fired.timer.owner;
        if owner == self.player.id() {
            self.player.on_timer(fired.timer.kind, ctx);
            return true;
        }
        match self.enemies.iter_mut().find(|e| e.id() == owner) {
            Some(enemy) => {
                enemy.on_timer(fired.timer.kind, ctx);
                true
            }
            None => {
                debug!(%owner, kind = ?fired.timer.kind, "timer for unknown owner dropped");
                false
            }
        }
    }

    /// Routes an animation signal to its actor.
    pub fn handle_animation_signal(
        &mut self,
        signal: &AnimationSignal,
        ctx: &mut CombatContext<'_>,
    ) -> bool {
        if signal.actor == self.player.id() {
            self.player.on_animation_signal(signal, ctx);
            return true;
        }
        match self.enemies.iter_mut().find(|e| e.id() == signal.actor) {
            Some(enemy) => {
                enemy.on_animation_signal(signal, ctx);
                true
            }
            None => false,
        }
    }

    fn pump_timers(&mut self, stage: &mut Stage) {
        for _ in 0..MAX_TIMER_PASSES {
            let due = stage.timers.take_due();
            if due.is_empty() {
                return;
            }
            let mut ctx = stage.ctx();
            for fired in due {
                self.dispatch_timer(fired, &mut ctx);
            }
        }
        debug!("timer pump pass limit reached");
    }

    /// Runs one frame.
    pub fn update(&mut self, stage: &mut Stage, delta_ms: f32, input: &CombatInput) -> ResolveStats {
        self.frames += 1;

        stage.timers.advance(delta_ms);
        self.pump_timers(stage);

        let signals = stage.renderer.advance(delta_ms);
        {
            let mut ctx = stage.ctx();
            for signal in &signals {
                self.handle_animation_signal(signal, &mut ctx);
            }
        }

        {
            let mut ctx = stage.ctx();
            self.player.update(delta_ms, input, &mut ctx);

            let targets: Vec<TargetInfo> = ctx
                .physics
                .position(self.player.id())
                .map(|position| TargetInfo {
                    id: self.player.id(),
                    position,
                    alive: self.player.combatant.is_alive(),
                })
                .into_iter()
                .collect();
            for enemy in &mut self.enemies {
                enemy.update(delta_ms, &targets, &mut ctx);
            }
        }

        stage.physics.step(delta_ms);

        let stats = {
            let mut ctx = stage.ctx();
            self.resolver
                .resolve(&mut self.player, &mut self.enemies, &mut self.progress, &mut ctx)
        };

        self.pump_timers(stage);
        stats
    }

    /// Removes defeated enemies, tearing down their timers, shapes and bodies.
    pub fn despawn_defeated(&mut self, stage: &mut Stage) -> Vec<EntityId> {
        let (defeated, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.enemies)
            .into_iter()
            .partition(|e| !e.combatant.is_alive());
        self.enemies = alive;

        let mut ids = Vec::with_capacity(defeated.len());
        for mut enemy in defeated {
            {
                let mut ctx = stage.ctx();
                enemy.destroy(&mut ctx);
                ctx.renderer.stop_animation(enemy.id());
            }
            stage.physics.remove(enemy.id());
            debug!(enemy = %enemy.id(), "enemy despawned");
            ids.push(enemy.id());
        }
        ids
    }
}
