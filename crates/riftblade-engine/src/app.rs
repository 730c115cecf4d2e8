//! Encounter lifecycle.
//!
//! Loads content, builds the stage and arena from the config, drives the
//! scripted pilot tick by tick and produces the [`EncounterReport`].

use std::time::Instant;

use anyhow::{Context, Result};
use riftblade_combat::{
    Arena, BodyStore, CombatInput, EventBus, PhysicsWorld, ProgressTracker, Scheduler, Stage,
};
use riftblade_common::{EntityId, Vec2};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::content_loader::{ActorRegistry, ContentLoader};
use crate::pilot::{PilotView, ScriptedPilot};
use crate::report::{EncounterReport, EventTally, Outcome};
use crate::timing::FrameTiming;

/// One configured encounter, ready to tick.
#[derive(Debug)]
pub struct Encounter {
    config: EngineConfig,
    stage: Stage,
    arena: Arena,
    pilot: ScriptedPilot,
    input: CombatInput,
    timing: FrameTiming,
    events: EventTally,
    hits: u32,
    max_ticks: u64,
}

impl Encounter {
    /// Spawns the player and the configured enemies.
    pub fn new(config: EngineConfig, registry: &ActorRegistry) -> Result<Self> {
        let mut stage = Stage::new();
        stage.physics = BodyStore::new().with_floor(config.floor_y);
        stage.physics.gravity = config.gravity;
        stage.events = EventBus::new(config.event_capacity);

        let player_def = registry.player(&config.player)?;
        let standing = |size: Vec2, x: f32| Vec2::new(x, config.floor_y - size.y * 0.5);

        let mut arena = Arena::new(
            &mut stage,
            player_def,
            standing(player_def.size, config.player_x),
            config.tuning.clone(),
            ProgressTracker::new(),
        )
        .with_context(|| format!("spawning player '{}'", config.player))?;

        for spawn in &config.encounter {
            let def = registry.enemy(&spawn.actor)?;
            arena
                .spawn_enemy(&mut stage, def, standing(def.size, spawn.x))
                .with_context(|| format!("spawning enemy '{}'", spawn.actor))?;
        }
        if arena.enemies().is_empty() {
            warn!("Encounter has no enemies");
        }
        arena.begin(&stage);

        info!(
            player = %config.player,
            enemies = arena.enemies().len(),
            tick_rate = config.tick_rate,
            "Encounter ready"
        );

        Ok(Self {
            pilot: ScriptedPilot::new(config.seed, player_def),
            timing: FrameTiming::new(config.tick_rate),
            max_ticks: config.max_ticks(),
            config,
            stage,
            arena,
            input: CombatInput::new(),
            events: EventTally::new(),
            hits: 0,
        })
    }

    /// The arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Events seen so far.
    #[must_use]
    pub fn events(&self) -> &EventTally {
        &self.events
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.timing.ticks()
    }

    fn view(&self) -> PilotView {
        let player = self.arena.player().id();
        let position = self.stage.physics.position(player).unwrap_or(Vec2::ZERO);
        let target = self
            .arena
            .enemies()
            .iter()
            .filter(|e| e.combatant.is_alive())
            .filter_map(|e| self.stage.physics.position(e.id()))
            .min_by(|a, b| {
                (a.x - position.x)
                    .abs()
                    .total_cmp(&(b.x - position.x).abs())
            });
        PilotView {
            position,
            grounded: self.stage.physics.is_grounded(player),
            target,
        }
    }

    /// Simulates one tick. Returns the outcome once the encounter is over.
    pub fn step(&mut self) -> Option<Outcome> {
        let started = Instant::now();
        let now = self.stage.timers.now_ms();
        let view = self.view();
        self.pilot.drive(now, &view, &mut self.input);

        let stats = self
            .arena
            .update(&mut self.stage, self.timing.tick_ms(), &self.input);
        self.input.end_frame();
        self.hits += stats.hits;

        for event in self.stage.events.drain() {
            self.events.record(&event);
        }
        let despawned: Vec<EntityId> = self.arena.despawn_defeated(&mut self.stage);
        if !despawned.is_empty() {
            debug!(count = despawned.len(), "despawned defeated enemies");
        }
        self.timing.record_step(started.elapsed());

        if self.arena.is_lost() {
            Some(Outcome::Defeat)
        } else if self.arena.is_cleared() {
            Some(Outcome::Victory)
        } else if self.timing.ticks() >= self.max_ticks {
            Some(Outcome::Timeout)
        } else {
            None
        }
    }

    /// Runs to the end and builds the report.
    pub fn run(mut self) -> EncounterReport {
        let outcome = if self.config.realtime {
            self.run_realtime()
        } else {
            loop {
                if let Some(outcome) = self.step() {
                    break outcome;
                }
            }
        };
        self.finish(outcome)
    }

    fn run_realtime(&mut self) -> Outcome {
        self.timing.reset();
        loop {
            let delta = self.timing.delta_ms();
            for _ in 0..self.timing.accumulate(delta) {
                if let Some(outcome) = self.step() {
                    return outcome;
                }
            }
            self.timing.sleep_remainder();
        }
    }

    fn finish(self, outcome: Outcome) -> EncounterReport {
        let final_health = self.arena.player().combatant.vitals.health;
        let (summary, progress) = self.arena.finish(&self.stage);
        let summary = summary.unwrap_or_else(|| progress.session().clone());

        info!(
            ?outcome,
            ticks = self.timing.ticks(),
            kills = summary.kills,
            exp = summary.exp_gained,
            "Encounter finished"
        );

        EncounterReport {
            player: self.config.player.clone(),
            seed: self.config.seed,
            outcome,
            ticks: self.timing.ticks(),
            simulated_ms: self.timing.simulated_ms(),
            average_step_ms: self.timing.average_step_ms(),
            final_health,
            hits: self.hits,
            summary,
            events: self.events,
        }
    }
}

/// Loads content, runs the configured encounter and writes the report.
pub fn run(config: EngineConfig) -> Result<EncounterReport> {
    let mut loader = ContentLoader::new(&config.content_path);
    loader
        .load_all()
        .with_context(|| format!("loading content from {}", config.content_path.display()))?;
    if let Some((path, reason)) = loader.failures().first() {
        anyhow::bail!("invalid content in {}: {reason}", path.display());
    }
    let registry = loader.into_registry();

    let report_path = config.report_path.clone();
    let report = Encounter::new(config, &registry)?.run();

    match report_path {
        Some(path) => report
            .write_to(&path)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{}", report.to_json()?),
    }
    Ok(report)
}
