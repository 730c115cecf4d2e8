//! Encounter report written at the end of a run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use riftblade_combat::{CombatEvent, SessionSummary};
use riftblade_common::{RiftbladeError, RiftbladeResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How an encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every enemy defeated
    Victory,
    /// The player died
    Defeat,
    /// Time limit reached
    Timeout,
}

/// Counts combat events by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTally(BTreeMap<String, u32>);

impl EventTally {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one event.
    pub fn record(&mut self, event: &CombatEvent) {
        *self.0.entry(event_name(event).to_string()).or_insert(0) += 1;
    }

    /// Count for an event name.
    #[must_use]
    pub fn count(&self, name: &str) -> u32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Total events seen.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

/// Stable snake_case name of an event variant.
#[must_use]
pub fn event_name(event: &CombatEvent) -> &'static str {
    match event {
        CombatEvent::StateChanged { .. } => "state_changed",
        CombatEvent::SkillUsed { .. } => "skill_used",
        CombatEvent::SkillCompleted { .. } => "skill_completed",
        CombatEvent::SkillCooldownUpdated { .. } => "skill_cooldown_updated",
        CombatEvent::ChannelStopped { .. } => "channel_stopped",
        CombatEvent::Hit { .. } => "hit",
        CombatEvent::EnemyDefeated { .. } => "enemy_defeated",
        CombatEvent::PlayerDefeated { .. } => "player_defeated",
        CombatEvent::PhaseChanged { .. } => "phase_changed",
    }
}

/// Everything worth knowing about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    /// Player actor id
    pub player: String,
    /// Pilot seed, if fixed
    pub seed: Option<u64>,
    /// How it ended
    pub outcome: Outcome,
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated time
    pub simulated_ms: f64,
    /// Mean wall-clock cost per tick
    pub average_step_ms: f32,
    /// Player health at the end
    pub final_health: f32,
    /// Hits landed on both sides
    pub hits: u32,
    /// Progress session totals
    pub summary: SessionSummary,
    /// Events by type
    pub events: EventTally,
}

impl EncounterReport {
    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as JSON, creating parent directories.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> RiftbladeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = self
            .to_json()
            .map_err(|e| RiftbladeError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        info!("Wrote encounter report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riftblade_common::EntityId;
    use tempfile::TempDir;

    fn report() -> EncounterReport {
        let mut events = EventTally::new();
        let enemy = EntityId::from_raw(9);
        events.record(&CombatEvent::EnemyDefeated {
            enemy,
            exp_reward: 25,
        });
        events.record(&CombatEvent::EnemyDefeated {
            enemy,
            exp_reward: 25,
        });
        events.record(&CombatEvent::SkillUsed {
            actor: enemy,
            skill: "slam".to_string(),
        });
        EncounterReport {
            player: "knight".to_string(),
            seed: Some(5),
            outcome: Outcome::Victory,
            ticks: 600,
            simulated_ms: 10_000.0,
            average_step_ms: 0.05,
            final_health: 71.0,
            hits: 14,
            summary: SessionSummary::default(),
            events,
        }
    }

    #[test]
    fn test_tally_counts_by_name() {
        let report = report();
        assert_eq!(report.events.count("enemy_defeated"), 2);
        assert_eq!(report.events.count("skill_used"), 1);
        assert_eq!(report.events.count("hit"), 0);
        assert_eq!(report.events.total(), 3);
    }

    #[test]
    fn test_json_shape() {
        let json = report().to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["outcome"], "victory");
        assert_eq!(value["events"]["enemy_defeated"], 2);
        assert_eq!(value["summary"]["kills"], 0);
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out").join("report.json");
        let report = report();
        report.write_to(&path).expect("write");

        let text = fs::read_to_string(&path).expect("read back");
        let loaded: EncounterReport = serde_json::from_str(&text).expect("parse");
        assert_eq!(loaded, report);
    }
}
