//! Encounter progress: kills, experience and damage totals.
//!
//! The tracker is owned by whoever runs encounters and handed to the arena;
//! it is not global. Recording only counts while a session is active.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session started yet
    #[default]
    Idle,
    /// Recording
    Active,
    /// Finished; a new session may begin
    Ended,
}

/// Totals for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Enemies defeated
    pub kills: u32,
    /// Kills per actor class
    pub kills_by_class: BTreeMap<String, u32>,
    /// Experience earned
    pub exp_gained: u32,
    /// Damage dealt by the player
    pub damage_dealt: f32,
    /// Damage taken by the player
    pub damage_taken: f32,
    /// Whether the player died
    pub player_defeated: bool,
    /// Session length
    pub duration_ms: f64,
}

/// Tracks rewards across sessions.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    state: SessionState,
    started_ms: f64,
    session: SessionSummary,
    total_exp: u64,
    total_kills: u64,
}

impl ProgressTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Running totals of the current (or last) session.
    #[must_use]
    pub fn session(&self) -> &SessionSummary {
        &self.session
    }

    /// Experience across all sessions.
    #[must_use]
    pub fn total_exp(&self) -> u64 {
        self.total_exp
    }

    /// Kills across all sessions.
    #[must_use]
    pub fn total_kills(&self) -> u64 {
        self.total_kills
    }

    /// Starts recording. Returns `false` if a session is already active.
    pub fn begin_session(&mut self, now_ms: f64) -> bool {
        if self.state == SessionState::Active {
            warn!("progress session already active");
            return false;
        }
        self.state = SessionState::Active;
        self.started_ms = now_ms;
        self.session = SessionSummary::default();
        info!("progress session started");
        true
    }

    /// Stops recording and returns the session's totals.
    pub fn end_session(&mut self, now_ms: f64) -> Option<SessionSummary> {
        if self.state != SessionState::Active {
            return None;
        }
        self.state = SessionState::Ended;
        self.session.duration_ms = (now_ms - self.started_ms).max(0.0);
        info!(
            kills = self.session.kills,
            exp = self.session.exp_gained,
            "progress session ended"
        );
        Some(self.session.clone())
    }

    fn recording(&self, what: &str) -> bool {
        if self.state == SessionState::Active {
            true
        } else {
            warn!(what, "progress recorded outside an active session");
            false
        }
    }

    /// Records a defeated enemy and its reward.
    pub fn record_kill(&mut self, class: &str, exp_reward: u32) -> bool {
        if !self.recording("kill") {
            return false;
        }
        self.session.kills += 1;
        *self
            .session
            .kills_by_class
            .entry(class.to_string())
            .or_insert(0) += 1;
        self.session.exp_gained = self.session.exp_gained.saturating_add(exp_reward);
        self.total_exp += u64::from(exp_reward);
        self.total_kills += 1;
        true
    }

    /// Records damage the player dealt.
    pub fn record_damage_dealt(&mut self, amount: f32) {
        if self.state == SessionState::Active {
            self.session.damage_dealt += amount;
        }
    }

    /// Records damage the player took.
    pub fn record_damage_taken(&mut self, amount: f32) {
        if self.state == SessionState::Active {
            self.session.damage_taken += amount;
        }
    }

    /// Records the player's death.
    pub fn record_player_defeat(&mut self) {
        if self.recording("player defeat") {
            self.session.player_defeated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut tracker = ProgressTracker::new();
        assert!(!tracker.record_kill("grunt", 10));
        assert!(tracker.begin_session(100.0));
        assert!(!tracker.begin_session(150.0));
        assert!(tracker.record_kill("grunt", 10));
        assert!(tracker.record_kill("grunt", 10));
        assert!(tracker.record_kill("warlord", 250));
        tracker.record_damage_dealt(42.0);

        let summary = tracker.end_session(1100.0).expect("active session");
        assert_eq!(summary.kills, 3);
        assert_eq!(summary.exp_gained, 270);
        assert_eq!(summary.kills_by_class.get("grunt"), Some(&2));
        assert_eq!(summary.duration_ms, 1000.0);
        assert_eq!(tracker.state(), SessionState::Ended);
        assert!(tracker.end_session(1200.0).is_none());
    }

    #[test]
    fn test_totals_survive_sessions() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_session(0.0);
        tracker.record_kill("grunt", 10);
        tracker.end_session(10.0);
        tracker.begin_session(20.0);
        assert_eq!(tracker.session().kills, 0);
        tracker.record_kill("grunt", 5);
        assert_eq!(tracker.total_exp(), 15);
        assert_eq!(tracker.total_kills(), 2);
    }
}
