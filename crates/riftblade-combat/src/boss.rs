//! Boss phases.

use riftblade_common::Vec2;
use tracing::info;

use crate::actor::Combatant;
use crate::content::{BossConfig, BossPhaseDef, ControllerConfig};
use crate::context::CombatContext;
use crate::controller::EnemyController;
use crate::events::CombatEvent;

/// Phase progression.
///
/// The phase never decreases and never passes the last configured phase.
#[derive(Debug, Clone)]
pub struct BossPhase {
    current: u8,
    phases: Vec<BossPhaseDef>,
}

impl BossPhase {
    /// Starts in phase 0.
    #[must_use]
    pub fn new(config: &BossConfig) -> Self {
        Self {
            current: 0,
            phases: config.phases.clone(),
        }
    }

    /// Current phase index.
    #[must_use]
    pub fn current(&self) -> u8 {
        self.current
    }

    /// Index of the last phase.
    #[must_use]
    pub fn max_phase(&self) -> u8 {
        u8::try_from(self.phases.len().saturating_sub(1)).unwrap_or(u8::MAX)
    }

    /// Whether the boss is in its last phase.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.current >= self.max_phase()
    }

    /// Health of `phase`.
    #[must_use]
    pub fn max_health(&self, phase: u8) -> Option<f32> {
        self.phases.get(usize::from(phase)).map(|p| p.max_health)
    }

    /// Definition of the current phase.
    #[must_use]
    pub fn current_def(&self) -> Option<&BossPhaseDef> {
        self.phases.get(usize::from(self.current))
    }

    /// Moves to `phase`, clamped to the last phase.
    ///
    /// Returns the phase entered, or `None` if that would not move forward.
    pub fn enter(&mut self, phase: u8) -> Option<u8> {
        let target = phase.min(self.max_phase());
        if target <= self.current {
            return None;
        }
        self.current = target;
        Some(target)
    }
}

/// Boss brain: the enemy controller plus phases.
#[derive(Debug, Clone)]
pub struct BossController {
    controller: EnemyController,
    phase: BossPhase,
}

impl BossController {
    /// Creates a boss brain patrolling around `spawn`.
    #[must_use]
    pub fn new(controller: ControllerConfig, boss: &BossConfig, spawn: Vec2) -> Self {
        Self {
            controller: EnemyController::new(controller, spawn),
            phase: BossPhase::new(boss),
        }
    }

    /// Movement controller.
    #[must_use]
    pub fn controller(&self) -> &EnemyController {
        &self.controller
    }

    /// Mutable movement controller.
    pub fn controller_mut(&mut self) -> &mut EnemyController {
        &mut self.controller
    }

    /// Phase state.
    #[must_use]
    pub fn phase(&self) -> &BossPhase {
        &self.phase
    }

    /// Advances to the next phase when health is gone.
    ///
    /// Refills health to the new phase's maximum and publishes
    /// [`CombatEvent::PhaseChanged`]. Returns `false` in the final phase,
    /// where death is real.
    pub fn on_phase_change(&mut self, actor: &mut Combatant, ctx: &mut CombatContext<'_>) -> bool {
        let Some(next) = self.phase.enter(self.phase.current().saturating_add(1)) else {
            return false;
        };
        let Some(def) = self.phase.current_def().copied() else {
            return false;
        };
        actor.vitals.reset_health(def.max_health);
        info!(boss = %actor.id, phase = next, max_health = def.max_health, "boss phase changed");
        ctx.events.publish(CombatEvent::PhaseChanged {
            boss: actor.id,
            phase: next,
            tint: def.tint,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BossConfig {
        BossConfig {
            phases: vec![
                BossPhaseDef {
                    max_health: 300.0,
                    tint: None,
                },
                BossPhaseDef {
                    max_health: 200.0,
                    tint: Some(0xff_80_00),
                },
                BossPhaseDef {
                    max_health: 150.0,
                    tint: Some(0xff_00_00),
                },
            ],
        }
    }

    #[test]
    fn test_phase_is_monotonic_and_clamped() {
        let mut phase = BossPhase::new(&config());
        assert_eq!(phase.max_phase(), 2);
        assert_eq!(phase.enter(1), Some(1));
        assert_eq!(phase.enter(0), None);
        assert_eq!(phase.enter(1), None);
        assert_eq!(phase.enter(9), Some(2));
        assert!(phase.is_final());
        assert_eq!(phase.enter(3), None);
        assert_eq!(phase.current(), 2);
    }

    #[test]
    fn test_single_phase_is_final() {
        let phase = BossPhase::new(&BossConfig {
            phases: vec![BossPhaseDef {
                max_health: 10.0,
                tint: None,
            }],
        });
        assert!(phase.is_final());
        assert_eq!(phase.max_health(0), Some(10.0));
        assert_eq!(phase.max_health(1), None);
    }
}
