//! Enemy decision loop.
//!
//! The controller only decides; the enemy actor carries the decision out
//! (velocity, facing, state, attacks).

use riftblade_common::{EntityId, Facing, Vec2};
use serde::{Deserialize, Serialize};

use crate::content::ControllerConfig;

/// What an enemy can see of a potential target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    /// Target id
    pub id: EntityId,
    /// Target center
    pub position: Vec2,
    /// Whether the target can still be fought
    pub alive: bool,
}

/// Outcome of one think step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Stand still
    Idle,
    /// Walk the patrol route
    Patrol {
        /// Walk direction
        direction: Facing,
    },
    /// Close in on the target
    Advance {
        /// Direction of the target
        direction: Facing,
        /// Run instead of walk
        running: bool,
        /// Distance to the target
        distance: f32,
    },
    /// Hold position and attack
    Attack {
        /// Direction of the target
        direction: Facing,
        /// Distance to the target
        distance: f32,
    },
}

/// Target acquisition, range bands and patrol.
#[derive(Debug, Clone)]
pub struct EnemyController {
    config: ControllerConfig,
    spawn_x: f32,
    patrol_direction: Facing,
    target: Option<EntityId>,
}

impl EnemyController {
    /// Creates a controller patrolling around `spawn`.
    #[must_use]
    pub fn new(config: ControllerConfig, spawn: Vec2) -> Self {
        Self {
            config,
            spawn_x: spawn.x,
            patrol_direction: Facing::Right,
            target: None,
        }
    }

    /// Controller settings.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current target.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Current patrol direction.
    #[must_use]
    pub fn patrol_direction(&self) -> Facing {
        self.patrol_direction
    }

    /// Re-acquires the nearest live target within detection range.
    pub fn acquire(&mut self, position: Vec2, targets: &[TargetInfo]) -> Option<TargetInfo> {
        let nearest = targets
            .iter()
            .filter(|t| t.alive)
            .map(|t| (t, position.distance(t.position)))
            .filter(|(_, distance)| *distance <= self.config.detect_range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| *t);
        self.target = nearest.map(|t| t.id);
        nearest
    }

    /// Decides what to do this tick.
    ///
    /// Within `attack_range` the enemy halts and attacks. Within
    /// `run_range` (when set) it runs, and anywhere else inside
    /// `detect_range` it walks toward the target. Without a target it
    /// patrols `patrol_range` either side of its spawn point, turning at the
    /// edges; a zero patrol range idles.
    pub fn think(&mut self, position: Vec2, facing: Facing, targets: &[TargetInfo]) -> Decision {
        if let Some(target) = self.acquire(position, targets) {
            let direction = Facing::from_delta(target.position.x - position.x, facing);
            let distance = position.distance(target.position);
            if distance <= self.config.attack_range {
                return Decision::Attack {
                    direction,
                    distance,
                };
            }
            let running = self.config.run_range.is_some_and(|range| distance <= range);
            return Decision::Advance {
                direction,
                running,
                distance,
            };
        }

        if self.config.patrol_range <= 0.0 {
            return Decision::Idle;
        }
        if position.x >= self.spawn_x + self.config.patrol_range {
            self.patrol_direction = Facing::Left;
        } else if position.x <= self.spawn_x - self.config.patrol_range {
            self.patrol_direction = Facing::Right;
        }
        Decision::Patrol {
            direction: self.patrol_direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ControllerConfig {
        ControllerConfig {
            detect_range: 300.0,
            attack_range: 50.0,
            run_range: None,
            patrol_range: 100.0,
        }
    }

    fn target(x: f32, alive: bool) -> TargetInfo {
        TargetInfo {
            id: EntityId::new(),
            position: Vec2::new(x, 0.0),
            alive,
        }
    }

    #[test]
    fn test_acquires_nearest_live_target() {
        let mut ctrl = EnemyController::new(config(), Vec2::ZERO);
        let near_dead = target(20.0, false);
        let far = target(200.0, true);
        let near = target(-120.0, true);
        let found = ctrl.acquire(Vec2::ZERO, &[near_dead, far, near]);
        assert_eq!(found.map(|t| t.id), Some(near.id));
        assert_eq!(ctrl.target(), Some(near.id));
    }

    #[test]
    fn test_target_dropped_out_of_range() {
        let mut ctrl = EnemyController::new(config(), Vec2::ZERO);
        ctrl.acquire(Vec2::ZERO, &[target(100.0, true)]);
        assert!(ctrl.target().is_some());
        ctrl.acquire(Vec2::ZERO, &[target(400.0, true)]);
        assert!(ctrl.target().is_none());
    }

    #[test]
    fn test_bands() {
        let mut ctrl = EnemyController::new(config(), Vec2::ZERO);
        let close = [target(-40.0, true)];
        assert!(matches!(
            ctrl.think(Vec2::ZERO, Facing::Right, &close),
            Decision::Attack {
                direction: Facing::Left,
                ..
            }
        ));
        let mid = [target(200.0, true)];
        assert!(matches!(
            ctrl.think(Vec2::ZERO, Facing::Left, &mid),
            Decision::Advance {
                direction: Facing::Right,
                running: false,
                ..
            }
        ));
    }

    #[test]
    fn test_run_band() {
        let mut cfg = config();
        cfg.run_range = Some(150.0);
        let mut ctrl = EnemyController::new(cfg, Vec2::ZERO);
        assert!(matches!(
            ctrl.think(Vec2::ZERO, Facing::Right, &[target(120.0, true)]),
            Decision::Advance { running: true, .. }
        ));
        assert!(matches!(
            ctrl.think(Vec2::ZERO, Facing::Right, &[target(250.0, true)]),
            Decision::Advance { running: false, .. }
        ));
    }

    #[test]
    fn test_patrol_reverses_at_bounds() {
        let mut ctrl = EnemyController::new(config(), Vec2::ZERO);
        assert_eq!(
            ctrl.think(Vec2::new(50.0, 0.0), Facing::Right, &[]),
            Decision::Patrol {
                direction: Facing::Right
            }
        );
        assert_eq!(
            ctrl.think(Vec2::new(100.0, 0.0), Facing::Right, &[]),
            Decision::Patrol {
                direction: Facing::Left
            }
        );
        assert_eq!(
            ctrl.think(Vec2::new(0.0, 0.0), Facing::Left, &[]),
            Decision::Patrol {
                direction: Facing::Left
            }
        );
        assert_eq!(
            ctrl.think(Vec2::new(-100.0, 0.0), Facing::Left, &[]),
            Decision::Patrol {
                direction: Facing::Right
            }
        );
    }

    #[test]
    fn test_zero_patrol_range_idles() {
        let mut cfg = config();
        cfg.patrol_range = 0.0;
        let mut ctrl = EnemyController::new(cfg, Vec2::ZERO);
        assert_eq!(ctrl.think(Vec2::ZERO, Facing::Right, &[]), Decision::Idle);
    }
}
