//! Moving colliders spawned by projectile skills.

use ahash::AHashSet;
use riftblade_common::{EntityId, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::context::CombatContext;
use crate::hitbox::{HitEffect, HitResult, TargetType};
use crate::renderer::ShapeHandle;

/// Projectile configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileConfig {
    /// Speed in pixels per second
    pub speed: f32,
    /// Distance travelled before despawning
    pub range: f32,
    /// Collider width
    pub width: f32,
    /// Collider height
    pub height: f32,
    /// Spawn offset in front of the owner (mirrored by facing)
    #[serde(default)]
    pub offset_x: f32,
    /// Vertical spawn offset
    #[serde(default)]
    pub offset_y: f32,
    /// Damage per hit
    pub damage: f32,
    /// Knockback (x mirrored by travel direction)
    #[serde(default)]
    pub knockback: Vec2,
    /// Effects carried by each hit
    #[serde(default)]
    pub effects: Vec<HitEffect>,
    /// Keeps flying after a hit
    #[serde(default)]
    pub pierce: bool,
}

impl ProjectileConfig {
    /// Creates a non-piercing projectile config.
    #[must_use]
    pub fn new(speed: f32, range: f32, size: Vec2, damage: f32) -> Self {
        Self {
            speed,
            range,
            width: size.x,
            height: size.y,
            offset_x: 0.0,
            offset_y: 0.0,
            damage,
            knockback: Vec2::ZERO,
            effects: Vec::new(),
            pierce: false,
        }
    }

    /// Makes the projectile pierce.
    #[must_use]
    pub fn piercing(mut self) -> Self {
        self.pierce = true;
        self
    }
}

/// A projectile in flight.
#[derive(Debug, Clone)]
pub struct Projectile {
    owner: EntityId,
    config: ProjectileConfig,
    rect: Rect,
    velocity: Vec2,
    travelled: f32,
    handle: ShapeHandle,
    hit_targets: AHashSet<EntityId>,
    alive: bool,
}

impl Projectile {
    /// Launches a projectile from `owner` in its facing direction.
    pub fn launch(owner: EntityId, config: ProjectileConfig, ctx: &mut CombatContext<'_>) -> Self {
        let facing = ctx.physics.facing(owner);
        let anchor = ctx.physics.position(owner).unwrap_or(Vec2::ZERO);
        let rect = Rect::from_offset(
            anchor,
            config.offset_x,
            config.offset_y,
            config.width,
            config.height,
            facing,
        );
        let handle = ctx.renderer.spawn_shape(owner, rect);
        Self {
            owner,
            velocity: Vec2::new(config.speed * facing.sign(), 0.0),
            config,
            rect,
            travelled: 0.0,
            handle,
            hit_targets: AHashSet::new(),
            alive: true,
        }
    }

    /// Owner.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current collider.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Whether it is still flying.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Moves the projectile; despawns it once its range is spent.
    pub fn update(&mut self, delta_ms: f32, ctx: &mut CombatContext<'_>) {
        if !self.alive {
            return;
        }
        let step = self.velocity * (delta_ms / 1000.0);
        self.rect = self.rect.translated(step);
        self.travelled += step.length();
        if self.travelled >= self.config.range {
            self.destroy(ctx);
        } else {
            ctx.renderer.move_shape(self.handle, self.rect);
        }
    }

    /// Tests `target`. Non-piercing projectiles die on their first hit.
    pub fn check_hit(
        &mut self,
        target: EntityId,
        bounds: Rect,
        ctx: &mut CombatContext<'_>,
    ) -> Option<HitResult> {
        if !self.alive
            || target == self.owner
            || self.hit_targets.contains(&target)
            || !self.rect.overlaps(&bounds)
        {
            return None;
        }
        self.hit_targets.insert(target);
        if !self.config.pierce {
            self.destroy(ctx);
        }
        let direction = self.velocity.x.signum();
        Some(HitResult {
            damage: self.config.damage,
            knockback: Vec2::new(self.config.knockback.x * direction, self.config.knockback.y),
            effects: self.config.effects.clone(),
            target_type: if self.config.pierce {
                TargetType::Multi
            } else {
                TargetType::Single
            },
        })
    }

    /// Removes the collider.
    pub fn destroy(&mut self, ctx: &mut CombatContext<'_>) {
        if self.alive {
            self.alive = false;
            ctx.renderer.destroy_shape(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Stage;
    use crate::physics::Body;
    use riftblade_common::Facing;

    fn launch(stage: &mut Stage, config: ProjectileConfig) -> Projectile {
        let owner = EntityId::new();
        stage.physics.insert(
            owner,
            Body::new(Vec2::ZERO, Vec2::new(20.0, 40.0)).with_facing(Facing::Left),
        );
        Projectile::launch(owner, config, &mut stage.ctx())
    }

    #[test]
    fn test_flies_in_facing_direction_and_despawns_at_range() {
        let mut stage = Stage::new();
        let mut p = launch(
            &mut stage,
            ProjectileConfig::new(400.0, 200.0, Vec2::splat(10.0), 12.0),
        );
        p.update(250.0, &mut stage.ctx());
        assert!((p.rect().center().x + 100.0).abs() < 0.01);
        assert!(p.is_alive());

        p.update(250.0, &mut stage.ctx());
        assert!(!p.is_alive());
        assert_eq!(stage.renderer.live_shapes(), 0);
    }

    #[test]
    fn test_non_piercing_dies_on_first_hit() {
        let mut stage = Stage::new();
        let mut p = launch(
            &mut stage,
            ProjectileConfig::new(400.0, 500.0, Vec2::splat(10.0), 12.0),
        );
        let bounds = Rect::from_center(Vec2::ZERO, 20.0, 20.0);
        assert!(p.check_hit(EntityId::new(), bounds, &mut stage.ctx()).is_some());
        assert!(p.check_hit(EntityId::new(), bounds, &mut stage.ctx()).is_none());
        assert!(!p.is_alive());
    }

    #[test]
    fn test_piercing_hits_each_target_once() {
        let mut stage = Stage::new();
        let mut p = launch(
            &mut stage,
            ProjectileConfig::new(400.0, 500.0, Vec2::splat(10.0), 12.0).piercing(),
        );
        let bounds = Rect::from_center(Vec2::ZERO, 20.0, 20.0);
        let a = EntityId::new();
        assert!(p.check_hit(a, bounds, &mut stage.ctx()).is_some());
        assert!(p.check_hit(a, bounds, &mut stage.ctx()).is_none());
        assert!(p.check_hit(EntityId::new(), bounds, &mut stage.ctx()).is_some());
        assert!(p.is_alive());
    }
}
