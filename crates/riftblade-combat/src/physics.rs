//! Physics contract consumed by the combat core.
//!
//! This module provides:
//! - [`PhysicsWorld`], the read/write surface the combat core needs from bodies
//! - [`BodyStore`], a small kinematic implementation with gravity and a flat
//!   floor, used by tests and the headless engine

use ahash::AHashMap;
use riftblade_common::{EntityId, Facing, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Body queries and velocity writes.
///
/// Unknown ids read as "nothing there": no position, no bounds, not grounded,
/// zero velocity. Writes to unknown ids are ignored.
pub trait PhysicsWorld {
    /// Center position of the body.
    fn position(&self, id: EntityId) -> Option<Vec2>;

    /// Collision bounds of the body.
    fn bounds(&self, id: EntityId) -> Option<Rect>;

    /// Horizontal facing.
    fn facing(&self, id: EntityId) -> Facing;

    /// Turns the body around.
    fn set_facing(&mut self, id: EntityId, facing: Facing);

    /// Whether the body is standing on the ground.
    fn is_grounded(&self, id: EntityId) -> bool;

    /// Current velocity in pixels per second.
    fn velocity(&self, id: EntityId) -> Vec2;

    /// Overwrites the velocity.
    fn set_velocity(&mut self, id: EntityId, velocity: Vec2);

    /// Overwrites only the horizontal velocity.
    fn set_velocity_x(&mut self, id: EntityId, vx: f32) {
        let v = self.velocity(id);
        self.set_velocity(id, Vec2::new(vx, v.y));
    }
}

/// A kinematic body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Center position
    pub position: Vec2,
    /// Velocity in pixels per second
    pub velocity: Vec2,
    /// Full width and height
    pub size: Vec2,
    /// Horizontal facing
    pub facing: Facing,
    /// Standing on the floor
    pub grounded: bool,
    /// Whether gravity applies
    pub gravity: bool,
}

impl Body {
    /// Creates a grounded, gravity-affected body.
    #[must_use]
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            facing: Facing::Right,
            grounded: true,
            gravity: true,
        }
    }

    /// Sets the facing.
    #[must_use]
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Starts the body in the air.
    #[must_use]
    pub fn airborne(mut self) -> Self {
        self.grounded = false;
        self
    }

    /// Disables gravity (flying enemies, tests).
    #[must_use]
    pub fn without_gravity(mut self) -> Self {
        self.gravity = false;
        self
    }

    /// Collision bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, self.size.x, self.size.y)
    }
}

/// In-memory body storage with gravity and a flat floor.
#[derive(Debug, Clone)]
pub struct BodyStore {
    bodies: AHashMap<EntityId, Body>,
    /// Gravity acceleration in pixels per second squared (positive = down)
    pub gravity: f32,
    /// Y coordinate of the floor surface
    pub floor_y: Option<f32>,
}

impl Default for BodyStore {
    fn default() -> Self {
        Self {
            bodies: AHashMap::new(),
            gravity: 1400.0,
            floor_y: None,
        }
    }
}

impl BodyStore {
    /// Creates an empty store without a floor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the floor surface.
    #[must_use]
    pub fn with_floor(mut self, floor_y: f32) -> Self {
        self.floor_y = Some(floor_y);
        self
    }

    /// Inserts or replaces a body.
    pub fn insert(&mut self, id: EntityId, body: Body) {
        self.bodies.insert(id, body);
    }

    /// Removes a body.
    pub fn remove(&mut self, id: EntityId) -> Option<Body> {
        self.bodies.remove(&id)
    }

    /// Reads a body.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Mutable access to a body.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Moves a body to `position`.
    pub fn teleport(&mut self, id: EntityId, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = position;
        }
    }

    /// Sets the grounded flag directly.
    pub fn set_grounded(&mut self, id: EntityId, grounded: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.grounded = grounded;
        }
    }

    /// Integrates all bodies by `delta_ms`.
    pub fn step(&mut self, delta_ms: f32) {
        let dt = delta_ms / 1000.0;
        for body in self.bodies.values_mut() {
            if body.gravity && !body.grounded {
                body.velocity.y += self.gravity * dt;
            }
            body.position += body.velocity * dt;

            if let Some(floor) = self.floor_y {
                let half_h = body.size.y * 0.5;
                if body.position.y + half_h >= floor && body.velocity.y >= 0.0 {
                    body.position.y = floor - half_h;
                    body.velocity.y = 0.0;
                    body.grounded = true;
                } else if body.velocity.y < 0.0 {
                    body.grounded = false;
                }
            }
        }
    }
}

impl PhysicsWorld for BodyStore {
    fn position(&self, id: EntityId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn bounds(&self, id: EntityId) -> Option<Rect> {
        self.bodies.get(&id).map(Body::bounds)
    }

    fn facing(&self, id: EntityId) -> Facing {
        self.bodies.get(&id).map(|b| b.facing).unwrap_or_default()
    }

    fn set_facing(&mut self, id: EntityId, facing: Facing) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.facing = facing;
        }
    }

    fn is_grounded(&self, id: EntityId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.grounded)
    }

    fn velocity(&self, id: EntityId) -> Vec2 {
        self.bodies.get(&id).map_or(Vec2::ZERO, |b| b.velocity)
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_body_reads_empty() {
        let store = BodyStore::new();
        let id = EntityId::new();
        assert!(store.position(id).is_none());
        assert!(!store.is_grounded(id));
        assert_eq!(store.velocity(id), Vec2::ZERO);
    }

    #[test]
    fn test_set_velocity_x_keeps_y() {
        let mut store = BodyStore::new();
        let id = EntityId::new();
        store.insert(id, Body::new(Vec2::ZERO, Vec2::splat(10.0)));
        store.set_velocity(id, Vec2::new(5.0, -3.0));
        store.set_velocity_x(id, 0.0);
        assert_eq!(store.velocity(id), Vec2::new(0.0, -3.0));
    }

    #[test]
    fn test_airborne_body_lands_on_floor() {
        let mut store = BodyStore::new().with_floor(100.0);
        let id = EntityId::new();
        store.insert(
            id,
            Body::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0)).airborne(),
        );

        for _ in 0..120 {
            store.step(16.0);
        }

        let body = store.get(id).expect("body exists");
        assert!(body.grounded);
        assert!((body.position.y - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_horizontal_motion() {
        let mut store = BodyStore::new();
        let id = EntityId::new();
        store.insert(id, Body::new(Vec2::ZERO, Vec2::splat(10.0)));
        store.set_velocity(id, Vec2::new(100.0, 0.0));
        store.step(500.0);
        assert!((store.position(id).expect("body").x - 50.0).abs() < 0.001);
    }
}
