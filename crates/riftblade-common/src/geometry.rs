//! Geometry primitives shared by the combat core and the engine.
//!
//! All coordinates are in world pixels with +x to the right and +y down,
//! matching the 2D scene the combat core runs on.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Horizontal facing of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing towards negative x.
    Left,
    /// Facing towards positive x.
    #[default]
    Right,
}

impl Facing {
    /// Returns `-1.0` for left and `1.0` for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Facing derived from the sign of `dx`. Zero keeps `fallback`.
    #[must_use]
    pub fn from_delta(dx: f32, fallback: Self) -> Self {
        if dx > 0.0 {
            Self::Right
        } else if dx < 0.0 {
            Self::Left
        } else {
            fallback
        }
    }

    /// The opposite facing.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Axis-aligned rectangle used for bodies, hitbox shapes and projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum X coordinate
    pub min_x: f32,
    /// Minimum Y coordinate
    pub min_y: f32,
    /// Maximum X coordinate
    pub max_x: f32,
    /// Maximum Y coordinate
    pub max_y: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a rectangle from its center and full size.
    #[must_use]
    pub fn from_center(center: Vec2, width: f32, height: f32) -> Self {
        let half_w = width * 0.5;
        let half_h = height * 0.5;
        Self {
            min_x: center.x - half_w,
            min_y: center.y - half_h,
            max_x: center.x + half_w,
            max_y: center.y + half_h,
        }
    }

    /// Creates a rectangle placed relative to an anchor point.
    ///
    /// The x offset is mirrored by `facing`, so a shape configured in front of
    /// a right-facing actor stays in front when the actor turns around.
    #[must_use]
    pub fn from_offset(
        anchor: Vec2,
        offset_x: f32,
        offset_y: f32,
        width: f32,
        height: f32,
        facing: Facing,
    ) -> Self {
        let center = Vec2::new(anchor.x + offset_x * facing.sign(), anchor.y + offset_y);
        Self::from_center(center, width, height)
    }

    /// Returns the center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the width of the rectangle.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the rectangle.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Checks if this rectangle overlaps with another (touching edges do not count).
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Returns the rectangle translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap_excludes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        let c = Rect::new(9.0, 9.0, 20.0, 20.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn test_from_center_size() {
        let r = Rect::from_center(Vec2::new(5.0, 5.0), 4.0, 2.0);
        assert_eq!(r, Rect::new(3.0, 4.0, 7.0, 6.0));
        assert_eq!(r.width(), 4.0);
        assert_eq!(r.height(), 2.0);
    }

    #[test]
    fn test_facing_from_delta() {
        assert_eq!(Facing::from_delta(3.0, Facing::Left), Facing::Right);
        assert_eq!(Facing::from_delta(-3.0, Facing::Right), Facing::Left);
        assert_eq!(Facing::from_delta(0.0, Facing::Left), Facing::Left);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
    }

    #[test]
    fn test_translated() {
        let r = Rect::new(0.0, 0.0, 2.0, 2.0).translated(Vec2::new(3.0, -1.0));
        assert_eq!(r, Rect::new(3.0, -1.0, 5.0, 1.0));
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            ax in -200i16..200, ay in -200i16..200, aw in 1u8..80, ah in 1u8..80,
            bx in -200i16..200, by in -200i16..200, bw in 1u8..80, bh in 1u8..80,
        ) {
            let a = Rect::from_center(Vec2::new(f32::from(ax), f32::from(ay)), f32::from(aw), f32::from(ah));
            let b = Rect::from_center(Vec2::new(f32::from(bx), f32::from(by)), f32::from(bw), f32::from(bh));
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn prop_facing_mirrors_about_anchor(
            x in -500i16..500, offset in -100i16..100, w in 1u8..60,
        ) {
            let anchor = Vec2::new(f32::from(x), 0.0);
            let (offset, w) = (f32::from(offset), f32::from(w));
            let right = Rect::from_offset(anchor, offset, 0.0, w, 10.0, Facing::Right);
            let left = Rect::from_offset(anchor, offset, 0.0, w, 10.0, Facing::Left);
            prop_assert_eq!(right.center().x - anchor.x, anchor.x - left.center().x);
            prop_assert_eq!(right.width(), left.width());
        }
    }
}
