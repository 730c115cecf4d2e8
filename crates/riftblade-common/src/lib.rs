//! # Riftblade Common
//!
//! Common types, utilities, and shared abstractions for Riftblade.
//!
//! This crate provides foundational types used across all Riftblade crates:
//! - ID types (EntityId)
//! - Geometry (axis-aligned rectangles, facing, re-exported `Vec2`)
//! - Version information for content schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // v2 can read v1 data (newer version reading older data)
        assert!(v2.is_compatible_with(&v1));
        // Different major versions are incompatible
        assert!(!v1.is_compatible_with(&v3));
    }

    #[test]
    fn test_rect_mirrors_with_facing() {
        let right = Rect::from_offset(Vec2::new(100.0, 50.0), 20.0, 0.0, 40.0, 10.0, Facing::Right);
        let left = Rect::from_offset(Vec2::new(100.0, 50.0), 20.0, 0.0, 40.0, 10.0, Facing::Left);
        assert_eq!(right.center().x, 120.0);
        assert_eq!(left.center().x, 80.0);
    }
}
