//! Error types for collider construction, configuration and mass setup.

use glam::Vec3;
use thiserror::Error;

/// Errors reported when physics input is malformed.
///
/// The per-step algorithms (GJK, EPA, the contact solver) never fail; invalid data is
/// rejected up front when shapes, configs and bodies are built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("convex hull has no vertices")]
    EmptyHull,
    #[error("convex hull vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
    #[error("box half extents must be positive and finite, got {0}")]
    InvalidHalfExtents(Vec3),
    #[error("sphere needs a positive finite radius and at least 3 segments, got {radius} / {segments}")]
    InvalidSphere { radius: f32, segments: u32 },
    #[error("invalid physics config: {0}")]
    InvalidConfig(&'static str),
    #[error("rigid body {0:?} has no collider with positive mass")]
    MasslessBody(hecs::Entity),
    #[error("entity {0:?} has no rigid body")]
    MissingBody(hecs::Entity),
}
