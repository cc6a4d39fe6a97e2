//! Mass properties of a body aggregated from the colliders it owns.

use glam::{Mat3, Vec3};
use tracing::debug;

use crate::ecs::components::physics::{Collider, ColliderShape, RigidBody};
use crate::ecs::components::transform::Transform;
use crate::error::PhysicsError;

/// Inertia tensors with a determinant this small are treated as singular.
const SINGULAR_DETERMINANT: f32 = 1e-12;

/// Mass, centroid and inertia of one collider in its body's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderMass {
    pub mass: f32,
    pub centroid: Vec3,
    /// Inertia tensor about `centroid`.
    pub inertia: Mat3,
}

impl ColliderMass {
    pub fn of(collider: &Collider) -> Self {
        let mass = collider.mass;
        let (centroid, inertia) = match &collider.shape {
            ColliderShape::Box { half_extents } => {
                (Vec3::ZERO, box_inertia(mass, *half_extents * 2.0))
            }
            ColliderShape::Sphere { radius, .. } => (Vec3::ZERO, sphere_inertia(mass, *radius)),
            ColliderShape::ConvexHull(hull) => {
                let (min, max) = hull
                    .points()
                    .iter()
                    .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                        (lo.min(*p), hi.max(*p))
                    });
                (hull.vertex_centroid(), box_inertia(mass, max - min))
            }
        };

        Self {
            mass,
            centroid: collider.offset + centroid,
            inertia,
        }
    }
}

/// Inertia tensor of a solid box with full edge lengths `size`.
pub fn box_inertia(mass: f32, size: Vec3) -> Mat3 {
    let sq = size * size;
    Mat3::from_diagonal(Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0))
}

/// Inertia tensor of a solid sphere: `2/5 m r^2` on the diagonal.
pub fn sphere_inertia(mass: f32, radius: f32) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(0.4 * mass * radius * radius))
}

/// Parallel-axis term moving an inertia tensor by `d`: `m (|d|^2 E - d d^T)`.
fn parallel_axis(mass: f32, d: Vec3) -> Mat3 {
    let outer = Mat3::from_cols(d * d.x, d * d.y, d * d.z);
    (Mat3::IDENTITY * d.length_squared() - outer) * mass
}

/// Combine collider mass properties about their common centroid.
///
/// Returns `(total_mass, centroid, inertia)`; `None` if no part has positive mass.
pub fn combine(parts: &[ColliderMass]) -> Option<(f32, Vec3, Mat3)> {
    let parts: Vec<&ColliderMass> = parts.iter().filter(|p| p.mass > 0.0).collect();
    if parts.is_empty() {
        return None;
    }
    let total: f32 = parts.iter().map(|p| p.mass).sum();

    let centroid = parts.iter().map(|p| p.centroid * p.mass).sum::<Vec3>() / total;
    let inertia = parts.iter().fold(Mat3::ZERO, |acc, p| {
        acc + p.inertia + parallel_axis(p.mass, centroid - p.centroid)
    });
    Some((total, centroid, inertia))
}

/// Recompute `body`'s mass, centroid and inverse inertia from the colliders it owns.
///
/// Static bodies keep zero inverse mass and inertia. A singular inertia tensor locks
/// rotation (zero inverse).
pub fn aggregate_mass(world: &mut hecs::World, body: hecs::Entity) -> Result<(), PhysicsError> {
    let is_static = world
        .get::<&RigidBody>(body)
        .map(|rb| rb.is_static())
        .map_err(|_| PhysicsError::MissingBody(body))?;

    let parts: Vec<ColliderMass> = world
        .query::<&Collider>()
        .iter()
        .filter(|(_, c)| c.body == Some(body))
        .map(|(_, c)| ColliderMass::of(c))
        .collect();

    let rotation = world
        .get::<&Transform>(body)
        .map(|t| Mat3::from_quat(t.rotation))
        .unwrap_or(Mat3::IDENTITY);

    let mut rb = world
        .get::<&mut RigidBody>(body)
        .map_err(|_| PhysicsError::MissingBody(body))?;

    if is_static {
        if let Some((_, centroid, _)) = combine(&parts) {
            rb.local_centroid = centroid;
        }
        rb.inverse_mass = 0.0;
        rb.local_inverse_inertia = Mat3::ZERO;
        rb.world_inverse_inertia = Mat3::ZERO;
        return Ok(());
    }

    let (total, centroid, inertia) = combine(&parts).ok_or(PhysicsError::MasslessBody(body))?;

    let determinant = inertia.determinant();
    let inverse_inertia = if determinant.is_finite() && determinant.abs() > SINGULAR_DETERMINANT {
        inertia.inverse()
    } else {
        debug!(?body, determinant, "singular inertia tensor, locking rotation");
        Mat3::ZERO
    };

    rb.inverse_mass = 1.0 / total;
    rb.local_centroid = centroid;
    rb.local_inverse_inertia = inverse_inertia;
    rb.world_inverse_inertia = rotation * inverse_inertia * rotation.transpose();
    Ok(())
}
