//! Collider support mapping and bounding volumes.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::GlobalTransform;
use crate::error::PhysicsError;

/// A convex body that can answer support queries in world space.
pub trait SupportMap {
    /// The world-space vertex farthest along `direction`.
    fn support(&self, direction: Vec3) -> Vec3;

    /// Reference point used to seed the GJK search direction.
    fn center(&self) -> Vec3;
}

/// World-space vertex set of one collider, built once per narrowphase query.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldHull {
    vertices: Vec<Vec3>,
    center: Vec3,
}

impl WorldHull {
    /// Build from world-space vertices, using their mean as the center.
    pub fn new(vertices: Vec<Vec3>) -> Result<Self, PhysicsError> {
        if vertices.is_empty() {
            return Err(PhysicsError::EmptyHull);
        }
        let center = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
        Ok(Self { vertices, center })
    }

    /// Build from world-space vertices with an explicit center.
    pub fn with_center(vertices: Vec<Vec3>, center: Vec3) -> Result<Self, PhysicsError> {
        if vertices.is_empty() {
            return Err(PhysicsError::EmptyHull);
        }
        Ok(Self { vertices, center })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
}

impl SupportMap for WorldHull {
    /// Linear scan over the vertices. Ties go to the first vertex encountered.
    #[inline]
    fn support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.vertices[0];
        let mut best_dot = best.dot(direction);
        for v in &self.vertices[1..] {
            let d = v.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = *v;
            }
        }
        best
    }

    #[inline]
    fn center(&self) -> Vec3 {
        self.center
    }
}

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

impl ColliderShape {
    /// Shape vertices in the collider's local frame.
    ///
    /// Box corners come out in a fixed order: x varies slowest, z fastest.
    pub fn local_vertices(&self) -> Vec<Vec3> {
        match self {
            ColliderShape::Box { half_extents } => {
                let h = *half_extents;
                let mut corners = Vec::with_capacity(8);
                for sx in [-1.0, 1.0] {
                    for sy in [-1.0, 1.0] {
                        for sz in [-1.0, 1.0] {
                            corners.push(Vec3::new(sx * h.x, sy * h.y, sz * h.z));
                        }
                    }
                }
                corners
            }
            ColliderShape::Sphere { radius, segments } => sphere_vertices(*radius, *segments),
            ColliderShape::ConvexHull(hull) => hull.points().to_vec(),
        }
    }

    /// Transform the shape's vertices into world space.
    pub fn world_hull(&self, mat: Mat4) -> Result<WorldHull, PhysicsError> {
        let vertices = self
            .local_vertices()
            .into_iter()
            .map(|p| mat.transform_point3(p))
            .collect();
        WorldHull::with_center(vertices, mat.transform_point3(Vec3::ZERO))
    }

    /// Compute the world-space AABB for this shape.
    #[inline]
    pub fn compute_aabb(&self, mat: Mat4) -> PhysicsAabb {
        match self {
            ColliderShape::Box { half_extents } => aabb_from_extents(*half_extents, mat),
            ColliderShape::Sphere { radius, .. } => aabb_from_extents(Vec3::splat(*radius), mat),
            ColliderShape::ConvexHull(hull) => {
                let mut min = Vec3::splat(f32::MAX);
                let mut max = Vec3::splat(f32::MIN);
                for p in hull.points() {
                    let wp = mat.transform_point3(*p);
                    min = min.min(wp);
                    max = max.max(wp);
                }
                PhysicsAabb { min, max }
            }
        }
    }
}

impl Collider {
    /// World matrix of the collider: its frame's global transform followed by the offset.
    pub fn world_matrix(&self, transform: &GlobalTransform) -> Mat4 {
        if self.offset != Vec3::ZERO {
            transform.0 * Mat4::from_translation(self.offset)
        } else {
            transform.0
        }
    }

    /// World-space support geometry for this collider.
    pub fn world_hull(&self, transform: &GlobalTransform) -> Result<WorldHull, PhysicsError> {
        self.shape.world_hull(self.world_matrix(transform))
    }
}

/// Pole, rings, pole. Ring `i` sits at polar angle `PI * i / stacks`.
fn sphere_vertices(radius: f32, segments: u32) -> Vec<Vec3> {
    let slices = segments.max(3);
    let stacks = (slices / 2).max(2);

    let mut points = Vec::with_capacity((slices * (stacks - 1) + 2) as usize);
    points.push(Vec3::Y * radius);
    for i in 1..stacks {
        let (sin_polar, cos_polar) = (PI * i as f32 / stacks as f32).sin_cos();
        for j in 0..slices {
            let (sin_azimuth, cos_azimuth) = (TAU * j as f32 / slices as f32).sin_cos();
            points.push(
                Vec3::new(sin_polar * cos_azimuth, cos_polar, sin_polar * sin_azimuth) * radius,
            );
        }
    }
    points.push(Vec3::NEG_Y * radius);
    points
}

/// Compute world-space AABB from local half-extents and a transform matrix.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);

    // For each world axis, compute the extent by projecting the local box axes
    let abs_col0 = mat.x_axis.truncate().abs();
    let abs_col1 = mat.y_axis.truncate().abs();
    let abs_col2 = mat.z_axis.truncate().abs();

    let extent = abs_col0 * half_extents.x + abs_col1 * half_extents.y + abs_col2 * half_extents.z;

    PhysicsAabb {
        min: center - extent,
        max: center + extent,
    }
}
