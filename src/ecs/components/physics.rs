//! Physics components for ECS entities.

use glam::{Mat3, Vec3};

use crate::error::PhysicsError;

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by forces and contact impulses.
    Dynamic,
    /// Immovable. Never written to by the solver.
    Static,
}

/// Rigid body component.
///
/// Mass properties are stored inverted since that is all the solver and the
/// integrator ever need. A zero inverse mass or inverse inertia locks the
/// corresponding motion.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    pub inverse_mass: f32,
    /// Inverse inertia tensor in the body's local frame.
    pub local_inverse_inertia: Mat3,
    /// Inverse inertia tensor rotated into world space (`R * I_local^-1 * R^T`).
    pub world_inverse_inertia: Mat3,
    /// Center of mass in the body's local frame.
    pub local_centroid: Vec3,
    pub linear_velocity: Vec3,
    /// Angular velocity in radians per second.
    pub angular_velocity: Vec3,
    pub force_accumulator: Vec3,
    pub torque_accumulator: Vec3,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient (0.0 - 1.0).
    pub friction: f32,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f32,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// The inertia tensor starts out as `mass * I`. Spawning through
    /// [`spawn_body`](crate::ecs::bridge::spawn_body) replaces it with the one
    /// aggregated from the body's colliders.
    pub fn new_dynamic(mass: f32) -> Self {
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        let inverse_inertia = Mat3::from_diagonal(Vec3::splat(inverse_mass));
        Self {
            body_type: RigidBodyType::Dynamic,
            inverse_mass,
            local_inverse_inertia: inverse_inertia,
            world_inverse_inertia: inverse_inertia,
            local_centroid: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            restitution: 0.5,
            friction: 0.5,
            gravity_scale: 1.0,
        }
    }

    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            inverse_mass: 0.0,
            local_inverse_inertia: Mat3::ZERO,
            world_inverse_inertia: Mat3::ZERO,
            local_centroid: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            restitution: 0.5,
            friction: 0.5,
            gravity_scale: 0.0,
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == RigidBodyType::Static
    }

    /// Mass derived from the stored inverse. Zero for static or infinitely heavy bodies.
    pub fn mass(&self) -> f32 {
        if self.inverse_mass > 0.0 {
            1.0 / self.inverse_mass
        } else {
            0.0
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.clamp(0.0, 1.0);
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_velocity(mut self, linear_velocity: Vec3) -> Self {
        self.linear_velocity = linear_velocity;
        self
    }
}

/// A non-empty set of local-space points whose convex hull is the collision shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
}

impl ConvexHull {
    /// Build a hull from its vertices. Fails on an empty or non-finite vertex set.
    pub fn new(points: Vec<Vec3>) -> Result<Self, PhysicsError> {
        if points.is_empty() {
            return Err(PhysicsError::EmptyHull);
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(PhysicsError::NonFiniteVertex { index });
        }
        Ok(Self { points })
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Mean of the hull's vertices.
    pub fn vertex_centroid(&self) -> Vec3 {
        self.points.iter().copied().sum::<Vec3>() / self.points.len() as f32
    }
}

/// Collider shape. Every variant is a convex polyhedron described by its vertices.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Box { half_extents: Vec3 },
    /// Latitude/longitude polyhedron inscribed in a sphere. `segments` slices around
    /// the vertical axis, half as many stacks from pole to pole.
    Sphere { radius: f32, segments: u32 },
    ConvexHull(ConvexHull),
}

impl ColliderShape {
    /// Box shape with validated half extents.
    pub fn cuboid(half_extents: Vec3) -> Result<Self, PhysicsError> {
        if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidHalfExtents(half_extents));
        }
        Ok(ColliderShape::Box { half_extents })
    }

    /// Sphere shape with validated radius and tessellation.
    pub fn sphere(radius: f32, segments: u32) -> Result<Self, PhysicsError> {
        if !radius.is_finite() || radius <= 0.0 || segments < 3 {
            return Err(PhysicsError::InvalidSphere { radius, segments });
        }
        Ok(ColliderShape::Sphere { radius, segments })
    }

    /// Convex hull shape over the given local-space points.
    pub fn convex_hull(points: Vec<Vec3>) -> Result<Self, PhysicsError> {
        ConvexHull::new(points).map(ColliderShape::ConvexHull)
    }
}

/// Collision detection component.
///
/// A collider may live on its body's entity or on a separate entity that points back
/// to the body; several colliders sharing one body form a compound shape.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the owning frame's origin, in that frame's local space.
    pub offset: Vec3,
    /// Entity carrying the [`RigidBody`] this collider belongs to.
    pub body: Option<hecs::Entity>,
    /// Mass contributed to the owning body by mass aggregation.
    pub mass: f32,
    /// Set when the collider took part in a contact during the last step.
    pub had_contact: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape, body: Option<hecs::Entity>) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            body,
            mass: 1.0,
            had_contact: false,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(
            ColliderShape::Box {
                half_extents: Vec3::splat(0.5),
            },
            None,
        )
    }
}
