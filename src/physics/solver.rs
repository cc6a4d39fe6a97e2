//! Sequential impulse contact solver.
//!
//! Each contact contributes three constraint rows (normal, tangent1, tangent2) with
//! the Jacobian `[n, rA x n, -n, -(rB x n)]`. Rows are prepared once per call and then
//! relaxed Gauss-Seidel style for a fixed number of passes over the contact list.

use std::collections::HashMap;

use glam::{Mat3, Vec3};
use tracing::trace;

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::transform::GlobalTransform;

use super::contact::Contact;

/// Effective-mass denominators at or below this make a row inert.
const MIN_EFFECTIVE_MASS_DENOM: f32 = 1e-9;

/// Position correction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Baumgarte factor: fraction of the penetration error fed back per step.
    pub baumgarte: f32,
    /// Penetration allowed before position correction kicks in.
    pub penetration_slop: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            baumgarte: 0.2,
            penetration_slop: 0.005,
        }
    }
}

/// Resolve contact constraints by sequential impulses.
///
/// Only the linear and angular velocities of non-static bodies are written. Contacts
/// whose bodies lack a `RigidBody` or a `GlobalTransform` are skipped.
pub fn resolve_contacts(
    contacts: &[Contact],
    world: &mut hecs::World,
    dt: f32,
    iterations: u32,
    settings: &SolverSettings,
) {
    if contacts.is_empty() {
        return;
    }

    let mut bodies: Vec<RbData> = Vec::new();
    let mut body_index: HashMap<hecs::Entity, usize> = HashMap::new();
    let mut constraints: Vec<ContactConstraint> = Vec::with_capacity(contacts.len());

    let position_gain = if dt > 0.0 {
        settings.baumgarte / dt
    } else {
        0.0
    };

    for contact in contacts {
        let (Some(a), Some(b)) = (
            gather_body(world, contact.body_a, &mut bodies, &mut body_index),
            gather_body(world, contact.body_b, &mut bodies, &mut body_index),
        ) else {
            trace!(
                body_a = ?contact.body_a,
                body_b = ?contact.body_b,
                "contact skipped, body missing"
            );
            continue;
        };
        constraints.push(ContactConstraint::prepare(
            contact,
            a,
            b,
            &bodies,
            position_gain,
            settings.penetration_slop,
        ));
    }

    for _ in 0..iterations {
        for constraint in constraints.iter_mut() {
            constraint.solve(&mut bodies);
        }
    }

    for body in &bodies {
        if body.is_static {
            continue;
        }
        if let Ok(mut rb) = world.get::<&mut RigidBody>(body.entity) {
            rb.linear_velocity = body.linear_velocity;
            rb.angular_velocity = body.angular_velocity;
        }
    }
}

/// Look up (or load) the solver copy of `entity`'s rigid body state.
fn gather_body(
    world: &hecs::World,
    entity: hecs::Entity,
    bodies: &mut Vec<RbData>,
    body_index: &mut HashMap<hecs::Entity, usize>,
) -> Option<usize> {
    if let Some(&index) = body_index.get(&entity) {
        return Some(index);
    }
    let rb = world.get::<&RigidBody>(entity).ok()?;
    let Ok(global) = world.get::<&GlobalTransform>(entity) else {
        trace!(?entity, "body has no GlobalTransform");
        return None;
    };
    let position = global.translation();

    let index = bodies.len();
    bodies.push(RbData::from_rb(entity, &rb, position));
    body_index.insert(entity, index);
    Some(index)
}

/// Solver-local copy of the rigid body data a contact needs.
struct RbData {
    entity: hecs::Entity,
    is_static: bool,
    inv_mass: f32,
    inv_inertia: Mat3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    position: Vec3,
    restitution: f32,
    friction: f32,
}

impl RbData {
    fn from_rb(entity: hecs::Entity, rb: &RigidBody, position: Vec3) -> Self {
        let is_static = rb.is_static();
        let (inv_mass, inv_inertia) = if is_static {
            (0.0, Mat3::ZERO)
        } else {
            (rb.inverse_mass, rb.world_inverse_inertia)
        };

        Self {
            entity,
            is_static,
            inv_mass,
            inv_inertia,
            linear_velocity: rb.linear_velocity,
            angular_velocity: rb.angular_velocity,
            position,
            restitution: rb.restitution,
            friction: rb.friction,
        }
    }
}

/// One Jacobian row of a contact.
#[derive(Debug, Clone, Copy)]
struct ConstraintRow {
    direction: Vec3,
    /// `rA x direction`.
    angular_a: Vec3,
    /// `rB x direction`.
    angular_b: Vec3,
    /// Inverse of the row's generalized mass; zero when inert.
    effective_mass: f32,
    bias: f32,
    accumulated: f32,
}

impl ConstraintRow {
    fn new(direction: Vec3, r_a: Vec3, r_b: Vec3, a: &RbData, b: &RbData) -> Self {
        let angular_a = r_a.cross(direction);
        let angular_b = r_b.cross(direction);

        let denom = a.inv_mass
            + angular_a.dot(a.inv_inertia * angular_a)
            + b.inv_mass
            + angular_b.dot(b.inv_inertia * angular_b);
        let effective_mass = if denom.is_finite() && denom > MIN_EFFECTIVE_MASS_DENOM {
            1.0 / denom
        } else {
            0.0
        };

        Self {
            direction,
            angular_a,
            angular_b,
            effective_mass,
            bias: 0.0,
            accumulated: 0.0,
        }
    }

    /// Constraint velocity `J v`. Negative when the bodies approach along the row.
    #[inline]
    fn velocity(&self, a: &RbData, b: &RbData) -> f32 {
        self.direction.dot(a.linear_velocity) + self.angular_a.dot(a.angular_velocity)
            - self.direction.dot(b.linear_velocity)
            - self.angular_b.dot(b.angular_velocity)
    }

    /// Apply `delta` along the row to both bodies. Static bodies carry zero inverse mass.
    #[inline]
    fn apply(&self, delta: f32, bodies: &mut [RbData], a: usize, b: usize) {
        let body_a = &mut bodies[a];
        body_a.linear_velocity += self.direction * (body_a.inv_mass * delta);
        body_a.angular_velocity += body_a.inv_inertia * (self.angular_a * delta);

        let body_b = &mut bodies[b];
        body_b.linear_velocity -= self.direction * (body_b.inv_mass * delta);
        body_b.angular_velocity -= body_b.inv_inertia * (self.angular_b * delta);
    }
}

/// Prepared rows for one contact.
struct ContactConstraint {
    body_a: usize,
    body_b: usize,
    friction: f32,
    /// Normal, tangent1, tangent2.
    rows: [ConstraintRow; 3],
}

impl ContactConstraint {
    fn prepare(
        contact: &Contact,
        body_a: usize,
        body_b: usize,
        bodies: &[RbData],
        position_gain: f32,
        penetration_slop: f32,
    ) -> Self {
        let a = &bodies[body_a];
        let b = &bodies[body_b];
        let r_a = contact.point_a - a.position;
        let r_b = contact.point_b - b.position;

        let mut normal = ConstraintRow::new(contact.normal, r_a, r_b, a, b);
        let tangent1 = ConstraintRow::new(contact.tangent1, r_a, r_b, a, b);
        let tangent2 = ConstraintRow::new(contact.tangent2, r_a, r_b, a, b);

        let restitution = (a.restitution + b.restitution) * 0.5;
        let closing_velocity = normal.velocity(a, b);
        normal.bias = -position_gain * (contact.penetration - penetration_slop).max(0.0)
            + restitution * closing_velocity.min(0.0);

        Self {
            body_a,
            body_b,
            friction: (a.friction + b.friction) * 0.5,
            rows: [normal, tangent1, tangent2],
        }
    }

    fn solve(&mut self, bodies: &mut [RbData]) {
        let (a, b) = (self.body_a, self.body_b);

        // Normal: accumulated impulse never pulls.
        let row = &mut self.rows[0];
        let lambda = -row.effective_mass * (row.velocity(&bodies[a], &bodies[b]) + row.bias);
        let previous = row.accumulated;
        row.accumulated = (previous + lambda).max(0.0);
        let delta = row.accumulated - previous;
        row.apply(delta, bodies, a, b);

        // Friction: per-axis box around the current normal impulse.
        let max_friction = self.friction * self.rows[0].accumulated;
        for row in &mut self.rows[1..] {
            let lambda = -row.effective_mass * (row.velocity(&bodies[a], &bodies[b]) + row.bias);
            let previous = row.accumulated;
            row.accumulated = (previous + lambda).clamp(-max_friction, max_friction);
            let delta = row.accumulated - previous;
            row.apply(delta, bodies, a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::transform::Transform;
    use crate::physics::contact::tangent_basis;

    fn spawn(world: &mut hecs::World, position: Vec3, rb: RigidBody) -> hecs::Entity {
        let transform = Transform::from_position(position);
        world.spawn((transform, GlobalTransform::from_transform(&transform), rb))
    }

    fn contact(
        body_a: hecs::Entity,
        body_b: hecs::Entity,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
    ) -> Contact {
        let (tangent1, tangent2) = tangent_basis(normal);
        Contact {
            body_a,
            body_b,
            collider_a: body_a,
            collider_b: body_b,
            point_a: point,
            point_b: point,
            local_point_a: Vec3::ZERO,
            local_point_b: Vec3::ZERO,
            normal,
            tangent1,
            tangent2,
            penetration,
        }
    }

    /// Unit-mass cube centered at y = 0.5 touching a static ground at the origin.
    fn cube_on_ground(
        velocity: Vec3,
        restitution: f32,
        friction: f32,
    ) -> (hecs::World, hecs::Entity, hecs::Entity) {
        let mut world = hecs::World::new();
        let cube = spawn(
            &mut world,
            Vec3::new(0.0, 0.5, 0.0),
            RigidBody::new_dynamic(1.0)
                .with_velocity(velocity)
                .with_restitution(restitution)
                .with_friction(friction),
        );
        let ground = spawn(
            &mut world,
            Vec3::new(0.0, -0.5, 0.0),
            RigidBody::new_static()
                .with_restitution(restitution)
                .with_friction(friction),
        );
        (world, cube, ground)
    }

    #[test]
    fn test_resting_contact_stops_approach() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(0.0, -1.0, 0.0), 0.0, 0.5);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!(rb.linear_velocity.y.abs() < 1e-4, "vy = {}", rb.linear_velocity.y);
        let ground_rb = world.get::<&RigidBody>(ground).unwrap();
        assert_eq!(ground_rb.linear_velocity, Vec3::ZERO);
        assert_eq!(ground_rb.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_static_body_never_written() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(0.0, -1.0, 0.0), 0.3, 0.5);
        {
            let mut rb = world.get::<&mut RigidBody>(ground).unwrap();
            rb.linear_velocity = Vec3::new(1.0, 2.0, 3.0);
            rb.angular_velocity = Vec3::new(0.5, 0.0, 0.0);
        }
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.05)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 8, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(ground).unwrap();
        assert_eq!(rb.linear_velocity, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rb.angular_velocity, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_no_depth_no_closing_velocity_is_idle() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::ZERO, 0.5, 0.5);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert_eq!(rb.linear_velocity, Vec3::ZERO);
        assert_eq!(rb.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_separating_contact_not_pulled_back() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(0.0, 2.0, 0.0), 0.0, 0.5);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!((rb.linear_velocity.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_restitution_bounce() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(0.0, -1.0, 0.0), 1.0, 0.0);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!((rb.linear_velocity.y - 1.0).abs() < 1e-4, "vy = {}", rb.linear_velocity.y);
    }

    #[test]
    fn test_penetration_bias_pushes_out() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::ZERO, 0.0, 0.0);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.105)];
        let settings = SolverSettings {
            baumgarte: 0.2,
            penetration_slop: 0.005,
        };

        resolve_contacts(&contacts, &mut world, 0.01, 4, &settings);

        // (0.2 / 0.01) * (0.105 - 0.005) = 2
        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!((rb.linear_velocity.y - 2.0).abs() < 1e-4, "vy = {}", rb.linear_velocity.y);
    }

    #[test]
    fn test_friction_clamped_by_normal_impulse() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(2.0, -1.0, 0.0), 0.0, 0.5);
        let contacts = [contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        // Normal impulse is 1, so friction removes at most 0.5 of the sliding speed.
        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!((rb.linear_velocity.x - 1.5).abs() < 1e-4, "vx = {}", rb.linear_velocity.x);
        assert!(rb.linear_velocity.y.abs() < 1e-4);
        assert!(rb.linear_velocity.z.abs() < 1e-6);
        // The off-center friction impulse spins the cube about Z.
        assert!(rb.angular_velocity.z < 0.0);
    }

    #[test]
    fn test_zero_effective_mass_is_inert() {
        let mut world = hecs::World::new();
        let mut heavy = RigidBody::new_dynamic(1.0).with_velocity(Vec3::new(0.0, -1.0, 0.0));
        heavy.inverse_mass = 0.0;
        heavy.world_inverse_inertia = Mat3::ZERO;
        let a = spawn(&mut world, Vec3::new(0.0, 0.5, 0.0), heavy);
        let b = spawn(&mut world, Vec3::new(0.0, -0.5, 0.0), RigidBody::new_static());
        let contacts = [contact(a, b, Vec3::ZERO, Vec3::Y, 0.5)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(a).unwrap();
        assert_eq!(rb.linear_velocity, Vec3::new(0.0, -1.0, 0.0));
        assert!(rb.angular_velocity.is_finite());
    }

    #[test]
    fn test_two_dynamic_bodies_exchange_momentum() {
        let mut world = hecs::World::new();
        let a = spawn(
            &mut world,
            Vec3::new(-0.5, 0.0, 0.0),
            RigidBody::new_dynamic(1.0)
                .with_velocity(Vec3::new(1.0, 0.0, 0.0))
                .with_restitution(0.0),
        );
        let b = spawn(
            &mut world,
            Vec3::new(0.5, 0.0, 0.0),
            RigidBody::new_dynamic(1.0)
                .with_velocity(Vec3::new(-1.0, 0.0, 0.0))
                .with_restitution(0.0),
        );
        // B is on +X, so A separates along -X.
        let contacts = [contact(a, b, Vec3::ZERO, -Vec3::X, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let va = world.get::<&RigidBody>(a).unwrap().linear_velocity;
        let vb = world.get::<&RigidBody>(b).unwrap().linear_velocity;
        assert!(va.x.abs() < 1e-4 && vb.x.abs() < 1e-4);
        // Total momentum stays zero.
        assert!((va + vb).length() < 1e-5);
    }

    #[test]
    fn test_missing_body_skipped() {
        let (mut world, cube, ground) = cube_on_ground(Vec3::new(0.0, -1.0, 0.0), 0.0, 0.5);
        let gone = world.spawn(());
        world.despawn(gone).unwrap();
        let contacts = [
            contact(cube, gone, Vec3::ZERO, Vec3::Y, 0.0),
            contact(cube, ground, Vec3::ZERO, Vec3::Y, 0.0),
        ];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        assert!(rb.linear_velocity.y.abs() < 1e-4);
    }

    #[test]
    fn test_body_without_global_transform_skipped() {
        let mut world = hecs::World::new();
        let cube = world.spawn((
            Transform::from_position(Vec3::new(10.0, 0.5, 0.0)),
            RigidBody::new_dynamic(1.0).with_velocity(Vec3::new(0.0, -1.0, 0.0)),
        ));
        let ground = spawn(&mut world, Vec3::new(10.0, -0.5, 0.0), RigidBody::new_static());
        let contacts = [contact(cube, ground, Vec3::new(10.0, 0.0, 0.0), Vec3::Y, 0.0)];

        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        // Lever arms from the world origin would spin the cube; it must be left alone.
        {
            let rb = world.get::<&RigidBody>(cube).unwrap();
            assert_eq!(rb.linear_velocity, Vec3::new(0.0, -1.0, 0.0));
            assert_eq!(rb.angular_velocity, Vec3::ZERO);
        }

        let global =
            GlobalTransform::from_transform(&Transform::from_position(Vec3::new(10.0, 0.5, 0.0)));
        world.insert_one(cube, global).unwrap();
        resolve_contacts(&contacts, &mut world, 1.0 / 60.0, 10, &SolverSettings::default());

        let rb = world.get::<&RigidBody>(cube).unwrap();
        // Mean restitution 0.5 turns the -1 approach into a 0.5 rebound.
        assert!(
            (rb.linear_velocity - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-4,
            "v = {:?}",
            rb.linear_velocity
        );
        assert!(rb.angular_velocity.length() < 1e-4, "w = {:?}", rb.angular_velocity);
    }
}
