//! Rigid body integration functions.

use glam::{Mat3, Quat, Vec3};

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::{GlobalTransform, Transform};

/// Apply gravity force to all dynamic rigid bodies.
pub fn apply_gravity(world: &mut hecs::World, gravity: Vec3) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        if !rb.is_static() && rb.inverse_mass > 0.0 {
            rb.force_accumulator += gravity * rb.mass() * rb.gravity_scale;
        }
    }
}

/// Accumulate `force` applied at the world-space `point` on `entity`'s body.
///
/// The torque is taken about the body's center of mass. Does nothing for static
/// bodies or entities without a rigid body.
pub fn apply_force_at_point(world: &mut hecs::World, entity: hecs::Entity, force: Vec3, point: Vec3) {
    let Ok((rb, transform)) = world.query_one_mut::<(&mut RigidBody, &Transform)>(entity) else {
        return;
    };
    if rb.is_static() {
        return;
    }
    let centroid = transform.position + transform.rotation * rb.local_centroid;
    rb.force_accumulator += force;
    rb.torque_accumulator += (point - centroid).cross(force);
}

/// Integrate velocities using semi-implicit Euler: v += (F/m) * dt, w += I^-1 * tau * dt.
pub fn integrate_velocities(world: &mut hecs::World, dt: f32) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        if rb.is_static() {
            continue;
        }

        rb.linear_velocity += rb.force_accumulator * rb.inverse_mass * dt;
        rb.angular_velocity += rb.world_inverse_inertia * rb.torque_accumulator * dt;
    }
}

/// Rotate each body's local inverse inertia into world space: `R * I^-1 * R^T`.
pub fn update_world_inertia(world: &mut hecs::World) {
    for (_, (rb, transform)) in world.query_mut::<(&mut RigidBody, &Transform)>() {
        if rb.is_static() {
            rb.world_inverse_inertia = Mat3::ZERO;
            continue;
        }
        let rotation = Mat3::from_quat(transform.rotation);
        rb.world_inverse_inertia = rotation * rb.local_inverse_inertia * rotation.transpose();
    }
}

/// Integrate positions: p += v * dt, q += 0.5 * omega * q * dt.
pub fn integrate_positions(world: &mut hecs::World, dt: f32) {
    for (_, (rb, transform)) in world.query_mut::<(&RigidBody, &mut Transform)>() {
        if rb.is_static() {
            continue;
        }

        transform.position += rb.linear_velocity * dt;

        let omega = rb.angular_velocity;
        if omega.length_squared() > 1e-10 {
            let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
            let q_dot = omega_quat * transform.rotation * 0.5;
            transform.rotation = Quat::from_xyzw(
                transform.rotation.x + q_dot.x * dt,
                transform.rotation.y + q_dot.y * dt,
                transform.rotation.z + q_dot.z * dt,
                transform.rotation.w + q_dot.w * dt,
            )
            .normalize();
        }
    }
}

/// Rebuild every GlobalTransform from its entity's Transform.
pub fn sync_transforms(world: &mut hecs::World) {
    for (_, (transform, global)) in world.query_mut::<(&Transform, &mut GlobalTransform)>() {
        global.0 = transform.to_matrix();
    }
}

/// Copy each body's GlobalTransform onto colliders that live on their own entity.
///
/// Such colliders have no Transform of their own; their `offset` places them inside
/// the body frame.
pub fn sync_collider_transforms(world: &mut hecs::World) {
    let updates: Vec<(hecs::Entity, GlobalTransform)> = world
        .query::<&Collider>()
        .without::<&Transform>()
        .iter()
        .filter_map(|(entity, collider)| {
            let body = collider.body.filter(|body| *body != entity)?;
            let global = world.get::<&GlobalTransform>(body).ok()?;
            Some((entity, *global))
        })
        .collect();

    for (entity, global) in updates {
        if let Ok(mut target) = world.get::<&mut GlobalTransform>(entity) {
            *target = global;
        }
    }
}

/// Clear force and torque accumulators on all rigid bodies.
pub fn clear_forces(world: &mut hecs::World) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        rb.force_accumulator = Vec3::ZERO;
        rb.torque_accumulator = Vec3::ZERO;
    }
}
