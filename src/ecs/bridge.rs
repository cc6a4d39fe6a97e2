//! Helpers for spawning bodies and colliders into a `hecs::World`.

use crate::ecs::components::physics::{Collider, ColliderShape, RigidBody};
use crate::ecs::components::transform::{GlobalTransform, Transform};
use crate::error::PhysicsError;
use crate::physics::mass::aggregate_mass;

/// Spawn a rigid body with a single collider on the same entity.
///
/// Creates an entity with Transform, GlobalTransform, RigidBody and a Collider
/// whose owning body is the entity itself. The collider carries the body's mass and
/// the body's centroid and inertia are aggregated from it. A dynamic body without
/// positive mass is rejected and nothing is spawned.
pub fn spawn_body(
    world: &mut hecs::World,
    transform: Transform,
    body: RigidBody,
    shape: ColliderShape,
) -> Result<hecs::Entity, PhysicsError> {
    let entity = world.reserve_entity();
    let global = GlobalTransform::from_transform(&transform);
    let collider = Collider::new(shape, Some(entity)).with_mass(body.mass());
    world.spawn_at(entity, (transform, global, body, collider));

    if let Err(err) = aggregate_mass(world, entity) {
        let _ = world.despawn(entity);
        return Err(err);
    }
    Ok(entity)
}

/// Attach an extra collider to an existing body, forming a compound shape.
///
/// The collider gets its own entity whose GlobalTransform mirrors the body's;
/// `collider.offset` places it inside the body frame. The body's mass properties
/// are re-aggregated to include it.
pub fn attach_collider(
    world: &mut hecs::World,
    body: hecs::Entity,
    mut collider: Collider,
) -> Result<hecs::Entity, PhysicsError> {
    if !world.satisfies::<&RigidBody>(body).unwrap_or(false) {
        return Err(PhysicsError::MissingBody(body));
    }
    let global = world
        .get::<&GlobalTransform>(body)
        .map(|g| *g)
        .unwrap_or_default();
    collider.body = Some(body);
    let entity = world.spawn((global, collider));

    if let Err(err) = aggregate_mass(world, body) {
        let _ = world.despawn(entity);
        return Err(err);
    }
    Ok(entity)
}

/// Spawn a collider that no rigid body owns. Such colliders never produce contacts.
pub fn spawn_free_collider(
    world: &mut hecs::World,
    transform: Transform,
    shape: ColliderShape,
) -> hecs::Entity {
    let global = GlobalTransform::from_transform(&transform);
    world.spawn((transform, global, Collider::new(shape, None)))
}
