//! Scene builders shared by the physics benchmarks.

use convex_contact::ecs::bridge::spawn_body;
use convex_contact::ecs::components::physics::{ColliderShape, RigidBody};
use convex_contact::ecs::components::transform::Transform;
use convex_contact::physics::broadphase::{AllPairs, BroadPhase};
use convex_contact::physics::collider::WorldHull;
use convex_contact::physics::contact::Contact;
use convex_contact::physics::narrowphase::{GjkEpa, NarrowPhase};
use convex_contact::physics::{PhysicsConfig, PhysicsWorld};
use glam::{Mat4, Quat, Vec3};

/// Side length of the grid holding `n` bodies.
fn grid_side(n: usize) -> usize {
    (n as f32).sqrt().ceil() as usize
}

/// World-space hulls of two unit cubes, B translated by `offset` and rotated by `angle` about Y.
pub fn cube_pair(offset: Vec3, angle: f32) -> anyhow::Result<(WorldHull, WorldHull)> {
    let shape = ColliderShape::cuboid(Vec3::splat(0.5))?;
    let a = shape.world_hull(Mat4::IDENTITY)?;
    let b = shape.world_hull(Mat4::from_rotation_translation(
        Quat::from_rotation_y(angle),
        offset,
    ))?;
    Ok((a, b))
}

/// World-space hull of a random-looking convex point cloud around `center`.
pub fn point_cloud_hull(center: Vec3, count: usize) -> anyhow::Result<WorldHull> {
    let points = (0..count)
        .map(|i| {
            let t = i as f32 * 2.399_963;
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            center + Vec3::new(t.cos() * r, y, t.sin() * r) * 0.6
        })
        .collect();
    Ok(WorldHull::new(points)?)
}

/// `n` dynamic unit cubes on a grid over a static ground. Neighbours overlap slightly.
pub fn setup_box_world(n: usize) -> anyhow::Result<hecs::World> {
    let mut world = hecs::World::new();
    let side = grid_side(n);
    let shape = ColliderShape::cuboid(Vec3::splat(0.5))?;

    spawn_body(
        &mut world,
        Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        RigidBody::new_static(),
        ColliderShape::cuboid(Vec3::new(side as f32, 0.5, side as f32))?,
    )?;

    for i in 0..n {
        let x = (i % side) as f32 * 0.95 - side as f32 * 0.5;
        let z = (i / side) as f32 * 0.95 - side as f32 * 0.5;
        spawn_body(
            &mut world,
            Transform::from_position(Vec3::new(x, 0.49, z)),
            RigidBody::new_dynamic(1.0),
            shape.clone(),
        )?;
    }
    Ok(world)
}

/// Box world plus a physics world using the AABB broadphase.
pub fn setup_scene(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let world = setup_box_world(n)?;
    let physics = PhysicsWorld::new(PhysicsConfig {
        broadphase: convex_contact::physics::broadphase::BroadphaseKind::Aabb,
        ..PhysicsConfig::default()
    })?;
    Ok((world, physics))
}

/// Box world and the contacts GJK/EPA finds in it.
pub fn setup_contacts(n: usize) -> anyhow::Result<(hecs::World, Vec<Contact>)> {
    let world = setup_box_world(n)?;
    let pairs = AllPairs.compute_candidate_pairs(&world);
    let contacts = GjkEpa.detect_collisions(&world, &pairs);
    Ok((world, contacts))
}
