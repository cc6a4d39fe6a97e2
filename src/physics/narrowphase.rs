//! Narrowphase collision detection: GJK overlap test, EPA penetration, contact construction.

use glam::Mat4;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::GlobalTransform;

use super::broadphase::ColliderPair;
use super::collider::{SupportMap, WorldHull};
use super::contact::{Contact, ContactInfo, ContactSide};
use super::epa::epa;
use super::gjk::{gjk, GjkResult};

/// Turns candidate pairs into contacts. Must not mutate the world.
pub trait NarrowPhase {
    fn detect_collisions(&self, world: &hecs::World, pairs: &[ColliderPair]) -> Vec<Contact>;
}

/// Which narrowphase algorithm a [`PhysicsWorld`](super::PhysicsWorld) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrowphaseKind {
    #[default]
    GjkEpa,
}

/// Detect collision between two convex bodies: GJK first, EPA on overlap.
pub fn detect_collision<A, B>(a: &A, b: &B) -> Option<ContactInfo>
where
    A: SupportMap + ?Sized,
    B: SupportMap + ?Sized,
{
    match gjk(a, b) {
        GjkResult::Overlap(simplex) => epa(a, b, &simplex).map(|r| ContactInfo::from_epa(&r)),
        GjkResult::NoOverlap => None,
    }
}

/// GJK + EPA over each collider's world-space vertex set. One contact per pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct GjkEpa;

impl NarrowPhase for GjkEpa {
    fn detect_collisions(&self, world: &hecs::World, pairs: &[ColliderPair]) -> Vec<Contact> {
        // Canonical order so the solver sees the same sequence whatever the broadphase did.
        let mut pairs: Vec<ColliderPair> = pairs
            .iter()
            .map(|p| ColliderPair::new(p.a, p.b))
            .collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut contacts = Vec::new();
        for pair in &pairs {
            let (Some((side_a, hull_a)), Some((side_b, hull_b))) =
                (collider_side(world, pair.a), collider_side(world, pair.b))
            else {
                continue;
            };
            if side_a.body == side_b.body {
                continue;
            }

            if let Some(info) = detect_collision(&hull_a, &hull_b) {
                contacts.push(Contact::new(&side_a, &side_b, &info));
            }
        }
        contacts
    }
}

/// Owning body, world matrix and world hull of a collider, or `None` when the
/// collider has no transform or no owning rigid body.
fn collider_side(world: &hecs::World, entity: hecs::Entity) -> Option<(ContactSide, WorldHull)> {
    let collider = world.get::<&Collider>(entity).ok()?;
    let body = collider.body?;
    if !world.satisfies::<&RigidBody>(body).unwrap_or(false) {
        return None;
    }
    let transform = world.get::<&GlobalTransform>(entity).ok()?;
    let world_matrix: Mat4 = collider.world_matrix(&transform);
    let hull = collider.shape.world_hull(world_matrix).ok()?;
    Some((
        ContactSide {
            body,
            collider: entity,
            world_matrix,
        },
        hull,
    ))
}

/// Narrowphase selected once from [`NarrowphaseKind`].
#[derive(Debug, Clone, Copy)]
pub enum Narrowphase {
    GjkEpa(GjkEpa),
}

impl Narrowphase {
    pub fn new(kind: NarrowphaseKind) -> Self {
        match kind {
            NarrowphaseKind::GjkEpa => Narrowphase::GjkEpa(GjkEpa),
        }
    }
}

impl NarrowPhase for Narrowphase {
    fn detect_collisions(&self, world: &hecs::World, pairs: &[ColliderPair]) -> Vec<Contact> {
        match self {
            Narrowphase::GjkEpa(n) => n.detect_collisions(world, pairs),
        }
    }
}

/// Flag every collider that appears in `contacts`; clear the flag on all others.
pub fn mark_contacts(world: &mut hecs::World, contacts: &[Contact]) {
    for (_, collider) in world.query_mut::<&mut Collider>() {
        collider.had_contact = false;
    }
    for contact in contacts {
        for entity in [contact.collider_a, contact.collider_b] {
            if let Ok(mut collider) = world.get::<&mut Collider>(entity) {
                collider.had_contact = true;
            }
        }
    }
}
