//! Broadphase candidate pair generation.

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::GlobalTransform;

use super::collider::PhysicsAabb;

/// Unordered pair of collider entities, stored with the lower entity first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderPair {
    pub a: hecs::Entity,
    pub b: hecs::Entity,
}

impl ColliderPair {
    pub fn new(a: hecs::Entity, b: hecs::Entity) -> Self {
        if b < a {
            Self { a: b, b: a }
        } else {
            Self { a, b }
        }
    }
}

/// Produces the collider pairs the narrowphase should examine.
pub trait BroadPhase {
    fn compute_candidate_pairs(&self, world: &hecs::World) -> Vec<ColliderPair>;
}

/// Which broadphase strategy a [`PhysicsWorld`](super::PhysicsWorld) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadphaseKind {
    /// Every unordered pair of colliders.
    #[default]
    AllPairs,
    /// Pairs whose world-space AABBs overlap.
    Aabb,
}

/// Every unordered collider pair, O(n^2).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllPairs;

impl BroadPhase for AllPairs {
    fn compute_candidate_pairs(&self, world: &hecs::World) -> Vec<ColliderPair> {
        let mut colliders: Vec<hecs::Entity> = world
            .query::<&Collider>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        colliders.sort_unstable();

        let mut pairs = Vec::with_capacity(colliders.len() * colliders.len().saturating_sub(1) / 2);
        for i in 0..colliders.len() {
            for j in (i + 1)..colliders.len() {
                pairs.push(ColliderPair::new(colliders[i], colliders[j]));
            }
        }
        pairs
    }
}

/// Pair-wise world AABB test (O(n^2)). Pairs whose owners are both static are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct AabbOverlap;

impl BroadPhase for AabbOverlap {
    fn compute_candidate_pairs(&self, world: &hecs::World) -> Vec<ColliderPair> {
        let mut entries: Vec<(hecs::Entity, PhysicsAabb, bool)> = Vec::new();

        for (entity, (collider, transform)) in
            world.query::<(&Collider, &GlobalTransform)>().iter()
        {
            let aabb = collider
                .shape
                .compute_aabb(collider.world_matrix(transform));
            let is_static = collider
                .body
                .and_then(|body| world.get::<&RigidBody>(body).ok().map(|rb| rb.is_static()))
                .unwrap_or(false);
            entries.push((entity, aabb, is_static));
        }
        entries.sort_unstable_by_key(|(entity, _, _)| *entity);

        let mut pairs = Vec::new();
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (entity_a, aabb_a, static_a) = &entries[i];
                let (entity_b, aabb_b, static_b) = &entries[j];

                if *static_a && *static_b {
                    continue;
                }

                if aabb_a.overlaps(aabb_b) {
                    pairs.push(ColliderPair::new(*entity_a, *entity_b));
                }
            }
        }

        pairs
    }
}

/// Broadphase selected once from [`BroadphaseKind`].
#[derive(Debug, Clone, Copy)]
pub enum Broadphase {
    AllPairs(AllPairs),
    Aabb(AabbOverlap),
}

impl Broadphase {
    pub fn new(kind: BroadphaseKind) -> Self {
        match kind {
            BroadphaseKind::AllPairs => Broadphase::AllPairs(AllPairs),
            BroadphaseKind::Aabb => Broadphase::Aabb(AabbOverlap),
        }
    }
}

impl BroadPhase for Broadphase {
    fn compute_candidate_pairs(&self, world: &hecs::World) -> Vec<ColliderPair> {
        match self {
            Broadphase::AllPairs(b) => b.compute_candidate_pairs(world),
            Broadphase::Aabb(b) => b.compute_candidate_pairs(world),
        }
    }
}
