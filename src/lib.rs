//! Convex contact physics
//!
//! Narrowphase collision detection and contact resolution for convex rigid bodies
//! stored in a `hecs` world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Components (`Transform`, `RigidBody`, `Collider`) and spawn helpers
//! 2. **physics** - Support mapping, broadphase, GJK, EPA, contact construction,
//!    the sequential impulse solver, mass aggregation and the fixed-step world
//! 3. **error** - `PhysicsError` for malformed shapes, configs and bodies

pub mod ecs;
pub mod error;
pub mod physics;

// Re-export commonly used types
pub use ecs::prelude::*;

pub use error::PhysicsError;

pub use physics::broadphase::{BroadPhase, BroadphaseKind, ColliderPair};
pub use physics::contact::Contact;
pub use physics::narrowphase::{mark_contacts, NarrowPhase, NarrowphaseKind};
pub use physics::solver::{resolve_contacts, SolverSettings};
pub use physics::{PhysicsConfig, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
