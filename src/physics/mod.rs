//! Convex rigid body physics: GJK/EPA narrowphase and a sequential impulse solver.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop:
//!
//! 1. Apply forces (gravity)
//! 2. Integrate velocities
//! 3. Rotate inverse inertia tensors into world space
//! 4. Broadphase candidate pairs (all pairs or AABB overlap)
//! 5. Narrowphase: GJK overlap test, EPA penetration, one contact per pair
//! 6. Solve contact constraints (sequential impulse)
//! 7. Integrate positions
//! 8. Synchronize transforms
//! 9. Clear force accumulators
//!
//! Contacts are rebuilt from scratch every step; nothing is cached between steps.

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod epa;
pub mod gjk;
pub mod mass;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use glam::Vec3;
use tracing::{trace, warn};

use crate::error::PhysicsError;

use self::broadphase::{BroadPhase, Broadphase, BroadphaseKind};
use self::contact::Contact;
use self::narrowphase::{mark_contacts, NarrowPhase, Narrowphase, NarrowphaseKind};
use self::solver::{resolve_contacts, SolverSettings};

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Number of constraint solver iterations. Default: 8.
    pub solver_iterations: u32,
    /// Baumgarte stabilization factor in [0, 1]. Default: 0.2.
    pub baumgarte: f32,
    /// Penetration allowed before position correction. Default: 0.005.
    pub penetration_slop: f32,
    /// Default: [`BroadphaseKind::AllPairs`].
    pub broadphase: BroadphaseKind,
    /// Default: [`NarrowphaseKind::GjkEpa`].
    pub narrowphase: NarrowphaseKind,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 8,
            baumgarte: 0.2,
            penetration_slop: 0.005,
            broadphase: BroadphaseKind::default(),
            narrowphase: NarrowphaseKind::default(),
        }
    }
}

impl PhysicsConfig {
    /// Reject values the step loop or the solver cannot work with.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite"));
        }
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(PhysicsError::InvalidConfig(
                "fixed_timestep must be positive and finite",
            ));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig("max_substeps must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::InvalidConfig("baumgarte must lie in [0, 1]"));
        }
        if !self.penetration_slop.is_finite() || self.penetration_slop < 0.0 {
            return Err(PhysicsError::InvalidConfig(
                "penetration_slop must be non-negative and finite",
            ));
        }
        Ok(())
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            baumgarte: self.baumgarte,
            penetration_slop: self.penetration_slop,
        }
    }
}

/// The main physics world managing simulation state.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    broadphase: Broadphase,
    narrowphase: Narrowphase,
    contacts: Vec<Contact>,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            broadphase: Broadphase::new(config.broadphase),
            narrowphase: Narrowphase::new(config.narrowphase),
            config,
            accumulator: 0.0,
            contacts: Vec::new(),
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Contacts found during the last fixed step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world, self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            warn!(
                dropped = self.accumulator,
                "physics step fell behind, dropping accumulated time"
            );
            self.accumulator = 0.0;
        }
    }

    /// Run broadphase and narrowphase against the current transforms.
    pub fn detect_collisions(&self, world: &hecs::World) -> Vec<Contact> {
        let pairs = self.broadphase.compute_candidate_pairs(world);
        let contacts = self.narrowphase.detect_collisions(world, &pairs);
        trace!(
            pairs = pairs.len(),
            contacts = contacts.len(),
            "collision detection"
        );
        contacts
    }

    /// Advance the simulation by exactly one step of `dt` seconds.
    pub fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) {
        // 1. Apply forces (gravity)
        rigid_body::apply_gravity(world, self.config.gravity);

        // 2. Integrate velocities
        rigid_body::integrate_velocities(world, dt);

        // 3. World-space inertia and collider frames
        rigid_body::update_world_inertia(world);
        rigid_body::sync_collider_transforms(world);

        // 4-5. Broadphase + narrowphase
        self.contacts = self.detect_collisions(world);
        mark_contacts(world, &self.contacts);

        // 6. Solve contact constraints
        resolve_contacts(
            &self.contacts,
            world,
            dt,
            self.config.solver_iterations,
            &self.config.solver_settings(),
        );

        // 7. Integrate positions
        rigid_body::integrate_positions(world, dt);

        // 8. Synchronize transforms
        rigid_body::sync_transforms(world);
        rigid_body::sync_collider_transforms(world);

        // 9. Clear force accumulators
        rigid_body::clear_forces(world);
    }
}
