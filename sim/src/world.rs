//! Rapier-based dynamics world owned by the simulation context.
//!
//! This wraps the full set of Rapier structures needed for dynamics stepping
//! *and* for scene queries (wheel suspension ray casts). Everything is owned
//! by value so the caller can run multiple independent worlds, e.g. in tests.
//!
//! Design goals
//! - Deterministic: stepping is only ever driven with the fixed substep length,
//!   so identical inputs produce identical trajectories.
//! - Query-friendly: `query_pipeline()` exposes Rapier 0.31's borrowed
//!   `QueryPipeline` view for ray casts against the current collider set.

use rapier3d::prelude::*;

use crate::constants::GRAVITY_MPS2;

/// All Rapier state for one simulation: bodies, colliders, phases, solvers.
///
/// The world is created once at scene-build time; bodies are only removed at
/// world teardown (dropping the struct).
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    pipeline: PhysicsPipeline,
    collision_pipeline: CollisionPipeline,
    islands: IslandManager,
    ccd_solver: CCDSolver,
}

impl PhysicsWorld {
    /// Create an empty world with standard gravity.
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, GRAVITY_MPS2, 0.0],
            integration_parameters: IntegrationParameters::default(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            pipeline: PhysicsPipeline::new(),
            collision_pipeline: CollisionPipeline::new(),
            islands: IslandManager::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    /// Advance the dynamics by `dt` seconds in one synchronous call.
    ///
    /// Callers are expected to pass the fixed substep length; variable frame
    /// time is accumulated and split into substeps one level up.
    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;

        // Default hooks/events (none).
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &hooks,
            &events,
        );
    }

    /// Run collision detection only (no dynamics), updating the broad-phase
    /// BVH and the narrow-phase contact graph.
    ///
    /// Must be called after inserting colliders so ray casts see them before
    /// the first `step`.
    pub fn update_collision_structures(&mut self) {
        let hooks = ();
        let events = ();

        self.collision_pipeline.step(
            0.0,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &hooks,
            &events,
        );
    }

    /// Create a borrowed `QueryPipeline` view suitable for ray casts.
    ///
    /// The returned pipeline borrows `self`, so it must be dropped before any
    /// mutable access to the body/collider sets (e.g. applying impulses).
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_casts_see_colliders_before_the_first_step() {
        let mut world = PhysicsWorld::new();

        let body = RigidBodyBuilder::fixed().build();
        let handle = world.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(5.0, 0.5, 5.0).build();
        world
            .colliders
            .insert_with_parent(collider, handle, &mut world.bodies);
        world.update_collision_structures();

        // No dynamics step has run: the broad phase must still be queryable.
        let query = world.query_pipeline(QueryFilter::default());
        let ray = Ray::new(point![0.0, 3.0, 0.0], vector![0.0, -1.0, 0.0]);
        let hit = query.cast_ray_and_get_normal(&ray, 10.0, true);
        assert!(hit.is_some());
        assert!((hit.unwrap().1.time_of_impact - 2.5).abs() < 1.0e-5);
    }
}
