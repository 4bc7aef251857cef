//! Top-level simulation context: owns the world, the scene, the vehicles and
//! the input state, and drives the fixed-timestep frame loop.
//!
//! The host calls [`Simulation::tick`] once per rendered frame with the wall
//! clock delta. Internally each tick is:
//! 1. control — sample each vehicle's speed, run the drive law once, route
//!    the command to the wheels;
//! 2. step — consume the accumulated time in fixed `1/60 s` substeps
//!    (bounded; see [`MAX_SUBSTEPS_PER_TICK`]), running the wheel model
//!    before each physics step;
//! 3. sync — copy body transforms into the visual entities, then the cached
//!    wheel transforms.
//!
//! Sync always runs after stepping, so the scene is never a frame stale.

use log::{debug, warn};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use crate::constants::{FIXED_TIMESTEP_S, MAX_SUBSTEPS_PER_TICK};
use crate::control::{integrate_drive, ActionState, InputMap};
use crate::error::{Error, Result};
use crate::scene::{BoxParams, EntityId, ProjectileParams, Scene, VisualEntity};
use crate::vehicle::{Vehicle, VehicleConfig};
use crate::world::PhysicsWorld;

/// Index of a vehicle inside a [`Simulation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VehicleId(usize);

struct DrivenVehicle {
    vehicle: Vehicle,
    steering: f32,
}

/// The explicit simulation context. All mutation flows through `&mut self`;
/// there is no global state, so independent simulations can coexist (tests
/// rely on this).
pub struct Simulation {
    pub world: PhysicsWorld,
    pub scene: Scene,
    vehicles: Vec<DrivenVehicle>,
    actions: ActionState,
    input_map: InputMap,
    /// Unconsumed frame time, seconds. Always below `FIXED_TIMESTEP_S` after
    /// a tick unless the backlog bound dropped time.
    accumulator: f32,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            world: PhysicsWorld::new(),
            scene: Scene::new(),
            vehicles: Vec::new(),
            actions: ActionState::default(),
            input_map: InputMap::new(),
            accumulator: 0.0,
        }
    }

    /// Spawn a box into the scene. See [`Scene::spawn_box`].
    pub fn spawn_box(&mut self, params: BoxParams) -> Result<(RigidBodyHandle, EntityId)> {
        self.scene.spawn_box(&mut self.world, params)
    }

    /// Fire a projectile. See [`Scene::spawn_projectile`].
    pub fn spawn_projectile(
        &mut self,
        params: ProjectileParams,
    ) -> Result<(RigidBodyHandle, EntityId)> {
        self.scene.spawn_projectile(&mut self.world, params)
    }

    /// Spawn a vehicle and register it with the drive loop.
    pub fn add_vehicle(
        &mut self,
        config: &VehicleConfig,
        position: Vector<Real>,
        rotation: UnitQuaternion<Real>,
    ) -> Result<VehicleId> {
        let vehicle = Vehicle::spawn(&mut self.world, &mut self.scene, config, position, rotation)?;
        let id = VehicleId(self.vehicles.len());
        self.vehicles.push(DrivenVehicle {
            vehicle,
            steering: 0.0,
        });
        Ok(id)
    }

    /// Look up one vehicle; ids from a different simulation are reported,
    /// not panicked on.
    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle> {
        self.vehicles
            .get(id.0)
            .map(|d| &d.vehicle)
            .ok_or(Error::IndexOutOfRange {
                index: id.0,
                len: self.vehicles.len(),
            })
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle> {
        let len = self.vehicles.len();
        self.vehicles
            .get_mut(id.0)
            .map(|d| &mut d.vehicle)
            .ok_or(Error::IndexOutOfRange { index: id.0, len })
    }

    /// Current drive action snapshot.
    pub fn actions(&self) -> ActionState {
        self.actions
    }

    /// Forward a key press. Unbound codes are ignored.
    pub fn key_down(&mut self, code: &str) {
        self.input_map.key_down(&mut self.actions, code);
    }

    /// Forward a key release. Unbound codes are ignored.
    pub fn key_up(&mut self, code: &str) {
        self.input_map.key_up(&mut self.actions, code);
    }

    /// Advance one frame. Returns the number of fixed substeps executed.
    ///
    /// `dt` is the wall-clock frame delta in seconds. Non-finite or negative
    /// values advance nothing (the sync pass still runs).
    pub fn tick(&mut self, dt: f32) -> u32 {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        // 1. Control, once per tick per vehicle, with the speed sampled now.
        for driven in &mut self.vehicles {
            let speed = driven.vehicle.current_speed_kmh(&self.world);
            let limits = driven.vehicle.drive_limits();
            let command = integrate_drive(&self.actions, speed, driven.steering, &limits);
            driven.steering = command.steering;
            driven.vehicle.apply_drive(&command);
        }

        // 2. Fixed-timestep substeps, bounded per tick.
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= FIXED_TIMESTEP_S && substeps < MAX_SUBSTEPS_PER_TICK {
            for driven in &mut self.vehicles {
                driven.vehicle.update_wheels(&mut self.world, FIXED_TIMESTEP_S);
            }
            self.world.step(FIXED_TIMESTEP_S);
            self.accumulator -= FIXED_TIMESTEP_S;
            substeps += 1;
        }
        if self.accumulator >= FIXED_TIMESTEP_S {
            // Frame stall: drop the backlog instead of spiraling.
            warn!(
                "dropping {:.3} s of simulation backlog after {} substeps",
                self.accumulator, substeps
            );
            self.accumulator = 0.0;
        }
        if substeps > 1 {
            debug!("tick consumed {substeps} substeps (dt = {dt:.4} s)");
        }

        // 3. Sync, always after stepping. Wheel poses are re-anchored to the
        // post-step chassis first so they never trail the hull.
        self.scene.sync_transforms(&self.world.bodies);
        for driven in &mut self.vehicles {
            driven.vehicle.refresh_wheel_poses(&self.world);
            driven.vehicle.sync_wheel_entities(&mut self.scene);
        }

        substeps
    }

    /// Render-side view of one entity.
    pub fn entity(&self, id: EntityId) -> Result<&VisualEntity> {
        self.scene.entity(id)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FIXED_TIMESTEP_S;

    #[test]
    fn small_dt_accumulates_until_a_substep_fits() {
        let mut sim = Simulation::new();

        // Half a substep: nothing runs, time is banked.
        assert_eq!(sim.tick(FIXED_TIMESTEP_S / 2.0), 0);
        // Second half: exactly one substep.
        assert_eq!(sim.tick(FIXED_TIMESTEP_S / 2.0), 1);
    }

    #[test]
    fn substeps_per_tick_are_bounded() {
        let mut sim = Simulation::new();

        // A two-second stall would need 120 substeps; the bound caps it and
        // the rest of the backlog is dropped.
        assert_eq!(sim.tick(2.0), MAX_SUBSTEPS_PER_TICK);
        // The dropped backlog does not leak into the next tick.
        assert_eq!(sim.tick(0.0), 0);
    }

    #[test]
    fn invalid_dt_advances_nothing() {
        let mut sim = Simulation::new();

        assert_eq!(sim.tick(-1.0), 0);
        assert_eq!(sim.tick(f32::NAN), 0);
        assert_eq!(sim.tick(f32::INFINITY), 0);
    }

    #[test]
    fn vehicle_id_from_another_simulation_is_reported() {
        let mut populated = Simulation::new();
        let foreign = populated
            .add_vehicle(
                &crate::vehicle::VehicleConfig::car(),
                vector![0.0, 1.0, 0.0],
                UnitQuaternion::identity(),
            )
            .unwrap();

        let empty = Simulation::new();
        let err = empty.vehicle(foreign).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn keys_flow_into_the_action_state() {
        let mut sim = Simulation::new();

        sim.key_down("KeyW");
        sim.key_down("ArrowUp"); // unbound, ignored
        assert!(sim.actions().acceleration);
        assert!(!sim.actions().left);

        sim.key_up("KeyW");
        assert!(!sim.actions().acceleration);
    }
}
