pub mod constants;
pub mod control;
pub mod error;
pub mod scene;
pub mod simulation;
pub mod vehicle;
pub mod world;

pub use constants::{
    DEFAULT_FRICTION, FIXED_TIMESTEP_S, GRAVITY_MPS2, MAX_SUBSTEPS_PER_TICK, MPS_TO_KMH,
    SPEED_DEADBAND_KMH,
};
pub use control::{integrate_drive, Action, ActionState, DriveCommand, DriveLimits, InputMap};
pub use error::{Error, Result};
pub use scene::{BoxParams, EntityId, ProjectileParams, Scene, SyncRecord, VisualEntity};
pub use simulation::{Simulation, VehicleId};
pub use vehicle::{TurretConfig, Vehicle, VehicleConfig, WheelConfig};
pub use world::PhysicsWorld;
