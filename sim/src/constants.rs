/// World gravity along -Y (meters per second squared).
pub const GRAVITY_MPS2: f32 = -9.82;

/// Fallback contact friction for bodies spawned with zero/unset friction.
///
/// Zero-friction contacts make boxes slide forever and wheels spin in place,
/// so an unset value is a defaulting policy, not an error.
pub const DEFAULT_FRICTION: f32 = 1.0;

/// Fixed physics substep length (seconds).
pub const FIXED_TIMESTEP_S: f32 = 1.0 / 60.0;

/// Upper bound on physics substeps consumed by a single frame tick.
///
/// A frame-rate stall therefore costs at most `MAX_SUBSTEPS_PER_TICK` substeps
/// of catch-up work; any backlog beyond that is dropped. This trades a small
/// amount of wall-clock accuracy for a bounded per-tick cost.
pub const MAX_SUBSTEPS_PER_TICK: u32 = 10;

/// Speed deadband (km/h) separating "rolling" from "effectively stopped"
/// in the drive control law.
pub const SPEED_DEADBAND_KMH: f32 = 1.0;

/// Meters-per-second to kilometers-per-hour.
pub const MPS_TO_KMH: f32 = 3.6;
