//! Keyboard input mapping and the per-tick drive control law.
//!
//! Two layers, deliberately separate:
//! - [`InputMap`] translates physical key codes into [`Action`] flags on an
//!   [`ActionState`]. It runs on input events and touches nothing else.
//! - [`integrate_drive`] is a pure function from the current action snapshot,
//!   the sampled vehicle speed, and the previous steering angle to a
//!   [`DriveCommand`]. It runs exactly once per frame tick per vehicle.
//!
//! Keeping the law pure makes it trivially testable without a physics world.

use crate::constants::SPEED_DEADBAND_KMH;

/// The four drive intents a vehicle understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Acceleration,
    Braking,
    Left,
    Right,
}

/// Snapshot of which drive intents are currently held.
///
/// Mutated only by the input mapper, read once per tick by the control law.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionState {
    pub acceleration: bool,
    pub braking: bool,
    pub left: bool,
    pub right: bool,
}

impl ActionState {
    fn set(&mut self, action: Action, held: bool) {
        match action {
            Action::Acceleration => self.acceleration = held,
            Action::Braking => self.braking = held,
            Action::Left => self.left = held,
            Action::Right => self.right = held,
        }
    }
}

/// Physical-key layout: WASD, by key *position* (`KeyW` style codes), so the
/// mapping survives non-QWERTY layouts.
const KEY_BINDINGS: &[(&str, Action)] = &[
    ("KeyW", Action::Acceleration),
    ("KeyS", Action::Braking),
    ("KeyA", Action::Left),
    ("KeyD", Action::Right),
];

/// Fixed key-code to action table.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputMap;

impl InputMap {
    pub fn new() -> Self {
        Self
    }

    /// Look up the action bound to a physical key code.
    pub fn action_for(&self, code: &str) -> Option<Action> {
        KEY_BINDINGS
            .iter()
            .find(|(key, _)| *key == code)
            .map(|(_, action)| *action)
    }

    /// Set the matching flag. Unbound codes are ignored; returns whether the
    /// code was bound.
    pub fn key_down(&self, state: &mut ActionState, code: &str) -> bool {
        match self.action_for(code) {
            Some(action) => {
                state.set(action, true);
                true
            }
            None => false,
        }
    }

    /// Clear the matching flag. Unbound codes are ignored.
    pub fn key_up(&self, state: &mut ActionState, code: &str) -> bool {
        match self.action_for(code) {
            Some(action) => {
                state.set(action, false);
                true
            }
            None => false,
        }
    }
}

/// Per-vehicle force/steering limits consumed by the control law.
#[derive(Clone, Copy, Debug)]
pub struct DriveLimits {
    pub max_engine_force: f32,
    pub max_breaking_force: f32,
    pub steering_increment: f32,
    pub steering_clamp: f32,
}

/// Output of one control-law evaluation, ready to apply to the wheels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommand {
    pub engine_force: f32,
    pub breaking_force: f32,
    pub steering: f32,
}

/// Evaluate the drive control law for one tick.
///
/// Behavior
/// - Engine and braking forces start from zero every tick; only held actions
///   produce nonzero output.
/// - `acceleration` while rolling backward (speed below the deadband) brakes
///   at full force instead of fighting the motion with engine torque; forward
///   or stopped it applies full engine force.
/// - `braking` while rolling forward brakes at full force; at low speed it
///   becomes reverse gear: engine force `-max_engine_force / 2`.
/// - Steering moves by one `steering_increment` toward the held direction
///   (`left` wins over `right` when both are held); with neither held it
///   relaxes toward zero by one increment per tick and snaps to exactly zero
///   once within an increment. The result is clamped to
///   `[-steering_clamp, +steering_clamp]`.
pub fn integrate_drive(
    actions: &ActionState,
    speed_kmh: f32,
    previous_steering: f32,
    limits: &DriveLimits,
) -> DriveCommand {
    let mut engine_force = 0.0;
    let mut breaking_force = 0.0;

    if actions.acceleration {
        if speed_kmh < -SPEED_DEADBAND_KMH {
            breaking_force = limits.max_breaking_force;
        } else {
            engine_force = limits.max_engine_force;
        }
    }
    if actions.braking {
        if speed_kmh > SPEED_DEADBAND_KMH {
            breaking_force = limits.max_breaking_force;
        } else {
            engine_force = -limits.max_engine_force / 2.0;
        }
    }

    let inc = limits.steering_increment;
    let mut steering = previous_steering;
    if actions.left {
        if steering < limits.steering_clamp {
            steering += inc;
        }
    } else if actions.right {
        if steering > -limits.steering_clamp {
            steering -= inc;
        }
    } else if steering < -inc {
        steering += inc;
    } else if steering > inc {
        steering -= inc;
    } else {
        steering = 0.0;
    }
    steering = steering.clamp(-limits.steering_clamp, limits.steering_clamp);

    DriveCommand {
        engine_force,
        breaking_force,
        steering,
    }
}
