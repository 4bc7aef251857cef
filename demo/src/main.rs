//! Headless demo driver: builds the stock scene (floor, ramp, box wall,
//! vehicle), feeds a scripted key sequence, and runs the frame loop on wall
//! clock time.
//!
//! No rendering — the simulation is exercised end to end and a speedometer
//! line is logged once per second, the way a HUD would display it.
//!
//! ```sh
//! cargo run -p demo -- --preset tank --seconds 20
//! ```

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use log::info;
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use sim::{BoxParams, ProjectileParams, Simulation, VehicleConfig, VehicleId};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Car,
    Tank,
}

#[derive(Parser)]
#[command(about = "Headless tank/car driving demo")]
struct Args {
    /// Which vehicle preset to drive.
    #[arg(long, value_enum, default_value = "tank")]
    preset: Preset,

    /// How long to run, in wall-clock seconds.
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,
}

/// One scripted input event: at `at` seconds, press or release `code`.
struct KeyEvent {
    at: f32,
    code: &'static str,
    down: bool,
}

/// Roughly: drive forward over the ramp, swerve, brake, reverse.
const SCRIPT: &[KeyEvent] = &[
    KeyEvent { at: 1.0, code: "KeyW", down: true },
    KeyEvent { at: 6.0, code: "KeyA", down: true },
    KeyEvent { at: 8.0, code: "KeyA", down: false },
    KeyEvent { at: 9.0, code: "KeyD", down: true },
    KeyEvent { at: 11.0, code: "KeyD", down: false },
    KeyEvent { at: 14.0, code: "KeyW", down: false },
    KeyEvent { at: 14.0, code: "KeyS", down: true },
    KeyEvent { at: 18.0, code: "KeyS", down: false },
];

/// Floor, ramp, and a wall of stacked crates in front of the spawn point.
fn build_scene(sim: &mut Simulation, preset: Preset) -> VehicleId {
    // Ground: high-friction slab, top face at y = 0.
    let mut floor = BoxParams::new(vector![0.0, -0.5, 0.0], vector![75.0, 1.0, 75.0], 0.0);
    floor.friction = 2.0;
    sim.spawn_box(floor).expect("floor");

    // Jump ramp: a tilted static box, mostly buried.
    let mut ramp = BoxParams::new(vector![0.0, -1.5, 0.0], vector![8.0, 4.0, 10.0], 0.0);
    ramp.rotation = UnitQuaternion::from_axis_angle(&Vector::x_axis(), -PI / 18.0);
    sim.spawn_box(ramp).expect("ramp");

    // Crate wall: 10 x 5 grid of 5 m cubes.
    let size = 5.0;
    let (nw, nh) = (10, 5);
    for j in 0..nw {
        for i in 0..nh {
            let x = size * j as f32 - size * (nw - 1) as f32 / 2.0;
            let y = size * i as f32;
            sim.spawn_box(BoxParams::new(
                vector![x, y, 10.0],
                vector![size, size, size],
                10.0,
            ))
            .expect("crate");
        }
    }

    let (config, spawn_y) = match preset {
        Preset::Car => (VehicleConfig::car(), 1.0),
        Preset::Tank => (VehicleConfig::tank(), 1.7),
    };
    sim.add_vehicle(&config, vector![0.0, spawn_y, -10.0], UnitQuaternion::identity())
        .expect("vehicle")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut sim = Simulation::new();
    let vehicle = build_scene(&mut sim, args.preset);
    info!(
        "scene ready: {} entities, preset {:?}",
        sim.scene.entities().len(),
        args.preset
    );

    let start = Instant::now();
    let mut last_frame = start;
    let mut next_log = Duration::from_secs(1);
    let mut script_cursor = 0;
    let mut fired = false;

    while start.elapsed().as_secs_f32() < args.seconds {
        let now = Instant::now();
        let dt = (now - last_frame).as_secs_f32();
        last_frame = now;

        let elapsed = start.elapsed().as_secs_f32();
        while script_cursor < SCRIPT.len() && SCRIPT[script_cursor].at <= elapsed {
            let event = &SCRIPT[script_cursor];
            if event.down {
                sim.key_down(event.code);
            } else {
                sim.key_up(event.code);
            }
            script_cursor += 1;
        }

        // One shot at the crate wall, halfway through the drive.
        if !fired && elapsed > 4.0 {
            fired = true;
            let (pos, rot) = sim.vehicle(vehicle).expect("vehicle").chassis_transform(&sim.world);
            let muzzle = pos + rot * vector![0.0, 2.0, 4.0];
            sim.spawn_projectile(ProjectileParams {
                origin: muzzle,
                direction: rot * Vector::z(),
                speed: 150.0,
                radius: 0.325,
                mass: 17.0,
            })
            .expect("projectile");
            info!("fired projectile");
        }

        sim.tick(dt);

        if start.elapsed() >= next_log {
            next_log += Duration::from_secs(1);
            let speed = sim.vehicle(vehicle).expect("vehicle").current_speed_kmh(&sim.world);
            let (pos, _) = sim.vehicle(vehicle).expect("vehicle").chassis_transform(&sim.world);
            info!(
                "{}{:.1} km/h at ({:.1}, {:.1}, {:.1})",
                if speed < 0.0 { "(R) " } else { "" },
                speed.abs(),
                pos.x,
                pos.y,
                pos.z
            );
        }

        // ~60 fps pacing.
        std::thread::sleep(Duration::from_millis(16));
    }

    info!("done after {:.1} s", start.elapsed().as_secs_f32());
}
