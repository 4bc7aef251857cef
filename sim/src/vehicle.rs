//! Raycast-suspension vehicle model.
//!
//! The chassis is an ordinary dynamic rigid body. Wheels are *not* bodies:
//! each is a ray cast from its chassis-local connection point along
//! chassis-down. A hit feeds three impulse groups back into the chassis at the
//! contact point: suspension (spring/damper along the contact normal), drive
//! (engine/brake along the steered wheel forward), and lateral grip (cancels
//! side slip, applied toward the center of mass to limit body roll).
//!
//! Design goals
//! - Wheels never collide with anything; only the rays interact with the
//!   world. This keeps the model stable at large timesteps.
//! - All wheel forces are applied as impulses scaled by the substep length,
//!   so the model only runs at the fixed substep rate.
//! - Wheel world transforms are cached per substep and pushed to the scene
//!   during the sync pass, not recomputed at render time.

use log::debug;
use nalgebra as na;
use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use crate::constants::MPS_TO_KMH;
use crate::control::{DriveCommand, DriveLimits};
use crate::error::{Error, Result};
use crate::scene::{EntityId, Scene};
use crate::world::PhysicsWorld;

/// Chassis-local geometry and role of one wheel.
#[derive(Clone, Copy, Debug)]
pub struct WheelConfig {
    /// Suspension attachment point in chassis-local coordinates.
    pub connection_point: Vector<Real>,
    pub radius: f32,
    pub width: f32,
    /// Front wheels steer and brake at half force.
    pub is_front: bool,
    /// Driven wheels receive engine force.
    pub is_driven: bool,
}

/// Optional turret: a separate dynamic body joined to the chassis by a
/// vertical-axis revolute joint, free to swivel.
#[derive(Clone, Copy, Debug)]
pub struct TurretConfig {
    /// Full extents of the turret box, meters.
    pub dimensions: Vector<Real>,
    pub mass: f32,
    /// Joint anchor in chassis-local coordinates.
    pub chassis_pivot: Vector<Real>,
    /// Joint anchor in turret-local coordinates.
    pub turret_pivot: Vector<Real>,
}

/// Immutable construction-time description of a vehicle.
///
/// Use [`VehicleConfig::car`] or [`VehicleConfig::tank`] as starting points
/// and adjust fields before spawning; the config is validated on spawn.
#[derive(Clone, Debug)]
pub struct VehicleConfig {
    /// Full extents of the chassis box, meters.
    pub chassis_dimensions: Vector<Real>,
    pub chassis_mass: f32,

    pub max_engine_force: f32,
    pub max_breaking_force: f32,
    pub steering_increment: f32,
    pub steering_clamp: f32,

    pub suspension_stiffness: f32,
    /// Damping coefficient while the suspension is compressing.
    pub suspension_damping_compression: f32,
    /// Damping coefficient while the suspension is extending.
    pub suspension_damping_relaxation: f32,
    pub suspension_rest_length: f32,
    /// Hard ceiling on the suspension force of a single wheel, newtons.
    pub max_suspension_force: f32,

    /// Scales the available lateral grip per unit of normal force.
    pub friction_slip: f32,
    /// 0 applies lateral grip at the center of mass (no body roll),
    /// 1 applies it at the contact point (full roll).
    pub roll_influence: f32,

    pub wheels: Vec<WheelConfig>,
    pub turret: Option<TurretConfig>,
}

impl VehicleConfig {
    /// Four-wheel car: 1 x 1 x 2 m chassis, 800 kg, steered front axle,
    /// driven rear axle.
    pub fn car() -> Self {
        let wheel = |x: f32, z: f32, is_front: bool| WheelConfig {
            connection_point: vector![x, 0.3, z],
            radius: 0.4,
            width: 0.3,
            is_front,
            is_driven: !is_front,
        };
        Self {
            chassis_dimensions: vector![1.0, 1.0, 2.0],
            chassis_mass: 800.0,
            max_engine_force: 2000.0,
            max_breaking_force: 100.0,
            steering_increment: 0.04,
            steering_clamp: 0.5,
            suspension_stiffness: 20.0,
            suspension_damping_compression: 4.4,
            suspension_damping_relaxation: 2.3,
            suspension_rest_length: 0.6,
            max_suspension_force: 6000.0,
            friction_slip: 1000.0,
            roll_influence: 0.2,
            wheels: vec![
                wheel(0.7, 1.0, true),
                wheel(-0.7, 1.0, true),
                wheel(-0.7, -1.0, false),
                wheel(0.7, -1.0, false),
            ],
            turret: None,
        }
    }

    /// Six-wheel tank: 4 x 1.7 x 8 m chassis, softer suspension, driven
    /// middle and rear axles, and a swiveling turret.
    pub fn tank() -> Self {
        let wheel = |x: f32, z: f32, is_front: bool| WheelConfig {
            connection_point: vector![x, 0.2, z],
            radius: 1.0,
            width: 0.5,
            is_front,
            is_driven: !is_front,
        };
        Self {
            chassis_dimensions: vector![4.0, 1.7, 8.0],
            chassis_mass: 800.0,
            max_engine_force: 2000.0,
            max_breaking_force: 100.0,
            steering_increment: 0.04,
            steering_clamp: 0.5,
            suspension_stiffness: 10.0,
            suspension_damping_compression: 2.0,
            suspension_damping_relaxation: 2.3,
            suspension_rest_length: 0.6,
            max_suspension_force: 6000.0,
            friction_slip: 1000.0,
            roll_influence: 0.2,
            wheels: vec![
                wheel(2.23, 2.8, true),
                wheel(-2.23, 2.8, true),
                wheel(2.23, 0.0, false),
                wheel(-2.23, 0.0, false),
                wheel(-2.23, -2.8, false),
                wheel(2.23, -2.8, false),
            ],
            turret: Some(TurretConfig {
                dimensions: vector![4.0, 1.7, 2.56],
                mass: 100.0,
                chassis_pivot: vector![0.0, 3.4, 0.0],
                turret_pivot: vector![0.0, 2.0, 0.0],
            }),
        }
    }

    /// The force/steering limits consumed by the drive control law.
    pub fn drive_limits(&self) -> DriveLimits {
        DriveLimits {
            max_engine_force: self.max_engine_force,
            max_breaking_force: self.max_breaking_force,
            steering_increment: self.steering_increment,
            steering_clamp: self.steering_clamp,
        }
    }

    fn validate(&self) -> Result<()> {
        let d = self.chassis_dimensions;
        if !(d.x > 0.0 && d.y > 0.0 && d.z > 0.0) {
            return Err(Error::invalid_parameter(
                "chassis dimensions must be positive",
            ));
        }
        if !self.chassis_mass.is_finite() || self.chassis_mass <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "chassis mass must be > 0, got {}",
                self.chassis_mass
            )));
        }
        if self.wheels.is_empty() {
            return Err(Error::invalid_parameter("a vehicle needs at least one wheel"));
        }
        for (i, w) in self.wheels.iter().enumerate() {
            if !(w.radius > 0.0 && w.width > 0.0) {
                return Err(Error::invalid_parameter(format!(
                    "wheel {i}: radius and width must be positive"
                )));
            }
        }
        if !(self.suspension_rest_length > 0.0) {
            return Err(Error::invalid_parameter(
                "suspension rest length must be positive",
            ));
        }
        if self.steering_clamp < 0.0 {
            return Err(Error::invalid_parameter("steering clamp must be >= 0"));
        }
        if let Some(t) = &self.turret {
            let td = t.dimensions;
            if !(td.x > 0.0 && td.y > 0.0 && td.z > 0.0) || !(t.mass > 0.0) {
                return Err(Error::invalid_parameter(
                    "turret dimensions and mass must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Mutable per-wheel runtime state.
#[derive(Clone, Copy, Debug)]
struct Wheel {
    config: WheelConfig,
    entity: EntityId,
    steering: f32,
    engine_force: f32,
    brake_force: f32,
    /// Current spring length, `[0, rest_length]`; rest length while airborne.
    suspension_length: f32,
    /// Accumulated roll angle around the axle, radians.
    spin: f32,
    in_contact: bool,
    translation: Vector<Real>,
    rotation: UnitQuaternion<Real>,
}

#[derive(Debug)]
struct TurretParts {
    body: RigidBodyHandle,
    #[allow(dead_code)]
    entity: EntityId,
}

/// One spawned vehicle: chassis body, wheel states, optional turret.
#[derive(Debug)]
pub struct Vehicle {
    config: VehicleConfig,
    chassis: RigidBodyHandle,
    chassis_entity: EntityId,
    turret: Option<TurretParts>,
    wheels: Vec<Wheel>,
}

/// One impulse to apply to the chassis at a world-space point.
struct PendingImpulse {
    impulse: Vector<Real>,
    point: Point<Real>,
}

impl Vehicle {
    /// Build the chassis (and turret) bodies, colliders, visual entities, and
    /// wheel states at `position`/`rotation`.
    ///
    /// The chassis never sleeps: wheel rays apply impulses every substep and a
    /// sleeping chassis would ignore them.
    pub fn spawn(
        world: &mut PhysicsWorld,
        scene: &mut Scene,
        config: &VehicleConfig,
        position: Vector<Real>,
        rotation: UnitQuaternion<Real>,
    ) -> Result<Self> {
        config.validate()?;

        let iso = na::Isometry3::from_parts(Translation3::from(position), rotation);
        let chassis_body = RigidBodyBuilder::dynamic()
            .pose(iso)
            .can_sleep(false)
            .build();
        let chassis = world.bodies.insert(chassis_body);

        let d = config.chassis_dimensions;
        let chassis_collider = ColliderBuilder::cuboid(d.x * 0.5, d.y * 0.5, d.z * 0.5)
            .mass(config.chassis_mass)
            .build();
        world
            .colliders
            .insert_with_parent(chassis_collider, chassis, &mut world.bodies);

        let chassis_entity = scene.add_entity(position, rotation);
        scene.add_sync_record(chassis, chassis_entity);

        let wheels = config
            .wheels
            .iter()
            .map(|wc| {
                let translation = position + rotation * wc.connection_point;
                Wheel {
                    config: *wc,
                    entity: scene.add_entity(translation, rotation),
                    steering: 0.0,
                    engine_force: 0.0,
                    brake_force: 0.0,
                    suspension_length: config.suspension_rest_length,
                    spin: 0.0,
                    in_contact: false,
                    translation,
                    rotation,
                }
            })
            .collect();

        let turret = match &config.turret {
            Some(tc) => Some(Self::spawn_turret(world, scene, chassis, tc, position, rotation)),
            None => None,
        };
        world.update_collision_structures();

        debug!(
            "spawned vehicle: {} wheels, turret={}, chassis mass {} kg",
            config.wheels.len(),
            config.turret.is_some(),
            config.chassis_mass
        );

        Ok(Self {
            config: config.clone(),
            chassis,
            chassis_entity,
            turret,
            wheels,
        })
    }

    fn spawn_turret(
        world: &mut PhysicsWorld,
        scene: &mut Scene,
        chassis: RigidBodyHandle,
        tc: &TurretConfig,
        position: Vector<Real>,
        rotation: UnitQuaternion<Real>,
    ) -> TurretParts {
        // Place the turret so both joint anchors already coincide.
        let offset = tc.chassis_pivot - tc.turret_pivot;
        let translation = position + rotation * offset;
        let iso = na::Isometry3::from_parts(Translation3::from(translation), rotation);

        let body = RigidBodyBuilder::dynamic()
            .pose(iso)
            .can_sleep(false)
            .build();
        let handle = world.bodies.insert(body);

        let td = tc.dimensions;
        let collider = ColliderBuilder::cuboid(td.x * 0.5, td.y * 0.5, td.z * 0.5)
            .mass(tc.mass)
            .build();
        world
            .colliders
            .insert_with_parent(collider, handle, &mut world.bodies);

        // Jointed bodies must not collide with each other.
        let joint = RevoluteJointBuilder::new(Vector::y_axis())
            .local_anchor1(Point::from(tc.chassis_pivot))
            .local_anchor2(Point::from(tc.turret_pivot))
            .contacts_enabled(false)
            .build();
        world.impulse_joints.insert(chassis, handle, joint, true);

        let entity = scene.add_entity(translation, rotation);
        scene.add_sync_record(handle, entity);

        TurretParts {
            body: handle,
            entity,
        }
    }

    pub fn wheel_count(&self) -> usize {
        self.wheels.len()
    }

    pub fn chassis_body(&self) -> RigidBodyHandle {
        self.chassis
    }

    pub fn chassis_entity(&self) -> EntityId {
        self.chassis_entity
    }

    fn wheel(&self, index: usize) -> Result<&Wheel> {
        self.wheels.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.wheels.len(),
        })
    }

    fn wheel_mut(&mut self, index: usize) -> Result<&mut Wheel> {
        let len = self.wheels.len();
        self.wheels
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Set the engine force on one wheel for the coming substeps.
    pub fn apply_engine_force(&mut self, force: f32, wheel: usize) -> Result<()> {
        self.wheel_mut(wheel)?.engine_force = force;
        Ok(())
    }

    /// Set the brake force on one wheel for the coming substeps.
    pub fn set_brake(&mut self, force: f32, wheel: usize) -> Result<()> {
        self.wheel_mut(wheel)?.brake_force = force;
        Ok(())
    }

    /// Set the steering angle (radians, about chassis-up) on one wheel.
    pub fn set_steering(&mut self, angle: f32, wheel: usize) -> Result<()> {
        self.wheel_mut(wheel)?.steering = angle;
        Ok(())
    }

    /// Cached world transform of one wheel (updated each substep).
    pub fn wheel_transform(&self, wheel: usize) -> Result<(Vector<Real>, UnitQuaternion<Real>)> {
        let w = self.wheel(wheel)?;
        Ok((w.translation, w.rotation))
    }

    /// Whether the wheel's suspension ray hit the ground last substep.
    pub fn wheel_in_contact(&self, wheel: usize) -> Result<bool> {
        Ok(self.wheel(wheel)?.in_contact)
    }

    /// Signed speed along the chassis forward axis, km/h. Negative while
    /// reversing.
    pub fn current_speed_kmh(&self, world: &PhysicsWorld) -> f32 {
        let Some(body) = world.bodies.get(self.chassis) else {
            return 0.0;
        };
        let forward = *body.rotation() * Vector::z();
        body.linvel().dot(&forward) * MPS_TO_KMH
    }

    /// Current chassis world transform.
    pub fn chassis_transform(&self, world: &PhysicsWorld) -> (Vector<Real>, UnitQuaternion<Real>) {
        match world.bodies.get(self.chassis) {
            Some(body) => (*body.translation(), *body.rotation()),
            None => (Vector::zeros(), UnitQuaternion::identity()),
        }
    }

    /// Route one drive command to the wheels: engine force to driven wheels,
    /// brake at half force on the front axle and full force elsewhere,
    /// steering to the front axle only.
    pub fn apply_drive(&mut self, command: &DriveCommand) {
        for wheel in &mut self.wheels {
            wheel.engine_force = if wheel.config.is_driven {
                command.engine_force
            } else {
                0.0
            };
            wheel.brake_force = if wheel.config.is_front {
                command.breaking_force / 2.0
            } else {
                command.breaking_force
            };
            wheel.steering = if wheel.config.is_front {
                command.steering
            } else {
                0.0
            };
        }
    }

    /// Run one substep of the wheel model: cast the suspension rays, then
    /// apply suspension, drive, and lateral-grip impulses to the chassis.
    ///
    /// Must be called *before* the corresponding `world.step(dt)` so the
    /// impulses are integrated in the same substep.
    pub fn update_wheels(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let Some(chassis) = world.bodies.get(self.chassis) else {
            return;
        };
        let chassis_t = *chassis.translation();
        let chassis_r = *chassis.rotation();
        let com = *chassis.center_of_mass();
        let up = chassis_r * Vector::y();
        let down = -up;

        let cfg = &self.config;
        let rest = cfg.suspension_rest_length;
        let mass_share = cfg.chassis_mass / self.wheels.len() as f32;

        // Wheel rays must not hit the vehicle's own bodies.
        let turret_body = self.turret.as_ref().map(|t| t.body);
        let predicate = |_: ColliderHandle, collider: &Collider| match turret_body {
            Some(t) => collider.parent() != Some(t),
            None => true,
        };
        let filter = QueryFilter::default()
            .exclude_rigid_body(self.chassis)
            .predicate(&predicate);

        // Phase 1: immutable — cast rays, compute impulses, update wheel
        // state. The query pipeline borrows the world, so nothing is applied
        // yet.
        let mut pending: Vec<PendingImpulse> = Vec::with_capacity(self.wheels.len() * 3);
        {
            let query = world.query_pipeline(filter);

            for wheel in &mut self.wheels {
                let ray_origin = chassis_t + chassis_r * wheel.config.connection_point;
                let max_length = rest + wheel.config.radius;
                let ray = Ray::new(Point::from(ray_origin), down);

                let Some((_, hit)) = query.cast_ray_and_get_normal(&ray, max_length, true)
                else {
                    // Airborne: hang at full extension, keep rolling visually.
                    wheel.in_contact = false;
                    wheel.suspension_length = rest;
                    wheel.update_transform(ray_origin, down, chassis_r, rest);
                    continue;
                };

                let distance = hit.time_of_impact;
                let contact = Point::from(ray_origin + down * distance);
                let mut normal = hit.normal;
                if normal.dot(&down) > 0.0 {
                    normal = -normal;
                }

                wheel.in_contact = true;
                wheel.suspension_length =
                    (distance - wheel.config.radius).clamp(0.0, rest);
                let compression = rest - wheel.suspension_length;

                // 1. Suspension spring/damper along the contact normal.
                // The 1/(n . ray) factor keeps the effective spring rate
                // constant on slopes.
                let denom = normal.dot(&down);
                let inv_contact_dot = if denom < -0.1 { -1.0 / denom } else { 10.0 };

                let contact_vel = chassis.velocity_at_point(&contact);
                let rel_vel = normal.dot(&contact_vel) * inv_contact_dot;
                let damping = if rel_vel < 0.0 {
                    cfg.suspension_damping_compression
                } else {
                    cfg.suspension_damping_relaxation
                };

                let spring = cfg.suspension_stiffness * compression * inv_contact_dot;
                let suspension_force = ((spring - damping * rel_vel) * cfg.chassis_mass)
                    .clamp(0.0, cfg.max_suspension_force);
                pending.push(PendingImpulse {
                    impulse: normal * suspension_force * dt,
                    point: contact,
                });

                // 2. Drive: engine and brake along the steered wheel forward,
                // projected into the contact plane.
                let steer =
                    UnitQuaternion::from_axis_angle(&Vector::y_axis(), wheel.steering);
                let forward_raw = chassis_r * (steer * Vector::z());
                let forward_in_plane = forward_raw - normal * forward_raw.dot(&normal);
                let Some(forward) = forward_in_plane.try_normalize(1.0e-6) else {
                    wheel.update_transform(ray_origin, down, chassis_r, wheel.suspension_length);
                    continue;
                };
                let side = forward.cross(&normal);

                let v_long = contact_vel.dot(&forward);
                let v_side = contact_vel.dot(&side);

                if wheel.engine_force != 0.0 {
                    pending.push(PendingImpulse {
                        impulse: forward * wheel.engine_force * dt,
                        point: contact,
                    });
                }
                if wheel.brake_force > 0.0 {
                    // Oppose longitudinal motion, but never enough to reverse
                    // it within the substep.
                    let cap = wheel.brake_force * dt;
                    let stopping = (v_long * mass_share).clamp(-cap, cap);
                    if stopping != 0.0 {
                        pending.push(PendingImpulse {
                            impulse: -forward * stopping,
                            point: contact,
                        });
                    }
                }

                // 3. Lateral grip: cancel side slip, capped by the available
                // friction. Applied above the contact point so a hard corner
                // leans the body instead of flipping it.
                let grip_cap = cfg.friction_slip * suspension_force * dt;
                let side_impulse = (-v_side * mass_share * 0.5).clamp(-grip_cap, grip_cap);
                if side_impulse != 0.0 {
                    let height = (com - contact).dot(&up);
                    let grip_point =
                        contact + up * (height * (1.0 - cfg.roll_influence));
                    pending.push(PendingImpulse {
                        impulse: side * side_impulse,
                        point: grip_point,
                    });
                }

                wheel.spin += v_long / wheel.config.radius * dt;
                wheel.update_transform(ray_origin, down, chassis_r, wheel.suspension_length);
            }
        }

        // Phase 2: mutable — apply everything to the chassis.
        if let Some(chassis) = world.bodies.get_mut(self.chassis) {
            for p in pending {
                chassis.apply_impulse_at_point(p.impulse, p.point, true);
            }
        }
    }

    /// Recompute the cached wheel poses from the chassis transform as it is
    /// *now*, keeping the spring lengths measured by the last ray cast.
    ///
    /// `update_wheels` caches poses from the pre-step chassis; calling this
    /// after stepping re-anchors the hubs so wheels never trail the hull.
    pub fn refresh_wheel_poses(&mut self, world: &PhysicsWorld) {
        let Some(chassis) = world.bodies.get(self.chassis) else {
            return;
        };
        let chassis_t = *chassis.translation();
        let chassis_r = *chassis.rotation();
        let down = -(chassis_r * Vector::y());

        for wheel in &mut self.wheels {
            let ray_origin = chassis_t + chassis_r * wheel.config.connection_point;
            wheel.update_transform(ray_origin, down, chassis_r, wheel.suspension_length);
        }
    }

    /// Push the cached wheel transforms into the scene. Called during the
    /// sync pass, after stepping.
    pub fn sync_wheel_entities(&self, scene: &mut Scene) {
        for wheel in &self.wheels {
            scene.set_entity_transform(wheel.entity, wheel.translation, wheel.rotation);
        }
    }

    /// Limits derived from this vehicle's config, for the control law.
    pub fn drive_limits(&self) -> DriveLimits {
        self.config.drive_limits()
    }
}

impl Wheel {
    /// Cache the wheel's world pose: hub at the current spring length along
    /// the ray, orientation = chassis * steering * axle spin.
    fn update_transform(
        &mut self,
        ray_origin: Vector<Real>,
        down: Vector<Real>,
        chassis_rotation: UnitQuaternion<Real>,
        suspension_length: f32,
    ) {
        let steer = UnitQuaternion::from_axis_angle(&Vector::y_axis(), self.steering);
        let roll = UnitQuaternion::from_axis_angle(&Vector::x_axis(), self.spin);
        self.translation = ray_origin + down * suspension_length;
        self.rotation = chassis_rotation * steer * roll;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BoxParams;

    fn spawn_car(world: &mut PhysicsWorld, scene: &mut Scene, y: f32) -> Vehicle {
        Vehicle::spawn(
            world,
            scene,
            &VehicleConfig::car(),
            vector![0.0, y, 0.0],
            UnitQuaternion::identity(),
        )
        .unwrap()
    }

    fn spawn_floor(world: &mut PhysicsWorld, scene: &mut Scene) {
        let params = BoxParams::new(vector![0.0, -0.5, 0.0], vector![75.0, 1.0, 75.0], 0.0);
        scene.spawn_box(world, params).unwrap();
    }

    #[test]
    fn car_preset_has_steered_front_and_driven_rear() {
        let cfg = VehicleConfig::car();
        assert_eq!(cfg.wheels.len(), 4);
        for w in &cfg.wheels {
            assert_ne!(w.is_front, w.is_driven);
            assert_eq!(w.is_front, w.connection_point.z > 0.0);
        }
    }

    #[test]
    fn tank_preset_has_six_wheels_and_a_turret() {
        let cfg = VehicleConfig::tank();
        assert_eq!(cfg.wheels.len(), 6);
        assert_eq!(cfg.wheels.iter().filter(|w| w.is_driven).count(), 4);
        assert_eq!(cfg.wheels.iter().filter(|w| w.is_front).count(), 2);
        assert!(cfg.turret.is_some());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let mut cfg = VehicleConfig::car();
        cfg.chassis_mass = 0.0;
        let err = Vehicle::spawn(
            &mut world,
            &mut scene,
            &cfg,
            Vector::zeros(),
            UnitQuaternion::identity(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn spawn_creates_chassis_sync_record_and_wheel_entities() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let vehicle = spawn_car(&mut world, &mut scene, 1.0);

        // Chassis record only; wheels have no bodies to sync from.
        assert_eq!(scene.sync_records().len(), 1);
        assert_eq!(scene.sync_records()[0].body, vehicle.chassis_body());
        // Chassis entity + 4 wheel entities.
        assert_eq!(scene.entities().len(), 5);
    }

    #[test]
    fn tank_spawn_adds_turret_body_and_joint() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        Vehicle::spawn(
            &mut world,
            &mut scene,
            &VehicleConfig::tank(),
            vector![0.0, 2.0, 0.0],
            UnitQuaternion::identity(),
        )
        .unwrap();

        // Chassis + turret.
        assert_eq!(world.bodies.len(), 2);
        assert_eq!(world.impulse_joints.len(), 1);
        assert_eq!(scene.sync_records().len(), 2);
    }

    #[test]
    fn bad_wheel_index_is_reported() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();
        let mut vehicle = spawn_car(&mut world, &mut scene, 1.0);

        let err = vehicle.apply_engine_force(100.0, 9).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 9, len: 4 }));
        assert!(vehicle.wheel_transform(4).is_err());
    }

    #[test]
    fn drive_command_routing() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();
        let mut vehicle = spawn_car(&mut world, &mut scene, 1.0);

        vehicle.apply_drive(&DriveCommand {
            engine_force: 2000.0,
            breaking_force: 100.0,
            steering: 0.3,
        });

        for (i, w) in vehicle.wheels.iter().enumerate() {
            if w.config.is_front {
                assert_eq!(w.engine_force, 0.0, "front wheel {i} must not be driven");
                assert_eq!(w.brake_force, 50.0, "front brake is half force");
                assert_eq!(w.steering, 0.3);
            } else {
                assert_eq!(w.engine_force, 2000.0);
                assert_eq!(w.brake_force, 100.0);
                assert_eq!(w.steering, 0.0, "rear wheels never steer");
            }
        }
    }

    #[test]
    fn fresh_vehicle_reports_zero_speed() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();
        let vehicle = spawn_car(&mut world, &mut scene, 1.0);

        assert_eq!(vehicle.current_speed_kmh(&world), 0.0);
    }

    #[test]
    fn wheels_contact_the_floor_when_in_range() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();
        spawn_floor(&mut world, &mut scene);

        // Connection points at y = 0.9; ray length 1.0 reaches the floor.
        let mut vehicle = spawn_car(&mut world, &mut scene, 0.6);
        vehicle.update_wheels(&mut world, 1.0 / 60.0);

        for i in 0..vehicle.wheel_count() {
            assert!(vehicle.wheel_in_contact(i).unwrap());
        }
        // Compressed: spring length below rest.
        assert!(vehicle.wheels[0].suspension_length < 0.6);

        // Suspension pushes up against gravity.
        let chassis = world.bodies.get(vehicle.chassis_body()).unwrap();
        assert!(chassis.linvel().y > 0.0);
    }

    #[test]
    fn airborne_wheels_hang_at_rest_length() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let mut vehicle = spawn_car(&mut world, &mut scene, 10.0);
        vehicle.update_wheels(&mut world, 1.0 / 60.0);

        for i in 0..vehicle.wheel_count() {
            assert!(!vehicle.wheel_in_contact(i).unwrap());
        }
        let (pos, _) = vehicle.wheel_transform(0).unwrap();
        let connection = vehicle.wheels[0].config.connection_point;
        // Hub hangs rest_length below the connection point.
        assert!((pos.y - (10.0 + connection.y - 0.6)).abs() < 1.0e-5);

        // No impulses were applied.
        let chassis = world.bodies.get(vehicle.chassis_body()).unwrap();
        assert_eq!(chassis.linvel().norm(), 0.0);
    }
}
