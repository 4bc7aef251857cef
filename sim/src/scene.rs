//! Rigid body factory and the physics -> render synchronization table.
//!
//! # Model
//! - A `VisualEntity` is the render-facing transform for one object. Entities
//!   live in an arena inside [`Scene`] and are addressed by [`EntityId`].
//! - A `SyncRecord` is a weak `(RigidBodyHandle, EntityId)` pairing appended
//!   at creation time. Dropping/ignoring one side never destroys the other.
//! - Once per frame, [`Scene::sync_transforms`] copies the world transform of
//!   every recorded body into its paired entity, in insertion order.
//!
//! # Defaulting policy
//! - mass `0` marks a static/immovable body: it gets a fixed Rapier body and
//!   **no** sync record (it never moves after placement).
//! - friction `<= 0` falls back to [`DEFAULT_FRICTION`] to avoid degenerate
//!   zero-friction contacts. This is documented defaulting, not an error.

use log::debug;
use nalgebra as na;
use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use crate::constants::DEFAULT_FRICTION;
use crate::error::{Error, Result};
use crate::world::PhysicsWorld;

/// Index of a [`VisualEntity`] inside a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(u32);

/// Render-side transform paired 1:1 with a physics body (or, for wheels,
/// written directly by the vehicle model).
#[derive(Clone, Copy, Debug)]
pub struct VisualEntity {
    pub translation: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
}

/// Weak association between a dynamic body and its visual entity.
///
/// Invariant: every dynamic (mass > 0) body that should visually move has
/// exactly one record; static bodies have none.
#[derive(Clone, Copy, Debug)]
pub struct SyncRecord {
    pub body: RigidBodyHandle,
    pub entity: EntityId,
}

/// Parameters for spawning one axis-aligned box body + visual pair.
///
/// `dimensions` are full extents in meters (halved internally for the cuboid
/// collider, matching the render mesh convention).
#[derive(Clone, Copy, Debug)]
pub struct BoxParams {
    pub translation: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub dimensions: Vector<Real>,
    /// Mass in kilograms. `0.0` marks a static body.
    pub mass: f32,
    /// Contact friction; `<= 0.0` selects the default.
    pub friction: f32,
}

impl BoxParams {
    /// Axis-aligned box at `translation` with identity rotation and default friction.
    pub fn new(translation: Vector<Real>, dimensions: Vector<Real>, mass: f32) -> Self {
        Self {
            translation,
            rotation: UnitQuaternion::identity(),
            dimensions,
            mass,
            friction: 0.0,
        }
    }
}

/// Parameters for spawning a fired projectile (dynamic ball with an initial
/// linear velocity along the fire direction).
#[derive(Clone, Copy, Debug)]
pub struct ProjectileParams {
    pub origin: Vector<Real>,
    /// Fire direction; does not need to be normalized, but must be nonzero.
    pub direction: Vector<Real>,
    /// Muzzle speed in meters per second.
    pub speed: f32,
    pub radius: f32,
    pub mass: f32,
}

/// Entity arena plus the ordered sync table.
#[derive(Default)]
pub struct Scene {
    entities: Vec<VisualEntity>,
    sync: Vec<SyncRecord>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a render transform and return its id.
    pub fn add_entity(
        &mut self,
        translation: Vector<Real>,
        rotation: UnitQuaternion<Real>,
    ) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(VisualEntity {
            translation,
            rotation,
        });
        id
    }

    /// Look up one entity; ids from a different scene are reported, not
    /// panicked on.
    pub fn entity(&self, id: EntityId) -> Result<&VisualEntity> {
        self.entities
            .get(id.0 as usize)
            .ok_or(Error::IndexOutOfRange {
                index: id.0 as usize,
                len: self.entities.len(),
            })
    }

    pub fn entities(&self) -> &[VisualEntity] {
        &self.entities
    }

    /// Overwrite one entity's transform. Used by the vehicle model for wheel
    /// poses, which have no rigid body of their own.
    pub fn set_entity_transform(
        &mut self,
        id: EntityId,
        translation: Vector<Real>,
        rotation: UnitQuaternion<Real>,
    ) {
        let entity = &mut self.entities[id.0 as usize];
        entity.translation = translation;
        entity.rotation = rotation;
    }

    /// Pair a body with an entity for per-frame transform copying.
    pub fn add_sync_record(&mut self, body: RigidBodyHandle, entity: EntityId) {
        self.sync.push(SyncRecord { body, entity });
    }

    pub fn sync_records(&self) -> &[SyncRecord] {
        &self.sync
    }

    /// Copy the current world transform of every recorded body into its
    /// paired visual entity.
    ///
    /// A record whose body is missing (no valid transform this tick) is a
    /// benign skip: the entity keeps its previous transform and the copy is
    /// retried next tick.
    pub fn sync_transforms(&mut self, bodies: &RigidBodySet) {
        for record in &self.sync {
            let Some(body) = bodies.get(record.body) else {
                continue;
            };

            let entity = &mut self.entities[record.entity.0 as usize];
            entity.translation = *body.translation();
            entity.rotation = *body.rotation();
        }
    }

    /// Build one box body + collider + visual entity.
    ///
    /// Behavior
    /// - `mass < 0` or non-finite -> [`Error::InvalidParameter`].
    /// - non-positive dimensions -> [`Error::InvalidParameter`].
    /// - `mass == 0` -> fixed body, no sync record (zero inertia / immovable).
    /// - `mass > 0` -> dynamic body with the collider mass set explicitly
    ///   (local inertia derived from the shape), one sync record appended.
    pub fn spawn_box(
        &mut self,
        world: &mut PhysicsWorld,
        params: BoxParams,
    ) -> Result<(RigidBodyHandle, EntityId)> {
        if !params.mass.is_finite() || params.mass < 0.0 {
            return Err(Error::invalid_parameter(format!(
                "box mass must be >= 0, got {}",
                params.mass
            )));
        }
        let d = params.dimensions;
        if !(d.x > 0.0 && d.y > 0.0 && d.z > 0.0) {
            return Err(Error::invalid_parameter(format!(
                "box dimensions must be positive, got {:?}",
                (d.x, d.y, d.z)
            )));
        }

        let friction = if params.friction > 0.0 {
            params.friction
        } else {
            DEFAULT_FRICTION
        };

        let iso = na::Isometry3::from_parts(Translation3::from(params.translation), params.rotation);
        let body = if params.mass > 0.0 {
            RigidBodyBuilder::dynamic().pose(iso).build()
        } else {
            RigidBodyBuilder::fixed().pose(iso).build()
        };
        let handle = world.bodies.insert(body);

        let mut collider = ColliderBuilder::cuboid(d.x * 0.5, d.y * 0.5, d.z * 0.5).friction(friction);
        if params.mass > 0.0 {
            collider = collider.mass(params.mass);
        }
        world
            .colliders
            .insert_with_parent(collider.build(), handle, &mut world.bodies);
        world.update_collision_structures();

        let entity = self.add_entity(params.translation, params.rotation);
        if params.mass > 0.0 {
            self.add_sync_record(handle, entity);
        }

        debug!(
            "spawned box: dims=({:.2},{:.2},{:.2}) mass={} friction={} dynamic={}",
            d.x,
            d.y,
            d.z,
            params.mass,
            friction,
            params.mass > 0.0
        );

        Ok((handle, entity))
    }

    /// Fire a projectile: a dynamic ball spawned at `origin` with linear
    /// velocity `direction * speed`, CCD enabled so fast shots don't tunnel
    /// through thin obstacles.
    pub fn spawn_projectile(
        &mut self,
        world: &mut PhysicsWorld,
        params: ProjectileParams,
    ) -> Result<(RigidBodyHandle, EntityId)> {
        if !(params.radius > 0.0) {
            return Err(Error::invalid_parameter(format!(
                "projectile radius must be positive, got {}",
                params.radius
            )));
        }
        if !params.mass.is_finite() || params.mass <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "projectile mass must be > 0, got {}",
                params.mass
            )));
        }
        let dir_norm = params.direction.norm();
        if dir_norm <= 1.0e-6 {
            return Err(Error::invalid_parameter(
                "projectile direction must be nonzero",
            ));
        }

        let linvel = params.direction * (params.speed / dir_norm);
        let iso = na::Isometry3::from_parts(
            Translation3::from(params.origin),
            UnitQuaternion::identity(),
        );
        let body = RigidBodyBuilder::dynamic()
            .pose(iso)
            .linvel(linvel)
            .ccd_enabled(true)
            .build();
        let handle = world.bodies.insert(body);

        let collider = ColliderBuilder::ball(params.radius)
            .mass(params.mass)
            .friction(DEFAULT_FRICTION)
            .build();
        world
            .colliders
            .insert_with_parent(collider, handle, &mut world.bodies);
        world.update_collision_structures();

        let entity = self.add_entity(params.origin, UnitQuaternion::identity());
        self.add_sync_record(handle, entity);

        Ok((handle, entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_at(y: f32, mass: f32) -> BoxParams {
        BoxParams::new(vector![0.0, y, 0.0], vector![1.0, 1.0, 1.0], mass)
    }

    #[test]
    fn negative_mass_is_rejected() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let err = scene.spawn_box(&mut world, box_at(0.0, -1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn zero_size_shape_is_rejected() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let params = BoxParams::new(vector![0.0, 0.0, 0.0], vector![0.0, 1.0, 1.0], 1.0);
        let err = scene.spawn_box(&mut world, params).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn unset_friction_defaults_to_one() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        // friction 0.0 in the params means "unset".
        let (handle, _) = scene.spawn_box(&mut world, box_at(0.0, 5.0)).unwrap();

        let body = world.bodies.get(handle).unwrap();
        let collider_handle = body.colliders()[0];
        let collider = world.colliders.get(collider_handle).unwrap();
        assert_eq!(collider.friction(), DEFAULT_FRICTION);
    }

    #[test]
    fn static_body_gets_no_sync_record() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let (handle, _) = scene.spawn_box(&mut world, box_at(-0.5, 0.0)).unwrap();

        assert!(scene.sync_records().is_empty());
        assert!(world.bodies.get(handle).unwrap().is_fixed());
    }

    #[test]
    fn dynamic_body_gets_exactly_one_sync_record() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let (handle, entity) = scene.spawn_box(&mut world, box_at(2.0, 10.0)).unwrap();

        assert_eq!(scene.sync_records().len(), 1);
        let record = scene.sync_records()[0];
        assert_eq!(record.body, handle);
        assert_eq!(record.entity, entity);
        assert!(world.bodies.get(handle).unwrap().is_dynamic());
    }

    #[test]
    fn sync_skips_missing_bodies() {
        let world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let entity = scene.add_entity(vector![1.0, 2.0, 3.0], UnitQuaternion::identity());
        // Record points at a handle that was never inserted.
        scene.add_sync_record(RigidBodyHandle::invalid(), entity);

        scene.sync_transforms(&world.bodies);
        assert_eq!(
            scene.entity(entity).unwrap().translation,
            vector![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn entity_id_from_another_scene_is_reported() {
        let mut other = Scene::new();
        other.add_entity(vector![0.0, 0.0, 0.0], UnitQuaternion::identity());
        let foreign = other.add_entity(vector![0.0, 0.0, 0.0], UnitQuaternion::identity());

        let scene = Scene::new();
        let err = scene.entity(foreign).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 1, len: 0 }));
    }

    #[test]
    fn projectile_velocity_follows_fire_direction() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let params = ProjectileParams {
            origin: vector![0.0, 2.0, 0.0],
            direction: vector![0.0, 0.0, 2.0], // unnormalized on purpose
            speed: 150.0,
            radius: 0.325,
            mass: 17.0,
        };
        let (handle, _) = scene.spawn_projectile(&mut world, params).unwrap();

        let body = world.bodies.get(handle).unwrap();
        let v = body.linvel();
        assert!((v.norm() - 150.0).abs() < 1.0e-3);
        assert!(v.z > 0.0 && v.x.abs() < 1.0e-6 && v.y.abs() < 1.0e-6);
    }

    #[test]
    fn zero_fire_direction_is_rejected() {
        let mut world = PhysicsWorld::new();
        let mut scene = Scene::new();

        let params = ProjectileParams {
            origin: vector![0.0, 2.0, 0.0],
            direction: vector![0.0, 0.0, 0.0],
            speed: 150.0,
            radius: 0.325,
            mass: 17.0,
        };
        assert!(scene.spawn_projectile(&mut world, params).is_err());
    }
}
