//! Rigid-body world backed by rapier3d.
//!
//! Bodies are shared handles mirroring the rapier state. Once a body is added
//! the world steps it every `fixed_step`; the owning thing keeps its handle to
//! read the transform back. Writes to a handle between steps (teleports,
//! impulses, velocity tweaks) are pushed into rapier before the next step.

use crate::panel::Tunable;
use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude as rapier;
use std::cell::RefCell;
use std::rc::Rc;

pub type BodyRef = Rc<RefCell<RigidBody>>;

/// Default step, matching a 60 Hz animation frame.
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Infinite horizontal plane through the body position, facing +Y.
    Plane,
}

impl Shape {
    fn collider(&self) -> rapier::ColliderBuilder {
        match *self {
            Shape::Sphere { radius } => rapier::ColliderBuilder::ball(radius),
            Shape::Box { half_extents } => {
                rapier::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape::Plane => rapier::ColliderBuilder::halfspace(rapier::Vector::y_axis()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Zero mass means static
    pub mass: f32,
    pub shape: Shape,
    /// Fraction of velocity lost per second
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
    pub lock_rotations: bool,
}

impl RigidBody {
    pub fn dynamic(mass: f32, shape: Shape) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            shape,
            linear_damping: 0.01,
            angular_damping: 0.01,
            friction: 0.5,
            lock_rotations: false,
        }
    }

    pub fn fixed(shape: Shape) -> Self {
        Self::dynamic(0.0, shape)
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Keep the body upright: it translates but never spins.
    pub fn upright(mut self) -> Self {
        self.lock_rotations = true;
        self
    }

    pub fn into_ref(self) -> BodyRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// Instant change of momentum through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity += impulse / self.mass;
    }

    fn to_rapier(&self) -> (rapier::RigidBody, rapier::Collider) {
        let builder = if self.is_static() {
            rapier::RigidBodyBuilder::fixed()
        } else {
            rapier::RigidBodyBuilder::dynamic()
                .linvel(to_vector(self.velocity))
                .angvel(to_vector(self.angular_velocity))
                .linear_damping(damping_rate(self.linear_damping))
                .angular_damping(damping_rate(self.angular_damping))
                .ccd_enabled(true)
        };
        let builder = builder.position(to_isometry(self.position, self.orientation));
        let builder = if self.lock_rotations { builder.lock_rotations() } else { builder };

        let mut collider = self.shape.collider().friction(self.friction);
        if !self.is_static() {
            collider = collider.mass(self.mass);
        }
        (builder.build(), collider.build())
    }
}

/// Per-second velocity loss expressed as rapier's damping coefficient.
fn damping_rate(fraction: f32) -> f32 {
    -(1.0 - fraction.clamp(0.0, 0.999)).ln()
}

fn to_vector(v: Vec3) -> rapier::Vector<f32> {
    rapier::Vector::new(v.x, v.y, v.z)
}

fn from_vector(v: &rapier::Vector<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(position: Vec3, orientation: Quat) -> rapier::Isometry<f32> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        orientation.w,
        orientation.x,
        orientation.y,
        orientation.z,
    ));
    rapier::Isometry::from_parts(rapier::Translation::new(position.x, position.y, position.z), rotation)
}

/// Motion state last exchanged with rapier, used to spot writes to a handle.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    position: Vec3,
    orientation: Quat,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl Motion {
    fn of(body: &RigidBody) -> Self {
        Self {
            position: body.position,
            orientation: body.orientation,
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
        }
    }
}

struct Slot {
    body: BodyRef,
    handle: rapier::RigidBodyHandle,
    synced: Motion,
}

pub struct PhysicsWorld {
    slots: Vec<Slot>,
    /// Vertical gravity, tunable from a parameter panel
    gravity: Tunable<f32>,
    integration_params: rapier::IntegrationParameters,
    pipeline: rapier::PhysicsPipeline,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
}

impl PhysicsWorld {
    pub fn new(gravity_y: f32) -> Self {
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = DEFAULT_TIME_STEP;

        Self {
            slots: Vec::new(),
            gravity: Tunable::new(gravity_y),
            integration_params,
            pipeline: rapier::PhysicsPipeline::new(),
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
        }
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.integration_params.dt = time_step;
        self
    }

    pub fn gravity(&self) -> &Tunable<f32> {
        &self.gravity
    }

    pub fn time_step(&self) -> f32 {
        self.integration_params.dt
    }

    /// Insert a body. Adding one that is already present does nothing.
    pub fn add_body(&mut self, body: &BodyRef) {
        if self.contains(body) {
            return;
        }
        let mirror = body.borrow();
        let (rigid_body, collider) = mirror.to_rapier();
        let handle = self.bodies.insert(rigid_body);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.slots.push(Slot { body: Rc::clone(body), handle, synced: Motion::of(&mirror) });
    }

    /// Remove a body and its collider. Unknown bodies are ignored.
    pub fn remove_body(&mut self, body: &BodyRef) -> bool {
        let Some(index) = self.slots.iter().position(|s| Rc::ptr_eq(&s.body, body)) else {
            return false;
        };
        let slot = self.slots.remove(index);
        self.bodies.remove(
            slot.handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    pub fn contains(&self, body: &BodyRef) -> bool {
        self.slots.iter().any(|s| Rc::ptr_eq(&s.body, body))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Advance the simulation by one fixed time step.
    pub fn fixed_step(&mut self) {
        self.push_writes();

        let gravity = rapier::Vector::new(0.0, self.gravity.get(), 0.0);
        self.pipeline.step(
            &gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        self.pull_motion();
    }

    fn push_writes(&mut self) {
        for slot in &mut self.slots {
            let now = Motion::of(&slot.body.borrow());
            if now == slot.synced {
                continue;
            }
            let Some(rb) = self.bodies.get_mut(slot.handle) else {
                continue;
            };
            if now.position != slot.synced.position || now.orientation != slot.synced.orientation {
                rb.set_position(to_isometry(now.position, now.orientation), true);
            }
            if now.velocity != slot.synced.velocity || now.angular_velocity != slot.synced.angular_velocity {
                rb.set_linvel(to_vector(now.velocity), true);
                rb.set_angvel(to_vector(now.angular_velocity), true);
            }
            slot.synced = now;
        }
    }

    fn pull_motion(&mut self) {
        for slot in &mut self.slots {
            let mut mirror = slot.body.borrow_mut();
            if mirror.is_static() {
                continue;
            }
            let Some(rb) = self.bodies.get(slot.handle) else {
                continue;
            };
            let rotation = rb.rotation();
            mirror.position = from_vector(rb.translation());
            mirror.orientation = Quat::from_xyzw(rotation.i, rotation.j, rotation.k, rotation.w);
            mirror.velocity = from_vector(rb.linvel());
            mirror.angular_velocity = from_vector(rb.angvel());
            slot.synced = Motion::of(&mirror);
        }
    }
}
