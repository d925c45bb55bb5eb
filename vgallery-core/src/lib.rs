//! Scene-entity coordination for the gallery viewer: things, physics world,
//! scene graph, camera, input and the per-frame tick.

pub mod camera;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod input;
pub mod panel;
pub mod physics;
pub mod scene;
pub mod scheduler;
pub mod thing;

pub use camera::Camera;
pub use coordinator::{Coordinator, LoadResult};
pub use entity::{ThingId, ThingIds};
pub use error::{LoadError, UpdateError};
pub use geometry::{Aabb, Ray};
pub use input::{Input, InputContext};
pub use panel::{Binding, NumberBinding, PanelBoard, PanelId, ParameterHost, ParameterSpec, Range, Tunable};
pub use physics::{BodyRef, PhysicsWorld, RigidBody, Shape};
pub use scene::{NodeRef, Payload, ProximityTag, SceneGraph, SceneNode};
pub use scheduler::FrameClock;
pub use thing::{Parts, Thing, ThingBuilder, ThingRef, UpdateContext};

pub use glam::{Quat, Vec3};
