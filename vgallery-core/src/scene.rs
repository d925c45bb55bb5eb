//! Render scene graph as plain data: nodes with transforms and optional proximity tags.

use crate::geometry::{Aabb, Ray};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

pub type NodeRef = Rc<RefCell<SceneNode>>;

/// What a proximity target hands to listeners when the avatar comes near.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload {
    pub caption: Option<String>,
    pub audio: Option<String>,
}

impl Payload {
    pub fn caption(caption: impl Into<String>) -> Self {
        Self { caption: Some(caption.into()), audio: None }
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.audio.is_none()
    }
}

/// Out-of-band metadata marking a node as a proximity target.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityTag {
    pub radius: f32,
    /// Half extents of the volume tested against the camera ray. None uses a
    /// sphere of `radius` around the node.
    pub hit_extents: Option<Vec3>,
    pub payload: Payload,
    /// Trackers watching a group only see tags in it
    pub group: Option<String>,
}

impl ProximityTag {
    pub fn new(radius: f32, payload: Payload) -> Self {
        Self { radius, hit_extents: None, payload, group: None }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_hit_extents(mut self, extents: Vec3) -> Self {
        self.hit_extents = Some(extents);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    /// Width, height and depth of the unscaled geometry
    pub size: Vec3,
    pub visible: bool,
    pub tag: Option<ProximityTag>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, size: Vec3) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            size,
            visible: true,
            tag: None,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn tagged(mut self, tag: ProximityTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    /// World-space box around the scaled geometry.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_oriented(self.position, self.orientation, self.size * self.scale * 0.5)
    }

    /// Whether the ray passes through this node's hit volume.
    pub fn hit_by(&self, ray: &Ray) -> bool {
        let Some(tag) = &self.tag else {
            return self.bounds().intersect_ray(ray).is_some();
        };
        match tag.hit_extents {
            Some(extents) => Aabb::from_oriented(self.position, self.orientation, extents * self.scale)
                .intersect_ray(ray)
                .is_some(),
            None => ray.intersect_sphere(self.position, tag.radius).is_some(),
        }
    }
}

#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<NodeRef>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: &NodeRef) {
        if !self.contains(node) {
            self.nodes.push(Rc::clone(node));
        }
    }

    pub fn remove(&mut self, node: &NodeRef) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| !Rc::ptr_eq(n, node));
        before != self.nodes.len()
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.nodes.iter().any(|n| Rc::ptr_eq(n, node))
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
