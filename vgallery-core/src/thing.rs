//! Things: the unit registered with the coordinator.
//!
//! A thing combines zero or one physics body, zero or one render node and an
//! optional per-frame update closure. The combination is fixed by [`Parts`] when
//! the thing is built, so nothing downstream has to check for optional fields.

use crate::camera::Camera;
use crate::entity::ThingId;
use crate::error::UpdateError;
use crate::panel::{PanelId, ParameterSpec};
use crate::physics::BodyRef;
use crate::scene::NodeRef;
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

pub type ThingRef = Rc<RefCell<Thing>>;

/// Everything an update closure can see for the thing being updated.
pub struct UpdateContext<'a> {
    pub id: ThingId,
    pub name: &'a str,
    pub body: Option<&'a BodyRef>,
    pub object: Option<&'a NodeRef>,
    pub camera: &'a Camera,
}

impl<'a> UpdateContext<'a> {
    pub fn body(&self) -> Result<&'a BodyRef, UpdateError> {
        self.body.ok_or(UpdateError::MissingPart("body"))
    }

    pub fn object(&self) -> Result<&'a NodeRef, UpdateError> {
        self.object.ok_or(UpdateError::MissingPart("object"))
    }
}

pub type UpdateFn = Box<dyn FnMut(&UpdateContext<'_>, f32) -> Result<(), UpdateError>>;

#[derive(Clone)]
pub enum Parts {
    Bare,
    Render(NodeRef),
    Physics(BodyRef),
    Linked { body: BodyRef, object: NodeRef },
}

pub(crate) enum Behavior {
    Idle,
    /// Copy body transform onto the object every tick
    DefaultSync,
    Custom(UpdateFn),
}

pub struct Thing {
    name: String,
    parts: Parts,
    behavior: Behavior,
    unremovable: bool,
    parameters: Vec<ParameterSpec>,
    show_panel: bool,
    pub(crate) id: Option<ThingId>,
    pub(crate) panel: Option<PanelId>,
}

impl Thing {
    pub fn builder(name: impl Into<String>) -> ThingBuilder {
        ThingBuilder {
            name: name.into(),
            body: None,
            object: None,
            update: None,
            unremovable: false,
            parameters: Vec::new(),
            show_panel: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<ThingId> {
        self.id
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn body(&self) -> Option<&BodyRef> {
        match &self.parts {
            Parts::Physics(body) | Parts::Linked { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn object(&self) -> Option<&NodeRef> {
        match &self.parts {
            Parts::Render(object) | Parts::Linked { object, .. } => Some(object),
            _ => None,
        }
    }

    pub fn is_unremovable(&self) -> bool {
        self.unremovable
    }

    pub fn panel(&self) -> Option<PanelId> {
        self.panel
    }

    pub fn has_update(&self) -> bool {
        !matches!(self.behavior, Behavior::Idle)
    }

    pub fn has_default_sync(&self) -> bool {
        matches!(self.behavior, Behavior::DefaultSync)
    }

    /// Current world position: the object's when present, else the body's.
    pub fn position(&self) -> Option<Vec3> {
        self.object()
            .map(|o| o.borrow().position)
            .or_else(|| self.body().map(|b| b.borrow().position))
    }

    pub(crate) fn wants_panel(&self) -> bool {
        self.show_panel && !self.parameters.is_empty()
    }

    pub(crate) fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub(crate) fn install_default_sync(&mut self) {
        if matches!(self.parts, Parts::Linked { .. }) && matches!(self.behavior, Behavior::Idle) {
            self.behavior = Behavior::DefaultSync;
        }
    }

    /// Give the thing a render node after the fact, returning the node it replaces.
    pub(crate) fn attach_object(&mut self, object: NodeRef) -> Option<NodeRef> {
        let (parts, replaced) = match std::mem::replace(&mut self.parts, Parts::Bare) {
            Parts::Bare => (Parts::Render(object), None),
            Parts::Render(old) => (Parts::Render(object), Some(old)),
            Parts::Physics(body) => (Parts::Linked { body, object }, None),
            Parts::Linked { body, object: old } => (Parts::Linked { body, object }, Some(old)),
        };
        self.parts = parts;
        self.install_default_sync();
        replaced
    }

    /// Run this tick's behavior.
    pub(crate) fn update(&mut self, camera: &Camera, dt: f32) -> Result<(), UpdateError> {
        let Thing { name, parts, behavior, id, .. } = self;
        match behavior {
            Behavior::Idle => Ok(()),
            Behavior::DefaultSync => {
                if let Parts::Linked { body, object } = parts {
                    let body = body.borrow();
                    let mut object = object.borrow_mut();
                    object.position = body.position;
                    object.orientation = body.orientation;
                }
                Ok(())
            }
            Behavior::Custom(update) => {
                let Some(id) = *id else {
                    return Ok(());
                };
                let (body, object) = match &*parts {
                    Parts::Bare => (None, None),
                    Parts::Render(object) => (None, Some(object)),
                    Parts::Physics(body) => (Some(body), None),
                    Parts::Linked { body, object } => (Some(body), Some(object)),
                };
                let ctx = UpdateContext { id, name: name.as_str(), body, object, camera };
                update(&ctx, dt)
            }
        }
    }
}

pub struct ThingBuilder {
    name: String,
    body: Option<BodyRef>,
    object: Option<NodeRef>,
    update: Option<UpdateFn>,
    unremovable: bool,
    parameters: Vec<ParameterSpec>,
    show_panel: bool,
}

impl ThingBuilder {
    pub fn body(mut self, body: BodyRef) -> Self {
        self.body = Some(body);
        self
    }

    pub fn object(mut self, object: NodeRef) -> Self {
        self.object = Some(object);
        self
    }

    pub fn update(
        mut self,
        update: impl FnMut(&UpdateContext<'_>, f32) -> Result<(), UpdateError> + 'static,
    ) -> Self {
        self.update = Some(Box::new(update));
        self
    }

    pub fn unremovable(mut self) -> Self {
        self.unremovable = true;
        self
    }

    pub fn parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn parameters(mut self, specs: impl IntoIterator<Item = ParameterSpec>) -> Self {
        self.parameters.extend(specs);
        self
    }

    pub fn show_panel(mut self, show: bool) -> Self {
        self.show_panel = show;
        self
    }

    pub fn build(self) -> Thing {
        let parts = match (self.body, self.object) {
            (None, None) => Parts::Bare,
            (None, Some(object)) => Parts::Render(object),
            (Some(body), None) => Parts::Physics(body),
            (Some(body), Some(object)) => Parts::Linked { body, object },
        };
        let behavior = match self.update {
            Some(update) => Behavior::Custom(update),
            None => Behavior::Idle,
        };
        Thing {
            name: self.name,
            parts,
            behavior,
            unremovable: self.unremovable,
            parameters: self.parameters,
            show_panel: self.show_panel,
            id: None,
            panel: None,
        }
    }

    pub fn into_ref(self) -> ThingRef {
        Rc::new(RefCell::new(self.build()))
    }
}
