//! The scene-entity coordinator: single authority over which things exist and the
//! fixed per-frame tick.

use crate::camera::Camera;
use crate::entity::ThingIds;
use crate::error::LoadError;
use crate::input::{Input, InputContext};
use crate::panel::{PanelBoard, ParameterHost, Tunable};
use crate::physics::PhysicsWorld;
use crate::scene::{SceneGraph, SceneNode};
use crate::thing::{Thing, ThingRef};
use crossbeam_channel::{Receiver, TryRecvError};
use glam::Vec3;
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Result delivered by an asynchronous load for a thing's render node.
pub type LoadResult = Result<SceneNode, LoadError>;

struct PendingLoad {
    thing: Weak<RefCell<Thing>>,
    name: String,
    rx: Receiver<LoadResult>,
}

pub struct Coordinator<H: ParameterHost = PanelBoard> {
    things: Vec<ThingRef>,
    ids: ThingIds,
    world: PhysicsWorld,
    scene: SceneGraph,
    camera: Camera,
    input: Input,
    panels: H,
    camera_target: Option<(ThingRef, Vec3)>,
    pending: Vec<PendingLoad>,
    hud_enabled: bool,
    hud: Option<Box<dyn FnMut(f32)>>,
    mouse_sensitivity: Tunable<f32>,
    pointer_locked: bool,
    frame: u64,
}

impl Coordinator<PanelBoard> {
    pub fn new(world: PhysicsWorld, camera: Camera) -> Self {
        Self::with_host(world, camera, PanelBoard::new())
    }
}

impl<H: ParameterHost> Coordinator<H> {
    pub fn with_host(world: PhysicsWorld, camera: Camera, panels: H) -> Self {
        Self {
            things: Vec::new(),
            ids: ThingIds::new(),
            world,
            scene: SceneGraph::new(),
            camera,
            input: Input::new(),
            panels,
            camera_target: None,
            pending: Vec::new(),
            hud_enabled: false,
            hud: None,
            mouse_sensitivity: Tunable::new(0.002),
            pointer_locked: false,
            frame: 0,
        }
    }

    /// Register a thing. Adding a thing that is already registered does nothing.
    pub fn add(&mut self, thing: &ThingRef) {
        if self.contains(thing) {
            return;
        }

        let mut t = thing.borrow_mut();
        let id = self.ids.allocate();
        t.id = Some(id);

        if let Some(body) = t.body() {
            self.world.add_body(body);
        }
        if let Some(object) = t.object() {
            self.scene.add(object);
        }
        if t.wants_panel() {
            let panel = self.panels.create_group(t.name(), t.parameters().to_vec(), !t.is_unremovable());
            t.panel = Some(panel);
        }
        t.install_default_sync();

        debug!("+ thing '{}' ({})", t.name(), id);
        drop(t);
        self.things.push(Rc::clone(thing));
    }

    /// Unregister a thing, detaching body, object and panel. Unknown things are ignored.
    pub fn remove(&mut self, thing: &ThingRef) -> bool {
        let Some(index) = self.things.iter().position(|t| Rc::ptr_eq(t, thing)) else {
            return false;
        };
        let removed = self.things.remove(index);
        let mut t = removed.borrow_mut();

        if let Some(body) = t.body() {
            self.world.remove_body(body);
        }
        if let Some(object) = t.object() {
            self.scene.remove(object);
        }
        if let Some(panel) = t.panel.take() {
            self.panels.destroy_group(panel);
        }
        if let Some(id) = t.id.take() {
            self.ids.release(id);
            debug!("- thing '{}' ({})", t.name(), id);
        }

        if matches!(&self.camera_target, Some((target, _)) if Rc::ptr_eq(target, thing)) {
            self.camera_target = None;
        }
        true
    }

    pub fn contains(&self, thing: &ThingRef) -> bool {
        self.things.iter().any(|t| Rc::ptr_eq(t, thing))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ThingRef> {
        self.things.iter().find(|t| t.borrow().name() == name).cloned()
    }

    pub fn things(&self) -> &[ThingRef] {
        &self.things
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Advance one frame.
    ///
    /// Order: panel remove requests and finished loads, physics step, updates in
    /// registration order, camera follow, held-key handlers, HUD.
    pub fn tick(&mut self, dt: f32) {
        self.frame += 1;
        self.apply_remove_requests();
        self.attach_loaded();

        self.world.fixed_step();

        for thing in &self.things {
            let mut t = thing.borrow_mut();
            if let Err(e) = t.update(&self.camera, dt) {
                warn!("update of '{}' failed: {}", t.name(), e);
            }
        }

        if let Some((target, offset)) = &self.camera_target {
            if let Some(position) = target.borrow().position() {
                self.camera.position = position + *offset;
            }
        }

        self.input.run_held(&mut self.camera, &mut self.hud_enabled);

        if self.hud_enabled {
            if let Some(hud) = self.hud.as_mut() {
                hud(dt);
            }
        }
    }

    fn apply_remove_requests(&mut self) {
        for panel in self.panels.take_remove_requests() {
            let target = self.things.iter().find(|t| t.borrow().panel == Some(panel)).cloned();
            if let Some(thing) = target {
                if !thing.borrow().is_unremovable() {
                    self.remove(&thing);
                }
            }
        }
    }

    /// Attach a render node that is still loading. The node is added on the first
    /// tick after it arrives, provided the thing is still registered by then.
    pub fn attach_when_ready(&mut self, thing: &ThingRef, rx: Receiver<LoadResult>) {
        let name = thing.borrow().name().to_string();
        self.pending.push(PendingLoad { thing: Rc::downgrade(thing), name, rx });
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    fn attach_loaded(&mut self) {
        for load in std::mem::take(&mut self.pending) {
            match load.rx.try_recv() {
                Ok(Ok(node)) => self.attach_node(&load, node),
                Ok(Err(e)) => warn!("loading '{}' failed: {}", load.name, e),
                Err(TryRecvError::Empty) => self.pending.push(load),
                Err(TryRecvError::Disconnected) => warn!("loader for '{}' ended without a result", load.name),
            }
        }
    }

    fn attach_node(&mut self, load: &PendingLoad, node: SceneNode) {
        let thing = match load.thing.upgrade() {
            Some(thing) if self.contains(&thing) => thing,
            _ => {
                debug!("dropping late load for removed thing '{}'", load.name);
                return;
            }
        };
        let node = node.into_ref();
        if let Some(old) = thing.borrow_mut().attach_object(Rc::clone(&node)) {
            self.scene.remove(&old);
        }
        self.scene.add(&node);
        debug!("attached loaded object to '{}'", load.name);
    }

    /// Snap the camera to this thing's position (plus `offset`) after every tick.
    pub fn set_camera_target(&mut self, thing: &ThingRef, offset: Vec3) {
        self.camera_target = Some((Rc::clone(thing), offset));
    }

    pub fn clear_camera_target(&mut self) {
        self.camera_target = None;
    }

    // --- Input ---

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn on_down(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.input.on_down(key, handler);
    }

    pub fn on_up(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.input.on_up(key, handler);
    }

    pub fn while_pressed(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.input.while_pressed(key, handler);
    }

    pub fn key_down(&mut self, key: &str) {
        self.input.key_down(key, &mut self.camera, &mut self.hud_enabled);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.key_up(key, &mut self.camera, &mut self.hud_enabled);
    }

    /// Mouse look; ignored unless the pointer is locked to the view.
    pub fn pointer_move(&mut self, dx: f32, dy: f32) {
        if self.pointer_locked {
            self.camera.look(dx, dy, self.mouse_sensitivity.get());
        }
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.pointer_locked = locked;
        if !locked {
            self.camera.reset_look();
        }
    }

    pub fn mouse_sensitivity(&self) -> &Tunable<f32> {
        &self.mouse_sensitivity
    }

    // --- HUD ---

    pub fn set_hud(&mut self, hud: impl FnMut(f32) + 'static) {
        self.hud = Some(Box::new(hud));
    }

    pub fn hud_enabled(&self) -> bool {
        self.hud_enabled
    }

    pub fn set_hud_enabled(&mut self, enabled: bool) {
        self.hud_enabled = enabled;
    }

    // --- Read access to owned state ---

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn panels(&self) -> &H {
        &self.panels
    }

    pub fn panels_mut(&mut self) -> &mut H {
        &mut self.panels
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
