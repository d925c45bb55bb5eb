//! Keyboard tables: one-shot down/up handlers and handlers repeated every tick while held.

use crate::camera::Camera;
use std::collections::HashMap;

/// What a key handler may touch besides the state it captured.
pub struct InputContext<'a> {
    pub key: &'a str,
    pub camera: &'a mut Camera,
    pub hud_enabled: &'a mut bool,
}

pub type KeyHandler = Box<dyn FnMut(&mut InputContext<'_>)>;

#[derive(Default)]
pub struct Input {
    on_down: HashMap<String, KeyHandler>,
    on_up: HashMap<String, KeyHandler>,
    while_pressed: HashMap<String, KeyHandler>,
    // insertion order, so repeated handlers run in press order
    held: Vec<String>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_down(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.on_down.insert(key.into(), Box::new(handler));
    }

    pub fn on_up(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.on_up.insert(key.into(), Box::new(handler));
    }

    pub fn while_pressed(&mut self, key: impl Into<String>, handler: impl FnMut(&mut InputContext<'_>) + 'static) {
        self.while_pressed.insert(key.into(), Box::new(handler));
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.iter().any(|k| k == key)
    }

    pub fn held(&self) -> &[String] {
        &self.held
    }

    pub(crate) fn key_down(&mut self, key: &str, camera: &mut Camera, hud_enabled: &mut bool) {
        if let Some(handler) = self.on_down.get_mut(key) {
            handler(&mut InputContext { key, camera: &mut *camera, hud_enabled: &mut *hud_enabled });
        }
        // Only keys with a repeat handler are tracked as held
        if self.while_pressed.contains_key(key) && !self.is_held(key) {
            self.held.push(key.to_string());
        }
    }

    pub(crate) fn key_up(&mut self, key: &str, camera: &mut Camera, hud_enabled: &mut bool) {
        if let Some(handler) = self.on_up.get_mut(key) {
            handler(&mut InputContext { key, camera: &mut *camera, hud_enabled: &mut *hud_enabled });
        }
        self.held.retain(|k| k != key);
    }

    pub(crate) fn run_held(&mut self, camera: &mut Camera, hud_enabled: &mut bool) {
        for key in &self.held {
            match self.while_pressed.get_mut(key) {
                Some(handler) => handler(&mut InputContext { key, camera: &mut *camera, hud_enabled: &mut *hud_enabled }),
                None => log::debug!("unhandled pressed key {}", key),
            }
        }
    }
}
