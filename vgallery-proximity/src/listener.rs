//! Adapters turning proximity events into UI state.

use crate::transition::ProximityEvent;
use serde::Serialize;
use std::collections::BTreeMap;
use vgallery_core::{Payload, ThingId};

pub trait ProximityListener {
    fn on_enter(&mut self, id: ThingId, payload: &Payload);
    fn on_exit(&mut self, id: ThingId, payload: &Payload);
}

/// Records every event, in order.
impl ProximityListener for Vec<ProximityEvent> {
    fn on_enter(&mut self, id: ThingId, payload: &Payload) {
        self.push(ProximityEvent::Enter { id, payload: payload.clone() });
    }

    fn on_exit(&mut self, id: ThingId, payload: &Payload) {
        self.push(ProximityEvent::Exit { id, payload: payload.clone() });
    }
}

impl<L: ProximityListener + ?Sized> ProximityListener for &mut L {
    fn on_enter(&mut self, id: ThingId, payload: &Payload) {
        (**self).on_enter(id, payload);
    }

    fn on_exit(&mut self, id: ThingId, payload: &Payload) {
        (**self).on_exit(id, payload);
    }
}

/// Fan out to two listeners.
impl<A: ProximityListener, B: ProximityListener> ProximityListener for (A, B) {
    fn on_enter(&mut self, id: ThingId, payload: &Payload) {
        self.0.on_enter(id, payload);
        self.1.on_enter(id, payload);
    }

    fn on_exit(&mut self, id: ThingId, payload: &Payload) {
        self.0.on_exit(id, payload);
        self.1.on_exit(id, payload);
    }
}

/// Displayed description and active audio source.
#[derive(Debug, Clone, Serialize)]
pub struct MediaState {
    pub description: String,
    pub audio_source: String,
    #[serde(skip)]
    default_audio: String,
}

impl MediaState {
    pub fn new(default_audio: impl Into<String>) -> Self {
        let default_audio = default_audio.into();
        Self { description: String::new(), audio_source: default_audio.clone(), default_audio }
    }
}

impl ProximityListener for MediaState {
    fn on_enter(&mut self, _id: ThingId, payload: &Payload) {
        if let Some(caption) = &payload.caption {
            self.description = caption.clone();
        }
        if let Some(audio) = &payload.audio {
            self.audio_source = audio.clone();
        }
    }

    fn on_exit(&mut self, _id: ThingId, payload: &Payload) {
        if payload.caption.is_some() {
            self.description.clear();
        }
        if payload.audio.is_some() {
            self.audio_source = self.default_audio.clone();
        }
    }
}

/// Which targets are currently seen.
#[derive(Debug, Clone, Default)]
pub struct VisibilityFlags {
    flags: BTreeMap<ThingId, bool>,
}

impl VisibilityFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, id: ThingId) -> bool {
        self.flags.get(&id).copied().unwrap_or(false)
    }

    pub fn visible(&self) -> impl Iterator<Item = ThingId> + '_ {
        self.flags.iter().filter(|(_, v)| **v).map(|(id, _)| *id)
    }
}

impl ProximityListener for VisibilityFlags {
    fn on_enter(&mut self, id: ThingId, _payload: &Payload) {
        self.flags.insert(id, true);
    }

    fn on_exit(&mut self, id: ThingId, _payload: &Payload) {
        self.flags.insert(id, false);
    }
}
