//! Pure proximity logic: which targets are active, and which enter/exit events follow.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use vgallery_core::{Payload, ThingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Only the single closest target within range is active.
    NearestOne,
    /// Every target within range that the camera centre ray passes through is active.
    RayHit,
}

/// One target as measured by a poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSample {
    pub id: ThingId,
    pub distance: f32,
    pub radius: f32,
    pub ray_hit: bool,
    pub payload: Payload,
}

impl TargetSample {
    fn in_range(&self) -> bool {
        self.distance < self.radius
    }
}

pub type ActiveSet = BTreeMap<ThingId, Payload>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProximityEvent {
    Enter { id: ThingId, payload: Payload },
    Exit { id: ThingId, payload: Payload },
}

pub type Events = SmallVec<[ProximityEvent; 4]>;

/// Targets that are active under `policy`.
pub fn resolve(policy: Policy, samples: &[TargetSample]) -> ActiveSet {
    match policy {
        Policy::NearestOne => samples
            .iter()
            .filter(|s| s.in_range())
            .min_by_key(|s| OrderedFloat(s.distance))
            .map(|s| (s.id, s.payload.clone()))
            .into_iter()
            .collect(),
        Policy::RayHit => samples
            .iter()
            .filter(|s| s.in_range() && s.ray_hit)
            .map(|s| (s.id, s.payload.clone()))
            .collect(),
    }
}

/// The part of a leaving target's payload that no target in `current` still uses.
fn unshared(payload: &Payload, current: &ActiveSet) -> Payload {
    let caption = payload.caption.as_ref().filter(|c| !current.values().any(|p| p.caption.as_ref() == Some(*c)));
    let audio = payload.audio.as_ref().filter(|a| !current.values().any(|p| p.audio.as_ref() == Some(*a)));
    Payload { caption: caption.cloned(), audio: audio.cloned() }
}

/// Events for going from `previous` to `current`. Exits come first.
///
/// Targets without payload fields never produce events. An exit only carries
/// the payload fields no target in `current` shares, and is withheld when
/// nothing is left.
pub fn transitions(previous: &ActiveSet, current: &ActiveSet) -> Events {
    let mut events = Events::new();

    for (id, payload) in previous {
        if current.contains_key(id) || payload.is_empty() {
            continue;
        }
        let leaving = unshared(payload, current);
        if !leaving.is_empty() {
            events.push(ProximityEvent::Exit { id: *id, payload: leaving });
        }
    }

    for (id, payload) in current {
        if previous.contains_key(id) || payload.is_empty() {
            continue;
        }
        events.push(ProximityEvent::Enter { id: *id, payload: payload.clone() });
    }

    events
}
