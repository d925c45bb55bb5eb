use crate::listener::ProximityListener;
use crate::throttle::Throttle;
use crate::transition::{resolve, transitions, ActiveSet, Policy, ProximityEvent, TargetSample};
use glam::Vec3;
use log::{debug, info};
use std::time::{Duration, Instant};
use vgallery_core::{Camera, Coordinator, ParameterHost, ThingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Avatar or camera unavailable; nothing happened.
    Skipped,
    /// Still inside the interval since the last evaluation.
    Throttled,
    Evaluated { events: usize },
}

/// Decides, on a throttled cadence, which tagged things the avatar is near.
pub struct ProximityTracker {
    label: String,
    policy: Policy,
    throttle: Throttle,
    group: Option<String>,
    active: ActiveSet,
}

impl ProximityTracker {
    pub fn new(label: impl Into<String>, policy: Policy, interval: Duration) -> Self {
        Self { label: label.into(), policy, throttle: Throttle::new(interval), group: None, active: ActiveSet::new() }
    }

    /// Only consider targets tagged with this group.
    pub fn watching(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn is_active(&self, id: ThingId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active(&self) -> impl Iterator<Item = ThingId> + '_ {
        self.active.keys().copied()
    }

    /// Evaluate proximity against every tagged thing in the coordinator.
    ///
    /// Missing prerequisites (no avatar position, or no camera under the ray-hit
    /// policy) skip the poll without touching the throttle.
    pub fn poll<H: ParameterHost>(
        &mut self,
        vg: &Coordinator<H>,
        avatar: Option<Vec3>,
        camera: Option<&Camera>,
        now: Instant,
        listener: &mut dyn ProximityListener,
    ) -> PollOutcome {
        let Some(avatar) = avatar else {
            return PollOutcome::Skipped;
        };
        if self.policy == Policy::RayHit && camera.is_none() {
            return PollOutcome::Skipped;
        }
        if !self.throttle.ready(now) {
            return PollOutcome::Throttled;
        }

        let samples = self.sample(vg, avatar, camera);
        let current = resolve(self.policy, &samples);
        let events = transitions(&self.active, &current);

        for event in &events {
            match event {
                ProximityEvent::Enter { id, payload } => {
                    info!("[{}] {} entered: {:?}", self.label, id, payload.caption);
                    listener.on_enter(*id, payload);
                }
                ProximityEvent::Exit { id, payload } => {
                    info!("[{}] {} left: {:?}", self.label, id, payload.caption);
                    listener.on_exit(*id, payload);
                }
            }
        }

        self.active = current;
        PollOutcome::Evaluated { events: events.len() }
    }

    /// `poll` using the coordinator's camera and the position of the first thing
    /// named `avatar`.
    pub fn poll_avatar<H: ParameterHost>(
        &mut self,
        vg: &Coordinator<H>,
        avatar: &str,
        now: Instant,
        listener: &mut dyn ProximityListener,
    ) -> PollOutcome {
        let position = vg.find_by_name(avatar).and_then(|t| t.borrow().position());
        self.poll(vg, position, Some(vg.camera()), now, listener)
    }

    fn sample<H: ParameterHost>(&self, vg: &Coordinator<H>, avatar: Vec3, camera: Option<&Camera>) -> Vec<TargetSample> {
        let ray = match (self.policy, camera) {
            (Policy::RayHit, Some(camera)) => Some(camera.center_ray()),
            _ => None,
        };

        let mut samples = Vec::new();
        for thing in vg.things() {
            let thing = thing.borrow();
            let (Some(id), Some(object)) = (thing.id(), thing.object()) else {
                continue;
            };
            let node = object.borrow();
            let Some(tag) = &node.tag else {
                continue;
            };
            if self.group.is_some() && tag.group != self.group {
                continue;
            }

            // current position on every poll, so moving props are tracked
            let distance = node.position.distance(avatar);
            let ray_hit = match &ray {
                Some(ray) if distance < tag.radius => node.hit_by(ray),
                _ => false,
            };
            samples.push(TargetSample { id, distance, radius: tag.radius, ray_hit, payload: tag.payload.clone() });
        }
        debug!("[{}] sampled {} targets", self.label, samples.len());
        samples
    }
}
