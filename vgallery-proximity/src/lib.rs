//! Throttled proximity and visibility tracking on top of the coordinator's things.

pub mod listener;
pub mod throttle;
pub mod tracker;
pub mod transition;

pub use listener::{MediaState, ProximityListener, VisibilityFlags};
pub use throttle::Throttle;
pub use tracker::{PollOutcome, ProximityTracker};
pub use transition::{resolve, transitions, ActiveSet, Events, Policy, ProximityEvent, TargetSample};
