//! Per-frame view of the gallery sent to front-ends.

use serde::Serialize;
use vgallery_core::{Coordinator, ParameterHost, ThingId};
use vgallery_proximity::{MediaState, ProximityEvent, VisibilityFlags};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CameraState {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ThingState {
    pub id: ThingId,
    pub name: String,
    pub position: [f32; 3],
    /// Quaternion as x, y, z, w
    pub orientation: [f32; 4],
    pub scale: [f32; 3],
    pub visible: bool,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct MediaView {
    pub description: String,
    pub audio_source: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub dt: f32,
    pub camera: CameraState,
    pub things: Vec<ThingState>,
    pub media: MediaView,
    pub visible_props: Vec<ThingId>,
    /// Proximity transitions since the previous snapshot
    pub events: Vec<ProximityEvent>,
}

impl FrameSnapshot {
    /// Capture every thing that has a render object, plus the current UI state.
    pub fn capture<H: ParameterHost>(
        vg: &Coordinator<H>,
        dt: f32,
        media: &MediaState,
        visibility: &VisibilityFlags,
        events: Vec<ProximityEvent>,
    ) -> Self {
        let camera = vg.camera();
        let things = vg
            .things()
            .iter()
            .filter_map(|thing| {
                let thing = thing.borrow();
                let id = thing.id()?;
                let node = thing.object()?.borrow();
                Some(ThingState {
                    id,
                    name: thing.name().to_string(),
                    position: node.position.to_array(),
                    orientation: node.orientation.to_array(),
                    scale: node.scale.to_array(),
                    visible: node.visible,
                })
            })
            .collect();

        Self {
            frame: vg.frame(),
            dt,
            camera: CameraState { position: camera.position.to_array(), yaw: camera.yaw, pitch: camera.pitch },
            things,
            media: MediaView { description: media.description.clone(), audio_source: media.audio_source.clone() },
            visible_props: visibility.visible().collect(),
            events,
        }
    }
}
