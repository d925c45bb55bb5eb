//! Streams frame snapshots to front-ends and takes their input back.

use serde::Deserialize;
use std::io::{self, Write};
use thiserror::Error;

pub mod snapshot;
#[cfg(feature = "websocket")]
mod websocket;

pub use snapshot::{CameraState, FrameSnapshot, MediaView, ThingState};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketSender;

// --- Error Type ---
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("binary serialization failed: {0}")]
    Binary(#[from] bincode::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

// --- Traits ---
/// Turns a frame snapshot into a text frame.
pub trait Serializer: Send + Sync {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<String, TransportError>;
}

/// Sends serialized data to a destination.
pub trait Sender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

// --- Serializers ---

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<String, TransportError> {
        Ok(serde_json::to_string(snapshot)?)
    }
}

/// bincode-encoded snapshot, base64 wrapped so it travels as text.
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<String, TransportError> {
        let buffer = bincode::serialize(snapshot)?;
        Ok(base64::encode(buffer))
    }
}

// --- Senders ---

/// Writes one frame per line.
pub struct LineSender<W: Write> {
    out: W,
}

pub type StdioSender = LineSender<io::Stdout>;

impl StdioSender {
    pub fn new() -> Self {
        LineSender { out: io::stdout() }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> LineSender<W> {
    pub fn with_writer(out: W) -> Self {
        LineSender { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sender for LineSender<W> {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.out.write_all(data)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

// --- Client input ---

/// Message a front-end sends back: a key transition, pointer movement, or a
/// pointer-lock change.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum InputMessage {
    Key { key: String, pressed: bool },
    Pointer { dx: f32, dy: f32 },
    PointerLock { locked: bool },
}

impl InputMessage {
    pub fn parse(text: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgallery_core::{Camera, Coordinator, Payload, PhysicsWorld, SceneNode, Thing, ThingId, Vec3};
    use vgallery_proximity::{MediaState, ProximityEvent, ProximityListener, VisibilityFlags};

    fn gallery_snapshot() -> FrameSnapshot {
        let mut vg = Coordinator::new(PhysicsWorld::new(-30.0), Camera::default());
        let art = Thing::builder("alpha")
            .object(SceneNode::new("alpha", Vec3::new(2.0, 2.0, 0.1)).at(Vec3::new(0.0, 1.5, -10.0)).into_ref())
            .into_ref();
        let sensor = Thing::builder("sensor").into_ref();
        vg.add(&art);
        vg.add(&sensor);
        vg.tick(1.0 / 60.0);

        let id = art.borrow().id().unwrap();
        let payload = Payload::caption("Alpha").with_audio("alpha.mp3");
        let mut media = MediaState::new("intro.mp3");
        media.on_enter(id, &payload);
        let mut visibility = VisibilityFlags::new();
        visibility.on_enter(id, &payload);

        FrameSnapshot::capture(&vg, 1.0 / 60.0, &media, &visibility, vec![ProximityEvent::Enter { id, payload }])
    }

    #[test]
    fn json_snapshot_shape() {
        let snapshot = gallery_snapshot();
        let json = JsonSerializer.serialize(&snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["frame"], 1);
        // bare things have nothing to draw
        assert_eq!(value["things"].as_array().unwrap().len(), 1);
        assert_eq!(value["things"][0]["name"], "alpha");
        assert_eq!(value["things"][0]["position"][2], -10.0);
        assert_eq!(value["media"]["description"], "Alpha");
        assert_eq!(value["media"]["audio_source"], "alpha.mp3");
        assert_eq!(value["visible_props"].as_array().unwrap().len(), 1);
        assert_eq!(value["events"][0]["event"], "enter");
    }

    #[test]
    fn binary_snapshot_is_base64_bincode() {
        let snapshot = gallery_snapshot();
        let text = BinarySerializer.serialize(&snapshot).unwrap();
        let bytes = base64::decode(&text).unwrap();
        assert_eq!(bytes, bincode::serialize(&snapshot).unwrap());
        // frame number leads the record
        assert_eq!(u64::from_le_bytes(bytes[..8].try_into().unwrap()), snapshot.frame);
    }

    #[test]
    fn line_sender_terminates_frames() {
        let mut sender = LineSender::with_writer(Vec::new());
        sender.send(b"{\"frame\":1}").unwrap();
        sender.send(b"{\"frame\":2}").unwrap();
        assert_eq!(sender.into_inner(), b"{\"frame\":1}\n{\"frame\":2}\n");
    }

    #[test]
    fn parses_client_messages() {
        assert_eq!(
            InputMessage::parse(r#"{"key":"w","pressed":true}"#).unwrap(),
            InputMessage::Key { key: "w".into(), pressed: true }
        );
        assert_eq!(InputMessage::parse(r#"{"dx":3.0,"dy":-1.5}"#).unwrap(), InputMessage::Pointer { dx: 3.0, dy: -1.5 });
        assert_eq!(InputMessage::parse(r#"{"locked":false}"#).unwrap(), InputMessage::PointerLock { locked: false });
        assert!(InputMessage::parse(r#"{"mouse":1}"#).is_err());
    }

    #[test]
    fn ids_serialize_with_generation() {
        let json = serde_json::to_value(ThingId::new(3, 1)).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["generation"], 1);
    }
}
