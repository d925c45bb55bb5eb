use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format: {0}")]
    Format(String),
    #[error("{0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    Stdio,
    WebSocket,
}

/// How a tracker picks active targets.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPolicy {
    NearestOne,
    RayHit,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Wall {
    North,
    South,
    East,
    West,
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone)]
pub struct RoomSettings {
    #[serde(default = "default_room_width")]
    pub width: f32,
    #[serde(default = "default_room_depth")]
    pub depth: f32,
    #[serde(default = "default_room_height")]
    pub height: f32,
    #[serde(default = "default_room_thickness")]
    pub thickness: f32,
}

fn default_room_width() -> f32 { 150.0 }
fn default_room_depth() -> f32 { 250.0 }
fn default_room_height() -> f32 { 30.0 }
fn default_room_thickness() -> f32 { 1.0 }

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            width: default_room_width(),
            depth: default_room_depth(),
            height: default_room_height(),
            thickness: default_room_thickness(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlayerSettings {
    #[serde(default = "default_player_position")]
    pub position: [f32; 3],
    /// Initial pitch and yaw, in radians
    #[serde(default = "default_player_look")]
    pub look: [f32; 2],
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_jump_speed")]
    pub jump_speed: f32,
    #[serde(default = "default_crouch_speed")]
    pub crouch_speed: f32,
    #[serde(default = "default_eye_height")]
    pub eye_height: f32,
}

fn default_player_position() -> [f32; 3] { [0.0, 2.0, 0.0] }
fn default_player_look() -> [f32; 2] { [0.31, -0.3] }
fn default_move_speed() -> f32 { 600.0 }
fn default_jump_speed() -> f32 { 300.0 }
fn default_crouch_speed() -> f32 { 0.1 }
fn default_eye_height() -> f32 { 1.2 }

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            position: default_player_position(),
            look: default_player_look(),
            move_speed: default_move_speed(),
            jump_speed: default_jump_speed(),
            crouch_speed: default_crouch_speed(),
            eye_height: default_eye_height(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ControlSettings {
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
}

fn default_mouse_sensitivity() -> f32 { 0.002 }

impl Default for ControlSettings {
    fn default() -> Self {
        Self { mouse_sensitivity: default_mouse_sensitivity() }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub interval_ms: u64,
    pub radius: f32,
    pub policy: TrackingPolicy,
}

/// Fields given for one tracker; the rest come from that tracker's defaults.
#[derive(Deserialize, Debug, Default)]
struct TrackerOverride {
    interval_ms: Option<u64>,
    radius: Option<f32>,
    policy: Option<TrackingPolicy>,
}

impl TrackerOverride {
    fn over(self, base: TrackerSettings) -> TrackerSettings {
        TrackerSettings {
            interval_ms: self.interval_ms.unwrap_or(base.interval_ms),
            radius: self.radius.unwrap_or(base.radius),
            policy: self.policy.unwrap_or(base.policy),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct ProximityOverrides {
    #[serde(default)]
    artwork: TrackerOverride,
    #[serde(default)]
    birds: TrackerOverride,
}

#[derive(Debug, Clone)]
pub struct ProximitySettings {
    pub artwork: TrackerSettings,
    pub birds: TrackerSettings,
}

impl<'de> Deserialize<'de> for ProximitySettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = ProximityOverrides::deserialize(deserializer)?;
        Ok(Self {
            artwork: overrides.artwork.over(default_artwork_tracker()),
            birds: overrides.birds.over(default_bird_tracker()),
        })
    }
}

fn default_artwork_tracker() -> TrackerSettings {
    TrackerSettings { interval_ms: 500, radius: 20.0, policy: TrackingPolicy::NearestOne }
}

fn default_bird_tracker() -> TrackerSettings {
    TrackerSettings { interval_ms: 200, radius: 150.0, policy: TrackingPolicy::RayHit }
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self { artwork: default_artwork_tracker(), birds: default_bird_tracker() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ArtworkConfig {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    /// Image file; its pixel size gives the plane size when width/height are absent
    #[serde(default)]
    pub image: Option<String>,
    pub wall: String,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl ArtworkConfig {
    /// Wall this artwork hangs on. Only valid after `load_config` succeeded.
    pub fn wall(&self) -> Option<Wall> {
        parse_wall(&self.wall)
    }

    /// Text shown while the avatar stands in front of the piece.
    pub fn caption(&self) -> String {
        match &self.description {
            Some(description) if !description.is_empty() => format!("{}: {}", self.title, description),
            _ => self.title.clone(),
        }
    }
}

fn parse_wall(name: &str) -> Option<Wall> {
    match name.to_ascii_lowercase().as_str() {
        "north" => Some(Wall::North),
        "south" => Some(Wall::South),
        "east" => Some(Wall::East),
        "west" => Some(Wall::West),
        _ => None,
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BirdConfig {
    pub id: u32,
    /// Radians; a random angle when absent
    #[serde(default)]
    pub start_angle: Option<f32>,
    pub radius: f32,
    /// Radians per second
    pub rotation_speed: f32,
    #[serde(default = "default_fly_height")]
    pub fly_height: f32,
}

fn default_fly_height() -> f32 { 40.0 }

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SerializerConfig {
    #[serde(rename = "type", default)]
    pub serializer_type: SerializerType,
    pub options: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SenderConfig {
    #[serde(rename = "type", default)]
    pub sender_type: SenderType,
    pub options: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TransportConfig {
    #[serde(default)]
    pub serializer: SerializerConfig,
    #[serde(default)]
    pub sender: SenderConfig,
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default)]
    pub room: RoomSettings,
    #[serde(default)]
    pub player: PlayerSettings,
    #[serde(default)]
    pub controls: ControlSettings,
    #[serde(default)]
    pub proximity: ProximitySettings,
    #[serde(default)]
    pub artworks: Vec<ArtworkConfig>,
    #[serde(default)]
    pub birds: Vec<BirdConfig>,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Audio played while no artwork is active
    #[serde(default)]
    pub default_audio: String,
}

fn default_framerate() -> u32 { 60 }
fn default_gravity() -> f32 { -30.0 }

// --- WebSocket Configuration ---
#[derive(Deserialize, Debug, Clone)]
pub struct WebSocketOptions {
    #[serde(default = "default_ws_host")]
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

fn default_ws_host() -> String { "127.0.0.1".to_string() }
fn default_ws_port() -> u16 { 8080 }

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self { host: default_ws_host(), port: default_ws_port() }
    }
}

impl SenderConfig {
    pub fn get_websocket_options(&self) -> WebSocketOptions {
        if let Some(value) = &self.options {
            if let Ok(options) = serde_json::from_value(value.clone()) {
                return options;
            }
        }
        WebSocketOptions::default()
    }
}

// --- Loading Function ---

/// Load a gallery config from `.json` or `.toml`, chosen by file extension.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let config: Config = match extension.to_ascii_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        other => return Err(ConfigError::Format(other.to_string())),
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.framerate == 0 {
        return Err(ConfigError::Validation("Framerate cannot be zero.".to_string()));
    }

    let room = &config.room;
    if room.width <= 0.0 || room.depth <= 0.0 || room.height <= 0.0 || room.thickness <= 0.0 {
        return Err(ConfigError::Validation("Room dimensions must be positive.".to_string()));
    }

    for (name, tracker) in [("artwork", &config.proximity.artwork), ("birds", &config.proximity.birds)] {
        if tracker.interval_ms == 0 {
            return Err(ConfigError::Validation(format!("Proximity interval for '{}' cannot be zero.", name)));
        }
        if tracker.radius <= 0.0 {
            return Err(ConfigError::Validation(format!("Proximity radius for '{}' must be positive.", name)));
        }
    }

    if let Some(art) = config.artworks.iter().find(|a| parse_wall(&a.wall).is_none()) {
        return Err(ConfigError::Validation(format!("Artwork '{}' hangs on unknown wall '{}'.", art.title, art.wall)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;
    use tempfile::Builder;

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn load_valid_json_config() {
        let file = json_file(
            r#"{
          "framerate": 30,
          "room": { "width": 100.0, "depth": 200.0, "height": 20.0, "thickness": 1.0 },
          "artworks": [
            { "title": "Alpha", "description": "oil on canvas", "audio": "alpha.mp3", "wall": "North", "width": 4.0, "height": 3.0 }
          ],
          "birds": [ { "id": 1, "radius": 50.0, "rotation_speed": 0.5 } ],
          "transport": {
            "serializer": { "type": "binary" },
            "sender": { "type": "websocket", "options": { "port": 9001 } }
          }
        }"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.framerate, 30);
        assert_eq!(config.room.depth, 200.0);
        assert_eq!(config.artworks[0].wall(), Some(Wall::North));
        assert_eq!(config.artworks[0].caption(), "Alpha: oil on canvas");
        assert_eq!(config.birds[0].fly_height, 40.0);
        assert_eq!(config.transport.serializer.serializer_type, SerializerType::Binary);
        assert_eq!(config.transport.sender.sender_type, SenderType::WebSocket);
        let ws = config.transport.sender.get_websocket_options();
        assert_eq!((ws.host.as_str(), ws.port), ("127.0.0.1", 9001));
    }

    #[test]
    fn empty_object_takes_defaults() {
        let file = json_file("{}");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.framerate, 60);
        assert_eq!(config.gravity, -30.0);
        assert_eq!(config.proximity.artwork.interval_ms, 500);
        assert_eq!(config.proximity.artwork.policy, TrackingPolicy::NearestOne);
        assert_eq!(config.proximity.birds.policy, TrackingPolicy::RayHit);
        assert_eq!(config.transport.sender.sender_type, SenderType::Stdio);
        assert!(config.artworks.is_empty());
    }

    #[test]
    fn load_toml_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("gallery.toml");
        file.write_str(
            r#"
framerate = 24
default_audio = "intro.mp3"

[proximity.artwork]
interval_ms = 1000
radius = 15.0
policy = "nearest_one"

[[artworks]]
title = "Beta"
wall = "east"
"#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.framerate, 24);
        assert_eq!(config.default_audio, "intro.mp3");
        assert_eq!(config.proximity.artwork.interval_ms, 1000);
        assert_eq!(config.proximity.birds.interval_ms, 200);
        assert_eq!(config.artworks[0].wall(), Some(Wall::East));
        assert_eq!(config.artworks[0].caption(), "Beta");
    }

    #[test]
    fn load_invalid_framerate() {
        let file = json_file(r#"{ "framerate": 0 }"#);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_flat_room() {
        let file = json_file(r#"{ "room": { "height": 0.0 } }"#);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let file = json_file(r#"{ "proximity": { "birds": { "interval_ms": 0, "radius": 150.0, "policy": "ray_hit" } } }"#);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn partial_tracker_settings_keep_their_own_defaults() {
        let file = json_file(r#"{ "proximity": { "artwork": { "radius": 10.0 }, "birds": { "interval_ms": 50 } } }"#);
        let config = load_config(file.path()).unwrap();

        let artwork = &config.proximity.artwork;
        assert_eq!((artwork.interval_ms, artwork.radius, artwork.policy), (500, 10.0, TrackingPolicy::NearestOne));
        let birds = &config.proximity.birds;
        assert_eq!((birds.interval_ms, birds.radius, birds.policy), (50, 150.0, TrackingPolicy::RayHit));
    }

    #[test]
    fn rejects_unknown_wall() {
        let file = json_file(r#"{ "artworks": [ { "title": "Lost", "wall": "ceiling" } ] }"#);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("ceiling"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("gallery.yaml");
        file.write_str("framerate: 60").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Format(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let result = load_config(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
