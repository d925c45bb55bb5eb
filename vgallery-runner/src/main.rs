use clap::Parser;
use crossbeam_channel::{unbounded, Sender as InputSender};
use env_logger::Env;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use vgallery_config::{load_config, Config, ConfigError, SenderType, SerializerType, TrackerSettings, TrackingPolicy};
use vgallery_core::{Camera, Coordinator, FrameClock, PhysicsWorld};
use vgallery_proximity::{MediaState, Policy, ProximityEvent, ProximityTracker, VisibilityFlags};
use vgallery_transport::{
    BinarySerializer, FrameSnapshot, InputMessage, JsonSerializer, Sender, Serializer, StdioSender, TransportError,
};

#[cfg(feature = "websocket")]
use vgallery_transport::WebSocketSender;

mod gallery;
mod stats;

use gallery::{ARTWORK_GROUP, BIRD_GROUP};
use stats::FrameStats;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the gallery configuration file (.json or .toml)
    #[arg(short, long, default_value = "gallery.json")]
    config: PathBuf,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to set up frame statistics: {0}")]
    Stats(#[from] hdrhistogram::CreationError),
    #[error("WebSocket sender configured but the websocket feature is not enabled")]
    WebSocketDisabled,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let config = load_config(&args.config)?;
    info!("Using configuration from {}", args.config.display());

    let mut vg = Coordinator::new(PhysicsWorld::new(config.gravity), Camera::default());
    let gallery = gallery::build(&mut vg, &config);
    info!("Gallery ready: {} artworks, {} birds", gallery.artworks.len(), gallery.birds.len());

    let mut art_tracker = tracker("artwork", &config.proximity.artwork).watching(ARTWORK_GROUP);
    let mut bird_tracker = tracker("birds", &config.proximity.birds).watching(BIRD_GROUP);
    let mut media = MediaState::new(config.default_audio.clone());
    let mut visibility = VisibilityFlags::new();

    let (input_tx, input_rx) = unbounded();
    let serializer = create_serializer(&config);
    let mut sender = create_sender(&config, input_tx)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let mut clock = FrameClock::new(config.framerate);
    let mut stats = FrameStats::new()?;
    info!("Running gallery at {} FPS...", config.framerate);

    while running.load(Ordering::SeqCst) {
        if args.frames.map_or(false, |limit| vg.frame() >= limit) {
            break;
        }

        let dt = clock.begin();
        for message in input_rx.try_iter() {
            apply_input(&mut vg, message);
        }
        vg.tick(dt);

        let now = Instant::now();
        let mut events: Vec<ProximityEvent> = Vec::new();
        let avatar = gallery.player.borrow().position();
        art_tracker.poll(&vg, avatar, Some(vg.camera()), now, &mut (&mut media, &mut events));
        bird_tracker.poll(&vg, avatar, Some(vg.camera()), now, &mut (&mut visibility, &mut events));

        let snapshot = FrameSnapshot::capture(&vg, dt, &media, &visibility, events);
        match serializer.serialize(&snapshot) {
            Ok(data) => {
                if let Err(e) = sender.send(data.as_bytes()) {
                    warn!("Error sending frame {}: {}", snapshot.frame, e);
                }
            }
            Err(e) => warn!("Error serializing frame {}: {}", snapshot.frame, e),
        }

        let (work, overran) = clock.finish();
        stats.record(work, overran);
        if overran && config.framerate > 10 {
            debug!("Frame time exceeded budget: {:?} > {:?}", work, clock.frame_duration());
        }
    }

    info!("Shutting down");
    stats.report();
    Ok(())
}

fn tracker(label: &str, settings: &TrackerSettings) -> ProximityTracker {
    let policy = match settings.policy {
        TrackingPolicy::NearestOne => Policy::NearestOne,
        TrackingPolicy::RayHit => Policy::RayHit,
    };
    ProximityTracker::new(label, policy, Duration::from_millis(settings.interval_ms))
}

fn apply_input(vg: &mut Coordinator, message: InputMessage) {
    match message {
        InputMessage::Key { key, pressed: true } => vg.key_down(&key),
        InputMessage::Key { key, pressed: false } => vg.key_up(&key),
        InputMessage::Pointer { dx, dy } => vg.pointer_move(dx, dy),
        InputMessage::PointerLock { locked } => vg.set_pointer_locked(locked),
    }
}

fn create_serializer(config: &Config) -> Box<dyn Serializer> {
    match config.transport.serializer.serializer_type {
        SerializerType::Json => Box::new(JsonSerializer),
        SerializerType::Binary => Box::new(BinarySerializer),
    }
}

#[allow(unused_variables)]
fn create_sender(config: &Config, input: InputSender<InputMessage>) -> Result<Box<dyn Sender>, RunError> {
    match config.transport.sender.sender_type {
        SenderType::Stdio => {
            info!("Sending gallery frames to standard output");
            Ok(Box::new(StdioSender::new()))
        }
        SenderType::WebSocket => {
            #[cfg(feature = "websocket")]
            {
                let options = config.transport.sender.get_websocket_options();
                let mut ws_sender = WebSocketSender::new(&options.host, options.port).with_input(input);
                ws_sender.start()?;
                info!("Open the gallery front-end at ws://{}:{}", options.host, options.port);
                Ok(Box::new(ws_sender))
            }

            #[cfg(not(feature = "websocket"))]
            {
                Err(RunError::WebSocketDisabled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgallery_core::Vec3;

    #[test]
    fn client_input_drives_keys_and_look() {
        let mut vg = Coordinator::new(PhysicsWorld::new(-30.0), Camera::default());
        let config: Config = serde_json::from_str("{}").unwrap();
        gallery::build(&mut vg, &config);
        let yaw = vg.camera().yaw;

        apply_input(&mut vg, InputMessage::Key { key: "ArrowLeft".into(), pressed: true });
        vg.tick(1.0 / 60.0);
        assert!(vg.camera().yaw > yaw);
        apply_input(&mut vg, InputMessage::Key { key: "ArrowLeft".into(), pressed: false });

        // pointer movement only counts while locked
        let yaw = vg.camera().yaw;
        apply_input(&mut vg, InputMessage::Pointer { dx: 100.0, dy: 0.0 });
        assert_eq!(vg.camera().yaw, yaw);
        apply_input(&mut vg, InputMessage::PointerLock { locked: true });
        apply_input(&mut vg, InputMessage::Pointer { dx: 100.0, dy: 0.0 });
        assert!(vg.camera().yaw < yaw);

        apply_input(&mut vg, InputMessage::PointerLock { locked: false });
        assert_eq!(vg.camera().yaw, 0.0);
        assert_eq!(vg.camera().forward(), Vec3::NEG_Z);
    }

    #[test]
    fn trackers_follow_configured_policy() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(tracker("artwork", &config.proximity.artwork).policy(), Policy::NearestOne);
        assert_eq!(tracker("birds", &config.proximity.birds).policy(), Policy::RayHit);
    }

    #[test]
    fn hud_key_toggles_hud() {
        let mut vg = Coordinator::new(PhysicsWorld::new(-30.0), Camera::default());
        let config: Config = serde_json::from_str("{}").unwrap();
        gallery::build(&mut vg, &config);
        assert!(!vg.hud_enabled());
        apply_input(&mut vg, InputMessage::Key { key: "h".into(), pressed: true });
        assert!(vg.hud_enabled());
    }
}
