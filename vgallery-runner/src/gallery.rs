//! Builds the walkable gallery from config: room, artworks, avatar, birds and
//! tuning panels.

use crossbeam_channel::{bounded, Sender};
use log::debug;
use rand::Rng;
use std::cell::Cell;
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::rc::Rc;
use std::thread;
use vgallery_config::{ArtworkConfig, BirdConfig, Config, PlayerSettings, RoomSettings, Wall};
use vgallery_core::{
    Coordinator, LoadError, LoadResult, ParameterSpec, Payload, ProximityTag, Quat, RigidBody, SceneNode, Shape,
    Thing, ThingRef, Tunable, UpdateContext, UpdateError, Vec3,
};

pub const PLAYER: &str = "player";
pub const ARTWORK_GROUP: &str = "artwork";
pub const BIRD_GROUP: &str = "birds";

/// Image pixels per world unit when an artwork has no explicit size.
const PIXELS_PER_UNIT: f32 = 100.0;
/// Height of an artwork's centre above the floor.
const HANG_HEIGHT: f32 = 3.0;
/// Gap between an artwork and its wall.
const WALL_GAP: f32 = 0.1;
const FRAME_DEPTH: f32 = 0.05;
/// Birds never dip below this.
const MIN_BIRD_HEIGHT: f32 = 37.0;
const LOOK_STEP_YAW: f32 = 0.05;
const LOOK_STEP_PITCH: f32 = 0.02;

pub struct Gallery {
    pub player: ThingRef,
    pub artworks: Vec<ThingRef>,
    pub birds: Vec<ThingRef>,
}

pub fn build(vg: &mut Coordinator, config: &Config) -> Gallery {
    build_room(vg, &config.room);
    build_panels(vg, config);
    let player = build_player(vg, &config.player);
    let artworks = build_artworks(vg, config);
    let birds = config.birds.iter().map(|bird| build_bird(vg, bird, config.proximity.birds.radius)).collect();
    Gallery { player, artworks, birds }
}

// --- Room ---

fn build_room(vg: &mut Coordinator, room: &RoomSettings) {
    let floor = Thing::builder("floor")
        .body(RigidBody::fixed(Shape::Plane).into_ref())
        .object(SceneNode::new("floor", Vec3::new(room.width, 0.1, room.depth)).into_ref())
        .unremovable()
        .into_ref();
    vg.add(&floor);

    let (w, d, h, t) = (room.width, room.depth, room.height, room.thickness);
    let walls = [
        ("westWall", Vec3::new(-w / 2.0 - t / 2.0, h / 2.0, 0.0), Vec3::new(t, h, d)),
        ("eastWall", Vec3::new(w / 2.0 + t / 2.0, h / 2.0, 0.0), Vec3::new(t, h, d)),
        ("northWall", Vec3::new(0.0, h / 2.0, -d / 2.0 - t / 2.0), Vec3::new(w, h, t)),
        ("southWall", Vec3::new(0.0, h / 2.0, d / 2.0 + t / 2.0), Vec3::new(w, h, t)),
    ];
    for (name, center, size) in walls {
        let wall = Thing::builder(name)
            .body(RigidBody::fixed(Shape::Box { half_extents: size / 2.0 }).at(center).into_ref())
            .object(SceneNode::new(name, size).at(center).into_ref())
            .into_ref();
        vg.add(&wall);
    }
}

// --- Panels ---

fn build_panels(vg: &mut Coordinator, config: &Config) {
    let world = Thing::builder("world")
        .parameter(ParameterSpec::range("gravity", vg.world().gravity(), -100.0, 10.0, Some(0.1)))
        .unremovable()
        .into_ref();
    vg.add(&world);

    vg.mouse_sensitivity().set(config.controls.mouse_sensitivity);
    let mouse = Thing::builder("mouse")
        .parameter(ParameterSpec::range("sensitivity", vg.mouse_sensitivity(), 0.0005, 0.01, Some(0.0001)))
        .unremovable()
        .into_ref();
    vg.add(&mouse);

    vg.on_down("h", |ctx| *ctx.hud_enabled = !*ctx.hud_enabled);
    vg.set_hud(|dt| debug!("HUD {:.1} fps", 1.0 / dt.max(f32::EPSILON)));
}

// --- Avatar ---

#[derive(Debug, Clone, Copy, Default)]
struct Steering {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
}

impl Steering {
    /// Normalised (side, forward) intent.
    fn intent(self) -> (f32, f32) {
        let side = self.right as i8 - self.left as i8;
        let forward = self.forward as i8 - self.back as i8;
        let (x, z) = (side as f32, forward as f32);
        let len = (x * x + z * z).sqrt();
        if len > 0.0 {
            (x / len, z / len)
        } else {
            (0.0, 0.0)
        }
    }
}

fn build_player(vg: &mut Coordinator, settings: &PlayerSettings) -> ThingRef {
    let body = RigidBody::dynamic(30.0, Shape::Sphere { radius: 1.0 })
        .at(Vec3::from_array(settings.position))
        .with_damping(0.9, 0.9)
        .with_friction(0.0)
        .upright()
        .into_ref();
    let object = SceneNode::new(PLAYER, Vec3::new(1.0, 3.0, 2.0)).into_ref();

    let move_speed = Tunable::new(settings.move_speed);
    let jump_speed = Tunable::new(settings.jump_speed);
    let crouch_speed = settings.crouch_speed;
    let steering = Rc::new(Cell::new(Steering::default()));

    let update = {
        let steering = Rc::clone(&steering);
        let move_speed = move_speed.clone();
        move |ctx: &UpdateContext<'_>, dt: f32| -> Result<(), UpdateError> {
            let body = ctx.body()?;
            let object = ctx.object()?;

            let (side, forward) = steering.get().intent();
            let heading = ctx.camera.heading();
            let right = Vec3::new(-heading.z, 0.0, heading.x);
            let impulse = (right * side + heading * forward) * move_speed.get() * dt;

            let mut body = body.borrow_mut();
            body.apply_impulse(impulse);

            let mut object = object.borrow_mut();
            object.position = body.position;
            object.orientation = body.orientation;
            Ok(())
        }
    };

    let player = Thing::builder(PLAYER)
        .body(body.clone())
        .object(object)
        .update(update)
        .unremovable()
        .parameter(ParameterSpec::range("move speed", &move_speed, 0.0, 2000.0, Some(10.0)))
        .parameter(ParameterSpec::range("jump speed", &jump_speed, 0.0, 1000.0, Some(10.0)))
        .into_ref();
    vg.add(&player);

    let bindings: [(&str, fn(&mut Steering, bool)); 4] = [
        ("w", |s, on| s.forward = on),
        ("s", |s, on| s.back = on),
        ("a", |s, on| s.left = on),
        ("d", |s, on| s.right = on),
    ];
    for (key, set) in bindings {
        let down = Rc::clone(&steering);
        vg.on_down(key, move |_| {
            let mut s = down.get();
            set(&mut s, true);
            down.set(s);
        });
        let up = Rc::clone(&steering);
        vg.on_up(key, move |_| {
            let mut s = up.get();
            set(&mut s, false);
            up.set(s);
        });
    }

    let jumper = body.clone();
    vg.on_down(" ", move |_| {
        let mut body = jumper.borrow_mut();
        if body.velocity.y.abs() < 0.1 {
            body.apply_impulse(Vec3::new(0.0, jump_speed.get(), 0.0));
        }
    });
    vg.while_pressed("Control", move |_| body.borrow_mut().velocity.y -= crouch_speed);

    vg.while_pressed("ArrowLeft", |ctx| ctx.camera.yaw += LOOK_STEP_YAW);
    vg.while_pressed("ArrowRight", |ctx| ctx.camera.yaw -= LOOK_STEP_YAW);
    vg.while_pressed("ArrowUp", |ctx| ctx.camera.pitch = (ctx.camera.pitch + LOOK_STEP_PITCH).min(FRAC_PI_2));
    vg.while_pressed("ArrowDown", |ctx| ctx.camera.pitch = (ctx.camera.pitch - LOOK_STEP_PITCH).max(-FRAC_PI_2));

    let camera = vg.camera_mut();
    camera.pitch = settings.look[0];
    camera.yaw = settings.look[1];
    vg.set_camera_target(&player, Vec3::new(0.0, settings.eye_height, 0.0));
    player
}

// --- Artworks ---

/// Where a piece hangs: centre and facing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    center: Vec3,
    facing: Quat,
}

/// Pieces share a wall in equal slots, centred in order of appearance.
fn place(wall: Wall, slot: usize, slots: usize, room: &RoomSettings) -> Placement {
    let along = match wall {
        Wall::North | Wall::South => room.width,
        Wall::East | Wall::West => room.depth,
    };
    let offset = -along / 2.0 + along * (slot as f32 + 0.5) / slots.max(1) as f32;
    let (hw, hd) = (room.width / 2.0 - WALL_GAP, room.depth / 2.0 - WALL_GAP);
    let (center, angle) = match wall {
        Wall::North => (Vec3::new(offset, HANG_HEIGHT, -hd), 0.0),
        Wall::South => (Vec3::new(offset, HANG_HEIGHT, hd), PI),
        Wall::East => (Vec3::new(hw, HANG_HEIGHT, offset), -FRAC_PI_2),
        Wall::West => (Vec3::new(-hw, HANG_HEIGHT, offset), FRAC_PI_2),
    };
    Placement { center, facing: Quat::from_rotation_y(angle) }
}

fn build_artworks(vg: &mut Coordinator, config: &Config) -> Vec<ThingRef> {
    let mut per_wall: HashMap<Wall, usize> = HashMap::new();
    for art in &config.artworks {
        if let Some(wall) = art.wall() {
            *per_wall.entry(wall).or_default() += 1;
        }
    }

    let mut next_slot: HashMap<Wall, usize> = HashMap::new();
    let mut things = Vec::new();
    for art in &config.artworks {
        let Some(wall) = art.wall() else {
            continue;
        };
        let slot = next_slot.entry(wall).or_default();
        let placement = place(wall, *slot, per_wall[&wall], &config.room);
        *slot += 1;

        let body = RigidBody::fixed(Shape::Box { half_extents: frame_extents(art) })
            .at(placement.center)
            .with_orientation(placement.facing)
            .into_ref();
        let thing = Thing::builder(art.title.clone()).body(body).into_ref();
        vg.add(&thing);

        // decoding image headers stays off the frame loop
        let (tx, rx) = bounded(1);
        let art = art.clone();
        let radius = config.proximity.artwork.radius;
        thread::spawn(move || {
            deliver(&tx, load_artwork(&art, radius), &art.title);
        });
        vg.attach_when_ready(&thing, rx);
        things.push(thing);
    }
    things
}

/// Hand a finished load to the frame loop. False when nobody waits for it any more.
fn deliver(tx: &Sender<LoadResult>, result: LoadResult, title: &str) -> bool {
    if tx.send(result).is_err() {
        debug!("dropping load for '{}': the gallery is gone", title);
        return false;
    }
    true
}

/// Half extents of an artwork's frame body. Pieces sized only by their image
/// start as a unit square.
fn frame_extents(art: &ArtworkConfig) -> Vec3 {
    let (width, height) = match (art.width, art.height) {
        (Some(width), Some(height)) => (width, height),
        _ => (1.0, 1.0),
    };
    Vec3::new(width / 2.0, height / 2.0, FRAME_DEPTH / 2.0)
}

fn load_artwork(art: &ArtworkConfig, radius: f32) -> LoadResult {
    let (width, height) = match (art.width, art.height) {
        (Some(width), Some(height)) => (width, height),
        _ => {
            let path = art
                .image
                .as_deref()
                .ok_or_else(|| LoadError::Unsupported(format!("'{}' has neither a size nor an image", art.title)))?;
            let (w, h) = image::image_dimensions(path)
                .map_err(|e| LoadError::Read { path: path.to_string(), reason: e.to_string() })?;
            (w as f32 / PIXELS_PER_UNIT, h as f32 / PIXELS_PER_UNIT)
        }
    };

    let mut payload = Payload::caption(art.caption());
    if let Some(audio) = &art.audio {
        payload = payload.with_audio(audio.clone());
    }
    Ok(SceneNode::new(art.title.clone(), Vec3::new(width, height, FRAME_DEPTH))
        .tagged(ProximityTag::new(radius, payload).in_group(ARTWORK_GROUP)))
}

// --- Birds ---

fn orbit(center_height: f32, radius: f32, angle: f32) -> Vec3 {
    let y = (center_height + (angle * 0.5).sin() * 40.0).max(MIN_BIRD_HEIGHT);
    Vec3::new(radius * angle.cos(), y, radius * angle.sin())
}

fn build_bird(vg: &mut Coordinator, bird: &BirdConfig, radius: f32) -> ThingRef {
    let name = format!("bird_{}", bird.id);
    let mut angle = bird.start_angle.unwrap_or_else(|| rand::thread_rng().gen_range(0.0..TAU));
    let (orbit_radius, speed, height) = (bird.radius, bird.rotation_speed, bird.fly_height);

    let size = Vec3::new(1.2, 0.4, 1.0);
    let node = SceneNode::new(name.clone(), size)
        .at(orbit(height, orbit_radius, angle))
        .with_scale(Vec3::splat(0.9))
        .tagged(
            ProximityTag::new(radius, Payload::caption(name.clone()))
                .with_hit_extents(size * 2.5)
                .in_group(BIRD_GROUP),
        )
        .into_ref();

    let thing = Thing::builder(name)
        .object(node)
        .update(move |ctx, dt| {
            let mut node = ctx.object()?.borrow_mut();
            angle += dt * speed;
            let next = orbit(height, orbit_radius, angle);
            let heading = (next - node.position).normalize_or_zero();
            if heading != Vec3::ZERO {
                node.orientation = Quat::from_rotation_arc(Vec3::NEG_Z, heading);
            }
            node.position = next;
            Ok(())
        })
        .show_panel(false)
        .into_ref();
    vg.add(&thing);
    thing
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use vgallery_core::{Camera, PhysicsWorld};
    use vgallery_proximity::{MediaState, Policy, ProximityTracker};

    fn config(json: &str) -> Config {
        let config: Config = serde_json::from_str(json).unwrap();
        vgallery_config::validate(&config).unwrap();
        config
    }

    fn gallery(config: &Config) -> (Coordinator, Gallery) {
        let mut vg = Coordinator::new(PhysicsWorld::new(config.gravity), Camera::default());
        let gallery = build(&mut vg, config);
        (vg, gallery)
    }

    fn settle_loads(vg: &mut Coordinator) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while vg.pending_loads() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            vg.tick(1.0 / 60.0);
        }
    }

    #[test]
    fn room_and_panels_are_registered() {
        let (vg, gallery) = gallery(&config("{}"));
        for name in ["floor", "northWall", "southWall", "eastWall", "westWall", "world", "mouse", PLAYER] {
            assert!(vg.find_by_name(name).is_some(), "missing {}", name);
        }
        assert!(gallery.player.borrow().is_unremovable());
        let panel = vg.panels().find("world").unwrap();
        assert_eq!(vg.panels().number(panel, "gravity"), Some(-30.0));
    }

    #[test]
    fn artworks_share_a_wall_in_slots() {
        let room = RoomSettings::default();
        let left = place(Wall::North, 0, 2, &room);
        let right = place(Wall::North, 1, 2, &room);
        assert_eq!(left.center.x, -room.width / 4.0);
        assert_eq!(right.center.x, room.width / 4.0);
        assert_eq!(left.center.z, -room.depth / 2.0 + WALL_GAP);

        // east-facing pieces turn to face the room centre
        let east = place(Wall::East, 0, 1, &room);
        let normal = east.facing * Vec3::Z;
        assert!((normal - Vec3::NEG_X).length() < 1e-5, "normal {}", normal);
    }

    #[test]
    fn artwork_loads_attach_and_sync_to_their_body() {
        let (mut vg, gallery) = gallery(&config(
            r#"{ "artworks": [ { "title": "Alpha", "audio": "alpha.mp3", "wall": "north", "width": 4.0, "height": 3.0 } ] }"#,
        ));
        settle_loads(&mut vg);
        vg.tick(1.0 / 60.0);

        let art = gallery.artworks[0].borrow();
        let node = art.object().expect("artwork attached").borrow();
        assert_eq!(node.size, Vec3::new(4.0, 3.0, FRAME_DEPTH));
        let frame = art.body().unwrap().borrow().shape;
        assert_eq!(frame, Shape::Box { half_extents: Vec3::new(2.0, 1.5, FRAME_DEPTH / 2.0) });
        assert_eq!(node.position, art.body().unwrap().borrow().position);
        let tag = node.tag.as_ref().unwrap();
        assert_eq!(tag.payload.audio.as_deref(), Some("alpha.mp3"));
        assert_eq!(tag.group.as_deref(), Some(ARTWORK_GROUP));
    }

    #[test]
    fn artwork_without_size_or_image_never_attaches() {
        let (mut vg, gallery) = gallery(&config(r#"{ "artworks": [ { "title": "Ghost", "wall": "west" } ] }"#));
        settle_loads(&mut vg);
        assert_eq!(vg.pending_loads(), 0);
        assert!(gallery.artworks[0].borrow().object().is_none());
        assert!(vg.contains(&gallery.artworks[0]));
    }

    #[test]
    fn walking_up_to_an_artwork_shows_its_caption() {
        let (mut vg, gallery) = gallery(&config(
            r#"{
              "player": { "position": [0.0, 1.0, -115.0] },
              "artworks": [ { "title": "Alpha", "description": "fresco", "wall": "north", "width": 4.0, "height": 3.0 } ]
            }"#,
        ));
        settle_loads(&mut vg);
        vg.tick(1.0 / 60.0);

        let mut tracker = ProximityTracker::new("artwork", Policy::NearestOne, Duration::from_millis(500)).watching(ARTWORK_GROUP);
        let mut media = MediaState::new("intro.mp3");
        tracker.poll_avatar(&vg, PLAYER, Instant::now(), &mut media);
        assert_eq!(media.description, "Alpha: fresco");

        gallery.player.borrow().body().unwrap().borrow_mut().position = Vec3::new(0.0, 1.0, 100.0);
        vg.tick(1.0 / 60.0);
        tracker.poll_avatar(&vg, PLAYER, Instant::now() + Duration::from_secs(1), &mut media);
        assert_eq!(media.description, "");
    }

    #[test]
    fn held_w_walks_along_camera_heading() {
        let (mut vg, gallery) = gallery(&config(r#"{ "player": { "position": [0.0, 1.0, 0.0], "look": [0.0, 0.0] } }"#));
        vg.key_down("w");
        for _ in 0..60 {
            vg.tick(1.0 / 60.0);
        }
        vg.key_up("w");

        let position = gallery.player.borrow().position().unwrap();
        assert!(position.z < -0.5, "player at {}", position);
        assert!(position.x.abs() < 1e-3);
        // camera rides at eye height
        assert!((vg.camera().position.y - position.y - 1.2).abs() < 1e-4);
    }

    #[test]
    fn walls_keep_the_player_inside_the_room() {
        let (mut vg, gallery) = gallery(&config("{}"));
        let room = RoomSettings::default();
        {
            let player = gallery.player.borrow();
            let mut body = player.body().unwrap().borrow_mut();
            body.position = Vec3::new(room.width / 2.0 - 3.0, 1.0, 0.0);
            body.velocity = Vec3::new(30.0, 0.0, 0.0);
        }
        for _ in 0..120 {
            vg.tick(1.0 / 60.0);
        }
        let position = gallery.player.borrow().position().unwrap();
        assert!(position.x < room.width / 2.0 - 0.95, "player at {}", position);
        assert!(position.x > room.width / 2.0 - 2.0, "player at {}", position);
    }

    #[test]
    fn load_for_a_dropped_gallery_is_discarded() {
        let (tx, rx) = bounded(1);
        assert!(deliver(&tx, Err(LoadError::Unsupported("first".into())), "Alpha"));
        drop(rx);
        assert!(!deliver(&tx, Err(LoadError::Unsupported("second".into())), "Alpha"));
    }

    #[test]
    fn image_sized_artwork_gets_a_unit_frame() {
        let art: ArtworkConfig = serde_json::from_str(r#"{ "title": "Beta", "image": "beta.png", "wall": "east" }"#).unwrap();
        assert_eq!(frame_extents(&art), Vec3::new(0.5, 0.5, FRAME_DEPTH / 2.0));
    }

    #[test]
    fn birds_orbit_above_the_minimum_height() {
        let (mut vg, gallery) = gallery(&config(
            r#"{ "birds": [ { "id": 1, "start_angle": 0.0, "radius": 50.0, "rotation_speed": 0.5, "fly_height": 10.0 } ] }"#,
        ));
        let start = gallery.birds[0].borrow().position().unwrap();
        for _ in 0..30 {
            vg.tick(1.0 / 60.0);
        }
        let bird = gallery.birds[0].borrow();
        let now = bird.position().unwrap();
        assert_ne!(now, start);
        assert!(now.y >= MIN_BIRD_HEIGHT);
        assert!((Vec3::new(now.x, 0.0, now.z).length() - 50.0).abs() < 1e-3);
        assert_eq!(bird.name(), "bird_1");
    }

    #[test]
    fn steering_intent_is_normalised() {
        let both = Steering { forward: true, right: true, ..Steering::default() };
        let (x, z) = both.intent();
        assert!(((x * x + z * z).sqrt() - 1.0).abs() < 1e-6);
        let cancelled = Steering { forward: true, back: true, ..Steering::default() };
        assert_eq!(cancelled.intent(), (0.0, 0.0));
    }
}
