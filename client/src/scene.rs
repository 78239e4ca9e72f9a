//! Boundary to the rendering/physics side of the client
//!
//! The synchronization engine never draws anything itself. It drives a
//! [`Scene`] that owns every visual and reports back, once per frame, where
//! the local avatar is and what it touched.

use log::{debug, info};
use shared::{
    check_overlap, Bounds, Facing, BOMB_SIZE, PLAYER_HEIGHT, PLAYER_SPEED, PLAYER_WIDTH,
    STAR_SIZE, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Opaque reference to a visual owned by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnKind {
    LocalPlayer,
    RemotePlayer { tint: u32 },
    Star,
    Bomb { velocity_x: f32 },
}

/// State of the local avatar as the scene last simulated it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSample {
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
}

/// Local avatar started touching a star or a bomb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    Star(Handle),
    Bomb(Handle),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSample {
    pub local: Option<LocalSample>,
    pub overlaps: Vec<Overlap>,
}

pub trait Scene {
    fn spawn(&mut self, kind: SpawnKind, x: f32, y: f32) -> Handle;
    fn destroy(&mut self, handle: Handle);
    fn set_position(&mut self, handle: Handle, x: f32, y: f32);
    fn play_animation(&mut self, handle: Handle, name: &str);
    fn set_start_enabled(&mut self, enabled: bool);
    fn set_score(&mut self, score: u32);
    fn sample_frame(&mut self) -> FrameSample;
}

/// Horizontal direction held by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Walk {
    Left,
    Right,
    #[default]
    Idle,
}

#[derive(Debug, Clone)]
struct Sprite {
    kind: SpawnKind,
    x: f32,
    y: f32,
    animation: String,
}

impl Sprite {
    fn bounds(&self) -> Bounds {
        let (width, height) = match self.kind {
            SpawnKind::LocalPlayer | SpawnKind::RemotePlayer { .. } => (PLAYER_WIDTH, PLAYER_HEIGHT),
            SpawnKind::Star => (STAR_SIZE, STAR_SIZE),
            SpawnKind::Bomb { .. } => (BOMB_SIZE, BOMB_SIZE),
        };
        Bounds::centered(self.x, self.y, width, height)
    }
}

/// Terminal scene: keeps sprite positions in memory, logs visual effects and
/// walks the local avatar along the ground.
pub struct HeadlessScene {
    next_handle: u64,
    sprites: HashMap<Handle, Sprite>,
    local: Option<Handle>,
    walk: Walk,
    touching: HashSet<Handle>,
    start_enabled: bool,
    score: u32,
    last_frame: Instant,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            sprites: HashMap::new(),
            local: None,
            walk: Walk::Idle,
            touching: HashSet::new(),
            start_enabled: false,
            score: 0,
            last_frame: Instant::now(),
        }
    }

    pub fn set_walk(&mut self, walk: Walk) {
        self.walk = walk;
    }

    pub fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn position(&self, handle: Handle) -> Option<(f32, f32)> {
        self.sprites.get(&handle).map(|sprite| (sprite.x, sprite.y))
    }

    /// Advances the local avatar by `dt` seconds and collects new overlaps.
    pub fn step(&mut self, dt: f32) -> FrameSample {
        let Some(local_handle) = self.local else {
            return FrameSample::default();
        };

        let facing = match self.walk {
            Walk::Left => Facing::Left,
            Walk::Right => Facing::Right,
            Walk::Idle => Facing::Turn,
        };
        let velocity = match self.walk {
            Walk::Left => -PLAYER_SPEED,
            Walk::Right => PLAYER_SPEED,
            Walk::Idle => 0.0,
        };

        let local_bounds = match self.sprites.get_mut(&local_handle) {
            Some(sprite) => {
                let half_width = PLAYER_WIDTH / 2.0;
                let half_height = PLAYER_HEIGHT / 2.0;
                sprite.x = (sprite.x + velocity * dt).clamp(half_width, WORLD_WIDTH - half_width);
                sprite.y = sprite.y.clamp(half_height, WORLD_HEIGHT - half_height);
                sprite.animation = facing.animation().to_string();
                sprite.bounds()
            }
            None => return FrameSample::default(),
        };

        let mut overlaps = Vec::new();
        let mut touching = HashSet::new();
        let mut candidates: Vec<(&Handle, &Sprite)> = self.sprites.iter().collect();
        candidates.sort_by_key(|(handle, _)| **handle);

        for (handle, sprite) in candidates {
            let overlap = match sprite.kind {
                SpawnKind::Star => Overlap::Star(*handle),
                SpawnKind::Bomb { .. } => Overlap::Bomb(*handle),
                _ => continue,
            };
            if check_overlap(&local_bounds, &sprite.bounds()) {
                touching.insert(*handle);
                if !self.touching.contains(handle) {
                    overlaps.push(overlap);
                }
            }
        }
        self.touching = touching;

        let local = self.sprites.get(&local_handle).map(|sprite| LocalSample {
            x: sprite.x,
            y: sprite.y,
            facing,
        });

        FrameSample { local, overlaps }
    }
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for HeadlessScene {
    fn spawn(&mut self, kind: SpawnKind, x: f32, y: f32) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;

        if kind == SpawnKind::LocalPlayer {
            self.local = Some(handle);
        }
        debug!("Spawned {:?} #{} at ({:.1}, {:.1})", kind, handle.0, x, y);
        self.sprites.insert(
            handle,
            Sprite {
                kind,
                x,
                y,
                animation: Facing::Turn.animation().to_string(),
            },
        );
        handle
    }

    fn destroy(&mut self, handle: Handle) {
        if let Some(sprite) = self.sprites.remove(&handle) {
            debug!("Destroyed {:?} #{}", sprite.kind, handle.0);
        }
        if self.local == Some(handle) {
            info!("Local avatar removed");
            self.local = None;
        }
        self.touching.remove(&handle);
    }

    fn set_position(&mut self, handle: Handle, x: f32, y: f32) {
        if let Some(sprite) = self.sprites.get_mut(&handle) {
            sprite.x = x;
            sprite.y = y;
        }
    }

    fn play_animation(&mut self, handle: Handle, name: &str) {
        if let Some(sprite) = self.sprites.get_mut(&handle) {
            if sprite.animation != name {
                debug!("#{} plays {}", handle.0, name);
                sprite.animation = name.to_string();
            }
        }
    }

    fn set_start_enabled(&mut self, enabled: bool) {
        if self.start_enabled != enabled {
            info!(
                "Start control {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.start_enabled = enabled;
    }

    fn set_score(&mut self, score: u32) {
        if self.score != score {
            info!("Score: {}", score);
        }
        self.score = score;
    }

    fn sample_frame(&mut self) -> FrameSample {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32().min(0.05);
        self.last_frame = now;
        self.step(dt)
    }
}
