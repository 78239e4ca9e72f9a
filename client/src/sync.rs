//! Synchronization engine
//!
//! Maps inbound server topics onto the entity registry and session, and maps
//! local frame samples back onto outbound messages.
//!
//! Effects of the local player's own collisions are applied optimistically:
//! the star or bomb disappears locally before the server hears about it.
//! Everything else is server-confirmed: remote players, stars and bombs are
//! only created or destroyed when an explicit topic says so. Every removal is
//! keyed by id, so a local removal followed by the server's echo is a no-op
//! the second time.

use crate::registry::{Collectible, Hazard, Registry, RemotePlayer};
use crate::scene::{FrameSample, Handle, Overlap, Scene, SpawnKind};
use crate::session::{Session, SessionError};
use log::{debug, info, warn};
use shared::{
    decode, BombState, ClientEnvelope, ClientMessage, EntityId, Facing, Inbound, MovementIntent,
    PlayerSnapshot, RoundLayout, ServerMessage, SessionState, StarState, PLAYER_SPAWN_X,
    PLAYER_SPAWN_Y, STAR_POINTS,
};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub const HIT_ANIMATION: &str = "hit";

pub struct SyncEngine<S: Scene> {
    scene: S,
    session: Option<Session>,
    registry: Registry,

    local_avatar: Option<Handle>,
    local_hit: bool,
    intent: MovementIntent,

    reporting: bool,
    next_req_id: u64,
    last_acked_req_id: Option<u64>,

    outbound: VecDeque<ClientEnvelope>,
    pending_destroys: Vec<(Instant, Handle)>,
    hit_grace: Duration,
}

impl<S: Scene> SyncEngine<S> {
    pub fn new(scene: S, hit_grace: Duration) -> Self {
        Self {
            scene,
            session: None,
            registry: Registry::new(),
            local_avatar: None,
            local_hit: false,
            intent: MovementIntent {
                x: PLAYER_SPAWN_X,
                y: PLAYER_SPAWN_Y,
                facing: Facing::Turn,
                player_id: EntityId::new(),
            },
            reporting: false,
            next_req_id: 0,
            last_acked_req_id: None,
            outbound: VecDeque::new(),
            pending_destroys: Vec::new(),
            hit_grace,
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn intent(&self) -> &MovementIntent {
        &self.intent
    }

    pub fn local_avatar(&self) -> Option<Handle> {
        self.local_avatar
    }

    pub fn is_local_hit(&self) -> bool {
        self.local_hit
    }

    pub fn last_acked_req_id(&self) -> Option<u64> {
        self.last_acked_req_id
    }

    /// Whether the periodic movement report should fire.
    pub fn is_reporting(&self) -> bool {
        self.reporting && self.session.as_ref().is_some_and(|session| !session.is_over())
    }

    pub fn has_pending_destroys(&self) -> bool {
        !self.pending_destroys.is_empty()
    }

    /// Hands the queued envelopes to the transport, oldest first.
    pub fn drain_outbound(&mut self) -> Vec<ClientEnvelope> {
        self.outbound.drain(..).collect()
    }

    fn local_player_id(&self) -> &str {
        self.session
            .as_ref()
            .map(Session::local_player_id)
            .unwrap_or_default()
    }

    fn is_local(&self, player_id: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_local(player_id))
    }

    fn queue(&mut self, message: ClientMessage) {
        let envelope = ClientEnvelope::new(self.local_player_id(), message);
        self.outbound.push_back(envelope);
    }

    // Transport lifecycle

    /// The channel is open: the handshake goes out ahead of anything else.
    pub fn on_open(&mut self) {
        let envelope = ClientEnvelope::new(self.local_player_id(), ClientMessage::Connect {});
        self.outbound.push_front(envelope);
    }

    pub fn handle_text(&mut self, text: &str, now: Instant) {
        match decode(text) {
            Ok(inbound) => self.handle(inbound, now),
            Err(e) => warn!("Dropping malformed message: {}", e),
        }
    }

    pub fn handle(&mut self, inbound: Inbound, now: Instant) {
        match inbound.message {
            ServerMessage::Init {
                player_id,
                game_state,
                players,
                stars,
                bombs,
            } => self.on_init(player_id, game_state, players, stars, bombs),
            ServerMessage::PlayerJoined { player_id } => {
                self.spawn_remote_player(&player_id, PLAYER_SPAWN_X, PLAYER_SPAWN_Y, Facing::Turn)
            }
            ServerMessage::PlayerLeft { player_id } => self.on_player_left(&player_id),
            ServerMessage::GameStart { payload } => self.on_game_start(payload),
            ServerMessage::NextRound(layout) => self.on_next_round(layout),
            ServerMessage::GameOver => self.on_game_over(),
            ServerMessage::PlayerMovement { player_id, payload } => {
                self.on_player_movement(&player_id, payload)
            }
            ServerMessage::StarCollected { star_id } => self.remove_collectible(&star_id),
            ServerMessage::BombHit { player_id, bomb_id } => {
                self.on_bomb_hit(&player_id, &bomb_id, now)
            }
            ServerMessage::Ack { req_id } => {
                if let Some(req_id) = req_id {
                    self.last_acked_req_id = self.last_acked_req_id.max(Some(req_id));
                }
            }
            ServerMessage::Unknown => warn!("Dropping message with unknown topic {:?}", inbound.topic),
        }
    }

    // Inbound handlers

    fn on_init(
        &mut self,
        player_id: EntityId,
        game_state: SessionState,
        players: HashMap<EntityId, PlayerSnapshot>,
        stars: HashMap<EntityId, StarState>,
        bombs: HashMap<EntityId, BombState>,
    ) {
        let previous_id = match self.session.as_mut() {
            Some(session) if session.is_local(&player_id) => {
                session.reseed(game_state);
                None
            }
            Some(session) => {
                let previous = session.local_player_id().to_string();
                session.rebind(player_id.clone(), game_state);
                Some(previous)
            }
            None => {
                self.session = Some(Session::seed(player_id.clone(), game_state));
                None
            }
        };
        if let Some(previous) = previous_id {
            warn!("Local player id changed from {} to {}", previous, player_id);
        }

        if let Ok(stray) = self.registry.players.remove(&player_id) {
            self.scene.destroy(stray.handle);
        }

        if self.local_avatar.is_none() && !self.local_hit {
            let handle = self
                .scene
                .spawn(SpawnKind::LocalPlayer, PLAYER_SPAWN_X, PLAYER_SPAWN_Y);
            self.local_avatar = Some(handle);
        }
        self.intent.player_id = player_id.clone();

        let mut roster: Vec<(EntityId, PlayerSnapshot)> = players.into_iter().collect();
        roster.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, snapshot) in roster {
            if id == player_id {
                continue;
            }
            self.spawn_remote_player(
                &id,
                snapshot.x.unwrap_or(PLAYER_SPAWN_X),
                snapshot.y.unwrap_or(PLAYER_SPAWN_Y),
                snapshot.facing.unwrap_or_default(),
            );
        }

        let (state, start_enabled, score) = match self.session.as_ref() {
            Some(session) => (session.state(), session.start_enabled(), session.score()),
            None => return,
        };

        // Joining a round in progress: the snapshot carries the live items.
        if state == SessionState::Running {
            self.spawn_layout(RoundLayout { stars, bombs });
        }

        self.scene.set_start_enabled(start_enabled);
        self.scene.set_score(score);
        self.reporting = state != SessionState::Over;

        info!(
            "Joined as {} (state {}, {} other players)",
            player_id,
            state,
            self.registry.players.len()
        );
    }

    fn spawn_remote_player(&mut self, player_id: &str, x: f32, y: f32, facing: Facing) {
        if self.is_local(player_id) {
            debug!("Ignoring spawn of local player {}", player_id);
            return;
        }

        let scene = &mut self.scene;
        let created = self.registry.players.create_with(player_id, || {
            let tint = rand::random::<u32>() & 0x00FF_FFFF;
            let handle = scene.spawn(SpawnKind::RemotePlayer { tint }, x, y);
            scene.play_animation(handle, facing.animation());
            RemotePlayer {
                handle,
                x,
                y,
                facing,
            }
        });

        match created {
            Ok(_) => info!("Player {} joined", player_id),
            Err(e) => debug!("{}", e),
        }
    }

    fn on_player_left(&mut self, player_id: &str) {
        match self.registry.players.remove(player_id) {
            Ok(player) => {
                self.scene.destroy(player.handle);
                info!("Player {} left", player_id);
            }
            Err(e) => debug!("{}", e),
        }
    }

    fn on_game_start(&mut self, layout: RoundLayout) {
        let Some(session) = self.session.as_mut() else {
            warn!("Dropping game_start: {}", SessionError::NotSeeded);
            return;
        };
        if let Err(e) = session.start() {
            warn!("Dropping game_start: {}", e);
            return;
        }

        self.scene.set_start_enabled(false);
        info!(
            "Game started with {} stars and {} bombs",
            layout.stars.len(),
            layout.bombs.len()
        );
        self.spawn_layout(layout);
    }

    fn on_next_round(&mut self, layout: RoundLayout) {
        match self.session.as_ref() {
            None => {
                warn!("Dropping next_round: {}", SessionError::NotSeeded);
                return;
            }
            Some(session) if session.is_over() => {
                warn!("Dropping next_round: session is over");
                return;
            }
            Some(_) => {}
        }

        for (_, star) in self.registry.collectibles.drain() {
            self.scene.destroy(star.handle);
        }
        info!("Next round with {} stars", layout.stars.len());
        self.spawn_layout(layout);
    }

    fn on_game_over(&mut self) {
        let Some(session) = self.session.as_mut() else {
            warn!("Dropping game_over: {}", SessionError::NotSeeded);
            return;
        };

        session.finish();
        self.reporting = false;
        self.scene.set_start_enabled(false);
        info!("Game over, final score {}", session.score());
    }

    fn on_player_movement(&mut self, player_id: &str, payload: MovementIntent) {
        if self.is_local(player_id) {
            return;
        }

        match self
            .registry
            .players
            .update_position(player_id, payload.x, payload.y)
        {
            Ok(handle) => {
                if let Some(player) = self.registry.players.get_mut(player_id) {
                    player.facing = payload.facing;
                }
                self.scene.set_position(handle, payload.x, payload.y);
                self.scene.play_animation(handle, payload.facing.animation());
            }
            Err(e) => debug!("Ignoring movement: {}", e),
        }
    }

    fn remove_collectible(&mut self, star_id: &str) {
        match self.registry.collectibles.remove(star_id) {
            Ok(star) => self.scene.destroy(star.handle),
            Err(e) => debug!("{}", e),
        }
    }

    fn on_bomb_hit(&mut self, player_id: &str, bomb_id: &str, now: Instant) {
        // Our own hit was already applied when the overlap happened.
        if self.is_local(player_id) {
            return;
        }

        match self.registry.players.remove(player_id) {
            Ok(victim) => {
                self.scene.play_animation(victim.handle, HIT_ANIMATION);
                self.schedule_destroy(victim.handle, now);
                info!("Player {} hit bomb {}", player_id, bomb_id);
            }
            Err(e) => debug!("{}", e),
        }

        match self.registry.hazards.remove(bomb_id) {
            Ok(bomb) => self.scene.destroy(bomb.handle),
            Err(e) => debug!("{}", e),
        }
    }

    /// Bombs are additive across rounds; stars are whatever the layout says.
    fn spawn_layout(&mut self, layout: RoundLayout) {
        let mut bombs: Vec<(EntityId, BombState)> = layout.bombs.into_iter().collect();
        bombs.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, bomb) in bombs.into_iter().filter(|(_, bomb)| !bomb.hit) {
            let scene = &mut self.scene;
            let created = self.registry.hazards.create_with(&id, || Hazard {
                handle: scene.spawn(SpawnKind::Bomb { velocity_x: bomb.vx }, bomb.x, bomb.y),
                x: bomb.x,
                y: bomb.y,
                velocity_x: bomb.vx,
            });
            if let Err(e) = created {
                debug!("{}", e);
            }
        }

        let mut stars: Vec<(EntityId, StarState)> = layout.stars.into_iter().collect();
        stars.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, star) in stars.into_iter().filter(|(_, star)| !star.collected) {
            let scene = &mut self.scene;
            let created = self.registry.collectibles.create_with(&id, || Collectible {
                handle: scene.spawn(SpawnKind::Star, star.x, star.y),
                x: star.x,
                y: star.y,
            });
            if let Err(e) = created {
                debug!("{}", e);
            }
        }
    }

    fn schedule_destroy(&mut self, handle: Handle, now: Instant) {
        self.pending_destroys.push((now + self.hit_grace, handle));
    }

    fn flush_destroys(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending_destroys
            .drain(..)
            .partition(|(deadline, _)| *deadline <= now);
        self.pending_destroys = waiting;

        for (_, handle) in due {
            self.scene.destroy(handle);
        }
    }

    // Local direction

    /// Queues one `movement` report. Refuses once the session is over.
    pub fn report_movement(&mut self) -> bool {
        if !self.is_reporting() {
            return false;
        }

        self.next_req_id += 1;
        let envelope = ClientEnvelope::new(
            self.local_player_id(),
            ClientMessage::Movement(self.intent.clone()),
        )
        .with_req_id(self.next_req_id);
        self.outbound.push_back(envelope);
        true
    }

    /// Applies one frame of local state: the avatar's position and whatever
    /// it touched since the previous frame.
    pub fn on_frame_tick(&mut self, sample: FrameSample, now: Instant) {
        self.flush_destroys(now);

        match self.session.as_ref() {
            Some(session) if !session.is_over() => {}
            _ => return,
        }

        if !self.local_hit {
            if let Some(local) = sample.local {
                self.intent.x = local.x;
                self.intent.y = local.y;
                self.intent.facing = local.facing;
            }
        }

        for overlap in sample.overlaps {
            match overlap {
                Overlap::Star(handle) => self.collect_star(handle),
                Overlap::Bomb(handle) => self.hit_bomb(handle, now),
            }
        }
    }

    fn can_interact(&self) -> bool {
        !self.local_hit && self.session.as_ref().is_some_and(Session::is_running)
    }

    fn collect_star(&mut self, handle: Handle) {
        if !self.can_interact() {
            return;
        }
        let Some(star_id) = self.registry.collectibles.find_by_handle(handle).cloned() else {
            debug!("Overlap with unregistered star #{}", handle.0);
            return;
        };

        let score = match self.session.as_mut().map(|session| session.add_score(STAR_POINTS)) {
            Some(Ok(score)) => score,
            _ => return,
        };

        if let Ok(star) = self.registry.collectibles.remove(&star_id) {
            self.scene.destroy(star.handle);
        }
        self.scene.set_score(score);
        self.queue(ClientMessage::CollectStar { star_id });
    }

    fn hit_bomb(&mut self, handle: Handle, now: Instant) {
        if !self.can_interact() {
            return;
        }
        let Some(bomb_id) = self.registry.hazards.find_by_handle(handle).cloned() else {
            debug!("Overlap with unregistered bomb #{}", handle.0);
            return;
        };

        self.local_hit = true;
        if let Ok(bomb) = self.registry.hazards.remove(&bomb_id) {
            self.schedule_destroy(bomb.handle, now);
        }
        if let Some(avatar) = self.local_avatar.take() {
            self.scene.play_animation(avatar, HIT_ANIMATION);
            self.schedule_destroy(avatar, now);
        }

        info!("Hit bomb {}", bomb_id);
        self.queue(ClientMessage::HitBomb { bomb_id });
    }

    /// The user pressed start. Only asks the server; the local state waits
    /// for `game_start`.
    pub fn request_start(&mut self) -> bool {
        if !self.session.as_ref().is_some_and(Session::start_enabled) {
            info!("Start is not available right now");
            return false;
        }

        self.queue(ClientMessage::StartGame {});
        true
    }
}
