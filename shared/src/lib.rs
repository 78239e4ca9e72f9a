use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_WIDTH: f32 = 32.0;
pub const PLAYER_HEIGHT: f32 = 48.0;
pub const STAR_SIZE: f32 = 24.0;
pub const BOMB_SIZE: f32 = 14.0;
pub const PLAYER_SPEED: f32 = 160.0;

/// Where a peer appears when the server has not told us its position yet.
pub const PLAYER_SPAWN_X: f32 = 100.0;
pub const PLAYER_SPAWN_Y: f32 = 450.0;

/// Points awarded locally for each collected star.
pub const STAR_POINTS: u32 = 10;

/// Value of the `type` field on every outbound envelope.
pub const ENVELOPE_TYPE: &str = "game_event";

pub type EntityId = String;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no topic")]
    MissingTopic,
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown game state {0}")]
pub struct InvalidSessionState(pub u8);

/// Lifecycle of a game room as reported by the server (1, 2, 3 on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SessionState {
    Ready,
    Running,
    Over,
}

impl TryFrom<u8> for SessionState {
    type Error = InvalidSessionState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SessionState::Ready),
            2 => Ok(SessionState::Running),
            3 => Ok(SessionState::Over),
            other => Err(InvalidSessionState(other)),
        }
    }
}

impl From<SessionState> for u8 {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Ready => 1,
            SessionState::Running => 2,
            SessionState::Over => 3,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Over => "over",
        };
        f.write_str(name)
    }
}

/// Direction a player sprite faces. Anything the client does not recognise
/// (the server seeds `"front"`) is treated as the idle pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Right,
    #[default]
    #[serde(other)]
    Turn,
}

impl Facing {
    pub fn animation(self) -> &'static str {
        match self {
            Facing::Left => "left",
            Facing::Right => "right",
            Facing::Turn => "turn",
        }
    }
}

// Inbound payload shapes

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerSnapshot {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub facing: Option<Facing>,
    pub alive: Option<bool>,
    pub score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StarState {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BombState {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default)]
    pub hit: bool,
}

/// Stars and bombs handed out at the start of a round.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoundLayout {
    #[serde(default)]
    pub stars: HashMap<EntityId, StarState>,
    #[serde(default)]
    pub bombs: HashMap<EntityId, BombState>,
}

/// Latest sampled state of the local player; also the payload peers receive
/// back as `player_movement`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub player_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum ServerMessage {
    Init {
        player_id: EntityId,
        game_state: SessionState,
        #[serde(default)]
        players: HashMap<EntityId, PlayerSnapshot>,
        #[serde(default)]
        stars: HashMap<EntityId, StarState>,
        #[serde(default)]
        bombs: HashMap<EntityId, BombState>,
    },
    PlayerJoined {
        player_id: EntityId,
    },
    PlayerLeft {
        player_id: EntityId,
    },
    GameStart {
        payload: RoundLayout,
    },
    NextRound(RoundLayout),
    GameOver,
    PlayerMovement {
        player_id: EntityId,
        payload: MovementIntent,
    },
    StarCollected {
        star_id: EntityId,
    },
    BombHit {
        player_id: EntityId,
        bomb_id: EntityId,
    },
    Ack {
        #[serde(default)]
        req_id: Option<u64>,
    },
    #[serde(other)]
    Unknown,
}

/// A decoded inbound frame. The topic is kept alongside the message so
/// unknown topics can still be reported by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub topic: String,
    pub message: ServerMessage,
}

pub fn decode(text: &str) -> Result<Inbound, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

    let topic = match &value {
        serde_json::Value::Object(fields) => fields
            .get("topic")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or(ProtocolError::MissingTopic)?,
        _ => return Err(ProtocolError::NotAnObject),
    };

    let message = ServerMessage::deserialize(value).map_err(ProtocolError::Malformed)?;
    Ok(Inbound { topic, message })
}

// Outbound

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Connect {},
    Movement(MovementIntent),
    CollectStar { star_id: EntityId },
    HitBomb { bomb_id: EntityId },
    StartGame {},
}

impl ClientMessage {
    pub fn topic(&self) -> &'static str {
        match self {
            ClientMessage::Connect {} => "connect",
            ClientMessage::Movement(_) => "movement",
            ClientMessage::CollectStar { .. } => "collect_star",
            ClientMessage::HitBomb { .. } => "hit_bomb",
            ClientMessage::StartGame {} => "start_game",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    kind: &'static str,
    pub player_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<u64>,
    #[serde(flatten)]
    pub message: ClientMessage,
}

impl ClientEnvelope {
    pub fn new(player_id: impl Into<EntityId>, message: ClientMessage) -> Self {
        Self {
            kind: ENVELOPE_TYPE,
            player_id: player_id.into(),
            req_id: None,
            message,
        }
    }

    pub fn with_req_id(mut self, req_id: u64) -> Self {
        self.req_id = Some(req_id);
        self
    }

    pub fn topic(&self) -> &'static str {
        self.message.topic()
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Axis-aligned box described by its centre, matching how sprites are placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn centered(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn edges(&self) -> (f32, f32, f32, f32) {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        (
            self.x - half_w,
            self.y - half_h,
            self.x + half_w,
            self.y + half_h,
        )
    }
}

pub fn check_overlap(a: &Bounds, b: &Bounds) -> bool {
    let (x1, y1, x2, y2) = a.edges();
    let (x3, y3, x4, y4) = b.edges();

    !(x2 <= x3 || x4 <= x1 || y2 <= y3 || y4 <= y1)
}
