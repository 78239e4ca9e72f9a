//! Client configuration and endpoint addressing

use crate::error::ClientError;
use std::time::Duration;

pub const DEFAULT_MOVEMENT_INTERVAL: Duration = Duration::from_millis(33);
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_HIT_GRACE: Duration = Duration::from_millis(100);

/// Session endpoint: a server address and the room to join on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub server: String,
    pub room: String,
}

impl Endpoint {
    pub fn new(server: impl Into<String>, room: impl Into<String>) -> Result<Self, ClientError> {
        let server = server.into();
        let room = room.into();

        if server.is_empty() {
            return Err(ClientError::InvalidEndpoint("server address is empty".into()));
        }
        if room.is_empty() || !room.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ClientError::InvalidEndpoint(format!("bad room name {:?}", room)));
        }

        Ok(Self { server, room })
    }

    /// WebSocket URL of the room, e.g. `ws://127.0.0.1:8000/ws/game/lobby/`.
    /// A server given with an explicit `ws://` or `wss://` scheme keeps it.
    pub fn url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        if server.starts_with("ws://") || server.starts_with("wss://") {
            format!("{}/ws/game/{}/", server, self.room)
        } else {
            format!("ws://{}/ws/game/{}/", server, self.room)
        }
    }
}

/// Timing knobs for the run loop and the synchronization engine.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Cadence of outbound `movement` reports.
    pub movement_interval: Duration,
    /// Cadence of scene sampling.
    pub frame_interval: Duration,
    /// Delay between a lethal hit and destroying the visuals involved.
    pub hit_grace: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            movement_interval: DEFAULT_MOVEMENT_INTERVAL,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            hit_grace: DEFAULT_HIT_GRACE,
        }
    }

    pub fn with_movement_interval(mut self, interval: Duration) -> Self {
        self.movement_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_hit_grace(mut self, grace: Duration) -> Self {
        self.hit_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let endpoint = Endpoint::new("127.0.0.1:8000", "lobby").unwrap();
        assert_eq!(endpoint.url(), "ws://127.0.0.1:8000/ws/game/lobby/");

        let endpoint = Endpoint::new("wss://play.example.com/", "room-2").unwrap();
        assert_eq!(endpoint.url(), "wss://play.example.com/ws/game/room-2/");
    }

    #[test]
    fn test_endpoint_rejects_bad_room() {
        assert!(Endpoint::new("127.0.0.1:8000", "").is_err());
        assert!(Endpoint::new("127.0.0.1:8000", "a/b").is_err());
        assert!(Endpoint::new("", "lobby").is_err());
    }

    #[test]
    fn test_config_defaults_and_clamping() {
        let endpoint = Endpoint::new("localhost:8000", "lobby").unwrap();
        let config = ClientConfig::new(endpoint).with_movement_interval(Duration::ZERO);

        assert_eq!(config.movement_interval, Duration::from_millis(1));
        assert_eq!(config.frame_interval, DEFAULT_FRAME_INTERVAL);
        assert_eq!(config.hit_grace, DEFAULT_HIT_GRACE);
    }
}
