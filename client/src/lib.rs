//! # Game Client Library
//!
//! Client side of a small room-based multiplayer game. The server owns the
//! session; this crate keeps a local view of it in sync and reports the local
//! player's movement and collisions back.
//!
//! ## Architecture Overview
//!
//! Messages travel as JSON text frames over a WebSocket. Everything between
//! the socket and the screen is split so the interesting part, the
//! synchronization engine, runs without either:
//!
//! ### Transport (`transport`)
//! Owns the socket. A reader task turns frames into events, a writer task
//! drains queued text frames.
//!
//! ### Synchronization Engine (`sync`)
//! Consumes decoded server messages and local frame samples. Produces scene
//! effects and queued outbound messages. It never awaits anything, which
//! keeps it deterministic under test.
//!
//! ### Registry (`registry`) and Session (`session`)
//! Server id to visual handle bookkeeping per entity category, and the
//! `Ready -> Running -> Over` lifecycle with the local score.
//!
//! ### Scene (`scene`)
//! The rendering/physics boundary. [`scene::HeadlessScene`] is the terminal
//! implementation used by the binary.
//!
//! ### Input (`input`) and Network (`network`)
//! Line commands from stdin, and the run loop tying all of the above together
//! with `tokio::select!`.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::{ClientConfig, Endpoint};
//! use client::network::Client;
//!
//! # async fn run() -> Result<(), client::error::ClientError> {
//! let endpoint = Endpoint::new("127.0.0.1:8000", "lobby")?;
//! let mut client = Client::new(ClientConfig::new(endpoint)).await?;
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod network;
pub mod registry;
pub mod scene;
pub mod session;
pub mod sync;
pub mod transport;
