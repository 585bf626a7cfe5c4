//! # Space Battle Client Library
//!
//! Client-side state reconciliation and entity lifecycle for a multiplayer
//! space shooter. The room server is authoritative; this crate keeps a local
//! copy of its world in sync, predicts the locally controlled ship, and turns
//! local overlaps into gameplay commands.
//!
//! ## Architecture Overview
//!
//! Everything happens inside a single synchronous [`game::Game::tick`].
//! Network I/O runs on tokio tasks behind the [`transport::Transport`] seam
//! and only reaches the world at the start of a tick, when the inbound queue
//! is drained.
//!
//! ### Entity Stores
//! One pooled store per kind (players, stars, lasers), keyed by the server
//! id. Despawns are flagged first and purged once per tick; slots carry
//! generation counters so deferred actions can never touch a recycled slot.
//!
//! ### Interpolation
//! Remote entities move a fixed fraction of the remaining distance to their
//! latest server transform every tick. Lasers additionally fly along their
//! velocity between updates.
//!
//! ### Local Prediction
//! The local ship moves immediately on input. Its transform is sent only
//! when it changed since the last successful send.
//!
//! ### Session
//! Joins a shared room, measures RTT with a 3 s heartbeat, and resumes the
//! room session after 5 s without a pong.
//!
//! ## Module Organization
//!
//! - `config`: gameplay and netcode tunables
//! - `entity`, `store`: typed entity records and their pooled stores
//! - `interpolation`, `overlap`: per-tick motion smoothing and hit tests
//! - `scheduler`: deferred projectile despawns and shoot cooldowns
//! - `rtt`, `session`: heartbeat and the connection state machine
//! - `transport`, `network`: the transport seam, in-memory and UDP backends
//! - `game`: the coordinator
//! - `hud`, `input`, `rendering`: presentation
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::GameConfig;
//! use client::game::Game;
//! use client::input::InputState;
//! use client::transport::MemoryTransport;
//!
//! let mut game = Game::new(GameConfig::default(), MemoryTransport::new());
//! game.connect(0)?;
//! game.request_spawn(0);
//!
//! let mut now = 0;
//! loop {
//!     now += 16;
//!     for event in game.tick(now, &InputState::default()) {
//!         println!("{:?}", event);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod entity;
pub mod game;
pub mod hud;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod overlap;
pub mod rendering;
pub mod rtt;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod transport;
