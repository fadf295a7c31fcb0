//! # Snake Arena Server Library
//!
//! This library provides the authoritative server for the multiplayer snake
//! arena. It owns the canonical world, applies commands arriving from any
//! number of TCP connections, advances the simulation at a fixed rate and
//! pushes a full snapshot to every connection after each step.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Movement, collisions, fruit pickup and game-over rules are decided here
//! only. Clients send intents (`MOVE`, `QUIT`) and render whatever the next
//! snapshot says.
//!
//! ### Connection Management
//! Handles the complete lifecycle of client connections:
//! - Admission against a bounded pool, with `SERVER_FULL` for the overflow
//! - Binding a connection to the player slot it created with `PLAYER`
//! - Releasing the slot and killing its snake when the connection ends
//!
//! ### State Broadcasting
//! Every tick the world is encoded once and offered to every connection's
//! outbound queue. A slow reader misses frames instead of holding up the
//! others; the next snapshot replaces whatever it missed.
//!
//! ## Architecture Design
//!
//! ### One Coarse Lock
//! The world and the connection table live together in a
//! [`game::GameContext`] behind a single `tokio::sync::Mutex`. Every
//! command application, tick and snapshot encode holds it for its whole
//! duration, so commands never interleave with a tick. No socket I/O
//! happens while the lock is held.
//!
//! ### Task Layout
//! - **Accept loop**: admits or rejects incoming connections
//! - **Tick loop**: `tokio::time::interval` at the configured rate, ticks
//!   the world and broadcasts
//! - **Session task** (per connection): reads, reassembles, decodes and
//!   applies commands
//! - **Writer task** (per connection): drains the outbound queue into the
//!   socket
//!
//! Shutdown is cooperative through a `watch` channel that every loop checks.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! Grid settings, players and their bodies, obstacles and fruit, map
//! rendering and snapshots.
//!
//! ### Placement Module (`placement`)
//! Bounded rejection sampling for obstacles and fruit.
//!
//! ### Simulation Module (`simulation`)
//! The per-tick state machine and its collision rules.
//!
//! ### Connection Table Module (`connection_table`)
//! Connection pool, slot bindings and non-blocking outbound queues.
//!
//! ### Game Module (`game`)
//! The lock-protected context and command application.
//!
//! ### Session, Broadcast and Network Modules
//! Async tasks wiring sockets to the context.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 22346,
//!         tick_rate: 10,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Binds after validating the port against the allowed range
//!     let server = Server::bind(config).await?;
//!     let shutdown = server.shutdown_handle();
//!
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         shutdown.shutdown();
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection_table;
pub mod error;
pub mod game;
pub mod network;
pub mod placement;
pub mod session;
pub mod simulation;
pub mod world;

pub use config::ServerConfig;
pub use error::{ServerError, WorldError};
pub use network::{Server, ShutdownHandle};
