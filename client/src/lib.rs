//! # Snake Arena Client Library
//!
//! This library provides a headless client for the snake arena server. It
//! speaks the wire protocol, keeps the latest authoritative snapshot and turns
//! simple line input into commands. Drawing the grid is left to whatever
//! presentation layer consumes the snapshot feed.
//!
//! ## Architecture Overview
//!
//! The server is fully authoritative; the client does no prediction. Each
//! snapshot replaces the previous one wholesale, so a lost or discarded frame
//! costs at most one tick of staleness.
//!
//! ### Stream Reassembly
//! TCP delivers bytes, not messages. Incoming data goes through the shared
//! `StreamReassembler`, which yields complete newline-terminated frames no
//! matter how the server's writes were split or merged in transit.
//!
//! ### Freshness
//! The view records when each snapshot arrived so a presentation layer can
//! mark it stale when the feed stalls.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - Connection setup and command sending
//! - Frame reassembly and decoding, skipping malformed frames
//!
//! ### Game Module (`game`)
//! - Latest snapshot, assigned slot and arrival time
//! - Serialisable view for the JSON feed
//!
//! ### Input Module (`input`)
//! - Key-to-action mapping (`w`/`a`/`s`/`d`, `q`)
//! - Action-to-command translation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGameState;
//! use client::network::ServerConnection;
//! use shared::Command;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connection = ServerConnection::connect("127.0.0.1:22346").await?;
//!     connection
//!         .send(&Command::Join {
//!             name: "ann".to_string(),
//!         })
//!         .await?;
//!
//!     let mut state = ClientGameState::new();
//!     loop {
//!         let message = connection.next_message().await?;
//!         if state.apply(message) {
//!             if let Some(me) = state.me() {
//!                 println!("score {}", me.score);
//!             }
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod game;
pub mod input;
pub mod network;

pub use error::ClientError;
