//! Error types for the arena server.

use thiserror::Error;

/// Failures that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("port {port} is outside the allowed range {min}-{max}")]
    PortOutOfRange { port: u16, min: u16, max: u16 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Rejections from [`crate::world::GameWorld`] mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("world roster is full ({0} players)")]
    RosterFull(usize),

    #[error("no player in slot {0}")]
    UnknownSlot(usize),

    #[error("no free room on the grid for a new snake")]
    NoSpawnRoom,
}
