//! Types and wire protocol shared by the snake arena server and its clients.

pub mod bounded;
pub mod framing;
pub mod protocol;
pub mod types;

pub use bounded::{BoundedVec, CapacityError};
pub use framing::StreamReassembler;
pub use protocol::{Command, PlayerSnapshot, ProtocolError, ServerMessage, Snapshot};
pub use types::{Cell, Direction, GameMode, WorldType};

pub const DEFAULT_PORT: u16 = 22346;
pub const MIN_PORT: u16 = 20000;
pub const MAX_PORT: u16 = 60000;

pub const DEFAULT_WORLD_WIDTH: i32 = 40;
pub const DEFAULT_WORLD_HEIGHT: i32 = 20;
pub const MIN_WORLD_DIMENSION: i32 = 10;
pub const MAX_WORLD_DIMENSION: i32 = 60;

pub const INITIAL_SNAKE_LEN: usize = 3;
pub const SNAKE_CAPACITY: usize = 1000;
pub const MAX_PLAYERS: usize = 10;
pub const MAX_OBSTACLES: usize = 50;
pub const MAX_FRUITS: usize = 10;
pub const FRUIT_REWARD: u32 = 10;

pub const DEFAULT_FPS: u32 = 5;
pub const MAX_FPS: u32 = 60;
pub const DEFAULT_MAX_CLIENTS: usize = 4;

/// Time limit used for the implicit world a bare `PLAYER` creates: a year.
pub const IMPLICIT_TIME_LIMIT_SECS: u32 = 365 * 24 * 3600;
