//! Text wire protocol spoken between the arena server and its clients.
//!
//! Every message is ASCII, `|`-delimited and starts with a command tag.
//! Both directions are newline-terminated so that either end can recover
//! message boundaries from a byte stream with [`crate::framing::StreamReassembler`].
//!
//! Decoding never panics: anything malformed or truncated comes back as a
//! [`ProtocolError`] and the caller is expected to drop the frame.

use crate::types::{Cell, Direction, GameMode, WorldType};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

/// Longest player name kept, in bytes.
pub const MAX_NAME_LEN: usize = 49;

pub const SERVER_FULL: &str = "SERVER_FULL";

/// Map block glyphs.
pub const MAP_EMPTY: char = '.';
pub const MAP_OBSTACLE: char = '#';
pub const MAP_FRUIT: char = '*';
pub const MAP_HEAD: char = '@';
pub const MAP_BODY: char = '~';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message type '{0}'")]
    UnknownCommand(String),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },
    #[error("map block has {actual} cells, expected {expected}")]
    MapSizeMismatch { expected: usize, actual: usize },
    #[error("unknown record tag '{0}'")]
    UnknownRecord(String),
}

/// Client to server commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `NEW_GAME|<mode>|<world_type>|<time_limit>[|<width>|<height>]`
    NewGame {
        mode: GameMode,
        world_type: WorldType,
        time_limit: u32,
        dimensions: Option<(i32, i32)>,
    },
    /// `PLAYER|<name>`
    Join { name: String },
    /// `MOVE|<slot>|<direction>`. The slot is whatever the client claimed;
    /// the server resolves the real one from the connection.
    Move {
        claimed_slot: i64,
        direction: Direction,
    },
    /// `QUIT[|<slot>]`
    Quit { claimed_slot: Option<i64> },
}

impl Command {
    pub fn decode(frame: &str) -> Result<Command, ProtocolError> {
        let mut fields = Fields::new(frame);
        let tag = fields.tag()?;

        match tag {
            "NEW_GAME" => {
                let mode = fields.int("mode")?;
                let mode = GameMode::from_wire(mode).ok_or_else(|| ProtocolError::InvalidField {
                    field: "mode",
                    value: mode.to_string(),
                })?;
                let world_type = fields.int("world_type")?;
                let world_type =
                    WorldType::from_wire(world_type).ok_or_else(|| ProtocolError::InvalidField {
                        field: "world_type",
                        value: world_type.to_string(),
                    })?;
                let time_limit = fields.parse::<u32>("time_limit")?;
                let dimensions = match fields.optional() {
                    Some(width) => {
                        let width = parse_field::<i32>("width", width)?;
                        let height = fields.parse::<i32>("height")?;
                        Some((width, height))
                    }
                    None => None,
                };
                Ok(Command::NewGame {
                    mode,
                    world_type,
                    time_limit,
                    dimensions,
                })
            }
            "PLAYER" => {
                let name = fields
                    .optional()
                    .map(sanitize_name)
                    .filter(|name| !name.is_empty())
                    .ok_or(ProtocolError::MissingField("name"))?;
                Ok(Command::Join { name })
            }
            "MOVE" => {
                let claimed_slot = fields.int("slot")?;
                let direction = fields.int("direction")?;
                let direction =
                    Direction::from_wire(direction).ok_or_else(|| ProtocolError::InvalidField {
                        field: "direction",
                        value: direction.to_string(),
                    })?;
                Ok(Command::Move {
                    claimed_slot,
                    direction,
                })
            }
            "QUIT" => {
                let claimed_slot = match fields.optional() {
                    Some(slot) => Some(parse_field::<i64>("slot", slot)?),
                    None => None,
                };
                Ok(Command::Quit { claimed_slot })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Newline-terminated wire form.
    pub fn encode(&self) -> String {
        match self {
            Command::NewGame {
                mode,
                world_type,
                time_limit,
                dimensions,
            } => {
                let mut out = format!(
                    "NEW_GAME|{}|{}|{}",
                    mode.to_wire(),
                    world_type.to_wire(),
                    time_limit
                );
                if let Some((width, height)) = dimensions {
                    let _ = write!(out, "|{}|{}", width, height);
                }
                out.push('\n');
                out
            }
            Command::Join { name } => format!("PLAYER|{}\n", sanitize_name(name)),
            Command::Move {
                claimed_slot,
                direction,
            } => format!("MOVE|{}|{}\n", claimed_slot, direction.to_wire()),
            Command::Quit {
                claimed_slot: Some(slot),
            } => format!("QUIT|{}\n", slot),
            Command::Quit { claimed_slot: None } => "QUIT\n".to_string(),
        }
    }
}

/// One player's row in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub slot: usize,
    pub name: String,
    pub alive: bool,
    pub score: u32,
    pub head: Cell,
    pub body_len: usize,
    pub direction: Direction,
}

/// Complete world state at one instant; enough to render a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_id: u32,
    pub width: i32,
    pub height: i32,
    pub active: bool,
    pub game_over: bool,
    pub mode: GameMode,
    pub world_type: WorldType,
    pub elapsed_time: u32,
    pub fruits: Vec<Cell>,
    pub obstacles: Vec<Cell>,
    pub players: Vec<PlayerSnapshot>,
    /// Row-major `width * height` glyphs. Older protocol revisions omit it.
    pub map: Option<String>,
}

impl Snapshot {
    /// Newline-terminated `STATE|...` frame.
    pub fn encode(&self) -> String {
        let (fruit_x, fruit_y) = self
            .fruits
            .first()
            .map(|fruit| (fruit.x, fruit.y))
            .unwrap_or((-1, -1));

        let mut out = String::with_capacity(
            64 + self.map.as_ref().map_or(0, String::len)
                + self.obstacles.len() * 10
                + self.players.len() * (MAX_NAME_LEN + 40),
        );

        let _ = write!(
            out,
            "STATE|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|",
            self.game_id,
            self.width,
            self.height,
            self.players.len(),
            fruit_x,
            fruit_y,
            u8::from(self.active),
            u8::from(self.game_over),
            self.obstacles.len(),
            self.mode.to_wire(),
            self.world_type.to_wire(),
            self.elapsed_time,
        );

        if let Some(map) = &self.map {
            let _ = write!(out, "M|{}|", map);
        }

        for obstacle in &self.obstacles {
            let _ = write!(out, "O|{}|{}|", obstacle.x, obstacle.y);
        }

        for player in &self.players {
            let _ = write!(
                out,
                "P|{}|{}|{}|{}|{}|{}|{}|{}|",
                player.slot,
                player.name,
                u8::from(player.alive),
                player.score,
                player.head.x,
                player.head.y,
                player.body_len,
                player.direction.to_wire(),
            );
        }

        out.push('\n');
        out
    }

    pub fn decode(frame: &str) -> Result<Snapshot, ProtocolError> {
        let mut fields = Fields::new(frame);
        match fields.tag()? {
            "STATE" => Self::decode_body(&mut fields),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    fn decode_body(fields: &mut Fields<'_>) -> Result<Snapshot, ProtocolError> {
        let game_id = fields.parse::<u32>("id")?;
        let width = fields.parse::<i32>("width")?;
        let height = fields.parse::<i32>("height")?;
        // Counts are advisory; the records that follow are authoritative.
        let _num_players = fields.parse::<u32>("num_players")?;
        let fruit_x = fields.parse::<i32>("fruit_x")?;
        let fruit_y = fields.parse::<i32>("fruit_y")?;
        let active = fields.flag("active")?;
        let game_over = fields.flag("game_over")?;
        let _num_obstacles = fields.parse::<u32>("num_obstacles")?;
        let mode = fields.int("mode")?;
        let mode = GameMode::from_wire(mode).ok_or_else(|| ProtocolError::InvalidField {
            field: "mode",
            value: mode.to_string(),
        })?;
        let world_type = fields.int("world_type")?;
        let world_type = WorldType::from_wire(world_type).ok_or_else(|| ProtocolError::InvalidField {
            field: "world_type",
            value: world_type.to_string(),
        })?;
        let elapsed_time = fields.parse::<u32>("elapsed_time")?;

        if width <= 0 || height <= 0 {
            return Err(ProtocolError::InvalidField {
                field: "width",
                value: format!("{}x{}", width, height),
            });
        }

        let mut map = None;
        let mut obstacles = Vec::new();
        let mut players = Vec::new();

        while let Some(tag) = fields.record_tag()? {
            match tag {
                "M" => {
                    let block = fields.required("map")?;
                    let expected = (width as usize) * (height as usize);
                    if block.len() != expected {
                        return Err(ProtocolError::MapSizeMismatch {
                            expected,
                            actual: block.len(),
                        });
                    }
                    if !block.chars().all(is_map_glyph) {
                        return Err(ProtocolError::InvalidField {
                            field: "map",
                            value: block.to_string(),
                        });
                    }
                    map = Some(block.to_string());
                }
                "O" => {
                    let x = fields.parse::<i32>("obstacle_x")?;
                    let y = fields.parse::<i32>("obstacle_y")?;
                    obstacles.push(Cell::new(x, y));
                }
                "P" => {
                    let slot = fields.parse::<usize>("slot")?;
                    let name = fields.required("name")?.to_string();
                    let alive = fields.flag("alive")?;
                    let score = fields.parse::<u32>("score")?;
                    let head_x = fields.parse::<i32>("head_x")?;
                    let head_y = fields.parse::<i32>("head_y")?;
                    let body_len = fields.parse::<usize>("body_len")?;
                    let direction = fields.int("direction")?;
                    let direction =
                        Direction::from_wire(direction).ok_or_else(|| ProtocolError::InvalidField {
                            field: "direction",
                            value: direction.to_string(),
                        })?;
                    players.push(PlayerSnapshot {
                        slot,
                        name,
                        alive,
                        score,
                        head: Cell::new(head_x, head_y),
                        body_len,
                        direction,
                    });
                }
                other => return Err(ProtocolError::UnknownRecord(other.to_string())),
            }
        }

        let fruits = match &map {
            Some(map) => map
                .chars()
                .enumerate()
                .filter(|(_, glyph)| *glyph == MAP_FRUIT)
                .map(|(index, _)| {
                    let index = index as i32;
                    Cell::new(index % width, index / width)
                })
                .collect(),
            None if fruit_x >= 0 && fruit_y >= 0 => vec![Cell::new(fruit_x, fruit_y)],
            None => Vec::new(),
        };

        Ok(Snapshot {
            game_id,
            width,
            height,
            active,
            game_over,
            mode,
            world_type,
            elapsed_time,
            fruits,
            obstacles,
            players,
            map,
        })
    }

    /// Map rows top to bottom, if the frame carried a map block.
    pub fn map_rows(&self) -> Option<Vec<&str>> {
        let map = self.map.as_deref().filter(|map| map.is_ascii())?;
        let width = usize::try_from(self.width).ok().filter(|w| *w > 0)?;
        Some(
            (0..map.len() / width)
                .map(|row| &map[row * width..(row + 1) * width])
                .collect(),
        )
    }

    pub fn player(&self, slot: usize) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|player| player.slot == slot)
    }
}

/// Server to client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `ASSIGN|<slot>|`, sent once after a successful join.
    Assign { slot: usize },
    State(Snapshot),
    /// Capacity rejection, sent right before the server closes the socket.
    ServerFull,
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Assign { slot } => format!("ASSIGN|{}|\n", slot),
            ServerMessage::State(snapshot) => snapshot.encode(),
            ServerMessage::ServerFull => format!("{}\n", SERVER_FULL),
        }
    }

    pub fn decode(frame: &str) -> Result<ServerMessage, ProtocolError> {
        let mut fields = Fields::new(frame);
        match fields.tag()? {
            "ASSIGN" => Ok(ServerMessage::Assign {
                slot: fields.parse::<usize>("slot")?,
            }),
            "STATE" => Snapshot::decode_body(&mut fields).map(ServerMessage::State),
            SERVER_FULL => Ok(ServerMessage::ServerFull),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

fn is_map_glyph(glyph: char) -> bool {
    matches!(
        glyph,
        MAP_EMPTY | MAP_OBSTACLE | MAP_FRUIT | MAP_HEAD | MAP_BODY
    )
}

/// Makes a user-supplied name safe to embed in a frame: drops delimiter and
/// control characters and truncates to [`MAX_NAME_LEN`] bytes on a char
/// boundary.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_NAME_LEN));
    for ch in name.chars() {
        if ch == '|' || ch.is_control() {
            continue;
        }
        if out.len() + ch.len_utf8() > MAX_NAME_LEN {
            break;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ProtocolError> {
    raw.trim().parse::<T>().map_err(|_| ProtocolError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

/// Cursor over the `|`-separated fields of one frame.
struct Fields<'a> {
    parts: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(frame: &'a str) -> Self {
        let frame = frame.trim_end_matches(['\r', '\n']);
        Self {
            parts: frame.split('|'),
        }
    }

    fn tag(&mut self) -> Result<&'a str, ProtocolError> {
        match self.parts.next().map(str::trim) {
            Some(tag) if !tag.is_empty() => Ok(tag),
            _ => Err(ProtocolError::Empty),
        }
    }

    /// Next field, treating an empty trailing field as absent.
    fn optional(&mut self) -> Option<&'a str> {
        self.parts.next().filter(|field| !field.is_empty())
    }

    /// Next record tag. Only the final field may be empty; an empty field
    /// with more after it means a record was cut short.
    fn record_tag(&mut self) -> Result<Option<&'a str>, ProtocolError> {
        match self.parts.next() {
            None => Ok(None),
            Some("") if self.parts.clone().next().is_none() => Ok(None),
            Some("") => Err(ProtocolError::MissingField("record")),
            Some(tag) => Ok(Some(tag)),
        }
    }

    fn required(&mut self, field: &'static str) -> Result<&'a str, ProtocolError> {
        self.optional().ok_or(ProtocolError::MissingField(field))
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T, ProtocolError> {
        let raw = self.required(field)?;
        parse_field(field, raw)
    }

    fn int(&mut self, field: &'static str) -> Result<i64, ProtocolError> {
        self.parse::<i64>(field)
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, ProtocolError> {
        match self.int(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidField {
                field,
                value: other.to_string(),
            }),
        }
    }
}
