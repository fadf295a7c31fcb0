//! Authoritative arena state: grid settings, the player roster, obstacles and fruit.
//!
//! A [`GameWorld`] lives until the next `NEW_GAME` replaces it wholesale.
//! Players are only ever appended, so a player's index in the roster is its
//! slot for the lifetime of the world.

use crate::error::WorldError;
use crate::placement;
use log::info;
use rand::Rng;
use shared::protocol::{sanitize_name, MAP_BODY, MAP_EMPTY, MAP_FRUIT, MAP_HEAD, MAP_OBSTACLE};
use shared::{
    BoundedVec, Cell, Direction, GameMode, PlayerSnapshot, Snapshot, WorldType,
    DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH, IMPLICIT_TIME_LIMIT_SECS, INITIAL_SNAKE_LEN,
    MAX_FRUITS, MAX_OBSTACLES, MAX_PLAYERS, MAX_WORLD_DIMENSION, MIN_WORLD_DIMENSION,
    SNAKE_CAPACITY,
};
use std::time::Instant;

/// Spawn columns are this far apart, starting at x = 5.
const SPAWN_COLUMN_SPACING: i32 = 5;
/// Spawn rows fan out from the middle row this far apart.
const SPAWN_ROW_SPACING: i32 = 3;

/// Parameters a world is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    pub width: i32,
    pub height: i32,
    pub mode: GameMode,
    pub world_type: WorldType,
    /// Seconds; only enforced in [`GameMode::Timed`]
    pub time_limit: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
            mode: GameMode::Timed,
            world_type: WorldType::Wrap,
            time_limit: IMPLICIT_TIME_LIMIT_SECS,
        }
    }
}

impl WorldSettings {
    /// Copy with both dimensions clamped into the supported range.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.clamp(MIN_WORLD_DIMENSION, MAX_WORLD_DIMENSION),
            height: self.height.clamp(MIN_WORLD_DIMENSION, MAX_WORLD_DIMENSION),
            ..self
        }
    }
}

/// One snake.
///
/// `direction` is what the snake moved with last tick; `next_direction` is
/// the buffered input that gets committed at the start of the next tick.
#[derive(Debug, Clone)]
pub struct Player {
    pub slot: usize,
    pub name: String,
    pub alive: bool,
    pub score: u32,
    pub direction: Direction,
    pub next_direction: Direction,
    pub(crate) body: BoundedVec<Cell>,
}

impl Player {
    /// Creates a snake of `length` segments with its body trailing behind
    /// `head`, opposite to `direction`, wrapping at the grid edges.
    pub fn new(
        slot: usize,
        name: impl Into<String>,
        head: Cell,
        direction: Direction,
        length: usize,
        width: i32,
        height: i32,
    ) -> Self {
        let mut body = BoundedVec::new(SNAKE_CAPACITY);
        let behind = direction.opposite();
        let mut segment = head;
        for _ in 0..length.clamp(1, SNAKE_CAPACITY) {
            // Capacity was clamped above, so this cannot fail.
            let _ = body.try_push(segment);
            segment = segment.step(behind).wrapped(width, height);
        }

        Self {
            slot,
            name: name.into(),
            alive: true,
            score: 0,
            direction,
            next_direction: direction,
            body,
        }
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    /// Body cells, head first.
    pub fn body(&self) -> &[Cell] {
        self.body.as_slice()
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Buffers a direction for the next tick. Returns false when the input
    /// is ignored: `None`, or an immediate reversal into the snake's own neck.
    pub fn queue_direction(&mut self, direction: Direction) -> bool {
        if direction == Direction::None {
            return false;
        }
        if self.body_len() > 1 && direction == self.direction.opposite() {
            return false;
        }
        self.next_direction = direction;
        true
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            slot: self.slot,
            name: self.name.clone(),
            alive: self.alive,
            score: self.score,
            head: self.head(),
            body_len: self.body_len(),
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameWorld {
    pub id: u32,
    pub width: i32,
    pub height: i32,
    pub mode: GameMode,
    pub world_type: WorldType,
    pub time_limit: u32,
    pub elapsed_time: u32,
    pub active: bool,
    pub game_over: bool,
    pub start_time: Instant,
    pub(crate) players: BoundedVec<Player>,
    pub(crate) obstacles: BoundedVec<Cell>,
    pub(crate) fruits: BoundedVec<Cell>,
}

impl GameWorld {
    /// Builds a fresh world: random id, and for obstacle worlds a random
    /// obstacle field that keeps every spawn lane clear.
    pub fn new<R: Rng + ?Sized>(settings: WorldSettings, rng: &mut R) -> Self {
        let mut world = Self::empty(settings);
        world.id = rng.gen_range(0..10_000);

        if world.world_type == WorldType::Obstacles {
            let count = placement::obstacle_count(world.width, world.height);
            let reserved = world.reserved_spawn_cells();
            placement::generate_obstacles(&mut world, count, &reserved, rng);
        }

        info!(
            "World {} initialised: {}x{}, mode {:?}, world {:?}, time limit {}s, {} obstacles",
            world.id,
            world.width,
            world.height,
            world.mode,
            world.world_type,
            world.time_limit,
            world.obstacles.len()
        );
        world
    }

    /// A world with no obstacles, fruit or players and id 0.
    pub fn empty(settings: WorldSettings) -> Self {
        let settings = settings.clamped();
        Self {
            id: 0,
            width: settings.width,
            height: settings.height,
            mode: settings.mode,
            world_type: settings.world_type,
            time_limit: settings.time_limit,
            elapsed_time: 0,
            active: false,
            game_over: false,
            start_time: Instant::now(),
            players: BoundedVec::new(MAX_PLAYERS),
            obstacles: BoundedVec::new(MAX_OBSTACLES),
            fruits: BoundedVec::new(MAX_FRUITS),
        }
    }

    /// Candidate starting heads in preference order: columns 5 apart along
    /// the middle row first, then rows fanning out 3 at a time.
    pub fn spawn_lanes(&self) -> Vec<Cell> {
        let middle = self.height / 2;
        let mut rows = vec![middle];
        let mut offset = SPAWN_ROW_SPACING;
        while middle - offset >= 0 || middle + offset < self.height {
            if middle - offset >= 0 {
                rows.push(middle - offset);
            }
            if middle + offset < self.height {
                rows.push(middle + offset);
            }
            offset += SPAWN_ROW_SPACING;
        }

        let columns: Vec<i32> = (SPAWN_COLUMN_SPACING..self.width - 1)
            .step_by(SPAWN_COLUMN_SPACING as usize)
            .collect();

        rows.iter()
            .flat_map(|&y| columns.iter().map(move |&x| Cell::new(x, y)))
            .collect()
    }

    /// Cells a spawn lane needs clear: the initial body and the cell ahead.
    fn lane_cells(&self, head: Cell) -> Vec<Cell> {
        let mut cells = vec![head.step(Direction::Right).wrapped(self.width, self.height)];
        let mut segment = head;
        for _ in 0..INITIAL_SNAKE_LEN {
            cells.push(segment);
            segment = segment.step(Direction::Left).wrapped(self.width, self.height);
        }
        cells
    }

    /// Everything obstacle generation must leave free so that the first
    /// [`MAX_PLAYERS`] joins always get a clean lane.
    fn reserved_spawn_cells(&self) -> Vec<Cell> {
        self.spawn_lanes()
            .into_iter()
            .take(MAX_PLAYERS)
            .flat_map(|head| self.lane_cells(head))
            .collect()
    }

    fn lane_is_clear(&self, head: Cell) -> bool {
        self.lane_cells(head).iter().all(|&cell| {
            !self.is_obstacle(cell) && !self.is_fruit(cell) && !self.occupied_by_snake(cell)
        })
    }

    /// First spawn lane whose cells are clear of obstacles, live snakes and
    /// fruit. When every lane is taken, scans the grid row-major for any
    /// clear run that does not cross an edge. None if the grid has no room.
    pub fn spawn_cell(&self) -> Option<Cell> {
        if let Some(head) = self
            .spawn_lanes()
            .into_iter()
            .find(|&head| self.lane_is_clear(head))
        {
            return Some(head);
        }

        let first_column = INITIAL_SNAKE_LEN as i32 - 1;
        (0..self.height)
            .flat_map(|y| (first_column..self.width - 1).map(move |x| Cell::new(x, y)))
            .find(|&head| self.lane_is_clear(head))
    }

    /// Appends a new snake at the next free spawn cell and tops up fruit.
    pub fn join<R: Rng + ?Sized>(&mut self, name: &str, rng: &mut R) -> Result<usize, WorldError> {
        if self.players.is_full() {
            return Err(WorldError::RosterFull(self.players.capacity()));
        }
        let head = self.spawn_cell().ok_or(WorldError::NoSpawnRoom)?;
        let slot = self.add_player_at(name, head, Direction::Right, INITIAL_SNAKE_LEN)?;
        placement::reconcile_fruits(self, rng);
        Ok(slot)
    }

    /// Appends a snake at an explicit position. The first player into a
    /// world activates it and restarts its clock.
    pub fn add_player_at(
        &mut self,
        name: &str,
        head: Cell,
        direction: Direction,
        length: usize,
    ) -> Result<usize, WorldError> {
        if self.players.is_full() {
            return Err(WorldError::RosterFull(self.players.capacity()));
        }

        let slot = self.players.len();
        let mut name = sanitize_name(name);
        if name.is_empty() {
            name = format!("player{}", slot);
        }
        let player = Player::new(slot, name, head, direction, length, self.width, self.height);

        info!(
            "Player '{}' joined world {} in slot {} at ({}, {})",
            player.name, self.id, slot, head.x, head.y
        );
        self.players
            .try_push(player)
            .map_err(|err| WorldError::RosterFull(err.capacity))?;

        if slot == 0 {
            self.active = true;
            self.game_over = false;
            self.elapsed_time = 0;
            self.start_time = Instant::now();
        }
        Ok(slot)
    }

    pub fn queue_direction(&mut self, slot: usize, direction: Direction) -> Result<bool, WorldError> {
        let player = self
            .players
            .get_mut(slot)
            .ok_or(WorldError::UnknownSlot(slot))?;
        Ok(player.alive && player.queue_direction(direction))
    }

    /// Marks a snake dead (its entry stays in the roster) and retires the
    /// fruit it no longer competes for.
    pub fn kill_player<R: Rng + ?Sized>(&mut self, slot: usize, rng: &mut R) -> Result<(), WorldError> {
        let player = self
            .players
            .get_mut(slot)
            .ok_or(WorldError::UnknownSlot(slot))?;
        if player.alive {
            player.alive = false;
            info!("Player '{}' in slot {} left the game", player.name, slot);
        }
        placement::reconcile_fruits(self, rng);
        Ok(())
    }

    pub fn players(&self) -> &[Player] {
        self.players.as_slice()
    }

    pub fn player(&self, slot: usize) -> Option<&Player> {
        self.players.get(slot)
    }

    pub fn obstacles(&self) -> &[Cell] {
        self.obstacles.as_slice()
    }

    pub fn fruits(&self) -> &[Cell] {
        self.fruits.as_slice()
    }

    pub fn add_obstacle(&mut self, cell: Cell) -> Result<(), shared::CapacityError<Cell>> {
        self.obstacles.try_push(cell)
    }

    pub fn add_fruit(&mut self, cell: Cell) -> Result<(), shared::CapacityError<Cell>> {
        self.fruits.try_push(cell)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    pub fn is_fruit(&self, cell: Cell) -> bool {
        self.fruits.contains(&cell)
    }

    /// True if any living snake's body covers `cell`.
    pub fn occupied_by_snake(&self, cell: Cell) -> bool {
        self.players
            .iter()
            .filter(|player| player.alive)
            .any(|player| player.body().contains(&cell))
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|player| player.alive).count()
    }

    pub fn reconcile_fruits<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        placement::reconcile_fruits(self, rng);
    }

    /// Row-major glyph grid. Later layers overwrite earlier ones: obstacles,
    /// fruit, living bodies, living heads.
    pub fn render_map(&self) -> String {
        let width = self.width as usize;
        let mut grid = vec![MAP_EMPTY; width * self.height as usize];
        let mut paint = |cell: Cell, glyph: char| {
            if cell.in_bounds(self.width, self.height) {
                grid[cell.y as usize * width + cell.x as usize] = glyph;
            }
        };

        for &cell in &self.obstacles {
            paint(cell, MAP_OBSTACLE);
        }
        for &cell in &self.fruits {
            paint(cell, MAP_FRUIT);
        }
        let alive = || self.players.iter().filter(|player| player.alive);
        for player in alive() {
            for &cell in &player.body()[1..] {
                paint(cell, MAP_BODY);
            }
        }
        for player in alive() {
            paint(player.head(), MAP_HEAD);
        }

        grid.into_iter().collect()
    }

    /// Full snapshot for broadcast. Fruit is listed in row-major order so it
    /// matches the order a decoder recovers from the map.
    pub fn snapshot(&self) -> Snapshot {
        let mut fruits = self.fruits.as_slice().to_vec();
        fruits.sort_by_key(|cell| (cell.y, cell.x));

        Snapshot {
            game_id: self.id,
            width: self.width,
            height: self.height,
            active: self.active,
            game_over: self.game_over,
            mode: self.mode,
            world_type: self.world_type,
            elapsed_time: self.elapsed_time,
            fruits,
            obstacles: self.obstacles.as_slice().to_vec(),
            players: self.players.iter().map(Player::snapshot).collect(),
            map: Some(self.render_map()),
        }
    }
}
