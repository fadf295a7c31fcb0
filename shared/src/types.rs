//! Grid primitives shared by the server simulation and the client view.

use serde::{Deserialize, Serialize};

/// A single grid cell. Signed so that a candidate move one step past the
/// edge can be represented before the boundary policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring cell in `direction`, without any bounds handling.
    pub fn step(self, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }

    /// Folds the cell back onto a `width` x `height` torus.
    pub fn wrapped(self, width: i32, height: i32) -> Cell {
        Cell::new(self.x.rem_euclid(width), self.y.rem_euclid(height))
    }
}

/// Heading of a snake. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    None = 4,
}

impl Direction {
    pub fn from_wire(value: i64) -> Option<Direction> {
        match value {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            4 => Some(Direction::None),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }

    /// Unit vector on the grid; y grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Runs until every snake is dead.
    Standard = 1,
    /// Runs until the time limit elapses.
    Timed = 2,
}

impl GameMode {
    pub fn from_wire(value: i64) -> Option<GameMode> {
        match value {
            1 => Some(GameMode::Standard),
            2 => Some(GameMode::Timed),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldType {
    /// Leaving one edge re-enters from the opposite edge.
    Wrap = 1,
    /// Leaving the grid, or entering an obstacle cell, is fatal.
    Obstacles = 2,
}

impl WorldType {
    pub fn from_wire(value: i64) -> Option<WorldType> {
        match value {
            1 => Some(WorldType::Wrap),
            2 => Some(WorldType::Obstacles),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_applies_unit_vector() {
        let cell = Cell::new(5, 5);
        assert_eq!(cell.step(Direction::Up), Cell::new(5, 4));
        assert_eq!(cell.step(Direction::Down), Cell::new(5, 6));
        assert_eq!(cell.step(Direction::Left), Cell::new(4, 5));
        assert_eq!(cell.step(Direction::Right), Cell::new(6, 5));
        assert_eq!(cell.step(Direction::None), cell);
    }

    #[test]
    fn test_wrapping_handles_negative_coordinates() {
        assert_eq!(Cell::new(-1, 3).wrapped(20, 10), Cell::new(19, 3));
        assert_eq!(Cell::new(20, -1).wrapped(20, 10), Cell::new(0, 9));
        assert_eq!(Cell::new(7, 7).wrapped(20, 10), Cell::new(7, 7));
    }

    #[test]
    fn test_bounds_check() {
        assert!(Cell::new(0, 0).in_bounds(10, 10));
        assert!(Cell::new(9, 9).in_bounds(10, 10));
        assert!(!Cell::new(10, 0).in_bounds(10, 10));
        assert!(!Cell::new(0, -1).in_bounds(10, 10));
    }

    #[test]
    fn test_direction_wire_values() {
        for value in 0..=4 {
            let direction = Direction::from_wire(value).unwrap();
            assert_eq!(direction.to_wire() as i64, value);
        }
        assert_eq!(Direction::from_wire(5), None);
        assert_eq!(Direction::from_wire(-1), None);
    }

    #[test]
    fn test_opposites() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn test_mode_and_world_type_wire_values() {
        assert_eq!(GameMode::from_wire(1), Some(GameMode::Standard));
        assert_eq!(GameMode::from_wire(2), Some(GameMode::Timed));
        assert_eq!(GameMode::from_wire(3), None);
        assert_eq!(WorldType::from_wire(1), Some(WorldType::Wrap));
        assert_eq!(WorldType::from_wire(2), Some(WorldType::Obstacles));
        assert_eq!(WorldType::from_wire(0), None);
    }
}
