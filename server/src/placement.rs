//! Obstacle and fruit placement by bounded rejection sampling.
//!
//! Neither policy loops forever. Obstacle generation may place fewer cells
//! than requested; fruit placement falls back to a full scan and finally to
//! [`FALLBACK_FRUIT_CELL`].

use crate::world::GameWorld;
use log::{debug, info, warn};
use rand::Rng;
use shared::{Cell, MAX_FRUITS, MAX_OBSTACLES};

/// Random draws per fruit before falling back to a scan.
pub const FRUIT_SPAWN_ATTEMPTS: usize = 3000;

/// Last-resort fruit position when the grid has no free cell.
pub const FALLBACK_FRUIT_CELL: Cell = Cell::new(0, 0);

/// Obstacles requested for a `width` x `height` obstacle world.
pub fn obstacle_count(width: i32, height: i32) -> usize {
    ((width.max(0) * height.max(0)) as usize / 8).min(MAX_OBSTACLES)
}

pub fn random_cell<R: Rng + ?Sized>(width: i32, height: i32, rng: &mut R) -> Cell {
    Cell::new(rng.gen_range(0..width), rng.gen_range(0..height))
}

/// Places up to `count` distinct obstacles outside `reserved`, giving up
/// after `3 * count` draws. Returns how many were placed.
pub fn generate_obstacles<R: Rng + ?Sized>(
    world: &mut GameWorld,
    count: usize,
    reserved: &[Cell],
    rng: &mut R,
) -> usize {
    let mut placed = 0;
    let mut attempts = 0;

    while placed < count && attempts < count * 3 {
        attempts += 1;
        let cell = random_cell(world.width, world.height, rng);
        if reserved.contains(&cell) || world.is_obstacle(cell) {
            continue;
        }
        if world.add_obstacle(cell).is_err() {
            break;
        }
        placed += 1;
    }

    if placed < count {
        info!(
            "Placed {} of {} obstacles after {} attempts",
            placed, count, attempts
        );
    }
    placed
}

fn is_free_for_fruit(world: &GameWorld, cell: Cell) -> bool {
    !world.is_obstacle(cell)
        && !world.is_fruit(cell)
        && !world
            .players()
            .iter()
            .any(|player| player.body().contains(&cell))
}

/// Picks a cell clear of obstacles, every snake body (dead or alive) and
/// existing fruit.
pub fn find_fruit_cell<R: Rng + ?Sized>(world: &GameWorld, rng: &mut R) -> Cell {
    for _ in 0..FRUIT_SPAWN_ATTEMPTS {
        let cell = random_cell(world.width, world.height, rng);
        if is_free_for_fruit(world, cell) {
            return cell;
        }
    }

    // Nearly full grid: a deterministic scan still finds any free cell.
    for y in 0..world.height {
        for x in 0..world.width {
            let cell = Cell::new(x, y);
            if is_free_for_fruit(world, cell) {
                return cell;
            }
        }
    }

    warn!(
        "No free cell for fruit in world {}, falling back to ({}, {})",
        world.id, FALLBACK_FRUIT_CELL.x, FALLBACK_FRUIT_CELL.y
    );
    FALLBACK_FRUIT_CELL
}

/// Moves the fruit at `index` to a fresh cell, keeping its position in
/// the list.
pub fn respawn_fruit<R: Rng + ?Sized>(world: &mut GameWorld, index: usize, rng: &mut R) {
    if index >= world.fruits.len() {
        return;
    }
    let eaten = world.fruits.remove(index);
    let cell = find_fruit_cell(world, rng);
    if world.fruits.try_insert(index, cell).is_err() {
        return;
    }
    debug!(
        "Fruit at ({}, {}) respawned at ({}, {})",
        eaten.x, eaten.y, cell.x, cell.y
    );
}

/// Brings the fruit count to the number of living snakes (capped at
/// [`MAX_FRUITS`]), spawning or retiring from the back.
pub fn reconcile_fruits<R: Rng + ?Sized>(world: &mut GameWorld, rng: &mut R) {
    let target = world.alive_count().min(MAX_FRUITS);

    while world.fruits.len() > target {
        if let Some(cell) = world.fruits.pop() {
            debug!("Retired fruit at ({}, {})", cell.x, cell.y);
        }
    }

    while world.fruits.len() < target {
        let cell = find_fruit_cell(world, rng);
        if world.add_fruit(cell).is_err() {
            break;
        }
        debug!("Spawned fruit at ({}, {})", cell.x, cell.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldSettings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{Direction, GameMode, WorldType};

    fn world(width: i32, height: i32) -> GameWorld {
        GameWorld::empty(WorldSettings {
            width,
            height,
            mode: GameMode::Standard,
            world_type: WorldType::Obstacles,
            time_limit: 0,
        })
    }

    #[test]
    fn test_obstacle_count_is_capped() {
        assert_eq!(obstacle_count(10, 10), 12);
        assert_eq!(obstacle_count(20, 10), 25);
        assert_eq!(obstacle_count(40, 20), MAX_OBSTACLES);
    }

    #[test]
    fn test_obstacles_are_distinct_and_skip_reserved() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut world = world(10, 10);
        let reserved = vec![Cell::new(5, 5), Cell::new(4, 5)];

        let placed = generate_obstacles(&mut world, 12, &reserved, &mut rng);
        assert_eq!(placed, world.obstacles().len());
        assert!(placed <= 12);
        for (i, cell) in world.obstacles().iter().enumerate() {
            assert!(!reserved.contains(cell));
            assert!(!world.obstacles()[i + 1..].contains(cell));
        }
    }

    #[test]
    fn test_obstacle_generation_gives_up() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut world = world(10, 10);
        let reserved: Vec<Cell> = (0..10)
            .flat_map(|y| (0..10).map(move |x| Cell::new(x, y)))
            .collect();

        assert_eq!(generate_obstacles(&mut world, 12, &reserved, &mut rng), 0);
        assert!(world.obstacles().is_empty());
    }

    #[test]
    fn test_fruit_avoids_everything() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut world = world(10, 10);
        world.add_obstacle(Cell::new(1, 1)).unwrap();
        world
            .add_player_at("ann", Cell::new(5, 5), Direction::Right, 3)
            .unwrap();

        for _ in 0..200 {
            let cell = find_fruit_cell(&world, &mut rng);
            assert!(cell.in_bounds(10, 10));
            assert!(!world.is_obstacle(cell));
            assert!(!world.player(0).unwrap().body().contains(&cell));
        }
    }

    /// Gives slot 0 a body covering every cell except `skip`.
    fn fill_grid(world: &mut GameWorld, skip: Option<Cell>) {
        world
            .add_player_at("long", Cell::new(0, 0), Direction::Right, 1)
            .unwrap();
        let body = &mut world.players[0].body;
        body.clear();
        for y in 0..world.height {
            for x in 0..world.width {
                let cell = Cell::new(x, y);
                if Some(cell) != skip {
                    body.try_push(cell).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_fruit_scan_finds_last_free_cell() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut world = world(10, 10);
        fill_grid(&mut world, Some(Cell::new(7, 8)));
        assert_eq!(find_fruit_cell(&world, &mut rng), Cell::new(7, 8));
    }

    #[test]
    fn test_fruit_falls_back_on_full_grid() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut world = world(10, 10);
        fill_grid(&mut world, None);
        assert_eq!(find_fruit_cell(&world, &mut rng), FALLBACK_FRUIT_CELL);
    }

    #[test]
    fn test_reconcile_tracks_alive_count() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut world = world(20, 10);
        world
            .add_player_at("ann", Cell::new(5, 5), Direction::Right, 3)
            .unwrap();
        world
            .add_player_at("bob", Cell::new(10, 5), Direction::Right, 3)
            .unwrap();

        reconcile_fruits(&mut world, &mut rng);
        assert_eq!(world.fruits().len(), 2);

        world.players[0].alive = false;
        reconcile_fruits(&mut world, &mut rng);
        assert_eq!(world.fruits().len(), 1);
    }

    #[test]
    fn test_respawn_keeps_count_and_moves() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut world = world(10, 10);
        world.add_fruit(Cell::new(3, 3)).unwrap();
        world.add_fruit(Cell::new(6, 6)).unwrap();

        respawn_fruit(&mut world, 0, &mut rng);
        assert_eq!(world.fruits().len(), 2);
        assert_eq!(world.fruits()[1], Cell::new(6, 6));
        assert_ne!(world.fruits()[0], Cell::new(6, 6));
    }
}
