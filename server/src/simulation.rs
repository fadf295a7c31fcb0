//! Fixed-step simulation: movement, collisions, fruit pickup and game-over checks.
//!
//! Collisions against other snakes are resolved against the bodies as they
//! stood when the tick began, so the outcome does not depend on the order in
//! which slots are processed. Two heads entering the same empty cell in one
//! tick both survive.

use crate::placement;
use crate::world::GameWorld;
use log::{debug, info, warn};
use rand::Rng;
use shared::{BoundedVec, Cell, Direction, GameMode, WorldType, FRUIT_REWARD, MAX_FRUITS};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Left the grid in an obstacle world
    Wall,
    Obstacle,
    SelfCollision,
    /// Ran into another snake's pre-tick body
    SnakeCollision,
}

/// What happened during one call to [`tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// False when the world was idle, over, or ran out of time this tick
    pub advanced: bool,
    pub deaths: Vec<(usize, DeathCause)>,
    /// Slots that picked up fruit
    pub fruit_eaten: Vec<usize>,
    pub time_up: bool,
    /// Standard-mode game ended because no snake is left alive
    pub all_dead: bool,
}

enum Step {
    Idle,
    Moved,
    Ate(usize),
    Died(DeathCause),
}

/// Advances `world` by one step, using `now` as the wall clock.
pub fn tick<R: Rng + ?Sized>(world: &mut GameWorld, now: Instant, rng: &mut R) -> TickReport {
    let mut report = TickReport::default();
    if !world.active || world.game_over {
        return report;
    }

    let elapsed = now.saturating_duration_since(world.start_time).as_secs();
    world.elapsed_time = u32::try_from(elapsed).unwrap_or(u32::MAX);

    if world.mode == GameMode::Timed && world.elapsed_time >= world.time_limit {
        world.active = false;
        world.game_over = true;
        report.time_up = true;
        info!(
            "World {} time limit of {}s reached, game over",
            world.id, world.time_limit
        );
        return report;
    }

    report.advanced = true;

    let pre_tick: Vec<Option<Vec<Cell>>> = world
        .players()
        .iter()
        .map(|player| player.alive.then(|| player.body().to_vec()))
        .collect();

    for slot in 0..world.players.len() {
        if !world.players[slot].alive {
            continue;
        }
        match advance(world, slot, &pre_tick) {
            Step::Idle | Step::Moved => {}
            Step::Ate(index) => {
                let player = &mut world.players[slot];
                player.score += FRUIT_REWARD;
                debug!(
                    "Player '{}' in slot {} ate fruit, score {}, length {}",
                    player.name,
                    slot,
                    player.score,
                    player.body_len()
                );
                placement::respawn_fruit(world, index, rng);
                report.fruit_eaten.push(slot);
            }
            Step::Died(cause) => {
                let player = &mut world.players[slot];
                player.alive = false;
                info!(
                    "Player '{}' in slot {} died: {:?}",
                    player.name, slot, cause
                );
                report.deaths.push((slot, cause));
            }
        }
    }

    placement::reconcile_fruits(world, rng);
    debug_assert_eq!(world.fruits().len(), world.alive_count().min(MAX_FRUITS));

    if world.mode == GameMode::Standard && !world.players.is_empty() && world.alive_count() == 0 {
        world.active = false;
        world.game_over = true;
        report.all_dead = true;
        info!("World {}: no snakes left alive, game over", world.id);
    }

    report
}

/// Commits the buffered direction for `slot` and moves it one cell, or
/// reports why it died. A dead snake keeps its pre-tick position.
fn advance(world: &mut GameWorld, slot: usize, pre_tick: &[Option<Vec<Cell>>]) -> Step {
    let (width, height, world_type) = (world.width, world.height, world.world_type);

    let player = &mut world.players[slot];
    player.direction = player.next_direction;
    if player.direction == Direction::None {
        return Step::Idle;
    }

    let mut candidate = player.head().step(player.direction);
    match world_type {
        WorldType::Wrap => candidate = candidate.wrapped(width, height),
        WorldType::Obstacles => {
            if !candidate.in_bounds(width, height) {
                return Step::Died(DeathCause::Wall);
            }
        }
    }

    if world.obstacles.contains(&candidate) {
        return Step::Died(DeathCause::Obstacle);
    }

    let fruit = world.fruits.position(&candidate);
    let player = &mut world.players[slot];
    let growing = fruit.is_some() && !player.body.is_full();

    // The tail cell is vacated this tick unless the snake grows.
    let body = player.body();
    let own = if growing {
        body
    } else {
        &body[..body.len() - 1]
    };
    if own.contains(&candidate) {
        return Step::Died(DeathCause::SelfCollision);
    }

    let hits_other = pre_tick.iter().enumerate().any(|(other, cells)| {
        other != slot
            && cells
                .as_ref()
                .map_or(false, |cells| cells.contains(&candidate))
    });
    if hits_other {
        return Step::Died(DeathCause::SnakeCollision);
    }

    move_body(&mut player.body, candidate, growing);

    match fruit {
        Some(index) => Step::Ate(index),
        None => Step::Moved,
    }
}

/// Puts `head` at the front of `body`. A growing body keeps its tail; if it
/// turns out to be full it moves like a non-growing one instead. Returns
/// whether the body grew.
fn move_body(body: &mut BoundedVec<Cell>, head: Cell, growing: bool) -> bool {
    if !growing {
        body.shift_in(head);
        return false;
    }
    match body.try_insert(0, head) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                "Snake body at capacity {} could not grow, moving without growth",
                err.capacity
            );
            body.shift_in(err.item);
            false
        }
    }
}
