//! Shared server state and command application.
//!
//! [`GameContext`] bundles the world and the connection table behind the
//! single lock every session and the tick loop go through.

use crate::config::ServerConfig;
use crate::connection_table::ConnectionTable;
use crate::simulation::{self, TickReport};
use crate::world::{GameWorld, WorldSettings};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Command, Snapshot};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// The one lock guarding all mutable server state.
pub type SharedContext = Arc<Mutex<GameContext>>;

/// Follow-up a session must perform after a command was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    None,
    /// Reply with `ASSIGN|slot|`
    Assigned(usize),
    /// Close the connection
    Disconnect,
}

#[derive(Debug)]
pub struct GameContext {
    world: Option<GameWorld>,
    pub connections: ConnectionTable,
    defaults: WorldSettings,
    rng: StdRng,
}

impl GameContext {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: &ServerConfig, rng: StdRng) -> Self {
        Self {
            world: None,
            connections: ConnectionTable::new(config.max_clients),
            defaults: config.default_world,
            rng,
        }
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    pub fn world(&self) -> Option<&GameWorld> {
        self.world.as_ref()
    }

    /// Applies one decoded command on behalf of connection `conn`.
    ///
    /// The acting slot always comes from the connection's binding; slot ids
    /// carried in `MOVE` and `QUIT` are ignored.
    pub fn apply_command(&mut self, conn: usize, command: Command) -> CommandOutcome {
        match command {
            Command::NewGame {
                mode,
                world_type,
                time_limit,
                dimensions,
            } => {
                let (width, height) =
                    dimensions.unwrap_or((self.defaults.width, self.defaults.height));
                let settings = WorldSettings {
                    width,
                    height,
                    mode,
                    world_type,
                    time_limit,
                };
                self.world = Some(GameWorld::new(settings, &mut self.rng));
                self.connections.unbind_all();
                CommandOutcome::None
            }
            Command::Join { name } => self.join(conn, &name),
            Command::Move { direction, .. } => {
                let (Some(slot), Some(world)) = (self.connections.slot_of(conn), self.world.as_mut())
                else {
                    debug!("Connection {} sent MOVE without a bound slot", conn);
                    return CommandOutcome::None;
                };
                if let Err(err) = world.queue_direction(slot, direction) {
                    warn!("Connection {}: {}", conn, err);
                }
                CommandOutcome::None
            }
            Command::Quit { .. } => {
                self.release_slot(conn);
                CommandOutcome::Disconnect
            }
        }
    }

    fn join(&mut self, conn: usize, name: &str) -> CommandOutcome {
        if let Some(slot) = self.connections.slot_of(conn) {
            debug!("Connection {} already controls slot {}", conn, slot);
            return CommandOutcome::Assigned(slot);
        }
        if self.connections.get(conn).is_none() {
            return CommandOutcome::None;
        }

        let defaults = self.defaults;
        let rng = &mut self.rng;
        let world = self.world.get_or_insert_with(|| {
            info!("PLAYER before NEW_GAME, creating the default world");
            GameWorld::new(defaults, rng)
        });

        match world.join(name, &mut self.rng) {
            Ok(slot) => {
                self.connections.bind_slot(conn, slot);
                CommandOutcome::Assigned(slot)
            }
            Err(err) => {
                warn!("Connection {} could not join: {}", conn, err);
                CommandOutcome::None
            }
        }
    }

    /// Marks the snake bound to `conn` dead, keeping the connection.
    fn release_slot(&mut self, conn: usize) {
        let (Some(slot), Some(world)) = (self.connections.slot_of(conn), self.world.as_mut()) else {
            return;
        };
        if let Err(err) = world.kill_player(slot, &mut self.rng) {
            warn!("Connection {}: {}", conn, err);
        }
    }

    /// Tears down connection `conn`: its snake dies and its pool entry is freed.
    pub fn disconnect(&mut self, conn: usize) {
        self.release_slot(conn);
        self.connections.remove_connection(conn);
    }

    /// Runs one simulation step if a world exists.
    pub fn tick(&mut self, now: Instant) -> Option<TickReport> {
        let world = self.world.as_mut()?;
        Some(simulation::tick(world, now, &mut self.rng))
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.world.as_ref().map(GameWorld::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_table::OutboundSender;
    use shared::{Cell, Direction, GameMode, WorldType};
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn context() -> GameContext {
        let config = ServerConfig {
            max_clients: 3,
            ..ServerConfig::default()
        };
        GameContext::with_rng(&config, StdRng::seed_from_u64(42))
    }

    fn connect(ctx: &mut GameContext) -> (usize, mpsc::Receiver<Arc<str>>) {
        let (tx, rx): (OutboundSender, _) = mpsc::channel(8);
        let addr: SocketAddr = "127.0.0.1:20000".parse().unwrap();
        (ctx.connections.add_connection(addr, tx).unwrap(), rx)
    }

    fn new_game(dimensions: Option<(i32, i32)>) -> Command {
        Command::NewGame {
            mode: GameMode::Standard,
            world_type: WorldType::Wrap,
            time_limit: 0,
            dimensions,
        }
    }

    fn join(name: &str) -> Command {
        Command::Join {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_join_without_world_uses_defaults() {
        let mut ctx = context();
        let (conn, _rx) = connect(&mut ctx);

        assert_eq!(ctx.apply_command(conn, join("ann")), CommandOutcome::Assigned(0));
        let world = ctx.world().unwrap();
        assert_eq!((world.width, world.height), (40, 20));
        assert_eq!(world.mode, GameMode::Timed);
        assert_eq!(world.world_type, WorldType::Wrap);
        assert!(world.active);
    }

    #[test]
    fn test_new_game_dimensions_are_clamped() {
        let mut ctx = context();
        let (conn, _rx) = connect(&mut ctx);

        ctx.apply_command(conn, new_game(Some((5, 99))));
        let world = ctx.world().unwrap();
        assert_eq!((world.width, world.height), (10, 60));

        ctx.apply_command(conn, new_game(None));
        let world = ctx.world().unwrap();
        assert_eq!((world.width, world.height), (40, 20));
    }

    #[test]
    fn test_repeated_join_reassigns_same_slot() {
        let mut ctx = context();
        let (conn, _rx) = connect(&mut ctx);

        assert_eq!(ctx.apply_command(conn, join("ann")), CommandOutcome::Assigned(0));
        assert_eq!(ctx.apply_command(conn, join("ann")), CommandOutcome::Assigned(0));
        assert_eq!(ctx.world().unwrap().players().len(), 1);
    }

    #[test]
    fn test_move_uses_bound_slot_not_claimed_one() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        let (b, _rx_b) = connect(&mut ctx);
        ctx.apply_command(a, join("ann"));
        ctx.apply_command(b, join("bob"));

        ctx.apply_command(
            b,
            Command::Move {
                claimed_slot: 0,
                direction: Direction::Up,
            },
        );
        let world = ctx.world().unwrap();
        assert_eq!(world.player(0).unwrap().next_direction, Direction::Right);
        assert_eq!(world.player(1).unwrap().next_direction, Direction::Up);
    }

    #[test]
    fn test_move_without_binding_is_ignored() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        let (b, _rx_b) = connect(&mut ctx);
        ctx.apply_command(a, join("ann"));

        let outcome = ctx.apply_command(
            b,
            Command::Move {
                claimed_slot: 0,
                direction: Direction::Up,
            },
        );
        assert_eq!(outcome, CommandOutcome::None);
        assert_eq!(
            ctx.world().unwrap().player(0).unwrap().next_direction,
            Direction::Right
        );
    }

    #[test]
    fn test_quit_kills_bound_slot_only() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        let (b, _rx_b) = connect(&mut ctx);
        ctx.apply_command(a, join("ann"));
        ctx.apply_command(b, join("bob"));

        let outcome = ctx.apply_command(
            b,
            Command::Quit {
                claimed_slot: Some(0),
            },
        );
        assert_eq!(outcome, CommandOutcome::Disconnect);
        let world = ctx.world().unwrap();
        assert!(world.player(0).unwrap().alive);
        assert!(!world.player(1).unwrap().alive);
        assert_eq!(world.fruits().len(), 1);
    }

    #[test]
    fn test_disconnect_frees_connection_and_kills_snake() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        ctx.apply_command(a, join("ann"));

        ctx.disconnect(a);
        assert!(ctx.connections.is_empty());
        let world = ctx.world().unwrap();
        assert!(!world.player(0).unwrap().alive);
        assert_eq!(world.players().len(), 1);
        assert!(world.fruits().is_empty());
    }

    #[test]
    fn test_new_game_clears_bindings() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        ctx.apply_command(a, join("ann"));
        ctx.apply_command(a, new_game(None));

        assert_eq!(ctx.connections.slot_of(a), None);
        assert!(ctx.world().unwrap().players().is_empty());
        assert_eq!(ctx.apply_command(a, join("ann")), CommandOutcome::Assigned(0));
    }

    #[test]
    fn test_tick_without_world() {
        let mut ctx = context();
        assert!(ctx.tick(Instant::now()).is_none());
        assert!(ctx.snapshot().is_none());
    }

    #[test]
    fn test_tick_advances_world() {
        let mut ctx = context();
        let (a, _rx_a) = connect(&mut ctx);
        ctx.apply_command(a, new_game(Some((20, 10))));
        ctx.apply_command(a, join("ann"));
        let head = ctx.world().unwrap().player(0).unwrap().head();

        let report = ctx.tick(Instant::now()).unwrap();
        assert!(report.advanced);
        let moved = ctx.world().unwrap().player(0).unwrap().head();
        assert_eq!(moved, Cell::new(head.x + 1, head.y));
    }
}
