//! Client-side view of the arena, rebuilt from each server snapshot.
//!
//! The client keeps no simulation of its own. It remembers the latest
//! snapshot, the slot the server assigned and when the snapshot arrived, so
//! a presentation layer can tell a fresh view from a stale one.

use serde::Serialize;
use shared::{PlayerSnapshot, ServerMessage, Snapshot};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct ClientGameState {
    snapshot: Option<Snapshot>,
    slot: Option<usize>,
    last_update: Option<Instant>,
    snapshots_received: u64,
    rejected: bool,
}

/// Render-ready view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ClientView<'a> {
    pub slot: Option<usize>,
    pub stale: bool,
    /// Milliseconds since the snapshot arrived
    pub age_ms: u64,
    pub snapshot: &'a Snapshot,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one server message into the view. Returns true if a new
    /// snapshot was taken.
    pub fn apply(&mut self, message: ServerMessage) -> bool {
        self.apply_at(message, Instant::now())
    }

    pub fn apply_at(&mut self, message: ServerMessage, received: Instant) -> bool {
        match message {
            ServerMessage::Assign { slot } => {
                self.slot = Some(slot);
                false
            }
            ServerMessage::State(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_update = Some(received);
                self.snapshots_received += 1;
                true
            }
            ServerMessage::ServerFull => {
                self.rejected = true;
                false
            }
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received
    }

    /// This client's own snake, once assigned and present in a snapshot.
    pub fn me(&self) -> Option<&PlayerSnapshot> {
        self.snapshot.as_ref()?.player(self.slot?)
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|received| now.saturating_duration_since(received))
    }

    /// True when no snapshot has arrived within `max_age`.
    pub fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        self.age(now).map_or(true, |age| age > max_age)
    }

    pub fn view(&self, now: Instant, max_age: Duration) -> Option<ClientView<'_>> {
        let snapshot = self.snapshot.as_ref()?;
        let age = self.age(now).unwrap_or_default();
        Some(ClientView {
            slot: self.slot,
            stale: age > max_age,
            age_ms: age.as_millis() as u64,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Cell, Direction, GameMode, WorldType};

    fn snapshot(game_id: u32) -> Snapshot {
        Snapshot {
            game_id,
            width: 10,
            height: 10,
            active: true,
            game_over: false,
            mode: GameMode::Standard,
            world_type: WorldType::Wrap,
            elapsed_time: 3,
            fruits: vec![Cell::new(1, 1)],
            obstacles: vec![],
            players: vec![PlayerSnapshot {
                slot: 0,
                name: "ann".to_string(),
                alive: true,
                score: 10,
                head: Cell::new(5, 5),
                body_len: 4,
                direction: Direction::Right,
            }],
            map: None,
        }
    }

    #[test]
    fn test_assign_then_state() {
        let mut state = ClientGameState::new();
        assert!(state.me().is_none());

        assert!(!state.apply(ServerMessage::Assign { slot: 0 }));
        assert!(state.apply(ServerMessage::State(snapshot(1))));
        assert_eq!(state.slot(), Some(0));
        assert_eq!(state.me().unwrap().score, 10);
        assert_eq!(state.snapshots_received(), 1);
    }

    #[test]
    fn test_staleness() {
        let mut state = ClientGameState::new();
        let start = Instant::now();
        assert!(state.is_stale(start, Duration::from_millis(500)));

        state.apply_at(ServerMessage::State(snapshot(1)), start);
        assert!(!state.is_stale(start + Duration::from_millis(100), Duration::from_millis(500)));
        assert!(state.is_stale(start + Duration::from_secs(1), Duration::from_millis(500)));

        let view = state
            .view(start + Duration::from_secs(1), Duration::from_millis(500))
            .unwrap();
        assert!(view.stale);
        assert_eq!(view.age_ms, 1000);
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let mut state = ClientGameState::new();
        state.apply(ServerMessage::Assign { slot: 0 });
        state.apply(ServerMessage::State(snapshot(1)));
        state.apply(ServerMessage::State(snapshot(2)));
        assert_eq!(state.snapshot().unwrap().game_id, 2);
        assert_eq!(state.slot(), Some(0));
        assert_eq!(state.snapshots_received(), 2);
    }

    #[test]
    fn test_server_full() {
        let mut state = ClientGameState::new();
        state.apply(ServerMessage::ServerFull);
        assert!(state.is_rejected());
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_view_serialises_to_json() {
        let mut state = ClientGameState::new();
        let now = Instant::now();
        state.apply_at(ServerMessage::Assign { slot: 0 }, now);
        state.apply_at(ServerMessage::State(snapshot(9)), now);

        let json = serde_json::to_value(state.view(now, Duration::from_secs(1)).unwrap()).unwrap();
        assert_eq!(json["slot"], 0);
        assert_eq!(json["stale"], false);
        assert_eq!(json["snapshot"]["game_id"], 9);
        assert_eq!(json["snapshot"]["players"][0]["name"], "ann");
    }
}
