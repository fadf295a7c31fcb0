//! Connection bookkeeping for the arena server
//!
//! This module tracks every live TCP session and its binding to a player slot:
//! - Admission against a fixed pool of connection ids (max concurrent clients)
//! - Connection-to-slot binding, with at most one live connection per slot
//! - Per-connection outbound queues used for snapshots and `ASSIGN` replies
//!
//! Outbound delivery never blocks. A session whose queue is full simply
//! misses that frame; the next periodic snapshot supersedes it.

use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sending half of a session's outbound frame queue.
pub type OutboundSender = mpsc::Sender<Arc<str>>;

/// A live connection and the slot it controls, if any.
#[derive(Debug)]
pub struct Connection {
    /// Pool index; reused once the connection closes
    pub id: usize,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Player slot bound by a successful `PLAYER` command
    pub slot: Option<usize>,
    pub connected_at: Instant,
    sender: OutboundSender,
    /// Frames not delivered because the queue was full
    pub dropped_frames: u64,
}

impl Connection {
    pub fn new(id: usize, addr: SocketAddr, sender: OutboundSender) -> Self {
        Self {
            id,
            addr,
            slot: None,
            connected_at: Instant::now(),
            sender,
            dropped_frames: 0,
        }
    }

    /// Queues a frame without waiting. Returns false if it was dropped.
    pub fn try_send(&mut self, frame: Arc<str>) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_frames += 1;
                debug!(
                    "Connection {} outbound queue full, dropped frame ({} so far)",
                    self.id, self.dropped_frames
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Delivery counts for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub recipients: usize,
    pub delivered: usize,
    pub dropped: usize,
}

/// Bounded pool of live connections
///
/// Connection ids are indices into the pool, so the pool size is the
/// server's concurrent-client limit. A freed id is handed to the next
/// connection that arrives.
#[derive(Debug)]
pub struct ConnectionTable {
    connections: Vec<Option<Connection>>,
}

impl ConnectionTable {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: (0..max_clients).map(|_| None).collect(),
        }
    }

    /// Admits a connection into the first free pool entry.
    ///
    /// Returns None when the pool is exhausted; the caller then sends the
    /// rejection notice and closes the socket.
    pub fn add_connection(&mut self, addr: SocketAddr, sender: OutboundSender) -> Option<usize> {
        let id = self.connections.iter().position(Option::is_none)?;
        self.connections[id] = Some(Connection::new(id, addr, sender));
        info!("Connection {} accepted from {}", id, addr);
        Some(id)
    }

    /// Frees a pool entry and returns the connection so the caller can
    /// release its slot.
    pub fn remove_connection(&mut self, id: usize) -> Option<Connection> {
        let connection = self.connections.get_mut(id)?.take()?;
        info!(
            "Connection {} from {} closed after {:.1}s",
            id,
            connection.addr,
            connection.connected_at.elapsed().as_secs_f32()
        );
        Some(connection)
    }

    pub fn get(&self, id: usize) -> Option<&Connection> {
        self.connections.get(id)?.as_ref()
    }

    pub fn slot_of(&self, id: usize) -> Option<usize> {
        self.get(id)?.slot
    }

    /// Binds `slot` to connection `id`. Fails if the connection is gone or
    /// another live connection already controls that slot.
    pub fn bind_slot(&mut self, id: usize, slot: usize) -> bool {
        if self
            .connection_for_slot(slot)
            .map_or(false, |owner| owner != id)
        {
            return false;
        }
        match self.connections.get_mut(id).and_then(Option::as_mut) {
            Some(connection) => {
                connection.slot = Some(slot);
                true
            }
            None => false,
        }
    }

    /// Drops every binding; used when the world is replaced.
    pub fn unbind_all(&mut self) {
        for connection in self.connections.iter_mut().flatten() {
            connection.slot = None;
        }
    }

    pub fn connection_for_slot(&self, slot: usize) -> Option<usize> {
        self.connections
            .iter()
            .flatten()
            .find(|connection| connection.slot == Some(slot))
            .map(|connection| connection.id)
    }

    pub fn send_to(&mut self, id: usize, frame: Arc<str>) -> bool {
        match self.connections.get_mut(id).and_then(Option::as_mut) {
            Some(connection) => connection.try_send(frame),
            None => false,
        }
    }

    /// Offers the same frame to every live connection without waiting.
    pub fn broadcast(&mut self, frame: Arc<str>) -> BroadcastStats {
        let mut stats = BroadcastStats::default();
        for connection in self.connections.iter_mut().flatten() {
            stats.recipients += 1;
            if connection.try_send(Arc::clone(&frame)) {
                stats.delivered += 1;
            } else {
                stats.dropped += 1;
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.connections.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.connections.iter().all(Option::is_some)
    }

    pub fn max_clients(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 20001)
    }

    fn test_addr2() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 20002)
    }

    fn channel(depth: usize) -> (OutboundSender, mpsc::Receiver<Arc<str>>) {
        mpsc::channel(depth)
    }

    #[test]
    fn test_table_creation() {
        let table = ConnectionTable::new(4);
        assert_eq!(table.max_clients(), 4);
        assert!(table.is_empty());
        assert!(!table.is_full());
    }

    #[test]
    fn test_add_connection_until_full() {
        let mut table = ConnectionTable::new(2);
        let (tx1, _rx1) = channel(1);
        let (tx2, _rx2) = channel(1);
        let (tx3, _rx3) = channel(1);

        assert_eq!(table.add_connection(test_addr(), tx1), Some(0));
        assert_eq!(table.add_connection(test_addr2(), tx2), Some(1));
        assert!(table.is_full());
        assert_eq!(table.add_connection(test_addr(), tx3), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_freed_id_is_reused() {
        let mut table = ConnectionTable::new(2);
        let (tx1, _rx1) = channel(1);
        let (tx2, _rx2) = channel(1);
        let (tx3, _rx3) = channel(1);

        table.add_connection(test_addr(), tx1).unwrap();
        table.add_connection(test_addr2(), tx2).unwrap();
        assert!(table.remove_connection(0).is_some());
        assert!(table.remove_connection(0).is_none());
        assert_eq!(table.add_connection(test_addr(), tx3), Some(0));
    }

    #[test]
    fn test_one_connection_per_slot() {
        let mut table = ConnectionTable::new(2);
        let (tx1, _rx1) = channel(1);
        let (tx2, _rx2) = channel(1);
        let a = table.add_connection(test_addr(), tx1).unwrap();
        let b = table.add_connection(test_addr2(), tx2).unwrap();

        assert!(table.bind_slot(a, 3));
        assert!(table.bind_slot(a, 3));
        assert!(!table.bind_slot(b, 3));
        assert_eq!(table.slot_of(a), Some(3));
        assert_eq!(table.slot_of(b), None);
        assert_eq!(table.connection_for_slot(3), Some(a));

        let removed = table.remove_connection(a).unwrap();
        assert_eq!(removed.slot, Some(3));
        assert!(table.bind_slot(b, 3));
    }

    #[test]
    fn test_unbind_all() {
        let mut table = ConnectionTable::new(2);
        let (tx1, _rx1) = channel(1);
        let a = table.add_connection(test_addr(), tx1).unwrap();
        table.bind_slot(a, 0);

        table.unbind_all();
        assert_eq!(table.slot_of(a), None);
        assert_eq!(table.connection_for_slot(0), None);
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut table = ConnectionTable::new(3);
        let (tx1, mut rx1) = channel(2);
        let (tx2, mut rx2) = channel(2);
        table.add_connection(test_addr(), tx1).unwrap();
        table.add_connection(test_addr2(), tx2).unwrap();

        let stats = table.broadcast(Arc::from("STATE|x\n"));
        assert_eq!(
            stats,
            BroadcastStats {
                recipients: 2,
                delivered: 2,
                dropped: 0
            }
        );
        assert_eq!(&*rx1.try_recv().unwrap(), "STATE|x\n");
        assert_eq!(&*rx2.try_recv().unwrap(), "STATE|x\n");
    }

    #[test]
    fn test_slow_receiver_drops_without_blocking_others() {
        let mut table = ConnectionTable::new(2);
        let (slow_tx, mut slow_rx) = channel(1);
        let (fast_tx, mut fast_rx) = channel(4);
        let slow = table.add_connection(test_addr(), slow_tx).unwrap();
        table.add_connection(test_addr2(), fast_tx).unwrap();

        table.broadcast(Arc::from("one"));
        let stats = table.broadcast(Arc::from("two"));
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(table.get(slow).unwrap().dropped_frames, 1);

        assert_eq!(&*slow_rx.try_recv().unwrap(), "one");
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(&*fast_rx.try_recv().unwrap(), "one");
        assert_eq!(&*fast_rx.try_recv().unwrap(), "two");
    }

    #[test]
    fn test_send_to_closed_receiver() {
        let mut table = ConnectionTable::new(1);
        let (tx, rx) = channel(1);
        let id = table.add_connection(test_addr(), tx).unwrap();
        drop(rx);
        assert!(!table.send_to(id, Arc::from("ASSIGN|0|\n")));
        assert!(!table.send_to(5, Arc::from("ASSIGN|0|\n")));
    }
}
