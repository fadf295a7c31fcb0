//! Snapshot fan-out and the per-connection writer task.

use crate::connection_table::BroadcastStats;
use crate::game::GameContext;
use log::{debug, error};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Encodes the current world once and offers it to every connection.
///
/// Runs under the state lock but performs no I/O: frames only go into the
/// bounded per-connection queues. Returns None when no world exists yet.
pub fn broadcast_snapshot(ctx: &mut GameContext) -> Option<BroadcastStats> {
    let frame: Arc<str> = Arc::from(ctx.snapshot()?.encode());
    let stats = ctx.connections.broadcast(frame);
    if stats.dropped > 0 {
        debug!(
            "Snapshot delivered to {}/{} connections ({} dropped)",
            stats.delivered, stats.recipients, stats.dropped
        );
    }
    Some(stats)
}

/// Drains a connection's outbound queue into its socket until the queue
/// closes or a write fails. Writes are not retried.
pub async fn run_writer<W>(mut writer: W, mut frames: mpsc::Receiver<Arc<str>>, conn: usize)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = writer.write_all(frame.as_bytes()).await {
            error!("Write to connection {} failed: {}", conn, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("Writer for connection {} finished", conn);
}
