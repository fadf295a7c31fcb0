//! Per-connection read loop.
//!
//! Each session reads raw bytes, reassembles them into frames, decodes each
//! frame and applies it under the shared lock before reading again. The lock
//! is never held across a socket read. Malformed frames are skipped without
//! a reply.

use crate::connection_table::OutboundSender;
use crate::game::{CommandOutcome, SharedContext};
use log::{debug, info, warn};
use shared::{Command, ServerMessage, StreamReassembler};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

const READ_CHUNK: usize = 4096;

/// Serves connection `conn` until the peer closes, a read fails, the peer
/// sends `QUIT`, or shutdown is signalled (or its sender is dropped).
/// Always releases the connection's slot on exit.
pub async fn run_session<R>(
    ctx: SharedContext,
    conn: usize,
    mut reader: R,
    outbound: OutboundSender,
    mut shutdown: watch::Receiver<bool>,
    reassembly_capacity: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut reassembler = StreamReassembler::new(reassembly_capacity);
    let mut buffer = vec![0u8; READ_CHUNK];

    'read: loop {
        if *shutdown.borrow() {
            break;
        }
        let read = tokio::select! {
            result = reader.read(&mut buffer) => result,
            _ = shutdown.changed() => break,
        };

        let n = match read {
            Ok(0) => {
                debug!("Connection {} closed by peer", conn);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Read from connection {} failed: {}", conn, e);
                break;
            }
        };

        for frame in reassembler.push(&buffer[..n]) {
            let command = match Command::decode(&frame) {
                Ok(command) => command,
                Err(e) => {
                    debug!("Connection {} sent malformed frame {:?}: {}", conn, frame, e);
                    continue;
                }
            };

            let outcome = ctx.lock().await.apply_command(conn, command);
            match outcome {
                CommandOutcome::None => {}
                CommandOutcome::Assigned(slot) => {
                    let reply: Arc<str> = Arc::from(ServerMessage::Assign { slot }.encode());
                    if outbound.send(reply).await.is_err() {
                        break 'read;
                    }
                }
                CommandOutcome::Disconnect => {
                    info!("Connection {} quit", conn);
                    break 'read;
                }
            }
        }
    }

    if reassembler.overflow_count() > 0 {
        info!(
            "Connection {} discarded {} bytes in {} reassembly overflows",
            conn,
            reassembler.discarded_bytes(),
            reassembler.overflow_count()
        );
    }
    ctx.lock().await.disconnect(conn);
}
