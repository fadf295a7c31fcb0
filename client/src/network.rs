//! Client side of the wire: command encoding out, frame reassembly and
//! decoding in.

use crate::error::ClientError;
use log::{debug, info};
use shared::{Command, ServerMessage, StreamReassembler};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_CHUNK: usize = 8192;

/// A connection to the arena server over any byte stream.
pub struct ServerConnection<S> {
    stream: S,
    reassembler: StreamReassembler,
    pending: VecDeque<String>,
    buffer: Vec<u8>,
    malformed_frames: u64,
}

impl ServerConnection<TcpStream> {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S> ServerConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            reassembler: StreamReassembler::default(),
            pending: VecDeque::new(),
            buffer: vec![0u8; READ_CHUNK],
            malformed_frames: 0,
        }
    }

    pub async fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        self.stream.write_all(command.encode().as_bytes()).await?;
        Ok(())
    }

    /// Waits for the next well-formed server message. Frames that fail to
    /// decode are counted and skipped.
    ///
    /// Cancel-safe: partial frames stay buffered across calls.
    pub async fn next_message(&mut self) -> Result<ServerMessage, ClientError> {
        loop {
            while let Some(frame) = self.pending.pop_front() {
                match ServerMessage::decode(&frame) {
                    Ok(message) => return Ok(message),
                    Err(e) => {
                        self.malformed_frames += 1;
                        debug!("Skipping malformed frame: {}", e);
                    }
                }
            }

            let n = self.stream.read(&mut self.buffer).await?;
            if n == 0 {
                return Err(ClientError::Disconnected);
            }
            self.pending.extend(self.reassembler.push(&self.buffer[..n]));
        }
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames
    }

    /// Times the reassembly buffer overflowed and was discarded.
    pub fn overflow_count(&self) -> u64 {
        self.reassembler.overflow_count()
    }
}
