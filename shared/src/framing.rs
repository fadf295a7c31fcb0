//! Newline-delimited framing over an unstructured byte stream.
//!
//! A single read may return part of a message, several messages, or the
//! tail of one message and the head of the next. [`StreamReassembler`]
//! accumulates bytes per peer and hands back every complete frame.
//!
//! The buffer is bounded. When a partial frame outgrows it the buffer is
//! discarded, losing at most that one frame; the next full snapshot
//! resynchronises the peer. Discards are logged and counted.

use log::warn;

/// Default accumulation limit; comfortably above the largest snapshot
/// (a 60x60 map plus obstacle and player records).
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 16 * 1024;

/// Frame terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

#[derive(Debug)]
pub struct StreamReassembler {
    buffer: Vec<u8>,
    capacity: usize,
    overflow_count: u64,
    discarded_bytes: u64,
}

impl StreamReassembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(4096)),
            capacity,
            overflow_count: 0,
            discarded_bytes: 0,
        }
    }

    /// Appends `bytes` and returns every frame completed by them, in order,
    /// without the delimiter (a trailing `\r` is stripped as well). Blank
    /// lines are skipped. Invalid UTF-8 is replaced lossily; such frames
    /// then fail to decode and get dropped by the caller.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut consumed = 0;

        while let Some(offset) = self.buffer[consumed..]
            .iter()
            .position(|byte| *byte == FRAME_DELIMITER)
        {
            let end = consumed + offset;
            let mut line = &self.buffer[consumed..end];
            if let Some((&b'\r', rest)) = line.split_last() {
                line = rest;
            }
            if !line.is_empty() {
                frames.push(String::from_utf8_lossy(line).into_owned());
            }
            consumed = end + 1;
        }

        // Compact down to the unconsumed partial frame.
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.capacity {
            self.overflow_count += 1;
            self.discarded_bytes += self.buffer.len() as u64;
            warn!(
                "Reassembly buffer overflow: discarding {} bytes (limit {}, overflow #{})",
                self.buffer.len(),
                self.capacity,
                self.overflow_count
            );
            self.buffer.clear();
        }

        frames
    }

    /// Bytes of the current partial frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of times the buffer has been discarded on overflow.
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_REASSEMBLY_CAPACITY)
    }
}
