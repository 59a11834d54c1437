//! Link driver for the wired-remote bus
//!
//! Accumulates received bytes, carves frames out of them and hands outbound
//! frames to the transport. Misaligned or corrupted input is skipped one byte
//! at a time until a frame lines up again.

use std::fmt::Write;
use std::time::{Duration, Instant};

use fujitsu_core::Result;
use tracing::{debug, error, warn};

use crate::codec::{self, Decoded, Frame, FRAME_LEN};

/// Receive buffer cap; older bytes are discarded beyond this
pub const MAX_BUFFER_LEN: usize = 256;

/// Byte-stream side of the UART boundary
///
/// Implementations must not block: bytes are queued for transmission and the
/// call returns. Failures are reported as `FujitsuError::Link`.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Receive-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_received: u64,
    pub bytes_discarded: u64,
    pub frames_sent: u64,
}

/// Format bytes as space-separated hex for UART debug logging
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // write! to String is infallible
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

pub struct LinkDriver<T: Transport> {
    transport: T,
    buffer: Vec<u8>,
    last_rx: Option<Instant>,
    inter_byte_timeout: Duration,
    debug_uart: bool,
    stats: LinkStats,
}

impl<T: Transport> LinkDriver<T> {
    /// Create a new link driver
    ///
    /// # Arguments
    /// * `transport` - Outbound side of the UART
    /// * `inter_byte_timeout` - Age after which a partial frame is dropped
    /// * `debug_uart` - Log every frame as hex
    pub fn new(transport: T, inter_byte_timeout: Duration, debug_uart: bool) -> Self {
        Self {
            transport,
            buffer: Vec::with_capacity(MAX_BUFFER_LEN),
            last_rx: None,
            inter_byte_timeout,
            debug_uart,
            stats: LinkStats::default(),
        }
    }

    /// Append newly arrived bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        self.feed_at(bytes, Instant::now());
    }

    /// Append newly arrived bytes, recording `now` as their arrival time
    pub fn feed_at(&mut self, bytes: &[u8], now: Instant) {
        if bytes.is_empty() {
            return;
        }

        self.buffer.extend_from_slice(bytes);
        self.last_rx = Some(now);

        if self.buffer.len() > MAX_BUFFER_LEN {
            let excess = self.buffer.len() - MAX_BUFFER_LEN;
            warn!("Receive buffer overflow, discarding {} bytes", excess);
            self.buffer.drain(..excess);
            self.stats.bytes_discarded += excess as u64;
        }
    }

    /// Extract the next complete frame, skipping garbage in front of it
    ///
    /// Returns `None` when the buffer holds no complete frame; any valid
    /// prefix is kept for the next call.
    pub fn try_extract_frame(&mut self) -> Option<Frame> {
        let mut skipped = 0usize;

        loop {
            match codec::decode(&self.buffer) {
                Decoded::Frame(frame) => {
                    self.buffer.drain(..FRAME_LEN);
                    self.stats.frames_received += 1;
                    if skipped > 0 {
                        debug!("Resynchronized after skipping {} bytes", skipped);
                    }
                    if self.debug_uart {
                        debug!("RX: {}", to_hex(&frame.to_bytes()));
                    }
                    return Some(frame);
                }
                Decoded::NeedMoreBytes => {
                    if skipped > 0 {
                        debug!("Skipped {} bytes waiting for a frame start", skipped);
                    }
                    return None;
                }
                Decoded::Invalid(reason) => {
                    if self.debug_uart {
                        debug!("Dropping 0x{:02X}: {}", self.buffer[0], reason);
                    }
                    self.buffer.remove(0);
                    self.stats.bytes_discarded += 1;
                    skipped += 1;
                }
            }
        }
    }

    /// Drop a partial frame that has not been completed in time
    ///
    /// Returns `true` if bytes were discarded.
    pub fn expire_stale(&mut self, now: Instant) -> bool {
        let Some(last_rx) = self.last_rx else {
            return false;
        };
        if self.buffer.is_empty() || now.saturating_duration_since(last_rx) < self.inter_byte_timeout
        {
            return false;
        }

        debug!(
            "Discarding {} stale bytes: {}",
            self.buffer.len(),
            to_hex(&self.buffer)
        );
        self.stats.bytes_discarded += self.buffer.len() as u64;
        self.buffer.clear();
        self.last_rx = None;
        true
    }

    /// Hand a frame to the transport
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if self.debug_uart {
            debug!("TX: {}", to_hex(bytes));
        }

        self.transport.write(bytes).map_err(|e| {
            error!("Write failed: {}", e);
            e
        })?;
        self.stats.frames_sent += 1;
        Ok(())
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
