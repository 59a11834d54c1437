//! Async session loop
//!
//! Drives one controller from one serial port. Byte arrival, the periodic
//! tick, user commands and outbound writes are all serialised through a
//! single `select!` loop, so the controller itself needs no locking.
//!
//! The bus is half duplex: an outbound frame is held until the line has been
//! quiet for the configured reply delay after the last received byte.

use std::future::Future;

use fujitsu_core::{FujitsuError, Result, TimingConfig};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::climate::{ClimateCall, ClimateHost, FrameConsumer, FujitsuClimate, Tickable};
use crate::link::Transport;
use crate::serial_driver::{is_disconnect_error, SerialIo};

/// Frames the controller may queue before writes fail
pub const OUTBOUND_QUEUE_LEN: usize = 16;

const READ_CHUNK_LEN: usize = 64;

/// `Transport` that queues frames for the session loop to write
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Create a transport together with the receiver the session drains
    pub fn channel() -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.tx.try_send(bytes.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => FujitsuError::Link("Outbound queue full".to_string()),
            TrySendError::Closed(_) => FujitsuError::Link("Session closed".to_string()),
        })
    }
}

enum Event {
    Shutdown,
    Outbound(Vec<u8>),
    LineQuiet,
    Command(ClimateCall),
    Read(Result<usize>),
    Tick,
}

/// Run the controller against a serial port until shutdown or disconnect
///
/// Returns `Ok(())` when `shutdown` completes and an error when the adapter
/// goes away; the controller keeps its state and can be handed to a new
/// session after reconnecting.
pub async fn run_session<S, T, H, F>(
    io: &mut S,
    controller: &mut FujitsuClimate<T, H>,
    outbound: &mut mpsc::Receiver<Vec<u8>>,
    commands: &mut mpsc::Receiver<ClimateCall>,
    timing: &TimingConfig,
    shutdown: F,
) -> Result<()>
where
    S: SerialIo + ?Sized,
    T: Transport,
    H: ClimateHost,
    F: Future<Output = ()>,
{
    info!(
        "Session started on {}",
        io.port_path().unwrap_or("<unknown port>")
    );

    let reply_delay = timing.reply_delay();
    let mut ticker = tokio::time::interval(timing.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buf = [0u8; READ_CHUNK_LEN];
    // Frame waiting for the line to go quiet
    let mut held: Option<Vec<u8>> = None;
    let mut last_read: Option<Instant> = None;
    tokio::pin!(shutdown);

    controller.setup(Instant::now().into_std());

    loop {
        let quiet_at = last_read.map_or_else(Instant::now, |at| at + reply_delay);
        let event = tokio::select! {
            biased;
            _ = &mut shutdown => Event::Shutdown,
            _ = tokio::time::sleep_until(quiet_at), if held.is_some() => Event::LineQuiet,
            Some(bytes) = outbound.recv(), if held.is_none() => Event::Outbound(bytes),
            Some(call) = commands.recv() => Event::Command(call),
            read = io.read_chunk(&mut buf) => Event::Read(read),
            _ = ticker.tick() => Event::Tick,
        };

        match event {
            Event::Shutdown => {
                info!("Session shutting down");
                return Ok(());
            }
            Event::Outbound(bytes) => held = Some(bytes),
            Event::LineQuiet => {
                let Some(bytes) = held.take() else {
                    continue;
                };
                if let Err(e) = io.write_all(&bytes).await {
                    if is_disconnect_error(&e) {
                        return Err(e);
                    }
                    // The state machine retries on its own timeout
                    warn!("Dropped outbound frame: {}", e);
                }
            }
            Event::Command(call) => {
                debug!("Applying {:?}", call);
                if let Err(e) = controller.control_at(call, Instant::now().into_std()) {
                    warn!("Rejected command: {}", e);
                }
            }
            Event::Read(Ok(n)) => {
                let now = Instant::now();
                if n > 0 {
                    last_read = Some(now);
                }
                controller.on_bytes(&buf[..n], now.into_std());
            }
            Event::Read(Err(e)) => {
                if is_disconnect_error(&e) {
                    return Err(e);
                }
                warn!("Read failed: {}", e);
            }
            Event::Tick => controller.tick(Instant::now().into_std()),
        }
    }
}
