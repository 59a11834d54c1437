//! Device state machine
//!
//! Owns the observed climate state and the single pending command. Every
//! input carries the current time and every output is an [`Effect`] for the
//! caller to execute, so the machine itself never touches the bus.
//!
//! ```text
//!  Idle ──mutation──▶ AwaitingAck ──matching ack──▶ Idle
//!   │                    │  ▲
//!   │                    └──┘ timeout: resend newest intent, or give up
//!   └──poll interval──▶ Polling ──status / timeout──▶ Idle
//! ```

use std::time::{Duration, Instant};

use fujitsu_core::{ClimateState, FieldMask, FujitsuError, StatusReport, TimingConfig};
use tracing::{debug, info, warn};

use crate::codec::{Frame, Message};

/// Phase of the request/response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A SET was sent and its ack is outstanding
    AwaitingAck,
    /// A POLL was sent and the status report is outstanding
    Polling,
}

/// Work requested by the state machine
#[derive(Debug)]
pub enum Effect {
    /// Encode and transmit this message
    Send(Message),
    /// Observed state was refreshed and should be republished; `confirmed`
    /// is set when the pending command was fully acknowledged
    Publish { confirmed: bool },
    /// Non-fatal problem to surface to the host
    Fault(FujitsuError),
}

/// A façade change not yet confirmed by the unit
#[derive(Debug, Clone, Copy)]
struct PendingCommand {
    /// Newest desired state; replaced on every coalesced mutation
    desired: ClimateState,
    /// Fields the intent changes; shielded from unrelated status reports
    fields: FieldMask,
    /// Snapshot carried by the last transmission
    in_flight: Option<ClimateState>,
    /// Transmissions made for the current intent
    attempts: u32,
    /// Transmissions since the unit last answered, across coalesced intents
    unanswered_sends: u32,
}

pub struct DeviceStateMachine {
    phase: Phase,
    observed: ClimateState,
    room_temperature: Option<u8>,
    fault: bool,
    pending: Option<PendingCommand>,
    sent_at: Option<Instant>,
    last_poll: Option<Instant>,
    missed_polls: u32,
    has_contact: bool,
    poll_interval: Duration,
    response_timeout: Duration,
    max_retries: u32,
    /// Cap on `unanswered_sends`, so coalescing cannot postpone a timeout forever
    max_unanswered_sends: u32,
    offline_after: u32,
}

impl DeviceStateMachine {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            phase: Phase::Idle,
            observed: ClimateState::default(),
            room_temperature: None,
            fault: false,
            pending: None,
            sent_at: None,
            last_poll: None,
            missed_polls: 0,
            has_contact: false,
            poll_interval: timing.poll_interval(),
            response_timeout: timing.response_timeout(),
            max_retries: timing.max_retries,
            max_unanswered_sends: (timing.max_retries + 1).saturating_mul(2),
            offline_after: timing.offline_after_missed_polls.max(1),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn observed(&self) -> &ClimateState {
        &self.observed
    }

    pub fn room_temperature(&self) -> Option<u8> {
        self.room_temperature
    }

    pub fn fault(&self) -> bool {
        self.fault
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fields shielded by the active pending command
    pub fn pending_fields(&self) -> FieldMask {
        self.pending.map(|p| p.fields).unwrap_or_default()
    }

    /// Whether the unit has answered recently enough to be trusted
    pub fn is_online(&self) -> bool {
        self.has_contact && self.missed_polls < self.offline_after
    }

    /// Accept a façade mutation
    ///
    /// While a SET is awaiting its ack the new intent replaces the pending one
    /// and nothing is sent; otherwise it goes out immediately.
    pub fn submit(&mut self, desired: ClimateState, fields: FieldMask, now: Instant) -> Vec<Effect> {
        let desired = desired.normalized();

        match self.pending.as_mut() {
            Some(pending) => {
                pending.desired = desired;
                pending.fields |= fields;
                pending.attempts = 0;
            }
            None => {
                self.pending = Some(PendingCommand {
                    desired,
                    fields,
                    in_flight: None,
                    attempts: 0,
                    unanswered_sends: 0,
                });
            }
        }

        if self.phase == Phase::AwaitingAck {
            debug!("Coalescing mutation into pending command");
            return Vec::new();
        }

        if self.phase == Phase::Polling {
            debug!("Abandoning outstanding poll for a mutation");
        }
        self.transmit_pending(now).into_iter().collect()
    }

    /// Handle a checksum-verified frame from the bus
    ///
    /// Frames for other addresses, our own echoed requests and frames that do
    /// not parse are logged and discarded without any state change.
    pub fn on_frame(&mut self, frame: &Frame, address: u8, now: Instant) -> Vec<Effect> {
        if frame.address() != address {
            debug!(
                "Ignoring frame for address 0x{:02X} (we are 0x{:02X})",
                frame.address(),
                address
            );
            return Vec::new();
        }

        match frame.message() {
            Ok(message) => self.on_message(message, now),
            Err(e) => {
                warn!("Discarding frame: {}", e);
                Vec::new()
            }
        }
    }

    /// Handle a decoded message from the unit
    pub fn on_message(&mut self, message: Message, now: Instant) -> Vec<Effect> {
        match message {
            Message::Poll | Message::Set(_) => {
                debug!("Ignoring controller request on the bus: {:?}", message.opcode());
                Vec::new()
            }
            Message::Ack(state) => {
                self.mark_contact();
                self.on_ack(state, now)
            }
            Message::Status(report) => {
                self.mark_contact();
                self.on_status(report)
            }
        }
    }

    /// Drive timeouts, retries and polling
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        match self.phase {
            Phase::AwaitingAck => {
                if !self.timed_out(now) {
                    return Vec::new();
                }
                warn!("No ack within {:?}", self.response_timeout);
                self.retry_or_give_up(now)
            }
            Phase::Polling => {
                if !self.timed_out(now) {
                    return Vec::new();
                }
                self.phase = Phase::Idle;
                self.sent_at = None;
                self.missed_polls += 1;
                debug!("Poll unanswered ({} in a row)", self.missed_polls);

                if self.has_contact && self.missed_polls == self.offline_after {
                    warn!(
                        "Unit unresponsive after {} polls, marking offline",
                        self.missed_polls
                    );
                    return vec![Effect::Publish { confirmed: false }];
                }
                Vec::new()
            }
            Phase::Idle => {
                if self.pending.is_some() {
                    // Left over from a failed write
                    return self.retry_or_give_up(now);
                }

                let due = self
                    .last_poll
                    .map_or(true, |last| now.saturating_duration_since(last) >= self.poll_interval);
                if !due {
                    return Vec::new();
                }

                self.phase = Phase::Polling;
                self.sent_at = Some(now);
                self.last_poll = Some(now);
                vec![Effect::Send(Message::Poll)]
            }
        }
    }

    /// A write failed: fall back to `Idle` and let the next tick resend
    pub fn on_link_error(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.in_flight = None;
        }
        self.phase = Phase::Idle;
        self.sent_at = None;
    }

    fn on_ack(&mut self, state: ClimateState, now: Instant) -> Vec<Effect> {
        let matches_in_flight = self.phase == Phase::AwaitingAck
            && self
                .pending
                .and_then(|p| p.in_flight)
                .is_some_and(|in_flight| in_flight == state);

        if !matches_in_flight {
            debug!("Ack does not match the command in flight, treating as status");
            return self.on_status(StatusReport {
                fault: self.fault,
                ..StatusReport::new(state)
            });
        }

        self.observed = state;
        let Some(pending) = self.pending else {
            return Vec::new();
        };

        if pending.desired == state {
            info!(
                "Unit confirmed mode={} target={} fan={} swing={}",
                state.mode, state.target_temperature, state.fan_speed, state.swing
            );
            self.pending = None;
            self.phase = Phase::Idle;
            self.sent_at = None;
            return vec![Effect::Publish { confirmed: true }];
        }

        // Newer intent was coalesced while this ack was outstanding
        debug!("Ack for superseded command, sending newest intent");
        if let Some(pending) = self.pending.as_mut() {
            pending.attempts = 0;
            pending.unanswered_sends = 0;
        }
        let mut effects = vec![Effect::Publish { confirmed: false }];
        effects.extend(self.transmit_pending(now));
        effects
    }

    fn on_status(&mut self, report: StatusReport) -> Vec<Effect> {
        let mut writable = report.reported;
        writable.remove(self.pending_fields());
        if !report.reported.contains(FieldMask::TARGET_TEMPERATURE) {
            debug!("Status carries no setpoint, keeping {}", self.observed.target_temperature);
        }

        let mut next = self.observed;
        next.merge_from(&report.state, writable);
        if next != self.observed {
            debug!(
                "Observed mode={} target={} fan={} swing={}",
                next.mode, next.target_temperature, next.fan_speed, next.swing
            );
        }

        if report.fault && !self.fault {
            warn!("Unit reports an error condition");
        }

        self.observed = next;
        self.fault = report.fault;
        if report.room_temperature.is_some() {
            self.room_temperature = report.room_temperature;
        }

        if self.phase == Phase::Polling {
            self.phase = Phase::Idle;
            self.sent_at = None;
        }

        vec![Effect::Publish { confirmed: false }]
    }

    fn retry_or_give_up(&mut self, now: Instant) -> Vec<Effect> {
        let Some(pending) = self.pending else {
            self.phase = Phase::Idle;
            self.sent_at = None;
            return Vec::new();
        };

        let exhausted = pending.unanswered_sends >= self.max_unanswered_sends;
        if pending.attempts <= self.max_retries && !exhausted {
            if pending.attempts > 0 {
                info!("Retrying command ({}/{})", pending.attempts, self.max_retries);
            }
            return self.transmit_pending(now).into_iter().collect();
        }

        if exhausted {
            warn!(
                "Giving up on command after {} unanswered sends across changed intents",
                pending.unanswered_sends
            );
        } else {
            warn!(
                "Giving up on command after {} attempts",
                pending.attempts
            );
        }
        self.pending = None;
        self.phase = Phase::Idle;
        self.sent_at = None;
        // Poll straight away so the mirror catches up with the unit
        self.last_poll = None;
        vec![Effect::Fault(FujitsuError::CommandTimeout {
            attempts: pending.unanswered_sends,
        })]
    }

    fn transmit_pending(&mut self, now: Instant) -> Option<Effect> {
        let pending = self.pending.as_mut()?;
        pending.attempts += 1;
        pending.unanswered_sends += 1;
        pending.in_flight = Some(pending.desired);

        self.phase = Phase::AwaitingAck;
        self.sent_at = Some(now);
        Some(Effect::Send(Message::Set(pending.desired)))
    }

    fn timed_out(&self, now: Instant) -> bool {
        self.sent_at
            .map_or(true, |sent| now.saturating_duration_since(sent) >= self.response_timeout)
    }

    fn mark_contact(&mut self) {
        if !self.has_contact || self.missed_polls >= self.offline_after {
            info!("Unit is online");
        }
        self.has_contact = true;
        self.missed_polls = 0;
    }
}
