//! Climate controller façade
//!
//! `FujitsuClimate` is the attribute-level surface a host framework talks to.
//! It owns the link, the device state machine and a copy of the state the
//! user asked for, and reports every state change back through
//! [`ClimateHost`].
//!
//! Getters return the desired value together with whether the unit has
//! confirmed it yet, so a freshly set temperature shows up immediately but is
//! marked as unconfirmed until the ack arrives.

use std::time::Instant;

use fujitsu_core::{
    ClimateAction, ClimateMode, ClimateSnapshot, ClimateState, FanSpeed, FieldMask, FujitsuError,
    Reading, Result, StaticConfig, Swing, TemperatureRange,
};
use tracing::{debug, error, info, warn};

use crate::codec::FrameCodec;
use crate::link::{LinkDriver, LinkStats, Transport};
use crate::state_machine::{DeviceStateMachine, Effect, Phase};

/// Receiver of published state and surfaced faults
pub trait ClimateHost {
    /// Called after every confirmed or observed change of state
    fn publish_state(&mut self, snapshot: &ClimateSnapshot);

    /// Called for non-fatal problems the user should know about
    fn report_fault(&mut self, fault: &FujitsuError);
}

/// Lifecycle hooks driven by the host loop
pub trait Tickable {
    /// Called once before the first tick
    fn setup(&mut self, now: Instant);

    /// Called periodically; drives timeouts, retries and polling
    fn tick(&mut self, now: Instant);
}

/// Receive side of the transport boundary
pub trait FrameConsumer {
    /// Feed bytes read from the bus, in arrival order
    fn on_bytes(&mut self, bytes: &[u8], now: Instant);
}

/// Attribute-level control surface
pub trait ClimateControllable {
    fn set_power(&mut self, on: bool) -> Result<()>;
    fn set_mode(&mut self, mode: ClimateMode) -> Result<()>;
    /// Set the target temperature in °C; must be on a 0.5 °C step and in range
    fn set_target_temperature(&mut self, celsius: f32) -> Result<()>;
    fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()>;
    fn set_swing(&mut self, swing: Swing) -> Result<()>;

    fn get_power(&self) -> Reading<bool>;
    fn get_mode(&self) -> Reading<ClimateMode>;
    fn get_target_temperature(&self) -> Reading<f32>;
    fn get_fan_speed(&self) -> Reading<FanSpeed>;
    fn get_swing(&self) -> Reading<Swing>;
}

/// Several attribute changes applied as one mutation
///
/// Unset fields are left as they are. When both `power` and `mode` are
/// given, `mode` wins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateCall {
    pub power: Option<bool>,
    pub mode: Option<ClimateMode>,
    pub target_temperature: Option<f32>,
    pub fan_speed: Option<FanSpeed>,
    pub swing: Option<Swing>,
}

impl ClimateCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_power(mut self, on: bool) -> Self {
        self.power = Some(on);
        self
    }

    pub fn with_mode(mut self, mode: ClimateMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_target_temperature(mut self, celsius: f32) -> Self {
        self.target_temperature = Some(celsius);
        self
    }

    pub fn with_fan_speed(mut self, speed: FanSpeed) -> Self {
        self.fan_speed = Some(speed);
        self
    }

    pub fn with_swing(mut self, swing: Swing) -> Self {
        self.swing = Some(swing);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct FujitsuClimate<T: Transport, H: ClimateHost> {
    name: String,
    codec: FrameCodec,
    link: LinkDriver<T>,
    machine: DeviceStateMachine,
    host: H,
    range: TemperatureRange,
    desired: ClimateState,
    unconfirmed: FieldMask,
    last_active_mode: ClimateMode,
    last_published: Option<ClimateSnapshot>,
}

impl<T: Transport, H: ClimateHost> FujitsuClimate<T, H> {
    /// Create a controller from the static configuration
    ///
    /// # Arguments
    /// * `config` - Controller identity, timing and serial options
    /// * `transport` - Outbound side of the bus
    /// * `host` - Receiver of published state and faults
    pub fn new(config: &StaticConfig, transport: T, host: H) -> Self {
        let address = config.controller.role.address();
        debug!(
            "Creating climate controller '{}' as {} (address 0x{:02X})",
            config.controller.name, config.controller.role, address
        );

        Self {
            name: config.controller.name.clone(),
            codec: FrameCodec::new(address),
            link: LinkDriver::new(
                transport,
                config.timing.inter_byte_timeout(),
                config.serial.debug_uart,
            ),
            machine: DeviceStateMachine::new(&config.timing),
            host,
            range: config.controller.temperature_range,
            desired: ClimateState::default(),
            unconfirmed: FieldMask::EMPTY,
            last_active_mode: ClimateMode::Auto,
            last_published: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u8 {
        self.codec.address()
    }

    /// Apply several attribute changes as a single mutation
    pub fn control(&mut self, call: ClimateCall) -> Result<()> {
        self.control_at(call, Instant::now())
    }

    /// Same as [`control`](Self::control) with an explicit clock
    ///
    /// Nothing is changed if any attribute fails validation.
    pub fn control_at(&mut self, call: ClimateCall, now: Instant) -> Result<()> {
        let target = call
            .target_temperature
            .map(|celsius| self.range.validate(celsius))
            .transpose()?;

        let mut next = self.desired;
        let mut fields = FieldMask::EMPTY;

        if let Some(on) = call.power {
            if on && next.mode == ClimateMode::Off {
                next.mode = self.last_active_mode;
            }
            if !on {
                next.mode = ClimateMode::Off;
            }
            next.power = on;
            fields |= FieldMask::MODE;
        }
        if let Some(mode) = call.mode {
            next.power = mode != ClimateMode::Off;
            next.mode = mode;
            fields |= FieldMask::MODE;
        }
        if let Some(target) = target {
            next.target_temperature = target;
            fields |= FieldMask::TARGET_TEMPERATURE;
        }
        if let Some(speed) = call.fan_speed {
            next.fan_speed = speed;
            fields |= FieldMask::FAN_SPEED;
        }
        if let Some(swing) = call.swing {
            next.swing = swing;
            fields |= FieldMask::SWING;
        }

        if fields.is_empty() {
            return Ok(());
        }

        let next = next.normalized();
        if next == self.desired && next == *self.machine.observed() && !self.machine.has_pending()
        {
            debug!("{}: requested state already applied", self.name);
            return Ok(());
        }

        info!(
            "{}: requesting mode={} target={} fan={} swing={}",
            self.name, next.mode, next.target_temperature, next.fan_speed, next.swing
        );
        self.desired = next;
        self.unconfirmed |= fields;
        self.remember_active_mode(next.mode);

        let effects = self.machine.submit(next, fields, now);
        self.run_effects(effects);
        Ok(())
    }

    /// Room temperature reported by the wall controller, in °C
    pub fn room_temperature(&self) -> Option<u8> {
        self.machine.room_temperature()
    }

    pub fn action(&self) -> ClimateAction {
        self.desired.action()
    }

    pub fn is_online(&self) -> bool {
        self.machine.is_online()
    }

    /// State as last observed on the bus
    pub fn observed(&self) -> &ClimateState {
        self.machine.observed()
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link.stats()
    }

    pub fn snapshot(&self) -> ClimateSnapshot {
        ClimateSnapshot {
            state: self.desired,
            action: self.desired.action(),
            room_temperature: self.machine.room_temperature(),
            fault: self.machine.fault(),
            online: self.machine.is_online(),
            pending: !self.unconfirmed.is_empty(),
        }
    }

    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.link.transport_mut()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn reading<V>(&self, value: V, field: FieldMask) -> Reading<V> {
        Reading {
            value,
            confirmed: !self.unconfirmed.intersects(field),
        }
    }

    fn remember_active_mode(&mut self, mode: ClimateMode) {
        if mode != ClimateMode::Off {
            self.last_active_mode = mode;
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(message) => match self.codec.encode(&message) {
                    Ok(bytes) => {
                        if let Err(e) = self.link.send(&bytes) {
                            self.machine.on_link_error();
                            self.host.report_fault(&e);
                        }
                    }
                    Err(e) => error!("{}: not sending {:?}: {}", self.name, message.opcode(), e),
                },
                Effect::Publish { confirmed } => {
                    self.sync_from_observed(confirmed);
                    self.publish();
                }
                Effect::Fault(fault) => {
                    warn!("{}: {}", self.name, fault);
                    self.host.report_fault(&fault);
                }
            }
        }
    }

    /// Pull observed values into the desired copy for fields no longer pending
    fn sync_from_observed(&mut self, confirmed: bool) {
        let observed = *self.machine.observed();
        self.remember_active_mode(observed.mode);

        if confirmed {
            self.desired = observed;
            self.unconfirmed = FieldMask::EMPTY;
            return;
        }

        let mut adopt = FieldMask::ALL;
        adopt.remove(self.machine.pending_fields());
        self.desired.merge_from(&observed, adopt);
        self.desired = self.desired.normalized();
        self.unconfirmed.remove(adopt);
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        if self.last_published.as_ref() == Some(&snapshot) {
            return;
        }

        debug!(
            "{}: publishing mode={} target={} online={} pending={}",
            self.name,
            snapshot.state.mode,
            snapshot.state.target_temperature,
            snapshot.online,
            snapshot.pending
        );
        self.host.publish_state(&snapshot);
        self.last_published = Some(snapshot);
    }
}

impl<T: Transport, H: ClimateHost> Tickable for FujitsuClimate<T, H> {
    fn setup(&mut self, now: Instant) {
        info!(
            "{}: starting controller at address 0x{:02X}",
            self.name,
            self.codec.address()
        );
        let effects = self.machine.tick(now);
        self.run_effects(effects);
    }

    fn tick(&mut self, now: Instant) {
        self.link.expire_stale(now);
        let effects = self.machine.tick(now);
        self.run_effects(effects);
    }
}

impl<T: Transport, H: ClimateHost> FrameConsumer for FujitsuClimate<T, H> {
    fn on_bytes(&mut self, bytes: &[u8], now: Instant) {
        self.link.feed_at(bytes, now);
        let address = self.codec.address();
        while let Some(frame) = self.link.try_extract_frame() {
            let effects = self.machine.on_frame(&frame, address, now);
            self.run_effects(effects);
        }
    }
}

impl<T: Transport, H: ClimateHost> ClimateControllable for FujitsuClimate<T, H> {
    fn set_power(&mut self, on: bool) -> Result<()> {
        self.control(ClimateCall::new().with_power(on))
    }

    fn set_mode(&mut self, mode: ClimateMode) -> Result<()> {
        self.control(ClimateCall::new().with_mode(mode))
    }

    fn set_target_temperature(&mut self, celsius: f32) -> Result<()> {
        self.control(ClimateCall::new().with_target_temperature(celsius))
    }

    fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        self.control(ClimateCall::new().with_fan_speed(speed))
    }

    fn set_swing(&mut self, swing: Swing) -> Result<()> {
        self.control(ClimateCall::new().with_swing(swing))
    }

    fn get_power(&self) -> Reading<bool> {
        self.reading(self.desired.power, FieldMask::MODE)
    }

    fn get_mode(&self) -> Reading<ClimateMode> {
        self.reading(self.desired.mode, FieldMask::MODE)
    }

    fn get_target_temperature(&self) -> Reading<f32> {
        self.reading(
            self.desired.target_temperature.celsius(),
            FieldMask::TARGET_TEMPERATURE,
        )
    }

    fn get_fan_speed(&self) -> Reading<FanSpeed> {
        self.reading(self.desired.fan_speed, FieldMask::FAN_SPEED)
    }

    fn get_swing(&self) -> Reading<Swing> {
        self.reading(self.desired.swing, FieldMask::SWING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Decoded, Message, FRAME_LEN};
    use fujitsu_core::{ControllerRole, StatusReport, TargetTemperature};
    use std::time::Duration;

    #[derive(Default)]
    struct MockTransport {
        written: Vec<Vec<u8>>,
        fail: bool,
    }

    impl Transport for MockTransport {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if self.fail {
                return Err(FujitsuError::Link("Broken pipe".to_string()));
            }
            self.written.push(bytes.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        published: Vec<ClimateSnapshot>,
        faults: Vec<String>,
    }

    impl ClimateHost for RecordingHost {
        fn publish_state(&mut self, snapshot: &ClimateSnapshot) {
            self.published.push(snapshot.clone());
        }

        fn report_fault(&mut self, fault: &FujitsuError) {
            self.faults.push(fault.to_string());
        }
    }

    type TestClimate = FujitsuClimate<MockTransport, RecordingHost>;

    fn create_climate() -> TestClimate {
        let mut config = StaticConfig::default();
        config.controller.role = ControllerRole::Secondary;
        FujitsuClimate::new(&config, MockTransport::default(), RecordingHost::default())
    }

    fn sent_messages(climate: &TestClimate) -> Vec<Message> {
        climate
            .transport()
            .written
            .iter()
            .map(|bytes| match codec::decode(bytes) {
                Decoded::Frame(frame) => frame.message().unwrap(),
                other => panic!("transport got a bad frame: {:?}", other),
            })
            .collect()
    }

    fn unit_frame(message: Message) -> [u8; FRAME_LEN] {
        FrameCodec::new(0x01).encode(&message).unwrap()
    }

    fn cool(celsius: f32) -> ClimateState {
        ClimateState {
            power: true,
            mode: ClimateMode::Cool,
            target_temperature: TargetTemperature::from_celsius(celsius).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_cool_22_scenario() {
        let mut climate = create_climate();
        let now = Instant::now();

        climate
            .control_at(
                ClimateCall::new()
                    .with_mode(ClimateMode::Cool)
                    .with_target_temperature(22.0),
                now,
            )
            .unwrap();

        assert_eq!(
            climate.transport().written,
            vec![vec![0xFE, 0x02, 0x01, 0x07, 0x0C, 0x00, 0x00, 0x14, 0xEB]]
        );
        assert_eq!(climate.phase(), Phase::AwaitingAck);
        assert!(!climate.get_mode().confirmed);
        assert_eq!(climate.get_mode().value, ClimateMode::Cool);

        climate.on_bytes(&unit_frame(Message::Ack(cool(22.0))), now);

        assert_eq!(climate.phase(), Phase::Idle);
        let published = climate.host().published.last().unwrap();
        assert_eq!(published.state.mode, ClimateMode::Cool);
        assert_eq!(published.state.target_temperature.celsius(), 22.0);
        assert!(!published.pending);
        assert!(climate.get_mode().confirmed);
        assert!(climate.get_target_temperature().confirmed);
    }

    #[test]
    fn test_rapid_temperature_changes_coalesce() {
        let mut climate = create_climate();
        let now = Instant::now();
        climate
            .control_at(ClimateCall::new().with_mode(ClimateMode::Heat), now)
            .unwrap();
        climate
            .control_at(ClimateCall::new().with_target_temperature(23.0), now)
            .unwrap();
        climate
            .control_at(ClimateCall::new().with_target_temperature(24.5), now)
            .unwrap();

        // Only the mode change went out so far
        assert_eq!(climate.transport().written.len(), 1);
        assert_eq!(climate.get_target_temperature().value, 24.5);

        let acked = ClimateState {
            power: true,
            mode: ClimateMode::Heat,
            ..Default::default()
        };
        climate.on_bytes(&unit_frame(Message::Ack(acked)), now);

        let sent = sent_messages(&climate);
        assert_eq!(sent.len(), 2);
        match sent[1] {
            Message::Set(state) => {
                assert_eq!(state.mode, ClimateMode::Heat);
                assert_eq!(state.target_temperature.celsius(), 24.5);
            }
            other => panic!("expected SET, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let mut climate = create_climate();

        let result = climate.set_target_temperature(22.3);
        assert!(matches!(result, Err(FujitsuError::InvalidInput(_))));
        assert!(climate.set_target_temperature(31.0).is_err());
        assert!(climate.set_target_temperature(15.5).is_err());

        assert!(climate.transport().written.is_empty());
        assert_eq!(climate.get_target_temperature().value, 22.0);
    }

    #[test]
    fn test_invalid_call_changes_nothing() {
        let mut climate = create_climate();
        let call = ClimateCall::new()
            .with_mode(ClimateMode::Cool)
            .with_target_temperature(40.0);

        assert!(climate.control(call).is_err());
        assert_eq!(climate.get_mode().value, ClimateMode::Off);
        assert!(climate.transport().written.is_empty());
    }

    #[test]
    fn test_mode_off_clears_power() {
        let mut climate = create_climate();
        let now = Instant::now();
        climate
            .control_at(ClimateCall::new().with_mode(ClimateMode::Dry), now)
            .unwrap();
        assert!(climate.get_power().value);

        climate
            .control_at(ClimateCall::new().with_mode(ClimateMode::Off), now)
            .unwrap();
        assert!(!climate.get_power().value);
        assert_eq!(climate.get_mode().value, ClimateMode::Off);
    }

    #[test]
    fn test_power_on_restores_last_mode() {
        let mut climate = create_climate();
        let now = Instant::now();

        // Nothing active yet: power on falls back to auto
        climate
            .control_at(ClimateCall::new().with_power(true), now)
            .unwrap();
        assert_eq!(climate.get_mode().value, ClimateMode::Auto);

        climate
            .control_at(ClimateCall::new().with_mode(ClimateMode::Heat), now)
            .unwrap();
        climate
            .control_at(ClimateCall::new().with_power(false), now)
            .unwrap();
        assert_eq!(climate.get_mode().value, ClimateMode::Off);

        climate
            .control_at(ClimateCall::new().with_power(true), now)
            .unwrap();
        assert_eq!(climate.get_mode().value, ClimateMode::Heat);
        assert!(climate.get_power().value);
    }

    #[test]
    fn test_setup_polls_and_status_publishes() {
        let mut climate = create_climate();
        let now = Instant::now();
        climate.setup(now);

        assert_eq!(sent_messages(&climate), vec![Message::Poll]);
        assert!(!climate.is_online());

        let report = StatusReport {
            room_temperature: Some(24),
            ..StatusReport::new(cool(25.0))
        };
        climate.on_bytes(&unit_frame(Message::Status(report)), now);

        assert!(climate.is_online());
        assert_eq!(climate.room_temperature(), Some(24));
        assert_eq!(climate.get_target_temperature().value, 25.0);
        assert!(climate.get_target_temperature().confirmed);
        assert_eq!(climate.action(), ClimateAction::Cooling);

        let published = climate.host().published.last().unwrap();
        assert!(published.online);
        assert_eq!(published.room_temperature, Some(24));
    }

    #[test]
    fn test_status_keeps_unconfirmed_field() {
        let mut climate = create_climate();
        let now = Instant::now();
        climate
            .control_at(ClimateCall::new().with_fan_speed(FanSpeed::High), now)
            .unwrap();

        let mut reported = cool(20.0);
        reported.fan_speed = FanSpeed::Low;
        climate.on_bytes(&unit_frame(Message::Status(StatusReport::new(reported))), now);

        assert_eq!(climate.get_fan_speed().value, FanSpeed::High);
        assert!(!climate.get_fan_speed().confirmed);
        assert_eq!(climate.get_mode().value, ClimateMode::Cool);
        assert!(climate.get_mode().confirmed);
    }

    #[test]
    fn test_timeout_reports_fault_then_status_reverts() {
        let mut climate = create_climate();
        let start = Instant::now();
        climate
            .control_at(ClimateCall::new().with_swing(Swing::Both), start)
            .unwrap();

        for step in 1..=4u64 {
            climate.tick(start + Duration::from_millis(1000 * step));
        }
        assert_eq!(climate.transport().written.len(), 4);
        assert_eq!(climate.host().faults.len(), 1);
        assert!(climate.host().faults[0].contains("4 attempts"));
        assert_eq!(climate.phase(), Phase::Idle);

        // Still shown as requested but unconfirmed
        assert_eq!(climate.get_swing().value, Swing::Both);
        assert!(!climate.get_swing().confirmed);

        // Recovery poll goes out on the next tick
        climate.tick(start + Duration::from_millis(4050));
        assert_eq!(sent_messages(&climate).last(), Some(&Message::Poll));

        climate.on_bytes(
            &unit_frame(Message::Status(StatusReport::new(ClimateState::default()))),
            start + Duration::from_millis(4100),
        );
        assert_eq!(climate.get_swing().value, Swing::Off);
        assert!(climate.get_swing().confirmed);
    }

    #[test]
    fn test_link_error_reported_and_retried() {
        let mut climate = create_climate();
        let now = Instant::now();
        climate.transport_mut().fail = true;

        climate
            .control_at(ClimateCall::new().with_mode(ClimateMode::Cool), now)
            .unwrap();
        assert_eq!(climate.host().faults.len(), 1);
        assert_eq!(climate.phase(), Phase::Idle);

        climate.transport_mut().fail = false;
        climate.tick(now + Duration::from_millis(50));
        assert_eq!(climate.transport().written.len(), 1);
        assert_eq!(climate.phase(), Phase::AwaitingAck);
    }

    #[test]
    fn test_repeated_value_is_not_resent() {
        let mut climate = create_climate();
        let now = Instant::now();

        climate
            .control_at(ClimateCall::new().with_fan_speed(FanSpeed::Auto), now)
            .unwrap();
        assert!(climate.transport().written.is_empty());
        assert!(climate.control_at(ClimateCall::new(), now).is_ok());
        assert!(climate.transport().written.is_empty());
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let mut climate = create_climate();
        let now = Instant::now();
        let frame = unit_frame(Message::Status(StatusReport::new(cool(21.0))));

        for byte in frame {
            climate.on_bytes(&[byte], now);
        }

        assert_eq!(climate.get_target_temperature().value, 21.0);
        assert_eq!(climate.link_stats().frames_received, 1);
        assert_eq!(climate.host().published.len(), 1);
    }

    #[test]
    fn test_frame_for_primary_ignored() {
        let mut climate = create_climate();
        let now = Instant::now();
        let frame = FrameCodec::new(0x00)
            .encode(&Message::Status(StatusReport::new(cool(19.0))))
            .unwrap();

        climate.on_bytes(&frame, now);
        assert!(climate.host().published.is_empty());
        assert_eq!(climate.get_mode().value, ClimateMode::Off);
    }

    #[test]
    fn test_unchanged_status_not_republished() {
        let mut climate = create_climate();
        let now = Instant::now();
        let frame = unit_frame(Message::Status(StatusReport::new(cool(21.0))));

        climate.on_bytes(&frame, now);
        climate.on_bytes(&frame, now + Duration::from_secs(5));
        assert_eq!(climate.host().published.len(), 1);
    }

    #[test]
    fn test_climate_call_is_empty() {
        assert!(ClimateCall::new().is_empty());
        assert!(!ClimateCall::new().with_swing(Swing::Off).is_empty());
    }
}
