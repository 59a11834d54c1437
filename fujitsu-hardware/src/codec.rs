//! Frame codec for the wired-remote bus
//!
//! Every frame is nine bytes long:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | `0xFE` start marker |
//! | 1 | opcode |
//! | 2 | controller address |
//! | 3 | power (bit 0), mode (bits 1-3), fan (bits 4-6), error (bit 7) |
//! | 4 | target temperature in half degrees above 16 °C (bits 0-6) |
//! | 5 | vertical swing (bit 2), horizontal swing (bit 3) |
//! | 6 | controller present (bit 0), room temperature °C (bits 1-6) |
//! | 7 | 8-bit additive checksum of bytes 0-6 |
//! | 8 | `0xEB` end marker |

use fujitsu_core::{
    ClimateMode, ClimateState, FanSpeed, FieldMask, FujitsuError, Result, StatusReport, Swing,
    TargetTemperature,
};

pub const FRAME_START: u8 = 0xFE;
pub const FRAME_END: u8 = 0xEB;
pub const FRAME_LEN: usize = 9;
/// Bytes between the opcode and the checksum
pub const PAYLOAD_LEN: usize = 5;

/// Packed temperature zero point: 16.0 °C
pub const TEMP_ZERO_HALF_DEGREES: u16 = 32;
/// Largest packed temperature the unit accepts (30.0 °C)
pub const TEMP_RAW_MAX: u8 = 28;
/// Packed temperature sent by the unit when it has no setpoint to report
pub const TEMP_UNREPORTED: u8 = 0x7F;
/// Room temperatures above this are sensor noise
pub const ROOM_TEMP_MAX_C: u8 = 50;

const POWER_BIT: u8 = 0x01;
const ERROR_BIT: u8 = 0x80;
const TEMP_MASK: u8 = 0x7F;
const SWING_VERTICAL_BIT: u8 = 0x04;
const SWING_HORIZONTAL_BIT: u8 = 0x08;
const CONTROLLER_PRESENT_BIT: u8 = 0x01;

/// Opcodes understood by the codec
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Status request (0x01)
    Poll = 0x01,
    /// Apply a full climate state (0x02)
    Set = 0x02,
    /// Status report from the unit (0x81)
    Status = 0x81,
    /// Unit confirms a SET and echoes the applied state (0x82)
    Ack = 0x82,
}

impl TryFrom<u8> for Opcode {
    type Error = FujitsuError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Opcode::Poll),
            0x02 => Ok(Opcode::Set),
            0x81 => Ok(Opcode::Status),
            0x82 => Ok(Opcode::Ack),
            opcode => Err(FujitsuError::UnrecognizedFrame { opcode }),
        }
    }
}

/// Typed content of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Poll,
    Set(ClimateState),
    Status(StatusReport),
    Ack(ClimateState),
}

impl Message {
    pub fn opcode(&self) -> Opcode {
        match self {
            Message::Poll => Opcode::Poll,
            Message::Set(_) => Opcode::Set,
            Message::Status(_) => Opcode::Status,
            Message::Ack(_) => Opcode::Ack,
        }
    }
}

/// A checksum-verified frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    opcode: u8,
    payload: [u8; PAYLOAD_LEN],
    checksum: u8,
}

impl Frame {
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn address(&self) -> u8 {
        self.payload[0]
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = FRAME_START;
        bytes[1] = self.opcode;
        bytes[2..2 + PAYLOAD_LEN].copy_from_slice(&self.payload);
        bytes[7] = self.checksum;
        bytes[8] = FRAME_END;
        bytes
    }

    /// Interpret the payload according to the opcode
    ///
    /// A STATUS or ACK whose setpoint is out of range (usually
    /// [`TEMP_UNREPORTED`]) still yields its other fields, as a
    /// [`Message::Status`] whose report leaves the target temperature out of
    /// `reported`. Such an ack cannot confirm a command.
    pub fn message(&self) -> Result<Message> {
        let [_, flags, temp, swing, room] = self.payload;
        let setpoint = unpack_setpoint(temp);

        match (Opcode::try_from(self.opcode)?, setpoint) {
            (Opcode::Poll, _) => Ok(Message::Poll),
            (Opcode::Set, Some(setpoint)) => Ok(Message::Set(unpack_state(flags, setpoint, swing)?)),
            (Opcode::Set, None) => Err(FujitsuError::DecodeInvalid(format!(
                "target temperature raw value {} out of range",
                temp & TEMP_MASK
            ))),
            (Opcode::Ack, Some(setpoint)) => Ok(Message::Ack(unpack_state(flags, setpoint, swing)?)),
            (Opcode::Ack | Opcode::Status, setpoint) => {
                let report = StatusReport {
                    state: unpack_state(flags, setpoint.unwrap_or_default(), swing)?,
                    reported: FieldMask::ALL,
                    room_temperature: unpack_room_temperature(room),
                    fault: flags & ERROR_BIT != 0,
                };
                Ok(Message::Status(match setpoint {
                    Some(_) => report,
                    None => report.without_setpoint(),
                }))
            }
        }
    }
}

/// Result of inspecting the head of a receive window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete frame occupies the first `FRAME_LEN` bytes
    Frame(Frame),
    /// The window is a valid prefix of a frame
    NeedMoreBytes,
    /// The head byte cannot start a frame; drop it and retry
    Invalid(&'static str),
}

/// 8-bit additive checksum
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Inspect the head of `window` for a frame
pub fn decode(window: &[u8]) -> Decoded {
    let Some(&first) = window.first() else {
        return Decoded::NeedMoreBytes;
    };
    if first != FRAME_START {
        return Decoded::Invalid("missing start marker");
    }
    if window.len() < FRAME_LEN {
        return Decoded::NeedMoreBytes;
    }

    let bytes = &window[..FRAME_LEN];
    if bytes[FRAME_LEN - 1] != FRAME_END {
        return Decoded::Invalid("bad end marker");
    }
    if checksum(&bytes[..7]) != bytes[7] {
        return Decoded::Invalid("checksum mismatch");
    }

    let mut payload = [0u8; PAYLOAD_LEN];
    payload.copy_from_slice(&bytes[2..7]);
    Decoded::Frame(Frame {
        opcode: bytes[1],
        payload,
        checksum: bytes[7],
    })
}

/// Encoder bound to this controller's bus address
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    address: u8,
}

impl FrameCodec {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Encode a message into a complete frame
    ///
    /// Fails with `FujitsuError::Encoding` if a field is outside the protocol
    /// domain; nothing should be transmitted in that case.
    pub fn encode(&self, message: &Message) -> Result<[u8; FRAME_LEN]> {
        let mut payload = [self.address, 0, 0, 0, 0];

        match message {
            Message::Poll => {}
            Message::Set(state) | Message::Ack(state) => {
                pack_state(state, &mut payload)?;
            }
            Message::Status(report) => {
                pack_state(&report.state, &mut payload)?;
                if report.fault {
                    payload[1] |= ERROR_BIT;
                }
                if !report.reported.contains(FieldMask::TARGET_TEMPERATURE) {
                    payload[2] = TEMP_UNREPORTED;
                }
                payload[4] = pack_room_temperature(report.room_temperature)?;
            }
        }

        let mut head = [0u8; 7];
        head[0] = FRAME_START;
        head[1] = message.opcode() as u8;
        head[2..].copy_from_slice(&payload);

        Ok(Frame {
            opcode: head[1],
            payload,
            checksum: checksum(&head),
        }
        .to_bytes())
    }
}

fn mode_to_bits(mode: ClimateMode) -> u8 {
    match mode {
        ClimateMode::Off => 0,
        ClimateMode::FanOnly => 1,
        ClimateMode::Dry => 2,
        ClimateMode::Cool => 3,
        ClimateMode::Heat => 4,
        ClimateMode::Auto => 5,
    }
}

fn mode_from_bits(bits: u8) -> Result<ClimateMode> {
    match bits {
        1 => Ok(ClimateMode::FanOnly),
        2 => Ok(ClimateMode::Dry),
        3 => Ok(ClimateMode::Cool),
        4 => Ok(ClimateMode::Heat),
        5 => Ok(ClimateMode::Auto),
        other => Err(FujitsuError::DecodeInvalid(format!(
            "unknown mode bits {}",
            other
        ))),
    }
}

fn fan_to_bits(fan: FanSpeed) -> u8 {
    match fan {
        FanSpeed::Auto => 0,
        FanSpeed::Quiet => 1,
        FanSpeed::Low => 2,
        FanSpeed::Medium => 3,
        FanSpeed::High => 4,
    }
}

fn fan_from_bits(bits: u8) -> Result<FanSpeed> {
    match bits {
        0 => Ok(FanSpeed::Auto),
        1 => Ok(FanSpeed::Quiet),
        2 => Ok(FanSpeed::Low),
        3 => Ok(FanSpeed::Medium),
        4 => Ok(FanSpeed::High),
        other => Err(FujitsuError::DecodeInvalid(format!(
            "unknown fan bits {}",
            other
        ))),
    }
}

/// Convert a target temperature to its packed form
///
/// - 16.0 °C → 0
/// - 22.0 °C → 12
/// - 30.0 °C → 28
pub fn temperature_to_raw(temperature: TargetTemperature) -> Result<u8> {
    let raw = temperature
        .half_degrees()
        .checked_sub(TEMP_ZERO_HALF_DEGREES)
        .filter(|raw| *raw <= TEMP_RAW_MAX as u16)
        .ok_or_else(|| {
            FujitsuError::Encoding(format!(
                "target temperature {} outside 16.0-30.0",
                temperature
            ))
        })?;
    Ok(raw as u8)
}

pub fn temperature_from_raw(raw: u8) -> Result<TargetTemperature> {
    if raw > TEMP_RAW_MAX {
        return Err(FujitsuError::DecodeInvalid(format!(
            "target temperature raw value {} out of range",
            raw
        )));
    }
    Ok(TargetTemperature::from_half_degrees(
        TEMP_ZERO_HALF_DEGREES + raw as u16,
    ))
}

fn pack_state(state: &ClimateState, payload: &mut [u8; PAYLOAD_LEN]) -> Result<()> {
    if !state.is_normalized() {
        return Err(FujitsuError::Encoding(format!(
            "power={} contradicts mode={}",
            state.power, state.mode
        )));
    }

    let mut flags = mode_to_bits(state.mode) << 1 | fan_to_bits(state.fan_speed) << 4;
    if state.power {
        flags |= POWER_BIT;
    }

    let mut swing = 0;
    if state.swing.vertical() {
        swing |= SWING_VERTICAL_BIT;
    }
    if state.swing.horizontal() {
        swing |= SWING_HORIZONTAL_BIT;
    }

    payload[1] = flags;
    payload[2] = temperature_to_raw(state.target_temperature)?;
    payload[3] = swing;
    Ok(())
}

/// Setpoint carried by a temperature byte; `None` when out of range
fn unpack_setpoint(temp: u8) -> Option<TargetTemperature> {
    temperature_from_raw(temp & TEMP_MASK).ok()
}

fn unpack_state(flags: u8, setpoint: TargetTemperature, swing: u8) -> Result<ClimateState> {
    let power = flags & POWER_BIT != 0;
    // Mode bits are meaningless while the unit is off
    let mode = if power {
        mode_from_bits((flags >> 1) & 0x07)?
    } else {
        ClimateMode::Off
    };

    Ok(ClimateState {
        power,
        mode,
        target_temperature: setpoint,
        fan_speed: fan_from_bits((flags >> 4) & 0x07)?,
        swing: Swing::from_axes(
            swing & SWING_VERTICAL_BIT != 0,
            swing & SWING_HORIZONTAL_BIT != 0,
        ),
    })
}

fn pack_room_temperature(room: Option<u8>) -> Result<u8> {
    match room {
        None => Ok(0),
        Some(celsius) if celsius <= ROOM_TEMP_MAX_C => Ok(celsius << 1 | CONTROLLER_PRESENT_BIT),
        Some(celsius) => Err(FujitsuError::Encoding(format!(
            "room temperature {} above {}",
            celsius, ROOM_TEMP_MAX_C
        ))),
    }
}

fn unpack_room_temperature(byte: u8) -> Option<u8> {
    if byte & CONTROLLER_PRESENT_BIT == 0 {
        return None;
    }
    let celsius = (byte >> 1) & 0x3F;
    (celsius <= ROOM_TEMP_MAX_C).then_some(celsius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cool_22() -> ClimateState {
        ClimateState {
            power: true,
            mode: ClimateMode::Cool,
            target_temperature: TargetTemperature::from_celsius(22.0).unwrap(),
            fan_speed: FanSpeed::Auto,
            swing: Swing::Off,
        }
    }

    fn decode_frame(bytes: &[u8]) -> Frame {
        match decode(bytes) {
            Decoded::Frame(frame) => frame,
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Poll as u8, 0x01);
        assert_eq!(Opcode::Set as u8, 0x02);
        assert_eq!(Opcode::Status as u8, 0x81);
        assert_eq!(Opcode::Ack as u8, 0x82);
        assert!(matches!(
            Opcode::try_from(0x7A),
            Err(FujitsuError::UnrecognizedFrame { opcode: 0x7A })
        ));
    }

    #[test]
    fn test_encode_set_cool_22_layout() {
        let codec = FrameCodec::new(0x01);
        let bytes = codec.encode(&Message::Set(cool_22())).unwrap();

        // power | cool(3) << 1, raw temperature (44 - 32) = 12
        assert_eq!(
            bytes,
            [0xFE, 0x02, 0x01, 0x07, 0x0C, 0x00, 0x00, 0x14, 0xEB]
        );
    }

    #[test]
    fn test_encode_poll_layout() {
        let codec = FrameCodec::new(0x00);
        let bytes = codec.encode(&Message::Poll).unwrap();
        assert_eq!(bytes, [0xFE, 0x01, 0x00, 0, 0, 0, 0, 0xFF, 0xEB]);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFE, 0x02, 0x01, 0x07, 0x0C, 0x00, 0x00]), 0x14);
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0xFF, 0x01]), 0x00);
    }

    #[test]
    fn test_temperature_packing() {
        let cases = [(16.0, 0u8), (16.5, 1), (22.0, 12), (25.5, 19), (30.0, 28)];
        for (celsius, raw) in cases {
            let t = TargetTemperature::from_celsius(celsius).unwrap();
            assert_eq!(temperature_to_raw(t).unwrap(), raw, "packing {}", celsius);
            assert_eq!(temperature_from_raw(raw).unwrap(), t, "unpacking {}", raw);
        }
    }

    #[test]
    fn test_temperature_out_of_protocol_domain() {
        let too_cold = TargetTemperature::from_celsius(15.5).unwrap();
        let too_hot = TargetTemperature::from_celsius(30.5).unwrap();
        assert!(matches!(
            temperature_to_raw(too_cold),
            Err(FujitsuError::Encoding(_))
        ));
        assert!(matches!(
            temperature_to_raw(too_hot),
            Err(FujitsuError::Encoding(_))
        ));
        assert!(temperature_from_raw(0x7F).is_err());
    }

    #[test]
    fn test_encode_rejects_inconsistent_power() {
        let codec = FrameCodec::new(0x01);
        let state = ClimateState {
            power: true,
            mode: ClimateMode::Off,
            ..Default::default()
        };
        assert!(matches!(
            codec.encode(&Message::Set(state)),
            Err(FujitsuError::Encoding(_))
        ));
    }

    #[test]
    fn test_round_trip_every_valid_state() {
        let codec = FrameCodec::new(0x01);
        let modes = [
            ClimateMode::Off,
            ClimateMode::Heat,
            ClimateMode::Cool,
            ClimateMode::Dry,
            ClimateMode::FanOnly,
            ClimateMode::Auto,
        ];
        let fans = [
            FanSpeed::Auto,
            FanSpeed::Quiet,
            FanSpeed::Low,
            FanSpeed::Medium,
            FanSpeed::High,
        ];
        let swings = [Swing::Off, Swing::Vertical, Swing::Horizontal, Swing::Both];

        for mode in modes {
            for fan_speed in fans {
                for swing in swings {
                    for half in 32u16..=60 {
                        let state = ClimateState {
                            power: mode != ClimateMode::Off,
                            mode,
                            target_temperature: TargetTemperature::from_half_degrees(half),
                            fan_speed,
                            swing,
                        };
                        let bytes = codec.encode(&Message::Set(state)).unwrap();
                        let decoded = decode_frame(&bytes).message().unwrap();
                        assert_eq!(decoded, Message::Set(state));
                    }
                }
            }
        }
    }

    #[test]
    fn test_status_report_carries_room_temperature_and_fault() {
        let codec = FrameCodec::new(0x01);
        let report = StatusReport {
            room_temperature: Some(24),
            fault: true,
            ..StatusReport::new(cool_22())
        };
        let bytes = codec.encode(&Message::Status(report)).unwrap();
        assert_eq!(bytes[6], 24 << 1 | 1);
        assert_eq!(bytes[3] & 0x80, 0x80);

        let decoded = decode_frame(&bytes).message().unwrap();
        assert_eq!(decoded, Message::Status(report));
    }

    #[test]
    fn test_room_temperature_without_controller_present() {
        // Bits 1-6 carry a value but the present bit is clear
        assert_eq!(unpack_room_temperature(24 << 1), None);
        assert_eq!(unpack_room_temperature(55 << 1 | 1), None);
        assert_eq!(unpack_room_temperature(21 << 1 | 1), Some(21));
        assert!(pack_room_temperature(Some(60)).is_err());
    }

    #[test]
    fn test_decode_need_more_bytes() {
        let bytes = FrameCodec::new(0x01).encode(&Message::Poll).unwrap();
        assert_eq!(decode(&[]), Decoded::NeedMoreBytes);
        for len in 1..FRAME_LEN {
            assert_eq!(decode(&bytes[..len]), Decoded::NeedMoreBytes);
        }
    }

    #[test]
    fn test_decode_invalid_markers_and_checksum() {
        let mut bytes = FrameCodec::new(0x01)
            .encode(&Message::Set(cool_22()))
            .unwrap();

        assert!(matches!(decode(&[0x00, 0xFE]), Decoded::Invalid(_)));

        bytes[8] = 0x00;
        assert_eq!(decode(&bytes), Decoded::Invalid("bad end marker"));

        bytes[8] = FRAME_END;
        bytes[4] ^= 0x01;
        assert_eq!(decode(&bytes), Decoded::Invalid("checksum mismatch"));
    }

    #[test]
    fn test_decode_uses_only_first_frame() {
        let codec = FrameCodec::new(0x01);
        let mut window = codec.encode(&Message::Poll).unwrap().to_vec();
        window.extend_from_slice(&codec.encode(&Message::Set(cool_22())).unwrap());

        let frame = decode_frame(&window);
        assert_eq!(frame.opcode(), Opcode::Poll as u8);
        assert_eq!(frame.address(), 0x01);
        assert_eq!(frame.to_bytes(), window[..FRAME_LEN]);
    }

    #[test]
    fn test_unknown_opcode_with_valid_checksum() {
        let head = [FRAME_START, 0x42, 0x01, 0, 0, 0, 0];
        let cs = checksum(&head);
        let bytes = [head[0], head[1], head[2], 0, 0, 0, 0, cs, FRAME_END];

        let frame = decode_frame(&bytes);
        assert!(matches!(
            frame.message(),
            Err(FujitsuError::UnrecognizedFrame { opcode: 0x42 })
        ));
    }

    #[test]
    fn test_unknown_mode_bits_rejected() {
        // Power on with mode bits 7
        let head = [FRAME_START, Opcode::Status as u8, 0x01, 0x0F, 0x0C, 0, 0];
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..7].copy_from_slice(&head);
        bytes[7] = checksum(&head);
        bytes[8] = FRAME_END;

        assert!(matches!(
            decode_frame(&bytes).message(),
            Err(FujitsuError::DecodeInvalid(_))
        ));
    }

    #[test]
    fn test_power_off_ignores_mode_bits() {
        // Unit reports cool bits with power clear: the mode reads as off
        let head = [FRAME_START, Opcode::Status as u8, 0x01, 0x06 | 0x20, 0x0C, 0, 0];
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..7].copy_from_slice(&head);
        bytes[7] = checksum(&head);
        bytes[8] = FRAME_END;

        match decode_frame(&bytes).message().unwrap() {
            Message::Status(report) => {
                assert_eq!(report.state.mode, ClimateMode::Off);
                assert!(!report.state.power);
                assert_eq!(report.state.fan_speed, FanSpeed::Low);
            }
            other => panic!("expected status, got {:?}", other),
        }
    }

    fn frame_bytes(head: [u8; 7]) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..7].copy_from_slice(&head);
        bytes[7] = checksum(&head);
        bytes[8] = FRAME_END;
        bytes
    }

    #[test]
    fn test_status_without_setpoint_keeps_other_fields() {
        // Power on, cool, fan high, no setpoint, room 24 °C with controller present
        let bytes = frame_bytes([FRAME_START, 0x81, 0x01, 0x47, TEMP_UNREPORTED, 0x00, 0x31]);

        match decode_frame(&bytes).message().unwrap() {
            Message::Status(report) => {
                assert!(report.state.power);
                assert_eq!(report.state.mode, ClimateMode::Cool);
                assert_eq!(report.state.fan_speed, FanSpeed::High);
                assert_eq!(report.room_temperature, Some(24));
                assert!(!report.reported.contains(FieldMask::TARGET_TEMPERATURE));
                assert!(report.reported.contains(FieldMask::MODE | FieldMask::FAN_SPEED));
            }
            other => panic!("expected status, got {:?}", other),
        }

        // Out-of-range values other than the marker read the same way
        let bytes = frame_bytes([FRAME_START, 0x81, 0x01, 0x47, 0x40, 0x00, 0x00]);
        assert!(matches!(
            decode_frame(&bytes).message().unwrap(),
            Message::Status(report) if !report.reported.contains(FieldMask::TARGET_TEMPERATURE)
        ));
    }

    #[test]
    fn test_ack_without_setpoint_is_an_observation() {
        let bytes = frame_bytes([FRAME_START, 0x82, 0x01, 0x47, TEMP_UNREPORTED, 0x00, 0x00]);

        match decode_frame(&bytes).message().unwrap() {
            Message::Status(report) => {
                assert_eq!(report.state.mode, ClimateMode::Cool);
                assert!(!report.reported.contains(FieldMask::TARGET_TEMPERATURE));
            }
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn test_set_without_setpoint_rejected() {
        let bytes = frame_bytes([FRAME_START, 0x02, 0x01, 0x47, TEMP_UNREPORTED, 0x00, 0x00]);
        assert!(matches!(
            decode_frame(&bytes).message(),
            Err(FujitsuError::DecodeInvalid(_))
        ));
    }

    #[test]
    fn test_encode_status_without_setpoint() {
        let codec = FrameCodec::new(0x01);
        let report = StatusReport::new(cool_22()).without_setpoint();
        let bytes = codec.encode(&Message::Status(report)).unwrap();
        assert_eq!(bytes[4], TEMP_UNREPORTED);

        let decoded = decode_frame(&bytes).message().unwrap();
        match decoded {
            Message::Status(decoded) => {
                assert_eq!(decoded.reported, report.reported);
                assert_eq!(decoded.state.mode, ClimateMode::Cool);
            }
            other => panic!("expected status, got {:?}", other),
        }
    }
}
