//! Core types and data structures for the climate controller

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::{FujitsuError, Result};

/// Operating mode as seen by callers
///
/// `Off` is a mode in its own right; on the wire it is expressed by clearing
/// the power bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateMode {
    Off,
    Heat,
    Cool,
    Dry,
    FanOnly,
    Auto,
}

impl ClimateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateMode::Off => "off",
            ClimateMode::Heat => "heat",
            ClimateMode::Cool => "cool",
            ClimateMode::Dry => "dry",
            ClimateMode::FanOnly => "fan_only",
            ClimateMode::Auto => "auto",
        }
    }
}

impl fmt::Display for ClimateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indoor unit fan speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanSpeed {
    Auto,
    Quiet,
    Low,
    Medium,
    High,
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FanSpeed::Auto => "auto",
            FanSpeed::Quiet => "quiet",
            FanSpeed::Low => "low",
            FanSpeed::Medium => "medium",
            FanSpeed::High => "high",
        };
        f.write_str(name)
    }
}

/// Louver swing setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Swing {
    Off,
    Vertical,
    Horizontal,
    Both,
}

impl Swing {
    /// Build a swing setting from the two independent louver axes
    pub fn from_axes(vertical: bool, horizontal: bool) -> Self {
        match (vertical, horizontal) {
            (false, false) => Swing::Off,
            (true, false) => Swing::Vertical,
            (false, true) => Swing::Horizontal,
            (true, true) => Swing::Both,
        }
    }

    pub fn vertical(&self) -> bool {
        matches!(self, Swing::Vertical | Swing::Both)
    }

    pub fn horizontal(&self) -> bool {
        matches!(self, Swing::Horizontal | Swing::Both)
    }
}

impl fmt::Display for Swing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Swing::Off => "off",
            Swing::Vertical => "vertical",
            Swing::Horizontal => "horizontal",
            Swing::Both => "both",
        };
        f.write_str(name)
    }
}

/// What the unit is doing, derived from power and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateAction {
    Off,
    Heating,
    Cooling,
    Drying,
    Fan,
    Idle,
}

/// Target temperature held as whole half-degree units
///
/// Keeping the value integral makes step validation and wire packing exact;
/// conversions to and from `f32` only happen at the façade boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetTemperature {
    half_degrees: u16,
}

impl TargetTemperature {
    /// Step between two settable temperatures, in °C
    pub const STEP_CELSIUS: f32 = 0.5;

    pub const fn from_half_degrees(half_degrees: u16) -> Self {
        Self { half_degrees }
    }

    /// Convert a Celsius value, rejecting values that are not on a 0.5 °C step
    pub fn from_celsius(celsius: f32) -> Result<Self> {
        if !celsius.is_finite() || celsius < 0.0 {
            return Err(FujitsuError::InvalidInput(format!(
                "Temperature must be a positive number, got {}",
                celsius
            )));
        }

        let halves = celsius * 2.0;
        if halves.fract() != 0.0 || halves > u16::MAX as f32 {
            return Err(FujitsuError::InvalidInput(format!(
                "Temperature {} is not a multiple of {} °C",
                celsius,
                Self::STEP_CELSIUS
            )));
        }

        Ok(Self {
            half_degrees: halves as u16,
        })
    }

    pub fn half_degrees(&self) -> u16 {
        self.half_degrees
    }

    pub fn celsius(&self) -> f32 {
        self.half_degrees as f32 / 2.0
    }
}

impl Default for TargetTemperature {
    fn default() -> Self {
        Self::from_half_degrees(44)
    }
}

impl fmt::Display for TargetTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.celsius())
    }
}

impl Serialize for TargetTemperature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.celsius())
    }
}

impl<'de> Deserialize<'de> for TargetTemperature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let celsius = f32::deserialize(deserializer)?;
        TargetTemperature::from_celsius(celsius).map_err(serde::de::Error::custom)
    }
}

/// Inclusive range of settable target temperatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: TargetTemperature,
    pub max: TargetTemperature,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            min: TargetTemperature::from_half_degrees(32),
            max: TargetTemperature::from_half_degrees(60),
        }
    }
}

impl TemperatureRange {
    pub fn contains(&self, temperature: TargetTemperature) -> bool {
        temperature >= self.min && temperature <= self.max
    }

    /// Validate a Celsius value against step and bounds
    pub fn validate(&self, celsius: f32) -> Result<TargetTemperature> {
        let temperature = TargetTemperature::from_celsius(celsius)?;
        if !self.contains(temperature) {
            return Err(FujitsuError::InvalidInput(format!(
                "Temperature {} outside of range {}-{}",
                temperature, self.min, self.max
            )));
        }
        Ok(temperature)
    }
}

/// Set of `ClimateState` fields touched by an intent
///
/// Power is carried by `MODE`: switching the unit on or off is a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldMask(u8);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);
    pub const MODE: FieldMask = FieldMask(0b0001);
    pub const TARGET_TEMPERATURE: FieldMask = FieldMask(0b0010);
    pub const FAN_SPEED: FieldMask = FieldMask(0b0100);
    pub const SWING: FieldMask = FieldMask(0b1000);
    pub const ALL: FieldMask = FieldMask(0b1111);

    pub fn contains(&self, other: FieldMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: FieldMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn remove(&mut self, other: FieldMask) {
        self.0 &= !other.0;
    }
}

impl BitOr for FieldMask {
    type Output = FieldMask;

    fn bitor(self, rhs: FieldMask) -> FieldMask {
        FieldMask(self.0 | rhs.0)
    }
}

impl BitAnd for FieldMask {
    type Output = FieldMask;

    fn bitand(self, rhs: FieldMask) -> FieldMask {
        FieldMask(self.0 & rhs.0)
    }
}

impl BitOrAssign for FieldMask {
    fn bitor_assign(&mut self, rhs: FieldMask) {
        self.0 |= rhs.0;
    }
}

/// Climate state of the unit, used for both desired and observed values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateState {
    pub power: bool,
    pub mode: ClimateMode,
    pub target_temperature: TargetTemperature,
    pub fan_speed: FanSpeed,
    pub swing: Swing,
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            power: false,
            mode: ClimateMode::Off,
            target_temperature: TargetTemperature::default(),
            fan_speed: FanSpeed::Auto,
            swing: Swing::Off,
        }
    }
}

impl ClimateState {
    /// Make power and mode agree: the unit is on exactly when the mode is not `Off`
    pub fn normalized(mut self) -> Self {
        if !self.power || self.mode == ClimateMode::Off {
            self.power = false;
            self.mode = ClimateMode::Off;
        }
        self
    }

    pub fn is_normalized(&self) -> bool {
        self.power == (self.mode != ClimateMode::Off)
    }

    pub fn action(&self) -> ClimateAction {
        if !self.power {
            return ClimateAction::Off;
        }
        match self.mode {
            ClimateMode::Off => ClimateAction::Off,
            ClimateMode::Heat => ClimateAction::Heating,
            ClimateMode::Cool => ClimateAction::Cooling,
            ClimateMode::Dry => ClimateAction::Drying,
            ClimateMode::FanOnly => ClimateAction::Fan,
            ClimateMode::Auto => ClimateAction::Idle,
        }
    }

    /// Fields whose values differ between `self` and `other`
    pub fn diff(&self, other: &ClimateState) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.power != other.power || self.mode != other.mode {
            mask |= FieldMask::MODE;
        }
        if self.target_temperature != other.target_temperature {
            mask |= FieldMask::TARGET_TEMPERATURE;
        }
        if self.fan_speed != other.fan_speed {
            mask |= FieldMask::FAN_SPEED;
        }
        if self.swing != other.swing {
            mask |= FieldMask::SWING;
        }
        mask
    }

    /// Copy the fields named by `mask` from `other`
    pub fn merge_from(&mut self, other: &ClimateState, mask: FieldMask) {
        if mask.contains(FieldMask::MODE) {
            self.power = other.power;
            self.mode = other.mode;
        }
        if mask.contains(FieldMask::TARGET_TEMPERATURE) {
            self.target_temperature = other.target_temperature;
        }
        if mask.contains(FieldMask::FAN_SPEED) {
            self.fan_speed = other.fan_speed;
        }
        if mask.contains(FieldMask::SWING) {
            self.swing = other.swing;
        }
    }
}

/// Observed-only data carried by a status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: ClimateState,
    /// Fields of `state` the unit actually reported; the rest are placeholders
    pub reported: FieldMask,
    /// Room temperature in °C, present only when the wall controller reports one
    pub room_temperature: Option<u8>,
    /// Error bit raised by the unit
    pub fault: bool,
}

impl StatusReport {
    pub fn new(state: ClimateState) -> Self {
        Self {
            state,
            reported: FieldMask::ALL,
            room_temperature: None,
            fault: false,
        }
    }

    /// Report without a setpoint (the unit sent the "no setpoint" value)
    pub fn without_setpoint(mut self) -> Self {
        self.reported.remove(FieldMask::TARGET_TEMPERATURE);
        self
    }
}

/// A façade value together with whether the unit has confirmed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reading<T> {
    pub value: T,
    pub confirmed: bool,
}

/// State published to the host after every confirmed or observed change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateSnapshot {
    pub state: ClimateState,
    pub action: ClimateAction,
    pub room_temperature: Option<u8>,
    pub fault: bool,
    pub online: bool,
    /// A façade change has not been acknowledged by the unit yet
    pub pending: bool,
}
