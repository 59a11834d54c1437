//! Unit definitions and bus parameters
//!
//! Each indoor-unit family implements the `UnitConfig` trait with the serial
//! parameters of its bus and the target temperatures its controller accepts.
//! `ControllerRole` is the runtime choice of address this controller occupies
//! on the bus.
//!
//! Note: Actual serial I/O is in the `fujitsu-hardware` crate. This module only
//! contains unit profiles and type definitions.

use serde::{Deserialize, Serialize};

use crate::types::{TargetTemperature, TemperatureRange};

/// Indoor unit bus configuration trait
///
/// # Example
///
/// ```
/// use fujitsu_core::unit::{FujitsuLin, UnitConfig};
///
/// const BAUD: u32 = FujitsuLin::BAUD_RATE;
/// assert_eq!(FujitsuLin::temperature_range().min.celsius(), 16.0);
/// ```
pub trait UnitConfig: Send + Sync + 'static {
    /// Human-readable unit family name
    const NAME: &'static str;

    /// Serial communication baud rate
    const BAUD_RATE: u32;

    /// Whether the bus uses even parity (odd is never used by these units)
    const EVEN_PARITY: bool;

    /// Lowest settable target temperature, in half-degree units
    const MIN_TARGET_HALF_DEGREES: u16;

    /// Highest settable target temperature, in half-degree units
    const MAX_TARGET_HALF_DEGREES: u16;

    /// Range of target temperatures accepted by this unit family
    fn temperature_range() -> TemperatureRange {
        TemperatureRange {
            min: TargetTemperature::from_half_degrees(Self::MIN_TARGET_HALF_DEGREES),
            max: TargetTemperature::from_half_degrees(Self::MAX_TARGET_HALF_DEGREES),
        }
    }
}

/// Fujitsu split units driven over the wired-remote LIN bus
///
/// - 500 baud, 8 data bits, even parity, 1 stop bit
/// - Target temperature 16-30 °C
pub struct FujitsuLin;

impl UnitConfig for FujitsuLin {
    const NAME: &'static str = "Fujitsu LIN";
    const BAUD_RATE: u32 = 500;
    const EVEN_PARITY: bool = true;
    const MIN_TARGET_HALF_DEGREES: u16 = 32;
    const MAX_TARGET_HALF_DEGREES: u16 = 60;
}

/// Default unit family used throughout the codebase
pub type DefaultUnit = FujitsuLin;

/// Which wall-controller slot this controller occupies on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerRole {
    Primary,
    /// The usual choice: the factory wall controller stays primary
    #[default]
    Secondary,
}

impl ControllerRole {
    /// Bus address carried in every frame
    pub fn address(&self) -> u8 {
        match self {
            ControllerRole::Primary => 0x00,
            ControllerRole::Secondary => 0x01,
        }
    }
}

impl std::str::FromStr for ControllerRole {
    type Err = crate::FujitsuError;

    /// Parse a controller role (for the CLI --role flag)
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use fujitsu_core::unit::ControllerRole;
    ///
    /// assert_eq!(ControllerRole::from_str("primary").unwrap(), ControllerRole::Primary);
    /// assert!(ControllerRole::from_str("tertiary").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(ControllerRole::Primary),
            "secondary" => Ok(ControllerRole::Secondary),
            _ => Err(crate::FujitsuError::InvalidInput(format!(
                "Unknown controller role: '{}'. Valid options: primary, secondary",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ControllerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerRole::Primary => f.write_str("primary"),
            ControllerRole::Secondary => f.write_str("secondary"),
        }
    }
}
