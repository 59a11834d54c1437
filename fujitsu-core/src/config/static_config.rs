//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::TemperatureRange;
use crate::unit::{ControllerRole, DefaultUnit, UnitConfig};
use crate::{FujitsuError, Result};

/// Serial port configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Path to the serial adapter (e.g. "/dev/ttyUSB0")
    pub device: Option<String>,
    /// Log every transmitted and received frame as hex
    pub debug_uart: bool,
}

/// Identity of the controller on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Name used in logs and published state
    pub name: String,
    /// Wall-controller slot this controller occupies
    pub role: ControllerRole,
    /// Settable target temperature range
    pub temperature_range: TemperatureRange,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "fujitsu".to_string(),
            role: ControllerRole::default(),
            temperature_range: TemperatureRange::default(),
        }
    }
}

/// Poll, timeout and retry policy of the device state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between status polls while idle
    pub poll_interval_ms: u64,
    /// How long to wait for an ack or status frame
    pub response_timeout_ms: u64,
    /// Resends after the first transmission before giving up
    pub max_retries: u32,
    /// Partial frames older than this are discarded
    pub inter_byte_timeout_ms: u64,
    /// Consecutive unanswered polls before the unit is reported offline
    pub offline_after_missed_polls: u32,
    /// Period of the controller tick driven by the session loop
    pub tick_interval_ms: u64,
    /// Quiet time after the last received byte before transmitting
    pub reply_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            response_timeout_ms: 1000,
            max_retries: 3,
            inter_byte_timeout_ms: 200,
            offline_after_missed_polls: 3,
            tick_interval_ms: 50,
            reply_delay_ms: 60,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn inter_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.inter_byte_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

/// Serial adapter reconnection policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reopen the port after the adapter disappears
    pub enabled: bool,
    /// Give up after this many attempts (0 = unlimited)
    pub max_attempts: u32,
    /// First delay between attempts
    pub initial_delay_secs: u64,
    /// Upper bound for the delay between attempts
    pub max_delay_secs: u64,
    /// Factor applied to the delay after each failed attempt
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 0,
            initial_delay_secs: 1,
            max_delay_secs: 30,
            backoff_multiplier: 2.0,
        }
    }
}

/// Static configuration for the daemon.
///
/// Located at `~/.config/fujitsu-climate/config.toml` by default. Every
/// section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub serial: SerialConfig,
    pub controller: ControllerConfig,
    pub timing: TimingConfig,
    pub reconnect: ReconnectConfig,
}

impl StaticConfig {
    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check values that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        let range = &self.controller.temperature_range;
        if range.min > range.max {
            return Err(FujitsuError::Config(format!(
                "temperature_range.min ({}) is above temperature_range.max ({})",
                range.min, range.max
            )));
        }
        let supported = DefaultUnit::temperature_range();
        if !supported.contains(range.min) || !supported.contains(range.max) {
            return Err(FujitsuError::Config(format!(
                "temperature_range {}-{} exceeds the {}-{} supported by {}",
                range.min,
                range.max,
                supported.min,
                supported.max,
                DefaultUnit::NAME
            )));
        }
        let timing = &self.timing;
        let durations = [
            ("poll_interval_ms", timing.poll_interval_ms),
            ("response_timeout_ms", timing.response_timeout_ms),
            ("inter_byte_timeout_ms", timing.inter_byte_timeout_ms),
            ("tick_interval_ms", timing.tick_interval_ms),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(FujitsuError::Config(format!(
                    "timing.{} must be greater than 0",
                    name
                )));
            }
        }
        if self.reconnect.backoff_multiplier < 1.0 {
            return Err(FujitsuError::Config(format!(
                "reconnect.backoff_multiplier must be >= 1.0, got {}",
                self.reconnect.backoff_multiplier
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_static_config() {
        let config = StaticConfig::default();
        assert_eq!(config.timing.poll_interval_ms, 5000);
        assert_eq!(config.timing.max_retries, 3);
        assert_eq!(config.controller.role, ControllerRole::Secondary);
        assert!(config.serial.device.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_static_config_serialization() {
        let config = StaticConfig::default();
        let toml_str = config.to_toml().unwrap();

        assert!(toml_str.contains("[controller]"));
        assert!(toml_str.contains("[timing]"));
        assert!(toml_str.contains("[reconnect]"));
    }

    #[test]
    fn test_static_config_deserialization() {
        let toml_str = r#"
            [serial]
            device = "/dev/ttyUSB1"
            debug_uart = true

            [controller]
            name = "living-room"
            role = "primary"
            temperature_range = { min = 18.0, max = 26.5 }

            [timing]
            poll_interval_ms = 2000
            max_retries = 5
        "#;

        let config = StaticConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.serial.device.as_deref(), Some("/dev/ttyUSB1"));
        assert!(config.serial.debug_uart);
        assert_eq!(config.controller.name, "living-room");
        assert_eq!(config.controller.role, ControllerRole::Primary);
        assert_eq!(config.controller.temperature_range.max.celsius(), 26.5);
        assert_eq!(config.timing.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.timing.max_retries, 5);
        // Unspecified keys keep their defaults
        assert_eq!(config.timing.response_timeout_ms, 1000);
        assert!(config.reconnect.enabled);
    }

    #[test]
    fn test_static_config_empty_is_default() {
        let config = StaticConfig::from_toml("").unwrap();
        assert_eq!(config.controller.name, "fujitsu");
        assert_eq!(config.timing.tick_interval_ms, 50);
    }

    #[test]
    fn test_static_config_rejects_off_step_temperature() {
        let toml_str = r#"
            [controller]
            temperature_range = { min = 18.2, max = 26.0 }
        "#;
        assert!(StaticConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_validate_inverted_range() {
        let toml_str = r#"
            [controller]
            temperature_range = { min = 28.0, max = 20.0 }
        "#;
        let config = StaticConfig::from_toml(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(FujitsuError::Config(_))));
    }

    #[test]
    fn test_validate_backoff_multiplier() {
        let mut config = StaticConfig::default();
        config.reconnect.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_range_beyond_unit_limits() {
        let toml_str = r#"
            [controller]
            temperature_range = { min = 10.0, max = 26.0 }
        "#;
        let config = StaticConfig::from_toml(toml_str).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Fujitsu LIN"));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let config = StaticConfig::from_toml("[timing]\npoll_interval_ms = 0\n").unwrap();
        match config.validate() {
            Err(FujitsuError::Config(msg)) => assert!(msg.contains("poll_interval_ms")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_zero_inter_byte_timeout() {
        let config = StaticConfig::from_toml("[timing]\ninter_byte_timeout_ms = 0\n").unwrap();
        match config.validate() {
            Err(FujitsuError::Config(msg)) => assert!(msg.contains("inter_byte_timeout_ms")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_reply_delay_default_and_zero() {
        let config = StaticConfig::default();
        assert_eq!(config.timing.reply_delay(), Duration::from_millis(60));

        // No quiet time is a valid choice on a dedicated line
        let config = StaticConfig::from_toml("[timing]\nreply_delay_ms = 0\n").unwrap();
        assert!(config.validate().is_ok());
    }
}
