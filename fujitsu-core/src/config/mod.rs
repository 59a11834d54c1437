//! Configuration types for the climate controller
//!
//! [`StaticConfig`] holds the serial, controller identity, timing and
//! reconnection settings. It is loaded once at startup from a TOML file.

mod paths;
mod static_config;

pub use paths::default_config_path;
pub use static_config::{
    ControllerConfig, ReconnectConfig, SerialConfig, StaticConfig, TimingConfig,
};
