//! Fujitsu Climate Core Library
//!
//! Shared types, models, and utilities for the Fujitsu climate controller.
//! This crate is used by both the hardware driver and the daemon.

pub mod config;
pub mod error;
pub mod types;
pub mod unit;

// Re-export commonly used types
pub use config::{
    default_config_path, ControllerConfig, ReconnectConfig, SerialConfig, StaticConfig,
    TimingConfig,
};
pub use error::*;
pub use types::*;
pub use unit::*;
