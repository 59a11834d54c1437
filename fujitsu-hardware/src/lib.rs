//! fujitsu-hardware
//!
//! Protocol and hardware crate for Fujitsu heat pumps on the wired-remote
//! bus. It contains everything between a byte stream and the climate
//! attributes a host works with, and is used by the daemon to drive a real
//! serial adapter.
//
//! Public API:
//! - `climate::FujitsuClimate`: attribute-level controller façade
//! - `state_machine::DeviceStateMachine`: request/ack/poll cycle and reconciliation
//! - `codec::FrameCodec`: 9-byte frame encoding and decoding
//! - `link::LinkDriver`: receive buffering and resynchronisation
//! - `serial_driver::SerialDriver`: tokio-serial adapter
//! - `session::run_session`: async loop tying a port to a controller

pub mod climate;
pub mod codec;
pub mod link;
pub mod serial_driver;
pub mod session;
pub mod state_machine;

pub use climate::{
    ClimateCall, ClimateControllable, ClimateHost, FrameConsumer, FujitsuClimate, Tickable,
};
pub use codec::{FrameCodec, Message};
pub use link::{LinkDriver, Transport};
pub use serial_driver::{
    available_ports, find_serial_adapter, is_disconnect_error, PortInfo, SerialDriver, SerialIo,
};
pub use session::{run_session, ChannelTransport};
pub use state_machine::{DeviceStateMachine, Phase};
