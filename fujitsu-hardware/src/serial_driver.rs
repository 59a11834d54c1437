//! Serial driver for the wired-remote bus
//!
//! Opens the UART adapter with the unit's line settings and exposes it as a
//! byte stream through [`SerialIo`].

use async_trait::async_trait;
use fujitsu_core::{DefaultUnit, FujitsuError, Result, UnitConfig};
use std::marker::PhantomData;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::{debug, error, warn};

/// Trait for serial I/O abstraction
///
/// This trait enables testing of the session loop without real hardware
/// by allowing mock implementations.
#[async_trait]
pub trait SerialIo: Send {
    /// Wait for the next bytes from the bus
    ///
    /// Returns the number of bytes written into `buf`, never 0: end of stream
    /// is reported as `FujitsuError::DeviceDisconnected`. Must be cancel-safe.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a complete frame to the bus
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Get the port path for reconnection purposes
    fn port_path(&self) -> Option<&str>;
}

/// Serial port candidate found on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
    pub usb: bool,
}

/// Serial driver for the wired-remote bus
pub struct SerialDriver<U: UnitConfig = DefaultUnit> {
    port: SerialStream,
    port_path: String,
    write_timeout: Duration,
    _unit: PhantomData<U>,
}

impl<U: UnitConfig> SerialDriver<U> {
    /// Open the serial adapter
    ///
    /// # Arguments
    /// * `port_path` - Path to the serial device (e.g., "/dev/ttyUSB0")
    /// * `write_timeout` - Upper bound for writing and flushing one frame
    pub fn new(port_path: &str, write_timeout: Duration) -> Result<Self> {
        debug!(
            "Opening serial port {} for {} ({} baud)",
            port_path,
            U::NAME,
            U::BAUD_RATE
        );

        let port = tokio_serial::new(port_path, U::BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(parity::<U>())
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", port_path, e);
                FujitsuError::Serial(format!("Failed to open serial port: {}", e))
            })?;

        debug!("Serial port opened successfully");

        Ok(Self {
            port,
            port_path: port_path.to_string(),
            write_timeout,
            _unit: PhantomData,
        })
    }
}

#[async_trait]
impl<U: UnitConfig> SerialIo for SerialDriver<U> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf).await {
            Ok(0) => {
                warn!("Serial port returned EOF - adapter may have been disconnected");
                Err(FujitsuError::DeviceDisconnected(
                    "Serial port returned EOF - adapter may have been unplugged".to_string(),
                ))
            }
            Ok(n) => Ok(n),
            Err(e) => {
                error!("Read error: {}", e);
                Err(FujitsuError::Serial(format!("Read error: {}", e)))
            }
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        timeout(self.write_timeout, self.port.write_all(bytes))
            .await
            .map_err(|_| {
                error!("Write timeout");
                FujitsuError::Timeout("Write operation timed out".to_string())
            })?
            .map_err(|e| {
                error!("Write failed: {}", e);
                FujitsuError::Serial(format!("Write failed: {}", e))
            })?;

        timeout(self.write_timeout, self.port.flush())
            .await
            .map_err(|_| FujitsuError::Timeout("Flush operation timed out".to_string()))?
            .map_err(|e| FujitsuError::Serial(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn port_path(&self) -> Option<&str> {
        Some(&self.port_path)
    }
}

fn parity<U: UnitConfig>() -> tokio_serial::Parity {
    if U::EVEN_PARITY {
        tokio_serial::Parity::Even
    } else {
        tokio_serial::Parity::None
    }
}

/// Determine if an error indicates the adapter went away
///
/// Returns `true` if the error suggests the adapter has been disconnected
/// (USB unplugged, power loss, etc.) rather than a transient error.
pub fn is_disconnect_error(err: &FujitsuError) -> bool {
    match err {
        FujitsuError::DeviceDisconnected(_) => true,
        FujitsuError::Serial(msg) | FujitsuError::Link(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("broken pipe")
                || msg_lower.contains("no such device")
                || msg_lower.contains("permission denied")
                || msg_lower.contains("device disconnected")
                || msg_lower.contains("device not configured")
                || msg_lower.contains("input/output error")
        }
        // Timeouts are typically transient, not disconnection
        FujitsuError::Timeout(_) => false,
        _ => false,
    }
}

/// List serial ports present on the host
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        error!("Failed to enumerate serial ports: {}", e);
        FujitsuError::Serial(format!("Failed to enumerate ports: {}", e))
    })?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let (description, usb) = match &port.port_type {
                SerialPortType::UsbPort(info) => (
                    format!(
                        "USB {:04X}:{:04X} {}",
                        info.vid,
                        info.pid,
                        info.product.as_deref().unwrap_or("serial adapter")
                    ),
                    true,
                ),
                SerialPortType::PciPort => ("PCI serial port".to_string(), false),
                SerialPortType::BluetoothPort => ("Bluetooth serial port".to_string(), false),
                SerialPortType::Unknown => ("serial port".to_string(), false),
            };
            PortInfo {
                name: port.port_name,
                description,
                usb,
            }
        })
        .collect())
}

/// Pick the serial adapter when none is configured
///
/// Only USB adapters are considered; the first one found wins.
pub fn find_serial_adapter() -> Result<String> {
    debug!("Searching for a USB serial adapter");

    for port in available_ports()? {
        debug!("Checking port: {} ({})", port.name, port.description);
        if port.usb {
            debug!("Using {}", port.name);
            return Ok(port.name);
        }
    }

    error!("No USB serial adapter found");
    Err(FujitsuError::DeviceNotFound)
}
