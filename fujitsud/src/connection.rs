//! Serial adapter connection with automatic reconnection
//!
//! Opens the configured adapter (or the first USB adapter found) and retries
//! with exponential backoff when it is missing or goes away.

use std::time::Duration;

use fujitsu_core::{FujitsuError, ReconnectConfig, Result};
use fujitsu_hardware::{find_serial_adapter, SerialDriver};
use tokio::time::sleep;
use tracing::{debug, error, info};

pub(crate) struct Connector {
    /// Configured device path; auto-detected when `None`
    device: Option<String>,
    config: ReconnectConfig,
    write_timeout: Duration,
}

impl Connector {
    pub fn new(device: Option<String>, config: ReconnectConfig, write_timeout: Duration) -> Self {
        Self {
            device,
            config,
            write_timeout,
        }
    }

    /// Single attempt at opening the adapter
    pub fn connect_once(&self) -> Result<SerialDriver> {
        let path = match &self.device {
            Some(device) => device.clone(),
            None => find_serial_adapter()?,
        };

        info!("Connecting to serial adapter at {}...", path);
        let driver = SerialDriver::new(&path, self.write_timeout)?;
        info!("Serial adapter {} connected", path);
        Ok(driver)
    }

    /// Open the adapter, retrying with exponential backoff when enabled
    pub async fn connect(&self) -> Result<SerialDriver> {
        let mut attempt = 0u32;
        let mut delay = Duration::from_secs(self.config.initial_delay_secs);
        let max_delay = Duration::from_secs(self.config.max_delay_secs);

        loop {
            attempt += 1;

            let err = match self.connect_once() {
                Ok(driver) => {
                    if attempt > 1 {
                        info!("Reconnection successful after {} attempts", attempt);
                    }
                    return Ok(driver);
                }
                Err(e) => e,
            };

            if !self.config.enabled {
                error!("Connection failed and reconnection is disabled: {}", err);
                return Err(err);
            }

            debug!("Connection attempt {} failed: {}", attempt, err);

            if self.config.max_attempts > 0 && attempt >= self.config.max_attempts {
                error!("Reconnection failed after {} attempts, giving up", attempt);
                return Err(FujitsuError::ReconnectionFailed {
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            info!(
                "Reconnection attempt {}/{} in {:?}",
                attempt + 1,
                if self.config.max_attempts == 0 {
                    "unlimited".to_string()
                } else {
                    self.config.max_attempts.to_string()
                },
                delay
            );

            sleep(delay).await;
            delay = next_delay(delay, self.config.backoff_multiplier, max_delay);
        }
    }

    pub fn reconnection_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Exponential backoff step capped at `max_delay`
fn next_delay(delay: Duration, multiplier: f64, max_delay: Duration) -> Duration {
    Duration::from_secs_f64((delay.as_secs_f64() * multiplier).min(max_delay.as_secs_f64()))
}
