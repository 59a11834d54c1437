//! Runtime configuration
//!
//! Loads the static TOML configuration once at startup and applies the
//! command-line overrides on top of it.

use fujitsu_core::{default_config_path, ControllerRole, FujitsuError, Result, StaticConfig};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable naming an alternative configuration file
pub(crate) const CONFIG_ENV_VAR: &str = "FUJITSU_CLIMATE_CONFIG";

/// Pick the configuration path: CLI flag > environment variable > default
pub(crate) fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    resolve_config_path_from(cli, std::env::var(CONFIG_ENV_VAR).ok())
}

fn resolve_config_path_from(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

/// Static configuration plus the file it came from
pub(crate) struct RuntimeConfig {
    path: PathBuf,
    static_config: StaticConfig,
}

impl RuntimeConfig {
    /// Load and validate the configuration file.
    ///
    /// If the file doesn't exist, it is created with defaults.
    pub async fn load(config_path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", config_path.display());

        let static_config = Self::load_static_config(config_path).await?;
        static_config.validate()?;

        debug!(
            "Controller '{}' as {}, target range {}-{} °C",
            static_config.controller.name,
            static_config.controller.role,
            static_config.controller.temperature_range.min,
            static_config.controller.temperature_range.max
        );
        debug!(
            "Poll every {} ms, response timeout {} ms, {} retries",
            static_config.timing.poll_interval_ms,
            static_config.timing.response_timeout_ms,
            static_config.timing.max_retries
        );

        Ok(Self {
            path: config_path.to_path_buf(),
            static_config,
        })
    }

    /// Load static config from TOML file, creating with defaults if missing.
    async fn load_static_config(path: &Path) -> Result<StaticConfig> {
        if !path.exists() {
            info!(
                "Static config not found at {}. Creating with defaults.",
                path.display()
            );

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    FujitsuError::Config(format!(
                        "Failed to create config directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }

            let config = StaticConfig::default();
            let toml_str = config
                .to_toml()
                .map_err(|e| FujitsuError::Config(format!("Failed to serialize config: {}", e)))?;

            fs::write(path, &toml_str)
                .await
                .map_err(|e| FujitsuError::Config(format!("Failed to write config file: {}", e)))?;

            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FujitsuError::Config(format!("Failed to read config file: {}", e)))?;

        StaticConfig::from_toml(&content)
            .map_err(|e| FujitsuError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply command-line flags over the file values
    pub fn apply_overrides(
        &mut self,
        device: Option<String>,
        role: Option<ControllerRole>,
        debug_uart: bool,
    ) {
        if let Some(device) = device {
            debug!("Serial device overridden from command line: {}", device);
            self.static_config.serial.device = Some(device);
        }
        if let Some(role) = role {
            debug!("Controller role overridden from command line: {}", role);
            self.static_config.controller.role = role;
        }
        if debug_uart {
            self.static_config.serial.debug_uart = true;
        }
    }

    pub fn static_config(&self) -> &StaticConfig {
        &self.static_config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
