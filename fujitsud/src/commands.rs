//! Control requests read from stdin
//!
//! Each line is a JSON object with any of `power`, `mode`,
//! `target_temperature`, `fan_speed` and `swing`, for example:
//!
//! ```text
//! {"mode": "cool", "target_temperature": 22.0}
//! ```

use fujitsu_core::{ClimateMode, FanSpeed, FujitsuError, Result, Swing};
use fujitsu_hardware::ClimateCall;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ControlRequest {
    power: Option<bool>,
    mode: Option<ClimateMode>,
    target_temperature: Option<f32>,
    fan_speed: Option<FanSpeed>,
    swing: Option<Swing>,
}

impl From<ControlRequest> for ClimateCall {
    fn from(request: ControlRequest) -> Self {
        ClimateCall {
            power: request.power,
            mode: request.mode,
            target_temperature: request.target_temperature,
            fan_speed: request.fan_speed,
            swing: request.swing,
        }
    }
}

/// Parse one control line
pub(crate) fn parse_control_line(line: &str) -> Result<ClimateCall> {
    let request: ControlRequest = serde_json::from_str(line)?;
    let call = ClimateCall::from(request);
    if call.is_empty() {
        return Err(FujitsuError::InvalidInput(
            "Control request sets no attribute".to_string(),
        ));
    }
    Ok(call)
}

/// Forward control requests from stdin until it closes
pub(crate) fn spawn_stdin_reader(tx: mpsc::Sender<ClimateCall>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_control_line(line) {
                        Ok(call) => {
                            if tx.send(call).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Ignoring control request: {}", e),
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, no further control requests");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let call = parse_control_line(
            r#"{"power": true, "mode": "fan_only", "target_temperature": 21.5, "fan_speed": "quiet", "swing": "both"}"#,
        )
        .unwrap();

        assert_eq!(call.power, Some(true));
        assert_eq!(call.mode, Some(ClimateMode::FanOnly));
        assert_eq!(call.target_temperature, Some(21.5));
        assert_eq!(call.fan_speed, Some(FanSpeed::Quiet));
        assert_eq!(call.swing, Some(Swing::Both));
    }

    #[test]
    fn test_parse_partial_request() {
        let call = parse_control_line(r#"{"mode": "heat"}"#).unwrap();
        assert_eq!(call, ClimateCall::new().with_mode(ClimateMode::Heat));
    }

    #[test]
    fn test_parse_rejects_unknown_fields_and_values() {
        assert!(matches!(
            parse_control_line(r#"{"volume": 11}"#),
            Err(FujitsuError::Serialization(_))
        ));
        assert!(parse_control_line(r#"{"mode": "turbo"}"#).is_err());
        assert!(parse_control_line("not json").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_request() {
        assert!(matches!(
            parse_control_line("{}"),
            Err(FujitsuError::InvalidInput(_))
        ));
    }
}
