//! State publisher
//!
//! Host side of the controller: logs every published state and fault, and
//! optionally prints them as JSON lines for other programs to consume.

use fujitsu_core::{ClimateAction, ClimateSnapshot, ClimateState, FujitsuError};
use fujitsu_hardware::ClimateHost;
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Line<'a> {
    State {
        name: &'a str,
        state: &'a ClimateState,
        action: ClimateAction,
        room_temperature: Option<u8>,
        fault: bool,
        online: bool,
        pending: bool,
    },
    Fault {
        name: &'a str,
        message: String,
        transient: bool,
    },
}

pub(crate) struct LogPublisher<W: Write = std::io::Stdout> {
    name: String,
    json: Option<W>,
}

impl LogPublisher {
    /// Publisher that only logs
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            json: None,
        }
    }

    /// Publisher that also prints JSON lines to stdout
    pub fn with_json_stdout(name: &str) -> Self {
        Self::with_json_writer(name, std::io::stdout())
    }
}

impl<W: Write> LogPublisher<W> {
    pub fn with_json_writer(name: &str, writer: W) -> Self {
        Self {
            name: name.to_string(),
            json: Some(writer),
        }
    }

    fn emit(&mut self, line: &Line<'_>) {
        let Some(writer) = self.json.as_mut() else {
            return;
        };

        let result = serde_json::to_string(line)
            .map_err(FujitsuError::from)
            .and_then(|json| {
                writeln!(writer, "{}", json)?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = result {
            warn!("Failed to write JSON line: {}", e);
        }
    }

    #[cfg(test)]
    fn writer(&self) -> Option<&W> {
        self.json.as_ref()
    }
}

impl<W: Write> ClimateHost for LogPublisher<W> {
    fn publish_state(&mut self, snapshot: &ClimateSnapshot) {
        info!(
            "{}: {} {} °C fan={} swing={} action={:?} room={} online={}{}",
            self.name,
            snapshot.state.mode,
            snapshot.state.target_temperature,
            snapshot.state.fan_speed,
            snapshot.state.swing,
            snapshot.action,
            snapshot
                .room_temperature
                .map(|t| format!("{} °C", t))
                .unwrap_or_else(|| "n/a".to_string()),
            snapshot.online,
            if snapshot.pending { " (pending)" } else { "" }
        );
        if snapshot.fault {
            warn!("{}: unit reports an error condition", self.name);
        }

        let name = self.name.clone();
        self.emit(&Line::State {
            name: &name,
            state: &snapshot.state,
            action: snapshot.action,
            room_temperature: snapshot.room_temperature,
            fault: snapshot.fault,
            online: snapshot.online,
            pending: snapshot.pending,
        });
    }

    fn report_fault(&mut self, fault: &FujitsuError) {
        warn!("{}: {}", self.name, fault);

        let name = self.name.clone();
        self.emit(&Line::Fault {
            name: &name,
            message: fault.to_string(),
            transient: fault.is_transient(),
        });
    }
}
