//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults matching the probe's classic settings, so an
//! empty or missing file yields a COM4-style 9600 8N1 probe.

use super::error::{ConfigError, ConfigResult};
use crate::port::{DataBits, LineSettings, Parity, StopBits, TimeoutPolicy};
use crate::probe::ProbeSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Device opened when nothing else names one.
#[cfg(windows)]
pub const DEFAULT_DEVICE: &str = "COM4";
#[cfg(not(windows))]
pub const DEFAULT_DEVICE: &str = "/dev/ttyS0";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to open, send and receive
    pub probe: ProbeConfig,
    /// Line parameters
    pub line: LineConfig,
    /// Read/write bounds
    pub timeouts: TimeoutConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate and convert into the settings the probe runs with.
    pub fn probe_settings(&self) -> ConfigResult<ProbeSettings> {
        let probe = &self.probe;
        if probe.device.trim().is_empty() {
            return Err(ConfigError::validation("probe.device", "must not be empty"));
        }
        if probe.buffer_capacity == 0 {
            return Err(ConfigError::validation(
                "probe.buffer_capacity",
                "must be greater than zero",
            ));
        }

        Ok(ProbeSettings {
            device: probe.device.clone(),
            payload: probe.payload_bytes()?,
            buffer_capacity: probe.buffer_capacity,
            line: self.line.to_settings()?,
            timeouts: self.timeouts.to_policy(),
            wait_for_operator: probe.wait_for_operator,
        })
    }
}

/// Probe section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Device path or name (`/dev/ttyUSB0`, `COM4`)
    pub device: String,
    /// Text payload written to the device
    pub payload: String,
    /// Hex payload; takes precedence over `payload` when set
    pub payload_hex: Option<String>,
    /// Receive buffer size in bytes
    pub buffer_capacity: usize,
    /// Pause for Enter between write and read
    pub wait_for_operator: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            payload: "abc".to_string(),
            payload_hex: None,
            buffer_capacity: 512,
            wait_for_operator: true,
        }
    }
}

impl ProbeConfig {
    /// The bytes to write.
    pub fn payload_bytes(&self) -> ConfigResult<Vec<u8>> {
        let bytes = match &self.payload_hex {
            Some(text) => {
                let compact: String = text.split_whitespace().collect();
                hex::decode(&compact)
                    .map_err(|e| ConfigError::validation("probe.payload_hex", e.to_string()))?
            }
            None => self.payload.as_bytes().to_vec(),
        };
        if bytes.is_empty() {
            return Err(ConfigError::validation("probe.payload", "must not be empty"));
        }
        Ok(bytes)
    }
}

/// Line parameter section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub baud_rate: u32,
    /// 5, 6, 7 or 8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
    /// "none", "odd" or "even"
    pub parity: Parity,
    pub xon_xoff_output: bool,
    pub xon_xoff_input: bool,
    pub tx_continue_on_xoff: bool,
    pub binary: bool,
    pub abort_on_error: bool,
}

impl Default for LineConfig {
    fn default() -> Self {
        let line = LineSettings::default();
        Self {
            baud_rate: line.baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: line.parity,
            xon_xoff_output: line.xon_xoff_output,
            xon_xoff_input: line.xon_xoff_input,
            tx_continue_on_xoff: line.tx_continue_on_xoff,
            binary: line.binary,
            abort_on_error: line.abort_on_error,
        }
    }
}

impl LineConfig {
    pub fn to_settings(&self) -> ConfigResult<LineSettings> {
        if self.baud_rate == 0 {
            return Err(ConfigError::validation("line.baud_rate", "must be greater than zero"));
        }
        let data_bits = DataBits::try_from(self.data_bits).map_err(|bits| {
            ConfigError::validation("line.data_bits", format!("{bits} is not one of 5, 6, 7, 8"))
        })?;
        let stop_bits = StopBits::try_from(self.stop_bits).map_err(|bits| {
            ConfigError::validation("line.stop_bits", format!("{bits} is not one of 1, 2"))
        })?;

        Ok(LineSettings {
            baud_rate: self.baud_rate,
            data_bits,
            parity: self.parity,
            stop_bits,
            xon_xoff_output: self.xon_xoff_output,
            xon_xoff_input: self.xon_xoff_input,
            tx_continue_on_xoff: self.tx_continue_on_xoff,
            binary: self.binary,
            abort_on_error: self.abort_on_error,
        })
    }
}

/// Timeout section, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum gap between two received bytes
    pub read_interval_ms: u64,
    pub read_total_multiplier_ms: u64,
    pub read_total_constant_ms: u64,
    pub write_total_multiplier_ms: u64,
    pub write_total_constant_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: 1000,
            read_total_multiplier_ms: 0,
            read_total_constant_ms: 1000,
            write_total_multiplier_ms: 0,
            write_total_constant_ms: 1000,
        }
    }
}

impl TimeoutConfig {
    pub fn to_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            read_interval: Duration::from_millis(self.read_interval_ms),
            read_total_multiplier: Duration::from_millis(self.read_total_multiplier_ms),
            read_total_constant: Duration::from_millis(self.read_total_constant_ms),
            write_total_multiplier: Duration::from_millis(self.write_total_multiplier_ms),
            write_total_constant: Duration::from_millis(self.write_total_constant_ms),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "pretty", "compact", "full"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line with source locations
    Pretty,
    /// Single line, abbreviated
    #[default]
    Compact,
    /// Single line, full span context
    Full,
}
