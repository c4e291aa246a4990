//! Probe-level error taxonomy.
//!
//! One variant per gated step of the probe, each carrying the platform status
//! that made the step fail.

use crate::config::ConfigError;
use crate::port::OsStatus;
use thiserror::Error;

/// Errors that abort a probe run.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The device is missing, in use, or access was denied.
    #[error("cannot open {device}: {status}")]
    DeviceUnavailable { device: String, status: OsStatus },

    /// The device did not accept the line parameters.
    #[error("set comm state error: {status}")]
    ConfigurationRejected { status: OsStatus },

    /// The device did not accept the timeout policy.
    #[error("set comm timeouts error: {status}")]
    TimeoutConfigurationRejected { status: OsStatus },

    /// The write timed out or the device reported an error.
    #[error("write file error: {status}")]
    WriteFailed { status: OsStatus },

    /// The device reported an error while reading. A read timeout is not one.
    #[error("read file error: {status}")]
    ReadFailed { status: OsStatus },

    /// The console could not be read while waiting for the operator.
    #[error("operator input error: {0}")]
    OperatorInput(#[source] std::io::Error),

    /// Progress could not be written to the console.
    #[error("console output error: {0}")]
    Console(#[source] std::io::Error),

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProbeError {
    /// Short name of the step that failed, as shown to the operator.
    pub fn step(&self) -> &'static str {
        match self {
            Self::DeviceUnavailable { .. } => "open",
            Self::ConfigurationRejected { .. } => "set comm state",
            Self::TimeoutConfigurationRejected { .. } => "set comm timeouts",
            Self::WriteFailed { .. } => "write file",
            Self::ReadFailed { .. } => "read file",
            Self::OperatorInput(_) => "operator input",
            Self::Console(_) => "console output",
            Self::Config(_) => "configuration",
        }
    }

    /// Platform status attached to a device step, if any.
    pub fn status(&self) -> Option<&OsStatus> {
        match self {
            Self::DeviceUnavailable { status, .. }
            | Self::ConfigurationRejected { status }
            | Self::TimeoutConfigurationRejected { status }
            | Self::WriteFailed { status }
            | Self::ReadFailed { status } => Some(status),
            Self::OperatorInput(_) | Self::Console(_) | Self::Config(_) => None,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Lines printed to the console when the run aborts: the step with its
    /// status code, then the system message.
    pub fn report_lines(&self) -> [String; 2] {
        match self.status() {
            Some(status) => {
                let head = match status.code {
                    Some(code) => format!("{} error {}", self.step(), code),
                    None => format!("{} error", self.step()),
                };
                [head, status.message.clone()]
            }
            None => [format!("{} error", self.step()), self.to_string()],
        }
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
