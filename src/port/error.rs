//! Port-specific error types.
//!
//! Defines error types for serial device operations, separate from the
//! probe-level taxonomy so the device layer stays reusable by tests and mocks.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Raw platform status captured at the point a device call failed.
///
/// `code` is the OS error number (`errno` / `GetLastError`) when the platform
/// reported one; `message` is the resolved system description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsStatus {
    pub code: Option<i32>,
    pub message: String,
}

impl OsStatus {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Status without a platform code, for failures detected in-process.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Capture the status from an I/O error returned by a device call.
    pub fn from_io(err: &std::io::Error) -> Self {
        let text = err.to_string();
        match err.raw_os_error() {
            Some(code) => {
                let suffix = format!(" (os error {code})");
                let message = text.strip_suffix(&suffix).unwrap_or(&text);
                Self::new(Some(code), message)
            }
            None => Self::new(None, text),
        }
    }

    /// Capture the status from a `serialport` error.
    ///
    /// `serialport` drops the raw code when it builds its error, so for
    /// I/O failures the thread's last OS error is read back. Call this
    /// immediately after the failing call, before anything else can
    /// overwrite it. Errors raised by `serialport` itself carry no code.
    pub fn from_serial(err: &serialport::Error) -> Self {
        let code = match err.kind() {
            serialport::ErrorKind::Io(_) => match std::io::Error::last_os_error().raw_os_error() {
                Some(0) | None => None,
                code => code,
            },
            _ => None,
        };
        Self::new(code, err.description.clone())
    }
}

impl fmt::Display for OsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (os error {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors that can occur during serial device operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device cannot honor a requested setting.
    #[error("Unsupported setting: {0}")]
    Unsupported(String),

    /// A write did not complete within the configured bound.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The handle was already released.
    #[error("Port is not open")]
    Closed,

    /// The platform rejected the call.
    #[error("{0}")]
    Os(OsStatus),
}

impl PortError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Flatten into the status reported to the operator.
    pub fn status(&self) -> OsStatus {
        match self {
            Self::Os(status) => status.clone(),
            other => OsStatus::message(other.to_string()),
        }
    }
}

impl From<std::io::Error> for PortError {
    fn from(err: std::io::Error) -> Self {
        Self::Os(OsStatus::from_io(&err))
    }
}
