//! Serial Probe Library
//!
//! Interactive verification that a serial port is reachable and correctly
//! configured: open a device, apply line settings and timeouts, write a probe
//! payload, wait for the operator, then read and hex-dump the reply.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Probe error taxonomy
//! - `logging`: `tracing` subscriber setup
//! - `port`: Device abstraction layer for serial communication
//! - `probe`: The gated probe sequence

pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod probe;

// Re-export commonly used types for convenience
pub use error::{ProbeError, ProbeResult};
pub use port::{
    DataBits, DeviceOpener, LineSettings, MockOpener, MockSerialPort, OsStatus, Parity,
    PortError, SerialDevice, StopBits, SyncSerialPort, SystemOpener, TimeoutPolicy,
};
pub use probe::{ConsoleGate, DeviceHandle, OperatorGate, ProbeReport, ProbeSettings, SerialProbe};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
