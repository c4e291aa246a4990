//! Device abstraction layer for serial communication.
//!
//! Provides the `SerialDevice` trait, a `serialport`-backed implementation
//! and a scriptable mock, so the probe flow can be exercised without hardware.

pub mod error;
pub mod interval;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::{OsStatus, PortError};
pub use mock::{MockCall, MockOpener, MockSerialPort, MockStep};
pub use sync_port::{list_ports, PortSummary, SyncSerialPort, SystemOpener};
pub use traits::*;
