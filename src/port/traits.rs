//! Core traits for serial device abstraction.
//!
//! Defines the `SerialDevice` and `DeviceOpener` traits that allow both real
//! serial ports and mock implementations to be driven by the probe.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line parameters applied by the configure step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// XON/XOFF gating of outbound data.
    pub xon_xoff_output: bool,

    /// XON/XOFF emission for inbound data.
    pub xon_xoff_input: bool,

    /// Keep transmitting after an XOFF condition.
    pub tx_continue_on_xoff: bool,

    /// Raw byte transfer, no end-of-line translation.
    pub binary: bool,

    /// Stop all I/O on a communication error until it is cleared.
    pub abort_on_error: bool,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            xon_xoff_output: false,
            xon_xoff_input: false,
            tx_continue_on_xoff: true,
            binary: true,
            abort_on_error: false,
        }
    }
}

impl LineSettings {
    /// Flow control mode implied by the XON/XOFF flags.
    pub fn flow_control(&self) -> serialport::FlowControl {
        if self.xon_xoff_output || self.xon_xoff_input {
            serialport::FlowControl::Software
        } else {
            serialport::FlowControl::None
        }
    }
}

/// Read/write bounds applied by the timeouts step.
///
/// Mirrors the classic comm-timeouts model: a read waits at most
/// `read_total_constant + read_total_multiplier * len` overall and, once data
/// has started arriving, at most `read_interval` between two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub read_interval: Duration,
    pub read_total_multiplier: Duration,
    pub read_total_constant: Duration,
    pub write_total_multiplier: Duration,
    pub write_total_constant: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(1000),
            read_total_multiplier: Duration::ZERO,
            read_total_constant: Duration::from_millis(1000),
            write_total_multiplier: Duration::ZERO,
            write_total_constant: Duration::from_millis(1000),
        }
    }
}

impl TimeoutPolicy {
    /// Overall bound for reading up to `len` bytes.
    pub fn read_total(&self, len: usize) -> Duration {
        self.read_total_constant
            .saturating_add(mul(self.read_total_multiplier, len))
    }

    /// Overall bound for writing `len` bytes.
    pub fn write_total(&self, len: usize) -> Duration {
        self.write_total_constant
            .saturating_add(mul(self.write_total_multiplier, len))
    }

    /// Reject policies under which a read or write could block forever.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.read_total_constant.is_zero() && self.read_total_multiplier.is_zero() {
            return Err(PortError::unsupported("read timeout would be unbounded"));
        }
        if self.write_total_constant.is_zero() && self.write_total_multiplier.is_zero() {
            return Err(PortError::unsupported("write timeout would be unbounded"));
        }
        Ok(())
    }
}

fn mul(per_byte: Duration, len: usize) -> Duration {
    per_byte.saturating_mul(u32::try_from(len).unwrap_or(u32::MAX))
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(other),
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(other),
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// An opened serial endpoint.
///
/// Every method is a single blocking platform call; none of them retries.
pub trait SerialDevice: std::fmt::Debug {
    /// Name the device was opened under.
    fn name(&self) -> &str;

    /// Apply line parameters.
    fn configure(&mut self, settings: &LineSettings) -> Result<(), PortError>;

    /// Apply the read/write timeout policy.
    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<(), PortError>;

    /// Write bytes to the device.
    ///
    /// Returns the number of bytes actually written, which may be short.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes into the provided buffer.
    ///
    /// Returns the number of bytes actually read; `Ok(0)` when the timeout
    /// policy elapsed without data.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Release the underlying platform handle.
    fn close(&mut self) -> Result<(), PortError>;
}

/// Opens devices by name.
pub trait DeviceOpener {
    type Device: SerialDevice;

    /// Open an existing device for exclusive read/write access.
    fn open(&mut self, port_name: &str) -> Result<Self::Device, PortError>;
}
