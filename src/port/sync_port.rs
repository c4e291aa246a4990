//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialDevice` trait so the probe can be driven against mocks in tests.

use super::error::{OsStatus, PortError};
use super::interval::{is_timeout, read_with_policy};
use super::traits::{DeviceOpener, LineSettings, SerialDevice, TimeoutPolicy};
use std::io::{Read, Write};
use tracing::debug;

/// Baud rate used while opening; the configure step applies the real one.
const OPEN_BAUD_RATE: u32 = 9600;

fn os_status(err: serialport::Error) -> PortError {
    PortError::Os(OsStatus::from_serial(&err))
}

/// Synchronous serial device wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port; `None` once released.
    port: Option<Box<dyn serialport::SerialPort>>,
    /// The port name/path for identification.
    name: String,
    /// Policy applied per read/write call.
    policy: TimeoutPolicy,
}

impl SyncSerialPort {
    /// Open an existing serial device for exclusive read/write access.
    ///
    /// No line parameters beyond the opening baud rate are applied; that is
    /// the job of [`SerialDevice::configure`].
    ///
    /// # Example
    /// ```no_run
    /// use serial_probe::port::SyncSerialPort;
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str) -> Result<Self, PortError> {
        let port = serialport::new(port_name, OPEN_BAUD_RATE)
            .open()
            .map_err(os_status)?;

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
            policy: TimeoutPolicy::default(),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::Closed)
    }
}

impl SerialDevice for SyncSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, settings: &LineSettings) -> Result<(), PortError> {
        // serialport always opens raw: binary on, abort-on-error off.
        if !settings.binary {
            return Err(PortError::unsupported("binary mode cannot be disabled"));
        }
        if settings.abort_on_error {
            return Err(PortError::unsupported("abort-on-error cannot be enabled"));
        }
        if settings.xon_xoff_output != settings.xon_xoff_input {
            return Err(PortError::unsupported(
                "XON/XOFF must be enabled for both directions or neither",
            ));
        }

        debug!(port = %self.name, ?settings, "applying line settings");
        let port = self.port_mut()?;
        port.set_baud_rate(settings.baud_rate).map_err(os_status)?;
        port.set_data_bits(settings.data_bits.into()).map_err(os_status)?;
        port.set_parity(settings.parity.into()).map_err(os_status)?;
        port.set_stop_bits(settings.stop_bits.into()).map_err(os_status)?;
        port.set_flow_control(settings.flow_control()).map_err(os_status)?;
        Ok(())
    }

    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<(), PortError> {
        policy.validate()?;
        debug!(port = %self.name, ?policy, "applying timeout policy");
        self.port_mut()?
            .set_timeout(policy.read_total_constant)
            .map_err(os_status)?;
        self.policy = *policy;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let bound = self.policy.write_total(data.len());
        let port = self.port_mut()?;
        port.set_timeout(bound).map_err(os_status)?;
        match port.write(data) {
            Ok(n) => Ok(n),
            Err(e) if is_timeout(&e) => Err(PortError::timeout(bound)),
            Err(e) => Err(e.into()),
        }
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let policy = self.policy;
        let port = self.port_mut()?;
        let n = read_with_policy(buffer, &policy, |chunk, wait| {
            port.set_timeout(wait)?;
            port.read(chunk)
        })?;
        Ok(n)
    }

    fn close(&mut self) -> Result<(), PortError> {
        // Dropping the boxed port closes the platform handle.
        self.port.take().map(drop).ok_or(PortError::Closed)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Opens real devices through `serialport`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DeviceOpener for SystemOpener {
    type Device = SyncSerialPort;

    fn open(&mut self, port_name: &str) -> Result<SyncSerialPort, PortError> {
        SyncSerialPort::open(port_name)
    }
}

/// A serial port as enumerated by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub kind: String,
}

/// Enumerate the serial ports the platform knows about.
pub fn list_ports() -> Result<Vec<PortSummary>, PortError> {
    let ports = serialport::available_ports().map_err(os_status)?;
    Ok(ports
        .into_iter()
        .map(|info| PortSummary {
            kind: describe_port_type(&info.port_type),
            name: info.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let mut text = format!("USB {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                text.push(' ');
                text.push_str(product);
            }
            text
        }
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}
