//! The probe sequence.
//!
//! ```text
//! open ─> configure ─> set timeouts ─> write ─> [operator] ─> read ─> close
//! ```
//!
//! Each step gates the next. Once a device is open it lives in a
//! [`DeviceHandle`], which releases it exactly once: through
//! [`DeviceHandle::close`] on success, or on drop when a later step fails.

use crate::config::DEFAULT_DEVICE;
use crate::error::{ProbeError, ProbeResult};
use crate::port::{DeviceOpener, LineSettings, SerialDevice, TimeoutPolicy};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

/// Everything a probe run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Device to open.
    pub device: String,
    /// Bytes written by the write step.
    pub payload: Vec<u8>,
    /// Receive buffer size.
    pub buffer_capacity: usize,
    pub line: LineSettings,
    pub timeouts: TimeoutPolicy,
    /// Pause for the operator between write and read.
    pub wait_for_operator: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            payload: b"abc".to_vec(),
            buffer_capacity: 512,
            line: LineSettings::default(),
            timeouts: TimeoutPolicy::default(),
            wait_for_operator: true,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub device: String,
    /// Bytes the device accepted from the payload.
    pub written: usize,
    /// Bytes received, in order; empty when the read timed out.
    pub received: Vec<u8>,
}

impl ProbeReport {
    /// Received bytes as two-digit lowercase hex, no separators.
    pub fn hex(&self) -> String {
        hex::encode(&self.received)
    }
}

/// The manual synchronization point between write and read.
pub trait OperatorGate {
    /// Block until the operator acknowledges.
    fn wait(&mut self) -> io::Result<()>;
}

/// Waits for one line on a reader; the content is discarded.
#[derive(Debug)]
pub struct ConsoleGate<R> {
    input: R,
}

impl<R: BufRead> ConsoleGate<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl ConsoleGate<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> OperatorGate for ConsoleGate<R> {
    fn wait(&mut self) -> io::Result<()> {
        let mut line = String::new();
        // EOF counts as an acknowledgement.
        self.input.read_line(&mut line).map(drop)
    }
}

/// Owns an open device and releases it at most once.
#[derive(Debug)]
pub struct DeviceHandle<D: SerialDevice> {
    device: D,
    released: bool,
}

impl<D: SerialDevice> DeviceHandle<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            released: false,
        }
    }

    pub fn device(&mut self) -> &mut D {
        &mut self.device
    }

    /// Release the device explicitly.
    pub fn close(mut self) -> Result<(), crate::port::PortError> {
        self.released = true;
        self.device.close()
    }
}

impl<D: SerialDevice> Drop for DeviceHandle<D> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.device.close() {
                warn!(port = %self.device.name(), error = %e, "failed to release device");
            } else {
                debug!(port = %self.device.name(), "device released");
            }
        }
    }
}

/// Runs the probe sequence and narrates it to a console sink.
#[derive(Debug)]
pub struct SerialProbe<W> {
    settings: ProbeSettings,
    out: W,
}

impl<W: Write> SerialProbe<W> {
    pub fn new(settings: ProbeSettings, out: W) -> Self {
        Self { settings, out }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Consume the probe and return the console sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run<O, G>(&mut self, opener: &mut O, gate: &mut G) -> ProbeResult<ProbeReport>
    where
        O: DeviceOpener,
        G: OperatorGate,
    {
        let mut handle = self.open(opener)?;
        self.configure(&mut handle)?;
        self.set_timeouts(&mut handle)?;
        let written = self.write_probe(&mut handle)?;
        self.wait_for_operator(gate)?;
        let received = self.read_response(&mut handle)?;
        self.close(handle)?;

        Ok(ProbeReport {
            device: self.settings.device.clone(),
            written,
            received,
        })
    }

    pub fn open<O: DeviceOpener>(&mut self, opener: &mut O) -> ProbeResult<DeviceHandle<O::Device>> {
        let device_name = self.settings.device.clone();
        debug!(device = %device_name, "opening device");
        let device = opener.open(&device_name).map_err(|e| {
            warn!(device = %device_name, error = %e, "open failed");
            ProbeError::DeviceUnavailable {
                device: device_name.clone(),
                status: e.status(),
            }
        })?;

        info!(device = %device_name, "device opened");
        let handle = DeviceHandle::new(device);
        self.say(format_args!("handle created {device_name}"))?;
        Ok(handle)
    }

    pub fn configure<D: SerialDevice>(&mut self, handle: &mut DeviceHandle<D>) -> ProbeResult<()> {
        handle
            .device()
            .configure(&self.settings.line)
            .map_err(|e| {
                warn!(error = %e, "line settings rejected");
                ProbeError::ConfigurationRejected { status: e.status() }
            })?;

        info!(baud = self.settings.line.baud_rate, "line settings applied");
        self.say(format_args!("set comm state succeed"))
    }

    pub fn set_timeouts<D: SerialDevice>(&mut self, handle: &mut DeviceHandle<D>) -> ProbeResult<()> {
        handle
            .device()
            .set_timeouts(&self.settings.timeouts)
            .map_err(|e| {
                warn!(error = %e, "timeout policy rejected");
                ProbeError::TimeoutConfigurationRejected { status: e.status() }
            })?;

        info!("timeout policy applied");
        self.say(format_args!("set comm timeouts succeed"))
    }

    pub fn write_probe<D: SerialDevice>(
        &mut self,
        handle: &mut DeviceHandle<D>,
    ) -> ProbeResult<usize> {
        let payload = &self.settings.payload;
        let written = handle.device().write_bytes(payload).map_err(|e| {
            warn!(error = %e, "write failed");
            ProbeError::WriteFailed { status: e.status() }
        })?;

        if written < payload.len() {
            warn!(written, expected = payload.len(), "short write");
        }
        info!(written, "probe written");
        self.say(format_args!("write file succeed ({written} bytes)"))?;
        Ok(written)
    }

    pub fn wait_for_operator<G: OperatorGate>(&mut self, gate: &mut G) -> ProbeResult<()> {
        if !self.settings.wait_for_operator {
            debug!("operator pause skipped");
            return Ok(());
        }

        write!(self.out, "Press Enter when ready for reading...")
            .and_then(|()| self.out.flush())
            .map_err(ProbeError::Console)?;
        gate.wait().map_err(ProbeError::OperatorInput)
    }

    pub fn read_response<D: SerialDevice>(
        &mut self,
        handle: &mut DeviceHandle<D>,
    ) -> ProbeResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.settings.buffer_capacity];
        let n = handle.device().read_bytes(&mut buffer).map_err(|e| {
            warn!(error = %e, "read failed");
            ProbeError::ReadFailed { status: e.status() }
        })?;
        buffer.truncate(n);

        if n == 0 {
            info!("read timed out with no data");
        } else {
            info!(received = n, "response read");
        }
        self.say(format_args!("received data {n}:"))?;
        self.say(format_args!("{}", hex::encode(&buffer)))?;
        Ok(buffer)
    }

    pub fn close<D: SerialDevice>(&mut self, handle: DeviceHandle<D>) -> ProbeResult<()> {
        match handle.close() {
            Ok(()) => {
                info!("device closed");
                self.say(format_args!("closed"))
            }
            Err(e) => {
                warn!(error = %e, "failed to release device");
                Ok(())
            }
        }
    }

    fn say(&mut self, line: std::fmt::Arguments<'_>) -> ProbeResult<()> {
        writeln!(self.out, "{line}").map_err(ProbeError::Console)
    }
}
