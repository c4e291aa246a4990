//! Mock serial device for testing.
//!
//! Provides a `MockSerialPort` that records every call made against it and
//! can be scripted to return data or fail at a chosen step, without requiring
//! actual hardware.

use super::error::{OsStatus, PortError};
use super::traits::{DeviceOpener, LineSettings, SerialDevice, TimeoutPolicy};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A device operation, as recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Configure(LineSettings),
    SetTimeouts(TimeoutPolicy),
    Write(Vec<u8>),
    Read { capacity: usize },
    Close,
}

/// The step a scripted failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    Configure,
    SetTimeouts,
    Write,
    Read,
    Close,
}

/// Inner state of the mock device, shared with every clone.
#[derive(Debug, Default)]
struct MockDeviceState {
    /// Bytes the peer has sent; each read drains what fits.
    read_queue: VecDeque<u8>,
    /// Every call in order.
    calls: Vec<MockCall>,
    /// Failures to return, at most one per step.
    failures: Vec<(MockStep, PortError)>,
    /// Cap on bytes accepted per write.
    write_limit: Option<usize>,
    closed: bool,
}

/// Mock serial device.
///
/// Clones share state, so a test can keep one clone as an observer while the
/// probe owns and consumes the other.
///
/// # Example
/// ```
/// use serial_probe::port::{MockSerialPort, SerialDevice};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(&[0x01, 0x02, 0x03]);
///
/// let mut buffer = [0u8; 512];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], &[0x01, 0x02, 0x03]);
///
/// // Nothing left: the read times out with zero bytes.
/// assert_eq!(port.read_bytes(&mut buffer).unwrap(), 0);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockSerialPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockDeviceState::default())),
        }
    }

    /// Queue bytes the peer will send.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Make the given step fail with a platform status.
    pub fn fail_on(&mut self, step: MockStep, status: OsStatus) {
        self.fail_with(step, PortError::Os(status));
    }

    /// Make the given step fail with an arbitrary port error.
    pub fn fail_with(&mut self, step: MockStep, error: PortError) {
        self.state.lock().failures.push((step, error));
    }

    /// Accept at most `limit` bytes per write.
    pub fn set_write_limit(&mut self, limit: usize) {
        self.state.lock().write_limit = Some(limit);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of times `close` was invoked.
    pub fn close_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == MockCall::Close)
            .count()
    }

    /// Bytes written, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Write(data) => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn record(&self, call: MockCall, step: MockStep) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.closed {
            return Err(PortError::Closed);
        }
        match state.failures.iter().position(|(s, _)| *s == step) {
            Some(index) => Err(state.failures.remove(index).1),
            None => Ok(()),
        }
    }
}

impl SerialDevice for MockSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, settings: &LineSettings) -> Result<(), PortError> {
        self.record(MockCall::Configure(settings.clone()), MockStep::Configure)
    }

    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<(), PortError> {
        self.record(MockCall::SetTimeouts(*policy), MockStep::SetTimeouts)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let limit = self.state.lock().write_limit.unwrap_or(data.len());
        let accepted = &data[..limit.min(data.len())];
        self.record(MockCall::Write(accepted.to_vec()), MockStep::Write)?;
        Ok(accepted.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.record(
            MockCall::Read {
                capacity: buffer.len(),
            },
            MockStep::Read,
        )?;

        let mut state = self.state.lock();
        let n = state.read_queue.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<(), PortError> {
        self.record(MockCall::Close, MockStep::Close)?;
        self.state.lock().closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("queued", &state.read_queue.len())
            .field("calls", &state.calls.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Opener that hands out a prepared mock or fails.
#[derive(Debug)]
pub struct MockOpener {
    outcome: Option<Result<MockSerialPort, PortError>>,
    attempts: Vec<String>,
}

impl MockOpener {
    /// Opening succeeds once with `device`.
    pub fn with_device(device: MockSerialPort) -> Self {
        Self {
            outcome: Some(Ok(device)),
            attempts: Vec::new(),
        }
    }

    /// Opening fails with a platform status.
    pub fn failing(status: OsStatus) -> Self {
        Self {
            outcome: Some(Err(PortError::Os(status))),
            attempts: Vec::new(),
        }
    }

    /// Names passed to `open`, in order.
    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }
}

impl DeviceOpener for MockOpener {
    type Device = MockSerialPort;

    fn open(&mut self, port_name: &str) -> Result<MockSerialPort, PortError> {
        self.attempts.push(port_name.to_string());
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => Err(PortError::Os(OsStatus::new(
                Some(5),
                "Access is denied (device already opened)",
            ))),
        }
    }
}
