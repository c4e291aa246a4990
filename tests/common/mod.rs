//! Shared test utilities for probe tests.
//!
//! Provides mock devices with scripted peers, an operator gate that never
//! blocks, and a helper that runs the whole probe against a mock.

#![allow(dead_code)]

use serial_probe::port::{MockOpener, MockSerialPort, MockStep, OsStatus};
use serial_probe::probe::{OperatorGate, ProbeReport, ProbeSettings, SerialProbe};
use serial_probe::ProbeResult;
use std::io;

pub const MOCK_PORT: &str = "MOCK0";

/// Operator gate that records how often it was passed.
#[derive(Debug, Default)]
pub struct ImmediateGate {
    pub waits: usize,
}

impl OperatorGate for ImmediateGate {
    fn wait(&mut self) -> io::Result<()> {
        self.waits += 1;
        Ok(())
    }
}

/// Probe settings pointing at the mock port, otherwise defaults.
pub fn mock_settings() -> ProbeSettings {
    ProbeSettings {
        device: MOCK_PORT.to_string(),
        ..ProbeSettings::default()
    }
}

/// A mock peer that answers the probe with `response`.
pub fn responding_port(response: &[u8]) -> MockSerialPort {
    let mut port = MockSerialPort::new(MOCK_PORT);
    port.enqueue_read(response);
    port
}

/// A mock port that fails `step` with the given OS code.
pub fn failing_port(step: MockStep, code: i32) -> MockSerialPort {
    let mut port = MockSerialPort::new(MOCK_PORT);
    port.fail_on(step, OsStatus::new(Some(code), format!("scripted failure {code}")));
    port
}

/// Outcome of a probe run against a mock.
pub struct Run {
    pub result: ProbeResult<ProbeReport>,
    pub transcript: String,
    pub gate: ImmediateGate,
    pub opener: MockOpener,
}

/// Run the full probe through `opener` with default mock settings.
pub fn run_probe(opener: MockOpener) -> Run {
    run_probe_with(mock_settings(), opener)
}

pub fn run_probe_with(settings: ProbeSettings, mut opener: MockOpener) -> Run {
    let mut gate = ImmediateGate::default();
    let mut probe = SerialProbe::new(settings, Vec::new());
    let result = probe.run(&mut opener, &mut gate);
    let transcript = String::from_utf8(probe.into_output()).expect("transcript is UTF-8");
    Run {
        result,
        transcript,
        gate,
        opener,
    }
}
