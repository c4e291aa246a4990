//! End-to-end probe runs against mock devices.
//!
//! Covers the gating and release guarantees of the probe sequence:
//! - open failure stops everything and releases nothing
//! - every later failure releases the device exactly once
//! - a read timeout is a zero-length success, not a read failure

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serial_probe::port::{MockCall, MockOpener, MockSerialPort, MockStep, OsStatus, PortError};
use serial_probe::{LineSettings, ProbeError, ProbeSettings, SerialProbe, TimeoutPolicy};
use std::time::Duration;

#[test]
fn test_echo_peer_is_hex_dumped() {
    let port = responding_port(&[0x01, 0x02, 0x03]);
    let run = run_probe(MockOpener::with_device(port.clone()));

    let report = run.result.expect("probe succeeds");
    assert_eq!(report.written, 3);
    assert_eq!(report.received, vec![0x01, 0x02, 0x03]);
    assert_eq!(report.hex(), "010203");
    assert!(run.transcript.contains("received data 3:\n010203\n"));
    assert!(run.transcript.ends_with("closed\n"));
    assert_eq!(port.written(), b"abc");
    assert_eq!(port.close_count(), 1);
}

#[test]
fn test_silent_peer_reads_zero_bytes_without_error() {
    let port = MockSerialPort::new(MOCK_PORT);
    let run = run_probe(MockOpener::with_device(port.clone()));

    // A timed-out read must not surface as ReadFailed.
    let report = match run.result {
        Ok(report) => report,
        Err(ProbeError::ReadFailed { status }) => panic!("timeout reported as failure: {status}"),
        Err(other) => panic!("unexpected failure: {other}"),
    };
    assert!(report.received.is_empty());
    assert!(run.transcript.contains("received data 0:\n\n"));
    assert_eq!(port.close_count(), 1);
}

#[test]
fn test_open_failure_attempts_nothing_else() {
    let mut opener = MockOpener::failing(OsStatus::new(Some(2), "No such file or directory"));
    let mut gate = ImmediateGate::default();
    let mut probe = SerialProbe::new(mock_settings(), Vec::new());

    let err = probe.run(&mut opener, &mut gate).unwrap_err();

    assert!(matches!(
        &err,
        ProbeError::DeviceUnavailable { device, status }
            if device == MOCK_PORT && status.code == Some(2)
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(err.report_lines()[0], "open error 2");
    assert_eq!(opener.attempts(), [MOCK_PORT]);
    assert_eq!(gate.waits, 0);
    assert!(probe.into_output().is_empty());
}

#[test]
fn test_each_failing_step_releases_once() {
    let cases = [
        (MockStep::Configure, "set comm state error 87"),
        (MockStep::SetTimeouts, "set comm timeouts error 87"),
        (MockStep::Write, "write file error 87"),
        (MockStep::Read, "read file error 87"),
    ];

    for (step, head) in cases {
        let port = failing_port(step, 87);
        let run = run_probe(MockOpener::with_device(port.clone()));

        let err = run.result.expect_err("step must fail");
        assert_eq!(err.report_lines()[0], head, "step {step:?}");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(port.close_count(), 1, "step {step:?}");
        assert_eq!(port.calls().last(), Some(&MockCall::Close), "step {step:?}");
        assert!(!run.transcript.contains("closed"), "step {step:?}");
    }
}

#[test]
fn test_configure_failure_skips_later_steps() {
    let port = failing_port(MockStep::Configure, 31);
    let run = run_probe(MockOpener::with_device(port.clone()));

    assert!(matches!(
        run.result,
        Err(ProbeError::ConfigurationRejected { .. })
    ));
    assert_eq!(
        port.calls(),
        vec![MockCall::Configure(LineSettings::default()), MockCall::Close]
    );
    assert_eq!(run.gate.waits, 0);
    assert_eq!(run.transcript, "handle created MOCK0\n");
}

#[test]
fn test_write_timeout_skips_operator_and_read() {
    let mut port = MockSerialPort::new(MOCK_PORT);
    port.fail_with(MockStep::Write, PortError::timeout(Duration::from_secs(1)));
    let run = run_probe(MockOpener::with_device(port.clone()));

    let err = run.result.unwrap_err();
    assert!(matches!(err, ProbeError::WriteFailed { .. }));
    assert_eq!(err.report_lines()[0], "write file error");
    assert_eq!(run.gate.waits, 0);
    assert!(!port
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::Read { .. })));
    assert_eq!(port.close_count(), 1);
}

#[test]
fn test_short_write_is_not_an_error() {
    let mut port = MockSerialPort::new(MOCK_PORT);
    port.set_write_limit(2);
    let run = run_probe(MockOpener::with_device(port));

    let report = run.result.unwrap();
    assert_eq!(report.written, 2);
    assert!(run.transcript.contains("write file succeed (2 bytes)"));
}

#[test]
fn test_operator_wait_sits_between_write_and_read() {
    let run = run_probe(MockOpener::with_device(MockSerialPort::new(MOCK_PORT)));
    assert_eq!(run.gate.waits, 1);

    let write_at = run.transcript.find("write file succeed").unwrap();
    let prompt_at = run.transcript.find("Press Enter when ready").unwrap();
    let read_at = run.transcript.find("received data").unwrap();
    assert!(write_at < prompt_at && prompt_at < read_at);
}

#[test]
fn test_no_wait_skips_operator() {
    let settings = ProbeSettings {
        wait_for_operator: false,
        ..mock_settings()
    };
    let run = run_probe_with(settings, MockOpener::with_device(responding_port(b"ok")));

    assert!(run.result.is_ok());
    assert_eq!(run.gate.waits, 0);
    assert!(!run.transcript.contains("Press Enter"));
}

#[test]
fn test_custom_settings_reach_the_device() {
    let port = MockSerialPort::new(MOCK_PORT);
    let settings = ProbeSettings {
        payload: vec![0xde, 0xad],
        buffer_capacity: 16,
        line: LineSettings {
            baud_rate: 115_200,
            ..LineSettings::default()
        },
        timeouts: TimeoutPolicy {
            read_interval: Duration::from_millis(20),
            ..TimeoutPolicy::default()
        },
        ..mock_settings()
    };
    let run = run_probe_with(settings.clone(), MockOpener::with_device(port.clone()));

    assert!(run.result.is_ok());
    assert_eq!(run.opener.attempts(), [MOCK_PORT]);
    assert_eq!(
        port.calls(),
        vec![
            MockCall::Configure(settings.line.clone()),
            MockCall::SetTimeouts(settings.timeouts),
            MockCall::Write(vec![0xde, 0xad]),
            MockCall::Read { capacity: 16 },
            MockCall::Close,
        ]
    );
}

#[test]
fn test_response_larger_than_buffer_is_truncated() {
    let port = responding_port(&[0x55; 40]);
    let settings = ProbeSettings {
        buffer_capacity: 8,
        ..mock_settings()
    };
    let run = run_probe_with(settings, MockOpener::with_device(port));

    let report = run.result.unwrap();
    assert_eq!(report.received.len(), 8);
    assert!(run
        .transcript
        .contains("received data 8:\n5555555555555555\n"));
}

/// Console sink that rejects every write.
struct FullConsole;

impl std::io::Write for FullConsole {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("no space left on console"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_console_failure_after_open_releases_once() {
    let port = MockSerialPort::new(MOCK_PORT);
    let mut opener = MockOpener::with_device(port.clone());
    let mut gate = ImmediateGate::default();
    let mut probe = SerialProbe::new(mock_settings(), FullConsole);

    let err = probe.run(&mut opener, &mut gate).unwrap_err();

    assert!(matches!(err, ProbeError::Console(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(port.close_count(), 1);
    assert_eq!(port.calls(), vec![MockCall::Close]);
    assert_eq!(gate.waits, 0);
}
