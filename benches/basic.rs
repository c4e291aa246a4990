use criterion::{criterion_group, criterion_main, Criterion};
use serial_probe::port::interval::read_with_policy;
use serial_probe::port::{MockOpener, MockSerialPort};
use serial_probe::probe::{OperatorGate, ProbeSettings, SerialProbe};
use serial_probe::TimeoutPolicy;
use std::hint::black_box;
use std::io;
use std::time::Duration;

struct NoWait;

impl OperatorGate for NoWait {
    fn wait(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn bench_read_assembly(c: &mut Criterion) {
    let policy = TimeoutPolicy::default();
    c.bench_function("assemble_512_bytes_in_16_byte_chunks", |b| {
        b.iter(|| {
            let mut buffer = [0u8; 512];
            let mut remaining = 512usize;
            let n = read_with_policy(&mut buffer, &policy, |chunk, _wait| {
                let n = chunk.len().min(16).min(remaining);
                chunk[..n].fill(0xa5);
                remaining -= n;
                Ok(n)
            })
            .unwrap();
            black_box(n);
        })
    });
}

pub fn bench_mock_probe(c: &mut Criterion) {
    c.bench_function("probe_against_echo_mock", |b| {
        b.iter(|| {
            let mut port = MockSerialPort::new("MOCK0");
            port.enqueue_read(&[0x01, 0x02, 0x03]);
            let mut opener = MockOpener::with_device(port);
            let settings = ProbeSettings {
                device: "MOCK0".to_string(),
                ..ProbeSettings::default()
            };
            let mut probe = SerialProbe::new(settings, io::sink());
            black_box(probe.run(&mut opener, &mut NoWait).unwrap());
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_read_assembly, bench_mock_probe
}
criterion_main!(benches);
