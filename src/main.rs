use clap::Parser;
use serial_probe::config::{Config, ConfigLoader};
use serial_probe::port::{list_ports, SystemOpener};
use serial_probe::{logging, ConsoleGate, ProbeError, SerialProbe};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-probe",
    version,
    about = "Open a serial port, write a probe, wait for Enter, then read and hex-dump the reply.",
    long_about = "Verifies by hand that a serial port is reachable and correctly configured. \
                  Every step (open, line settings, timeouts, write, read, close) must succeed \
                  before the next runs; the first failure is reported with the platform status \
                  code and the process exits with status 1."
)]
struct Args {
    /// Serial device to probe (e.g. /dev/ttyUSB0 or COM4).
    device: Option<String>,

    /// Configuration file to load instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Baud rate.
    #[arg(short, long)]
    baud: Option<u32>,

    /// Text payload to write.
    #[arg(long, conflicts_with = "payload_hex")]
    payload: Option<String>,

    /// Payload to write, as hex digits (e.g. "01 02 03").
    #[arg(long)]
    payload_hex: Option<String>,

    /// Receive buffer size in bytes.
    #[arg(long)]
    buffer: Option<usize>,

    /// Read right after writing instead of waiting for Enter.
    #[arg(long)]
    no_wait: bool,

    /// List serial ports and exit.
    #[arg(short, long)]
    list: bool,

    /// Raise diagnostic verbosity on stderr (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command-line values win over file and environment.
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.probe.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.line.baud_rate = baud;
        }
        if let Some(payload) = &self.payload {
            config.probe.payload = payload.clone();
            config.probe.payload_hex = None;
        }
        if let Some(payload_hex) = &self.payload_hex {
            config.probe.payload_hex = Some(payload_hex.clone());
        }
        if let Some(buffer) = self.buffer {
            config.probe.buffer_capacity = buffer;
        }
        if self.no_wait {
            config.probe.wait_for_operator = false;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        let config = listing_config(args.config.as_deref());
        logging::init(&config.logging, args.verbose);
        return list();
    }

    let mut config = match ConfigLoader::load(args.config.as_deref()) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            logging::init(&Config::default().logging, args.verbose);
            return report(&ProbeError::Config(e));
        }
    };
    args.apply(&mut config);
    logging::init(&config.logging, args.verbose);

    let settings = match config.probe_settings() {
        Ok(settings) => settings,
        Err(e) => return report(&ProbeError::Config(e)),
    };

    let mut probe = SerialProbe::new(settings, io::stdout().lock());
    let outcome = probe.run(&mut SystemOpener, &mut ConsoleGate::stdin());
    drop(probe);

    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Listing needs no probe settings; a broken config file only loses its
/// logging preferences.
fn listing_config(explicit: Option<&Path>) -> Config {
    ConfigLoader::load(explicit)
        .map(ConfigLoader::into_config)
        .unwrap_or_default()
}

fn list() -> ExitCode {
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            println!("no serial ports found");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                println!("{}\t{}", port.name, port.kind);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("list ports error");
            println!("{}", e.status());
            ExitCode::FAILURE
        }
    }
}

fn report(err: &ProbeError) -> ExitCode {
    for line in err.report_lines() {
        println!("{line}");
    }
    ExitCode::from(err.exit_code())
}
