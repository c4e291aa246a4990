//! Configuration module for serial-probe.
//!
//! This module provides TOML-based configuration with environment variable
//! overrides. Command-line flags are applied on top by the binary.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config <path>` on the command line
//! 2. `SERIAL_PROBE_CONFIG` environment variable (explicit path)
//! 3. `./serial-probe.toml` (current directory)
//! 4. `serial-probe/config.toml` in the platform config directory
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `SERIAL_PROBE_DEVICE=/dev/ttyUSB0`
//! - `SERIAL_PROBE_PAYLOAD=ping` or `SERIAL_PROBE_PAYLOAD_HEX=01 02 03`
//! - `SERIAL_PROBE_LINE_BAUD_RATE=115200`
//! - `SERIAL_PROBE_TIMEOUTS_READ_INTERVAL_MS=200`
//! - `SERIAL_PROBE_LOG_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_probe::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load(None)?;
//! let settings = loader.config().probe_settings()?;
//! println!("Probing {}", settings.device);
//! # Ok::<(), serial_probe::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    Config, LineConfig, LogFormat, LoggingConfig, ProbeConfig, TimeoutConfig, DEFAULT_DEVICE,
};
