//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_PROBE";

/// Config file name in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "serial-probe.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_PROBE_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` (a missing file is an error)
    /// 2. `SERIAL_PROBE_CONFIG` environment variable
    /// 3. `./serial-probe.toml`
    /// 4. `<platform config dir>/serial-probe/config.toml`
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override any config file values.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from(path);
        }

        let config_path = resolve_config_path();
        let mut config = match &config_path {
            Some(path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-probe").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Read `SERIAL_PROBE_<suffix>` and parse it, if set.
fn env_value<T: FromStr>(suffix: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{ENV_PREFIX}_{suffix}");
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}"))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern `SERIAL_PROBE_<SECTION>_<KEY>`,
/// except the probe section which drops its section name:
/// - `SERIAL_PROBE_DEVICE=/dev/ttyUSB0`
/// - `SERIAL_PROBE_LINE_BAUD_RATE=115200`
/// - `SERIAL_PROBE_TIMEOUTS_READ_INTERVAL_MS=200`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Probe overrides
    if let Some(val) = env_value::<String>("DEVICE", "device name")? {
        config.probe.device = val;
    }
    if let Some(val) = env_value::<String>("PAYLOAD", "payload")? {
        config.probe.payload = val;
        config.probe.payload_hex = None;
    }
    if let Some(val) = env_value::<String>("PAYLOAD_HEX", "hex payload")? {
        config.probe.payload_hex = Some(val);
    }
    if let Some(val) = env_value("BUFFER_CAPACITY", "buffer capacity")? {
        config.probe.buffer_capacity = val;
    }

    // Line overrides
    if let Some(val) = env_value("LINE_BAUD_RATE", "baud rate")? {
        config.line.baud_rate = val;
    }

    // Timeout overrides
    if let Some(val) = env_value("TIMEOUTS_READ_INTERVAL_MS", "timeout")? {
        config.timeouts.read_interval_ms = val;
    }
    if let Some(val) = env_value("TIMEOUTS_READ_TOTAL_CONSTANT_MS", "timeout")? {
        config.timeouts.read_total_constant_ms = val;
    }
    if let Some(val) = env_value("TIMEOUTS_WRITE_TOTAL_CONSTANT_MS", "timeout")? {
        config.timeouts.write_total_constant_ms = val;
    }

    // Logging overrides
    if let Some(val) = env_value::<String>("LOG_LEVEL", "log level")? {
        config.logging.level = val;
    }

    Ok(())
}
