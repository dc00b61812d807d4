//! TOML settings file for the gateway process.
//!
//! Default location:
//! - Linux:    `$XDG_CONFIG_HOME/sensor-gateway/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/SensorGateway/config.toml`
//! - Windows:  `%APPDATA%\SensorGateway\config.toml`
//!
//! Every field is optional; a missing file yields the defaults below.
//!
//! ```toml
//! [broker]
//! host = "iot.eclipse.org"
//! port = 1883
//! client_id = "P1"
//! topic_base = "viper"
//! keep_alive_secs = 30
//! qos = 0
//!
//! [transport]
//! kind = "serial"              # or "tcp"
//! serial_port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! tcp_addr = "127.0.0.1:2000"
//! poll_interval_ms = 10
//! frame_terminator = "\n"
//!
//! [storage]
//! path = "sensors.toml"        # relative paths resolve against this file's directory
//!
//! [gateway]
//! resync_delay_ms = 100
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewaySettings {
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub gateway: RuntimeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSettings {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// First segment of every topic.
    #[serde(default = "default_topic_base")]
    pub topic_base: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// 0, 1, or 2.  Anything above 2 is treated as 2.
    #[serde(default)]
    pub qos: u8,
}

/// Which physical link reaches the sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Radio transceiver on a serial port.
    #[default]
    Serial,
    /// Network-attached radio bridge speaking the same line protocol.
    Tcp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportSettings {
    #[serde(default)]
    pub kind: TransportKind,
    #[serde(default = "default_serial_port")]
    pub serial_port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_tcp_addr")]
    pub tcp_addr: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Appended to every outbound frame.
    #[serde(default = "default_frame_terminator")]
    pub frame_terminator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeSettings {
    #[serde(default = "default_resync_delay_ms")]
    pub resync_delay_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_broker_host() -> String {
    "iot.eclipse.org".to_string()
}
fn default_broker_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "P1".to_string()
}
fn default_topic_base() -> String {
    "viper".to_string()
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_tcp_addr() -> String {
    "127.0.0.1:2000".to_string()
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_frame_terminator() -> String {
    "\n".to_string()
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("sensors.toml")
}
fn default_resync_delay_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id: default_client_id(),
            topic_base: default_topic_base(),
            keep_alive_secs: default_keep_alive_secs(),
            qos: 0,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            tcp_addr: default_tcp_addr(),
            poll_interval_ms: default_poll_interval_ms(),
            frame_terminator: default_frame_terminator(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            resync_delay_ms: default_resync_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

impl TransportSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl RuntimeSettings {
    pub fn resync_delay(&self) -> Duration {
        Duration::from_millis(self.resync_delay_ms)
    }
}

impl StorageSettings {
    /// The store path, resolved against `settings_dir` when relative.
    pub fn resolve(&self, settings_dir: Option<&Path>) -> PathBuf {
        match settings_dir {
            Some(dir) if self.path.is_relative() => dir.join(&self.path),
            _ => self.path.clone(),
        }
    }
}

// ── Load / save ───────────────────────────────────────────────────────────────

/// Path of the settings file in the platform config directory.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(SettingsError::NoPlatformConfigDir)
}

/// Reads settings from `path`; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<GatewaySettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GatewaySettings::default()),
        Err(e) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes settings to `path`, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &GatewaySettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SensorGateway"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SensorGateway")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("sensor-gateway"))
    }
}
