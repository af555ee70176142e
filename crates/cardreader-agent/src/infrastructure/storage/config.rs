//! TOML-based configuration persistence for the card reader agent.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\HidCardReader\config.toml`
//! - Linux:    `~/.config/hidcardreader/config.toml`
//! - macOS:    `~/Library/Application Support/HidCardReader/config.toml`
//!
//! Example:
//!
//! ```toml
//! [reader]
//! card_length = 10
//! require_terminator = false
//! timeout_ms = 500
//! stale_buffer = "clear_all"
//! hid_keywords = "Bluetooth;HID"
//!
//! [device]
//! last_device_handle = "0x1A2B"
//! last_device_name = "Bluetooth keyboard (VID:1A2C PID:6004)"
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every section and field has a default, so a missing file, an empty file,
//! or a file written by an older version all load successfully.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cardreader_core::domain::config::{DEFAULT_CARD_LENGTH, DEFAULT_TIMEOUT_MS};
use cardreader_core::{DecoderConfig, DecoderConfigError, StaleBufferPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The reader section holds values the decoder cannot use.
    #[error("invalid reader settings: {0}")]
    InvalidReader(#[from] DecoderConfigError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Decoder behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderConfig {
    /// Number of digits in a card number.
    #[serde(default = "default_card_length")]
    pub card_length: usize,
    /// Whether Enter must follow the digits.
    #[serde(default)]
    pub require_terminator: bool,
    /// Inactivity window after which a partial number is discarded.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// What the timeout does with a buffer that already holds `card_length` digits.
    #[serde(default)]
    pub stale_buffer: StaleBufferPolicy,
    /// `;`-separated keywords used to suggest a reader when none is bound.
    #[serde(default = "default_hid_keywords")]
    pub hid_keywords: String,
}

/// The last bound device, restored at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceConfig {
    /// Device handle as written by `DeviceHandle`'s `Display` (`"0x1A2B"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_device_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_device_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_card_length() -> usize {
    DEFAULT_CARD_LENGTH
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_hid_keywords() -> String {
    "Bluetooth;HID".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            card_length: default_card_length(),
            require_terminator: false,
            timeout_ms: default_timeout_ms(),
            stale_buffer: StaleBufferPolicy::default(),
            hid_keywords: default_hid_keywords(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ReaderConfig {
    /// Converts the stored settings into a decoder configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidReader`] when `card_length` is 0.
    pub fn decoder_config(&self) -> Result<DecoderConfig, ConfigError> {
        Ok(DecoderConfig::new(self.card_length, self.require_terminator)?
            .with_stale_buffer(self.stale_buffer))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `HidCardReader` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("HidCardReader"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hidcardreader"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("HidCardReader")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
