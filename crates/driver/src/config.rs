//! Driver configuration.
//!
//! Tunables are stored as TOML. Every field has a default, so a missing
//! file or a partial file both work:
//! - Linux: `$XDG_CONFIG_HOME/atvbridge` or `~/.config/atvbridge`
//! - Windows: `%APPDATA%/atvbridge`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::pairing::PairingConfig;
use crate::poller::PollerConfig;
use crate::retry::RetryPolicy;

/// File name of the credential store inside `data_dir`.
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Directory holding the credential store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between poll ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Artwork width in pixels.
    #[serde(default = "default_artwork_width")]
    pub artwork_width: u32,

    /// Seconds the user has to answer a setup prompt.
    #[serde(default = "default_pairing_timeout")]
    pub pairing_timeout_secs: u64,

    /// Connection retries after the first attempt.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    #[serde(default = "default_connect_retry_delay")]
    pub connect_retry_delay_secs: u64,

    /// Name shown on the device for the AirPlay pairing.
    #[serde(default = "default_airplay_session_name")]
    pub airplay_session_name: String,

    /// Name shown on the device for the Companion pairing.
    #[serde(default = "default_companion_session_name")]
    pub companion_session_name: String,
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("atvbridge")
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg).join("atvbridge");
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config").join("atvbridge")
    }
}

fn default_poll_interval() -> u64 {
    2
}

fn default_artwork_width() -> u32 {
    480
}

fn default_pairing_timeout() -> u64 {
    300
}

fn default_connect_retries() -> u32 {
    5
}

fn default_connect_retry_delay() -> u64 {
    2
}

fn default_airplay_session_name() -> String {
    "Remote Two Airplay".into()
}

fn default_companion_session_name() -> String {
    "Remote Two Companion".into()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_interval_secs: default_poll_interval(),
            artwork_width: default_artwork_width(),
            pairing_timeout_secs: default_pairing_timeout(),
            connect_retries: default_connect_retries(),
            connect_retry_delay_secs: default_connect_retry_delay(),
            airplay_session_name: default_airplay_session_name(),
            companion_session_name: default_companion_session_name(),
        }
    }
}

impl DriverConfig {
    /// Loads configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    /// Tick interval. Zero falls back to the default.
    pub fn poll_interval(&self) -> Duration {
        let secs = match self.poll_interval_secs {
            0 => default_poll_interval(),
            v => v,
        };
        Duration::from_secs(secs)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.connect_retries,
            delay: Duration::from_secs(self.connect_retry_delay_secs),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval(),
            artwork_width: self.artwork_width,
        }
    }

    pub fn pairing_config(&self) -> PairingConfig {
        PairingConfig {
            airplay_session_name: self.airplay_session_name.clone(),
            companion_session_name: self.companion_session_name.clone(),
            input_timeout: self.pairing_timeout(),
        }
    }
}
