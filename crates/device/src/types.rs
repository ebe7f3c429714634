use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication protocol used during pairing and for live sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    AirPlay,
    Companion,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::AirPlay => write!(f, "airplay"),
            Protocol::Companion => write!(f, "companion"),
        }
    }
}

/// Operating system family reported by a device during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    TvOs,
    MacOs,
    IOs,
    AirPortOs,
    Legacy,
    Unknown,
}

/// A device found on the local network.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub identifier: String,
    pub name: String,
    pub operating_system: OperatingSystem,
    pub version: Option<String>,
}

impl DeviceDescriptor {
    /// Human-readable label shown in the setup device picker,
    /// e.g. `"Living Room TvOS 17.2"`.
    pub fn display_label(&self) -> String {
        let version = self.version.as_deref().unwrap_or("None");
        format!("{} TvOS {}", self.name, version)
    }
}

/// Power state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Unknown,
    Off,
    On,
}

/// Playback state of the device's media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Loading,
    Paused,
    Playing,
    Seeking,
    Stopped,
}

/// What the device is currently playing.
///
/// `content_hash` changes exactly when the identity or metadata of the
/// playing item changes; it is the only field compared between polls.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub device_state: DeviceState,
    pub position: Option<u64>,
    pub total_time: Option<u64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub content_hash: String,
}

impl PlaybackSnapshot {
    /// Snapshot of an idle device with nothing loaded.
    pub fn idle(content_hash: impl Into<String>) -> Self {
        Self {
            device_state: DeviceState::Idle,
            position: None,
            total_time: None,
            title: None,
            artist: None,
            album: None,
            content_hash: content_hash.into(),
        }
    }
}

/// Cover art for the playing item.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub bytes: Vec<u8>,
    /// MIME type as reported by the device; may be empty.
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
