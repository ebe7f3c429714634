//! Media-player commands forwarded to the device.

use atvbridge_device::{DeviceError, DeviceSession};

/// Commands the media-player entity accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCommand {
    On,
    Off,
    VolumeUp,
    VolumeDown,
    PlayPause,
    Next,
    Previous,
}

impl MediaCommand {
    /// Parses a hub command id. Unknown ids yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "on" => Self::On,
            "off" => Self::Off,
            "volume_up" => Self::VolumeUp,
            "volume_down" => Self::VolumeDown,
            "play_pause" => Self::PlayPause,
            "next" => Self::Next,
            "previous" => Self::Previous,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::VolumeUp => "volume_up",
            Self::VolumeDown => "volume_down",
            Self::PlayPause => "play_pause",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }

    pub async fn execute(self, session: &dyn DeviceSession) -> Result<(), DeviceError> {
        match self {
            Self::On => session.turn_on().await,
            Self::Off => session.turn_off().await,
            Self::VolumeUp => session.volume_up().await,
            Self::VolumeDown => session.volume_down().await,
            Self::PlayPause => session.play_pause().await,
            Self::Next => session.next().await,
            Self::Previous => session.previous().await,
        }
    }
}

impl std::fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
