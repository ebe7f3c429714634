//! Media-player entity model exposed to the hub.

use serde::{Deserialize, Serialize};

/// Connection status of the driver as shown by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    Connected,
    Disconnected,
    Error,
}

/// Result code sent back for an acknowledged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Ok,
    ServerError,
}

/// Hub-visible state of a media player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityState {
    On,
    Off,
    Playing,
    Paused,
    Unknown,
}

/// Capabilities a media player advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    OnOff,
    VolumeUpDown,
    PlayPause,
    Next,
    Previous,
    MediaDuration,
    MediaPosition,
    MediaTitle,
    MediaArtist,
    MediaAlbum,
    MediaImageUrl,
}

/// Partial attribute update for a media player. Unset fields are left
/// untouched by the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_image_url: Option<String>,
}

/// A media-player entity registered with the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlayerEntity {
    pub id: String,
    pub name: String,
    pub features: Vec<Feature>,
    pub attributes: EntityAttributes,
}
