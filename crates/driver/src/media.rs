//! Mapping from device state to the hub's media-player model.

use base64::Engine;

use atvbridge_device::{Artwork, DeviceDescriptor, DeviceState, PowerState};
use atvbridge_hub::{EntityAttributes, EntityState, Feature, MediaPlayerEntity};

/// Capabilities advertised for the media-player entity.
pub const MEDIA_PLAYER_FEATURES: [Feature; 11] = [
    Feature::OnOff,
    Feature::VolumeUpDown,
    Feature::PlayPause,
    Feature::Next,
    Feature::Previous,
    Feature::MediaDuration,
    Feature::MediaPosition,
    Feature::MediaTitle,
    Feature::MediaArtist,
    Feature::MediaAlbum,
    Feature::MediaImageUrl,
];

/// MIME type assumed when the device does not report one.
const DEFAULT_ARTWORK_MIME: &str = "image/png";

/// Maps device power and playback state to the hub entity state.
pub fn entity_state(power: PowerState, playback: DeviceState) -> EntityState {
    match (power, playback) {
        (PowerState::On, DeviceState::Playing) => EntityState::Playing,
        (PowerState::On, DeviceState::Paused | DeviceState::Idle) => EntityState::Paused,
        (PowerState::On, _) => EntityState::On,
        (PowerState::Off, _) => EntityState::Off,
        (PowerState::Unknown, _) => EntityState::Unknown,
    }
}

/// Encodes artwork as a `data:` URI suitable for `media_image_url`.
pub fn artwork_data_uri(artwork: &Artwork) -> String {
    let mime = if artwork.mime_type.trim().is_empty() {
        DEFAULT_ARTWORK_MIME
    } else {
        artwork.mime_type.as_str()
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&artwork.bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Builds the media-player entity for `device`, initially off with empty
/// media fields.
pub fn media_player_entity(device: &DeviceDescriptor) -> MediaPlayerEntity {
    MediaPlayerEntity {
        id: device.identifier.clone(),
        name: device.name.clone(),
        features: MEDIA_PLAYER_FEATURES.to_vec(),
        attributes: EntityAttributes {
            state: Some(EntityState::Off),
            media_position: Some(0),
            media_duration: Some(0),
            media_title: Some(String::new()),
            media_artist: Some(String::new()),
            media_album: Some(String::new()),
            media_image_url: Some(String::new()),
        },
    }
}
