//! Traits implemented by the device-control client.
//!
//! All methods return boxed futures so the traits stay object-safe and the
//! driver can hold `Arc<dyn DeviceClient>` / `Arc<dyn DeviceSession>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::DeviceError;
use crate::types::{Artwork, DeviceDescriptor, PlaybackSnapshot, PowerState, Protocol};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Entry point into the device-control library.
pub trait DeviceClient: Send + Sync {
    /// Scans the network. With `identifier` set, only that device is
    /// returned (if it is currently reachable).
    fn scan<'a>(
        &'a self,
        identifier: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<DeviceDescriptor>, DeviceError>>;

    /// Opens a pairing handshake with `device` for `protocol`.
    /// `session_name` is the name the device will show for this remote.
    fn pair<'a>(
        &'a self,
        device: &'a DeviceDescriptor,
        protocol: Protocol,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn PairingHandle>, DeviceError>>;

    /// Opens a control session to `device`. Credentials are applied to the
    /// returned handle with [`DeviceSession::set_credential`].
    fn connect<'a>(
        &'a self,
        device: &'a DeviceDescriptor,
    ) -> BoxFuture<'a, Result<Arc<dyn DeviceSession>, DeviceError>>;
}

/// One in-progress pairing handshake.
pub trait PairingHandle: Send + Sync {
    fn begin_handshake(&mut self) -> BoxFuture<'_, Result<(), DeviceError>>;

    /// Supplies the PIN: either the one shown on the device, or one the
    /// driver generated and the user typed on the device.
    fn submit_pin(&mut self, pin: u16);

    /// Whether the device displays its own PIN after `begin_handshake`.
    fn device_provides_pin(&self) -> bool;

    fn finish(&mut self) -> BoxFuture<'_, Result<(), DeviceError>>;

    /// Whether `finish` produced a successful pairing.
    fn is_paired(&self) -> bool;

    /// Credential blob obtained by a successful pairing.
    fn credentials(&self) -> Option<String>;

    fn close(&mut self) -> BoxFuture<'_, Result<(), DeviceError>>;
}

/// A live control session with a paired device.
pub trait DeviceSession: Send + Sync {
    /// Applies stored credentials. Returns `false` if the device rejects them.
    fn set_credential(&self, protocol: Protocol, credentials: &str) -> bool;

    fn play_pause(&self) -> BoxFuture<'_, Result<(), DeviceError>>;
    fn next(&self) -> BoxFuture<'_, Result<(), DeviceError>>;
    fn previous(&self) -> BoxFuture<'_, Result<(), DeviceError>>;

    fn turn_on(&self) -> BoxFuture<'_, Result<(), DeviceError>>;
    fn turn_off(&self) -> BoxFuture<'_, Result<(), DeviceError>>;
    fn power_state(&self) -> PowerState;

    fn volume_up(&self) -> BoxFuture<'_, Result<(), DeviceError>>;
    fn volume_down(&self) -> BoxFuture<'_, Result<(), DeviceError>>;

    fn currently_playing(&self) -> BoxFuture<'_, Result<PlaybackSnapshot, DeviceError>>;

    /// Fetches cover art scaled to `width`. `height: None` keeps the
    /// aspect ratio. Returns `Ok(None)` when nothing is playing.
    fn fetch_artwork(
        &self,
        width: u32,
        height: Option<u32>,
    ) -> BoxFuture<'_, Result<Option<Artwork>, DeviceError>>;

    fn close(&self);
}
