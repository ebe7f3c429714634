//! Device-control client contract.
//!
//! The driver never talks to a streaming device directly. Discovery,
//! pairing handshakes and the live control session are provided by an
//! implementation of [`DeviceClient`] supplied by the embedding process.

pub mod client;
pub mod error;
pub mod types;

pub use client::{BoxFuture, DeviceClient, DeviceSession, PairingHandle};
pub use error::DeviceError;
pub use types::{
    Artwork, DeviceDescriptor, DeviceState, OperatingSystem, PlaybackSnapshot, PowerState,
    Protocol,
};
