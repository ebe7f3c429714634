//! Hub integration contract.
//!
//! Defines the events the hub delivers to the driver, the entity model the
//! driver exposes, and the [`HubApi`] trait for outbound calls.

pub mod api;
pub mod entity;
pub mod events;

pub use api::{BoxFuture, HubApi, HubError};
pub use entity::{
    CommandStatus, DeviceState, EntityAttributes, EntityState, Feature, MediaPlayerEntity,
};
pub use events::{DropdownItem, FieldKind, HubEvent, SetupField};
