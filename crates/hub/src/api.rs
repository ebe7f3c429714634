//! Outbound calls from the driver to the hub.

use std::future::Future;
use std::pin::Pin;

use crate::entity::{CommandStatus, DeviceState, EntityAttributes, MediaPlayerEntity};
use crate::events::SetupField;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from the hub transport.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub connection closed")]
    Closed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hub rejected request: {0}")]
    Rejected(String),
}

/// Abstract hub connection.
///
/// Implemented by the embedding process on top of the hub's own protocol.
/// Keeping it a trait decouples the driver from the transport and makes it
/// testable with mocks.
pub trait HubApi: Send + Sync {
    fn acknowledge_command<'a>(
        &'a self,
        request_id: &'a str,
        status: CommandStatus,
    ) -> BoxFuture<'a, Result<(), HubError>>;

    fn report_setup_progress(&self) -> BoxFuture<'_, Result<(), HubError>>;

    fn request_user_input<'a>(
        &'a self,
        title: &'a str,
        fields: Vec<SetupField>,
    ) -> BoxFuture<'a, Result<(), HubError>>;

    fn request_user_confirmation<'a>(&'a self, title: &'a str)
    -> BoxFuture<'a, Result<(), HubError>>;

    fn report_setup_error<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), HubError>>;

    fn report_setup_complete(&self) -> BoxFuture<'_, Result<(), HubError>>;

    fn set_device_state(&self, state: DeviceState) -> BoxFuture<'_, Result<(), HubError>>;

    fn register_entity(&self, entity: MediaPlayerEntity) -> BoxFuture<'_, Result<(), HubError>>;

    fn update_entity_attributes<'a>(
        &'a self,
        entity_id: &'a str,
        attributes: EntityAttributes,
    ) -> BoxFuture<'a, Result<(), HubError>>;
}
