//! Connection lifecycle for the paired device.
//!
//! The manager resolves the stored identifier, opens a control session,
//! applies the stored credentials and registers the media-player entity.
//! It also owns the state poller, so a disconnect always joins the polling
//! task before the session is closed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use atvbridge_device::{DeviceClient, DeviceDescriptor, DeviceError, DeviceSession, Protocol};
use atvbridge_hub::{HubApi, HubError};

use crate::credentials::CredentialSet;
use crate::media::media_player_entity;
use crate::poller::{PollerConfig, StatePoller, Subscriptions};
use crate::retry::{RetryPolicy, Retryable, with_retry};

/// Errors from establishing a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("device {0} not found on the network")]
    DeviceNotFound(String),

    #[error("device rejected stored {0} credentials")]
    CredentialRejected(Protocol),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("hub error: {0}")]
    Hub(#[from] HubError),
}

impl Retryable for ConnectError {
    fn is_transient(&self) -> bool {
        match self {
            ConnectError::Device(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result of a connection attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new session is live for the given entity id.
    Connected(String),
    AlreadyConnected,
    /// Nothing has been paired yet.
    NoCredentials,
}

/// Snapshot of the manager's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub polling_active: bool,
}

struct LiveSession {
    session: Arc<dyn DeviceSession>,
    entity_id: String,
}

/// Owns the live session and the poller bound to it.
pub struct ConnectionManager {
    client: Arc<dyn DeviceClient>,
    hub: Arc<dyn HubApi>,
    live: Option<LiveSession>,
    poller: StatePoller,
    poller_config: PollerConfig,
}

impl ConnectionManager {
    pub fn new(
        client: Arc<dyn DeviceClient>,
        hub: Arc<dyn HubApi>,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            client,
            hub,
            live: None,
            poller: StatePoller::new(),
            poller_config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState {
            is_connected: self.live.is_some(),
            polling_active: self.poller.is_running(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.live.is_some()
    }

    /// The live session, for command dispatch.
    pub fn session(&self) -> Option<Arc<dyn DeviceSession>> {
        self.live.as_ref().map(|l| l.session.clone())
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.live.as_ref().map(|l| l.entity_id.as_str())
    }

    /// Makes a single connection attempt.
    pub async fn connect(
        &mut self,
        credentials: &CredentialSet,
    ) -> Result<ConnectOutcome, ConnectError> {
        self.connect_with_retry(
            credentials,
            RetryPolicy {
                retries: 0,
                ..RetryPolicy::default()
            },
        )
        .await
    }

    /// Connects, retrying transient failures according to `policy`.
    pub async fn connect_with_retry(
        &mut self,
        credentials: &CredentialSet,
        policy: RetryPolicy,
    ) -> Result<ConnectOutcome, ConnectError> {
        if self.live.is_some() {
            debug!("already connected");
            return Ok(ConnectOutcome::AlreadyConnected);
        }
        if credentials.is_empty() {
            debug!("no stored credentials, skipping connect");
            return Ok(ConnectOutcome::NoCredentials);
        }

        let this = &*self;
        let live = with_retry(policy, || this.establish(credentials)).await?;

        let entity_id = live.entity_id.clone();
        self.live = Some(live);
        Ok(ConnectOutcome::Connected(entity_id))
    }

    /// One full attempt: resolve, open, authenticate, register.
    async fn establish(&self, credentials: &CredentialSet) -> Result<LiveSession, ConnectError> {
        let device = self.resolve(&credentials.identifier).await?;

        info!(device = %device.identifier, name = %device.name, "connecting to device");
        let session = self.client.connect(&device).await?;

        for entry in &credentials.entries {
            if !session.set_credential(entry.protocol, &entry.credentials) {
                warn!(
                    device = %device.identifier,
                    protocol = %entry.protocol,
                    "credentials rejected"
                );
                session.close();
                return Err(ConnectError::CredentialRejected(entry.protocol));
            }
            debug!(device = %device.identifier, protocol = %entry.protocol, "credential applied");
        }

        if let Err(e) = self.hub.register_entity(media_player_entity(&device)).await {
            session.close();
            return Err(e.into());
        }

        info!(device = %device.identifier, "connected");
        Ok(LiveSession {
            session,
            entity_id: device.identifier,
        })
    }

    async fn resolve(&self, identifier: &str) -> Result<DeviceDescriptor, ConnectError> {
        self.client
            .scan(Some(identifier))
            .await?
            .into_iter()
            .find(|d| d.identifier == identifier)
            .ok_or_else(|| ConnectError::DeviceNotFound(identifier.to_string()))
    }

    /// Stops polling and closes the session. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.poller.stop().await;
        if let Some(live) = self.live.take() {
            live.session.close();
            info!(device = %live.entity_id, "disconnected");
        }
    }

    /// Starts the poller for the live session. No-op when disconnected,
    /// when the hub has no subscriber for the entity, or when polling is
    /// already active.
    pub fn start_polling(&mut self, subscriptions: Subscriptions) {
        let Some(live) = &self.live else {
            debug!("not connected, not polling");
            return;
        };
        let subscribed = subscriptions
            .read()
            .map(|s| s.contains(&live.entity_id))
            .unwrap_or(false);
        if !subscribed {
            debug!(entity = %live.entity_id, "no subscriber, not polling");
            return;
        }
        self.poller.start(
            live.session.clone(),
            self.hub.clone(),
            live.entity_id.clone(),
            subscriptions,
            self.poller_config,
        );
    }

    pub async fn stop_polling(&mut self) {
        self.poller.stop().await;
    }
}
