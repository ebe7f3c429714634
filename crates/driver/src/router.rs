//! Hub event routing.
//!
//! [`Driver`] owns every piece of driver state and handles one hub event at
//! a time. Setup events go to the pairing coordinator, lifecycle events to
//! the connection manager, and entity commands straight to the live session.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use atvbridge_device::DeviceClient;
use atvbridge_hub::{CommandStatus, DeviceState, HubApi, HubError, HubEvent};

use crate::commands::MediaCommand;
use crate::config::DriverConfig;
use crate::connection::{ConnectError, ConnectOutcome, ConnectionManager, ConnectionState};
use crate::credentials::{CredentialSet, CredentialStore};
use crate::pairing::{PairingCoordinator, PairingProgress, PairingState};
use crate::poller::Subscriptions;
use crate::retry::RetryPolicy;

pub struct Driver {
    hub: Arc<dyn HubApi>,
    store: CredentialStore,
    pairing: PairingCoordinator,
    connection: ConnectionManager,
    subscriptions: Subscriptions,
    retry: RetryPolicy,
}

impl Driver {
    pub fn new(config: &DriverConfig, client: Arc<dyn DeviceClient>, hub: Arc<dyn HubApi>) -> Self {
        Self {
            store: CredentialStore::new(config.credentials_path()),
            pairing: PairingCoordinator::new(client.clone(), hub.clone(), config.pairing_config()),
            connection: ConnectionManager::new(client, hub.clone(), config.poller_config()),
            subscriptions: Arc::new(RwLock::new(HashSet::new())),
            retry: config.retry_policy(),
            hub,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn pairing_state(&self) -> &PairingState {
        self.pairing.state()
    }

    pub fn credentials(&self) -> &CredentialSet {
        self.store.current()
    }

    /// Loads stored credentials and makes one connection attempt.
    pub async fn startup(&mut self) {
        let Some(set) = self.store.load() else {
            info!("no stored credentials, waiting for setup");
            return;
        };
        match self.connection.connect(&set).await {
            Ok(outcome) => debug!(?outcome, "startup connect"),
            Err(e) => warn!(error = %e, "startup connect failed"),
        }
    }

    /// Processes hub events until `cancel` fires or the channel closes,
    /// then disconnects.
    pub async fn run(mut self, mut events: mpsc::Receiver<HubEvent>, cancel: CancellationToken) {
        loop {
            let deadline = self.pairing.deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                _ = wait_until(deadline) => {
                    let err = self.pairing.expire().await;
                    report(
                        self.hub.report_setup_error(err.user_message()).await,
                        "report_setup_error",
                    );
                }
            }
        }

        self.connection.disconnect().await;
        info!("driver stopped");
    }

    pub async fn handle_event(&mut self, event: HubEvent) {
        debug!(event = event.kind(), "hub event");
        match event {
            HubEvent::SetupStart { request_id } => self.on_setup_start(&request_id).await,
            HubEvent::SetupUserInput { request_id, values } => {
                self.acknowledge_setup(&request_id).await;
                match self.pairing.handle_input(&values, &mut self.store).await {
                    Ok(PairingProgress::AwaitingInput) => {}
                    Ok(PairingProgress::Paired) => self.on_paired().await,
                    Err(e) => self.setup_error(e.user_message()).await,
                }
            }
            HubEvent::Connect => self.on_connect().await,
            HubEvent::Disconnect => {
                self.connection.disconnect().await;
                self.set_device_state(DeviceState::Disconnected).await;
            }
            HubEvent::EnterStandby => self.connection.disconnect().await,
            HubEvent::ExitStandby => {
                if let Ok(ConnectOutcome::Connected(_) | ConnectOutcome::AlreadyConnected) =
                    self.connect_retried().await
                {
                    self.connection.start_polling(self.subscriptions.clone());
                }
            }
            HubEvent::SubscribeEntities(ids) => {
                if !self.connection.is_connected() {
                    self.set_device_state(DeviceState::Error).await;
                    return;
                }
                match self.subscriptions.write() {
                    Ok(mut subs) => subs.extend(ids),
                    Err(e) => warn!(error = %e, "subscription set poisoned"),
                }
                self.connection.start_polling(self.subscriptions.clone());
            }
            HubEvent::UnsubscribeEntities(ids) => {
                if !self.connection.is_connected() {
                    self.set_device_state(DeviceState::Error).await;
                    return;
                }
                match self.subscriptions.write() {
                    Ok(mut subs) => subs.retain(|id| !ids.contains(id)),
                    Err(e) => warn!(error = %e, "subscription set poisoned"),
                }
            }
            HubEvent::EntityCommand {
                request_id,
                entity_id,
                command_id,
                ..
            } => self.on_command(&request_id, &entity_id, &command_id).await,
        }
    }

    async fn on_setup_start(&mut self, request_id: &str) {
        info!("driver setup started");
        self.acknowledge_setup(request_id).await;
        if let Err(e) = self.pairing.start(&mut self.store).await {
            self.setup_error(e.user_message()).await;
        }
    }

    async fn on_paired(&mut self) {
        match self.connect_retried().await {
            Ok(outcome) => {
                debug!(?outcome, "connected after pairing");
                self.connection.start_polling(self.subscriptions.clone());
            }
            Err(e) => warn!(error = %e, "connect after pairing failed"),
        }
        report(
            self.hub.report_setup_complete().await,
            "report_setup_complete",
        );
        info!("driver setup complete");
    }

    async fn on_connect(&mut self) {
        if self.connection.is_connected() {
            self.connection.start_polling(self.subscriptions.clone());
            self.set_device_state(DeviceState::Connected).await;
            return;
        }

        let state = match self.connect_retried().await {
            Ok(ConnectOutcome::Connected(_) | ConnectOutcome::AlreadyConnected) => {
                self.connection.start_polling(self.subscriptions.clone());
                DeviceState::Connected
            }
            Ok(ConnectOutcome::NoCredentials) => DeviceState::Disconnected,
            Err(e) => {
                warn!(error = %e, "connect failed");
                DeviceState::Disconnected
            }
        };
        self.set_device_state(state).await;
    }

    async fn on_command(&mut self, request_id: &str, entity_id: &str, command_id: &str) {
        let Some(command) = MediaCommand::from_id(command_id) else {
            debug!(entity = %entity_id, command = %command_id, "ignoring unsupported command");
            return;
        };

        let status = match self.connection.session() {
            Some(session) => match command.execute(session.as_ref()).await {
                Ok(()) => CommandStatus::Ok,
                Err(e) => {
                    warn!(entity = %entity_id, %command, error = %e, "command failed");
                    CommandStatus::ServerError
                }
            },
            None => {
                warn!(entity = %entity_id, %command, "command without a connection");
                CommandStatus::ServerError
            }
        };
        report(
            self.hub.acknowledge_command(request_id, status).await,
            "acknowledge_command",
        );
    }

    async fn connect_retried(&mut self) -> Result<ConnectOutcome, ConnectError> {
        let credentials = self.store.current().clone();
        self.connection
            .connect_with_retry(&credentials, self.retry)
            .await
    }

    async fn acknowledge_setup(&self, request_id: &str) {
        report(
            self.hub
                .acknowledge_command(request_id, CommandStatus::Ok)
                .await,
            "acknowledge_command",
        );
        report(
            self.hub.report_setup_progress().await,
            "report_setup_progress",
        );
    }

    async fn setup_error(&self, message: &str) {
        report(
            self.hub.report_setup_error(message).await,
            "report_setup_error",
        );
    }

    async fn set_device_state(&self, state: DeviceState) {
        report(self.hub.set_device_state(state).await, "set_device_state");
    }
}

fn report(result: Result<(), HubError>, call: &str) {
    if let Err(e) = result {
        warn!(call, error = %e, "hub call failed");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
