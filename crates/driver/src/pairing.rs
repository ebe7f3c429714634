//! Interactive pairing with the device.
//!
//! Pairing runs as a short setup wizard: discover, let the user pick a
//! device, then pair AirPlay followed by Companion. Each protocol either
//! shows a PIN on the device that the user types into the hub, or takes a
//! PIN the driver generates that the user types on the device.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use atvbridge_device::{
    DeviceClient, DeviceDescriptor, DeviceError, OperatingSystem, PairingHandle, Protocol,
};
use atvbridge_hub::{DropdownItem, FieldKind, HubApi, HubError, SetupField};

use crate::credentials::{CredentialEntry, CredentialSet, CredentialStore};

pub const CHOICE_FIELD: &str = "choice";
pub const AIRPLAY_PIN_FIELD: &str = "pin_airplay";
pub const COMPANION_PIN_FIELD: &str = "pin_companion";

/// Smallest and largest PIN the driver generates.
const PIN_RANGE: std::ops::RangeInclusive<u16> = 1000..=9999;

/// Default time the user has to answer a setup prompt.
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(300);

const CHOOSE_DEVICE_TITLE: &str = "Please choose your Apple TV";
const ENTER_PIN_TITLE: &str = "Please enter the PIN from your Apple TV";
const SHOW_PIN_TITLE: &str = "Please enter the following PIN on your Apple TV:";

/// Errors that end a setup run.
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("no tvOS devices found")]
    NoDevices,

    #[error("device {0} is no longer reachable")]
    DeviceVanished(String),

    #[error("{0} pairing did not succeed")]
    NotPaired(Protocol),

    #[error("setup input named no known field")]
    NoChoice,

    #[error("unexpected setup input {0:?}")]
    UnexpectedInput(String),

    #[error("invalid PIN {0:?}")]
    InvalidPin(String),

    #[error("timed out waiting for setup input")]
    TimedOut,

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("hub error: {0}")]
    Hub(#[from] HubError),
}

impl PairingError {
    /// Message shown to the user in the hub's setup wizard.
    pub fn user_message(&self) -> &'static str {
        match self {
            PairingError::NoDevices => "No Apple TVs found",
            PairingError::NotPaired(_) => "Unable to pair with Apple TV",
            PairingError::NoChoice => "No Apple TV was selected",
            PairingError::TimedOut => "Pairing timed out",
            PairingError::DeviceVanished(_)
            | PairingError::UnexpectedInput(_)
            | PairingError::InvalidPin(_)
            | PairingError::Device(_)
            | PairingError::Hub(_) => "There was an error during the setup process",
        }
    }
}

/// Who supplies the PIN for a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    DeviceProvidesPin,
    DriverProvidesPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStep {
    AwaitPin,
    AwaitConfirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingState {
    Idle,
    Discovering,
    AwaitingChoice,
    Pairing {
        protocol: Protocol,
        step: PairingStep,
    },
    Complete,
    Failed(String),
}

/// Result of feeding input to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingProgress {
    /// Another prompt was sent; waiting for the user.
    AwaitingInput,
    /// Both protocols are paired and stored.
    Paired,
}

/// One open handshake.
pub struct PairingSession {
    pub device: DeviceDescriptor,
    pub protocol: Protocol,
    pub pin_mode: PinMode,
    /// `None` when the configured timeout is too large to represent.
    pub deadline: Option<Instant>,
    handle: Box<dyn PairingHandle>,
}

impl PairingSession {
    async fn close(mut self) {
        if let Err(e) = self.handle.close().await {
            warn!(protocol = %self.protocol, error = %e, "failed to close pairing handle");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfig {
    pub airplay_session_name: String,
    pub companion_session_name: String,
    pub input_timeout: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            airplay_session_name: "Remote Two Airplay".into(),
            companion_session_name: "Remote Two Companion".into(),
            input_timeout: DEFAULT_INPUT_TIMEOUT,
        }
    }
}

impl PairingConfig {
    /// Deadline for a prompt sent now. Timeouts past the clock's range mean
    /// no deadline.
    fn deadline_from_now(&self) -> Option<Instant> {
        Instant::now().checked_add(self.input_timeout)
    }

    fn session_name(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::AirPlay => &self.airplay_session_name,
            Protocol::Companion => &self.companion_session_name,
        }
    }
}

/// Drives the setup wizard. At most one handshake is open at a time.
pub struct PairingCoordinator {
    client: Arc<dyn DeviceClient>,
    hub: Arc<dyn HubApi>,
    config: PairingConfig,
    state: PairingState,
    device: Option<DeviceDescriptor>,
    session: Option<PairingSession>,
    choice_deadline: Option<Instant>,
}

impl PairingCoordinator {
    pub fn new(client: Arc<dyn DeviceClient>, hub: Arc<dyn HubApi>, config: PairingConfig) -> Self {
        Self {
            client,
            hub,
            config,
            state: PairingState::Idle,
            device: None,
            session: None,
            choice_deadline: None,
        }
    }

    pub fn state(&self) -> &PairingState {
        &self.state
    }

    pub fn session(&self) -> Option<&PairingSession> {
        self.session.as_ref()
    }

    /// When the current prompt expires, if the user is being waited on.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PairingState::AwaitingChoice => self.choice_deadline,
            PairingState::Pairing {
                step: PairingStep::AwaitPin,
                ..
            } => self.session.as_ref().and_then(|s| s.deadline),
            _ => None,
        }
    }

    /// Starts a new setup run, discarding any run in progress.
    ///
    /// Stored credentials are cleared, the network is scanned and the user
    /// is asked to choose a device.
    pub async fn start(&mut self, store: &mut CredentialStore) -> Result<(), PairingError> {
        self.abort().await;
        if let Err(e) = store.clear() {
            error!(error = %e, "failed to clear credentials");
        }

        let res = self.discover().await;
        if let Err(e) = &res {
            self.fail(e).await;
        }
        res
    }

    /// Feeds one round of setup input.
    ///
    /// Fields are matched in order `pin_companion`, `pin_airplay`, `choice`.
    pub async fn handle_input(
        &mut self,
        values: &HashMap<String, String>,
        store: &mut CredentialStore,
    ) -> Result<PairingProgress, PairingError> {
        let res = self.dispatch_input(values, store).await;
        if let Err(e) = &res {
            self.fail(e).await;
        }
        res
    }

    /// Fails the run because the user did not answer in time.
    pub async fn expire(&mut self) -> PairingError {
        let err = PairingError::TimedOut;
        self.fail(&err).await;
        err
    }

    /// Closes any open handshake and returns to idle.
    pub async fn abort(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(protocol = %session.protocol, "discarding pairing session");
            session.close().await;
        }
        self.device = None;
        self.choice_deadline = None;
        self.state = PairingState::Idle;
    }

    async fn fail(&mut self, err: &PairingError) {
        warn!(error = %err, "pairing failed");
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        self.device = None;
        self.choice_deadline = None;
        self.state = PairingState::Failed(err.user_message().to_string());
    }

    async fn discover(&mut self) -> Result<(), PairingError> {
        self.state = PairingState::Discovering;
        debug!("discovering devices");

        let devices: Vec<DeviceDescriptor> = self
            .client
            .scan(None)
            .await?
            .into_iter()
            .filter(|d| d.operating_system == OperatingSystem::TvOs)
            .collect();

        let Some(first) = devices.first() else {
            return Err(PairingError::NoDevices);
        };

        let field = SetupField {
            id: CHOICE_FIELD.into(),
            label: "Choose your Apple TV".into(),
            field: FieldKind::Dropdown {
                value: first.identifier.clone(),
                items: devices
                    .iter()
                    .map(|d| DropdownItem {
                        id: d.identifier.clone(),
                        label: d.display_label(),
                    })
                    .collect(),
            },
        };
        self.hub
            .request_user_input(CHOOSE_DEVICE_TITLE, vec![field])
            .await?;

        info!(count = devices.len(), "waiting for device choice");
        self.state = PairingState::AwaitingChoice;
        self.choice_deadline = self.config.deadline_from_now();
        Ok(())
    }

    async fn dispatch_input(
        &mut self,
        values: &HashMap<String, String>,
        store: &mut CredentialStore,
    ) -> Result<PairingProgress, PairingError> {
        if let Some(pin) = values.get(COMPANION_PIN_FIELD) {
            self.on_pin(Protocol::Companion, COMPANION_PIN_FIELD, pin, store)
                .await
        } else if let Some(pin) = values.get(AIRPLAY_PIN_FIELD) {
            self.on_pin(Protocol::AirPlay, AIRPLAY_PIN_FIELD, pin, store)
                .await
        } else if let Some(choice) = values.get(CHOICE_FIELD) {
            self.on_choice(choice, store).await
        } else {
            Err(PairingError::NoChoice)
        }
    }

    async fn on_choice(
        &mut self,
        choice: &str,
        store: &mut CredentialStore,
    ) -> Result<PairingProgress, PairingError> {
        if self.state != PairingState::AwaitingChoice {
            return Err(PairingError::UnexpectedInput(CHOICE_FIELD.into()));
        }
        debug!(device = %choice, "device chosen");

        // Always re-resolve; the device may have changed address or left.
        let device = self
            .client
            .scan(Some(choice))
            .await?
            .into_iter()
            .find(|d| d.identifier == choice)
            .ok_or_else(|| PairingError::DeviceVanished(choice.to_string()))?;

        self.choice_deadline = None;
        self.device = Some(device);
        self.advance(Protocol::AirPlay, store).await
    }

    async fn on_pin(
        &mut self,
        protocol: Protocol,
        field: &str,
        raw: &str,
        store: &mut CredentialStore,
    ) -> Result<PairingProgress, PairingError> {
        let expected = PairingState::Pairing {
            protocol,
            step: PairingStep::AwaitPin,
        };
        if self.state != expected {
            return Err(PairingError::UnexpectedInput(field.into()));
        }
        let pin: u16 = raw
            .trim()
            .parse()
            .map_err(|_| PairingError::InvalidPin(raw.to_string()))?;

        let Some(session) = self.session.as_mut() else {
            return Err(PairingError::UnexpectedInput(field.into()));
        };
        debug!(%protocol, "PIN entered");
        session.handle.submit_pin(pin);

        match self.finish_protocol(store).await? {
            Some(next) => self.advance(next, store).await,
            None => Ok(PairingProgress::Paired),
        }
    }

    /// Begins handshakes starting at `protocol` until one needs user input
    /// or every protocol is paired.
    async fn advance(
        &mut self,
        mut protocol: Protocol,
        store: &mut CredentialStore,
    ) -> Result<PairingProgress, PairingError> {
        loop {
            match self.begin(protocol).await? {
                PinMode::DeviceProvidesPin => return Ok(PairingProgress::AwaitingInput),
                PinMode::DriverProvidesPin => match self.finish_protocol(store).await? {
                    Some(next) => protocol = next,
                    None => return Ok(PairingProgress::Paired),
                },
            }
        }
    }

    async fn begin(&mut self, protocol: Protocol) -> Result<PinMode, PairingError> {
        let Some(device) = self.device.clone() else {
            return Err(PairingError::UnexpectedInput(CHOICE_FIELD.into()));
        };

        info!(device = %device.identifier, %protocol, "pairing begin");
        let name = self.config.session_name(protocol);
        let mut handle = self.client.pair(&device, protocol, name).await?;
        if let Err(e) = handle.begin_handshake().await {
            if let Err(close_err) = handle.close().await {
                warn!(error = %close_err, "failed to close pairing handle");
            }
            return Err(e.into());
        }

        let deadline = self.config.deadline_from_now();
        if handle.device_provides_pin() {
            debug!(%protocol, "device provides PIN");
            self.session = Some(PairingSession {
                device,
                protocol,
                pin_mode: PinMode::DeviceProvidesPin,
                deadline,
                handle,
            });
            self.state = PairingState::Pairing {
                protocol,
                step: PairingStep::AwaitPin,
            };
            let field = SetupField {
                id: pin_field(protocol).into(),
                label: "Apple TV PIN".into(),
                field: FieldKind::Number {
                    min: 0,
                    max: 9999,
                    value: 0,
                },
            };
            self.hub.request_user_input(ENTER_PIN_TITLE, vec![field]).await?;
            Ok(PinMode::DeviceProvidesPin)
        } else {
            debug!(%protocol, "driver provides PIN");
            let pin = generate_pin();
            handle.submit_pin(pin);
            self.session = Some(PairingSession {
                device,
                protocol,
                pin_mode: PinMode::DriverProvidesPin,
                deadline,
                handle,
            });
            self.state = PairingState::Pairing {
                protocol,
                step: PairingStep::AwaitConfirm,
            };
            self.hub
                .request_user_confirmation(&format!("{SHOW_PIN_TITLE} {pin}"))
                .await?;
            Ok(PinMode::DriverProvidesPin)
        }
    }

    /// Completes the open handshake and stores its credentials.
    /// Returns the protocol to pair next, if any.
    async fn finish_protocol(
        &mut self,
        store: &mut CredentialStore,
    ) -> Result<Option<Protocol>, PairingError> {
        let Some(mut session) = self.session.take() else {
            return Err(PairingError::UnexpectedInput("finish".into()));
        };
        let protocol = session.protocol;

        let finished = session.handle.finish().await;
        let credentials = session
            .handle
            .is_paired()
            .then(|| session.handle.credentials())
            .flatten();
        let identifier = session.device.identifier.clone();
        session.close().await;
        finished?;

        let Some(credentials) = credentials else {
            return Err(PairingError::NotPaired(protocol));
        };
        info!(device = %identifier, %protocol, "paired");

        let entry = CredentialEntry {
            protocol,
            credentials,
        };
        let set = match protocol {
            Protocol::AirPlay => CredentialSet::new(identifier, entry),
            Protocol::Companion => {
                let mut set = store.current().clone();
                set.identifier = identifier;
                set.upsert(entry);
                set
            }
        };
        if let Err(e) = store.save(set) {
            error!(error = %e, "failed to store credentials");
        }

        match protocol {
            Protocol::AirPlay => Ok(Some(Protocol::Companion)),
            Protocol::Companion => {
                self.device = None;
                self.state = PairingState::Complete;
                Ok(None)
            }
        }
    }
}

fn pin_field(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::AirPlay => AIRPLAY_PIN_FIELD,
        Protocol::Companion => COMPANION_PIN_FIELD,
    }
}

/// Draws a fresh four-digit PIN.
pub fn generate_pin() -> u16 {
    use rand::Rng;
    rand::thread_rng().gen_range(PIN_RANGE)
}
