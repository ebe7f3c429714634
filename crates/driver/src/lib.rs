//! Bridge driver exposing a paired Apple TV as a hub media player.
//!
//! The embedding binary supplies a [`DeviceClient`](atvbridge_device::DeviceClient)
//! and a [`HubApi`](atvbridge_hub::HubApi), builds a [`Driver`] and feeds it
//! hub events through [`Driver::run`].

pub mod commands;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod logging;
pub mod media;
pub mod pairing;
pub mod poller;
pub mod retry;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::MediaCommand;
pub use config::{ConfigError, DriverConfig};
pub use connection::{ConnectError, ConnectOutcome, ConnectionManager, ConnectionState};
pub use credentials::{CredentialEntry, CredentialError, CredentialSet, CredentialStore};
pub use pairing::{PairingCoordinator, PairingError, PairingProgress, PairingState, generate_pin};
pub use poller::{PollerConfig, StatePoller};
pub use retry::{RetryPolicy, Retryable, with_retry};
pub use router::Driver;
