//! Credential persistence for the paired device.
//!
//! One JSON file per driver instance holds the device identifier and the
//! per-protocol credential blobs obtained during pairing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use atvbridge_device::Protocol;

/// Errors from credential persistence.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential set has entries but no device identifier (or the reverse)")]
    Inconsistent,
}

/// Authentication material for one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub protocol: Protocol,
    pub credentials: String,
}

/// Everything needed to reconnect to the paired device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub identifier: String,
    #[serde(rename = "credentials")]
    pub entries: Vec<CredentialEntry>,
}

impl CredentialSet {
    /// Starts a set for `identifier` with its first entry.
    pub fn new(identifier: impl Into<String>, first: CredentialEntry) -> Self {
        Self {
            identifier: identifier.into(),
            entries: vec![first],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty()
    }

    /// Identifier and entries are either both present or both absent.
    pub fn is_consistent(&self) -> bool {
        self.identifier.is_empty() == self.entries.is_empty()
    }

    /// Adds an entry, replacing any existing one for the same protocol.
    pub fn upsert(&mut self, entry: CredentialEntry) {
        match self.entries.iter_mut().find(|e| e.protocol == entry.protocol) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, protocol: Protocol) -> Option<&CredentialEntry> {
        self.entries.iter().find(|e| e.protocol == protocol)
    }
}

/// Persistent store for the single paired device's credentials.
///
/// The current set is cached in memory and mirrored to a JSON file.
pub struct CredentialStore {
    path: PathBuf,
    current: CredentialSet,
}

impl CredentialStore {
    /// Creates a store backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            current: CredentialSet::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory credential set (empty until loaded or paired).
    pub fn current(&self) -> &CredentialSet {
        &self.current
    }

    /// Loads credentials from disk.
    ///
    /// A missing, unreadable or corrupt file all yield `None`.
    pub fn load(&mut self) -> Option<CredentialSet> {
        match read_set(&self.path) {
            Ok(Some(set)) => {
                debug!(
                    device = %set.identifier,
                    entries = set.entries.len(),
                    "loaded credentials from {:?}",
                    self.path
                );
                self.current = set.clone();
                Some(set)
            }
            Ok(None) => {
                debug!("no credentials file at {:?}", self.path);
                None
            }
            Err(e) => {
                error!(error = %e, "cannot read credentials file {:?}", self.path);
                None
            }
        }
    }

    /// Replaces the current set and writes it to disk.
    ///
    /// The in-memory set is updated even when the write fails.
    pub fn save(&mut self, set: CredentialSet) -> Result<(), CredentialError> {
        if !set.is_consistent() {
            return Err(CredentialError::Inconsistent);
        }
        self.current = set;
        self.persist()
    }

    /// Forgets all credentials, in memory and on disk.
    pub fn clear(&mut self) -> Result<(), CredentialError> {
        self.current = CredentialSet::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("removed credentials file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(&self.current)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(
            entries = self.current.entries.len(),
            "persisted credentials to {:?}", self.path
        );
        Ok(())
    }
}

/// Reads a credential set. `Ok(None)` when the file does not exist.
fn read_set(path: &Path) -> Result<Option<CredentialSet>, CredentialError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let set: CredentialSet = serde_json::from_str(&data)?;
    if !set.is_consistent() {
        return Err(CredentialError::Inconsistent);
    }
    Ok(Some(set))
}
