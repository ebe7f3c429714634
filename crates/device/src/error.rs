//! Device-control error types.

/// Errors reported by a device-control client.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device did not respond in time")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("session closed")]
    Closed,
}

impl DeviceError {
    /// Returns `true` for failures worth retrying (network hiccups,
    /// handshake glitches). Unsupported operations and closed sessions
    /// fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::Io(_) | DeviceError::Timeout | DeviceError::Protocol(_)
        )
    }
}
