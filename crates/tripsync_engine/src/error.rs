//! Error types for the sync engine.

use thiserror::Error;
use tripsync_protocol::ProtocolError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// The orchestrator never recovers from any of these: every collaborator
/// error aborts the cycle and is returned unchanged. "Sync disabled" is not
/// an error; the gate reports it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Push or pull failed (network, auth, server rejection).
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Reading or writing local state failed.
    #[error("local store error: {0}")]
    LocalStore(String),

    /// Reading or persisting the sync cursor failed.
    #[error("cursor store error: {0}")]
    Cursor(String),

    /// The remote side answered with something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Encoding or decoding a wire message failed.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    /// The cycle was cancelled between steps.
    #[error("sync cancelled")]
    Cancelled,

    /// Another cycle is already in flight for this store.
    #[error("a sync cycle is already running")]
    AlreadyRunning,

    /// The transport is closed.
    #[error("not connected to server")]
    NotConnected,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a later cycle may succeed without intervention.
    ///
    /// Advisory only; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::NotConnected | SyncError::AlreadyRunning | SyncError::Cancelled => true,
            _ => false,
        }
    }
}
