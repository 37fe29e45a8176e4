//! Error types for the sync server.

use thiserror::Error;
use tripsync_protocol::ProtocolError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request contents.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Push exceeded the configured batch limit.
    #[error("push too large: {size} records > {max}")]
    BatchTooLarge {
        /// Records in the request.
        size: usize,
        /// Configured limit.
        max: u32,
    },

    /// Request or response body could not be (de)serialized.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    /// No handler for the path.
    #[error("no such endpoint: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::BatchTooLarge { .. }
                | ServerError::Codec(_)
                | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Internal(_))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Codec(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::BatchTooLarge { .. } => 413,
            ServerError::Internal(_) => 500,
        }
    }
}
