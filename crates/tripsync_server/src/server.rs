//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::warn;
use tripsync_protocol::{
    PullRequest, PullResponse, PushRequest, PushResponse, PULL_PATH, PUSH_PATH,
};

/// The sync server.
///
/// Handles push and pull requests against a shared [`RecordStore`]. It
/// does not listen on a socket; hosts route request bodies to
/// [`handle_post`](Self::handle_post) from whatever HTTP stack they use.
///
/// # Example
///
/// ```
/// use tripsync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// assert!(server.store().is_empty());
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    store: Arc<RecordStore>,
}

impl SyncServer {
    /// Creates a new sync server with an empty store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(RecordStore::new()))
    }

    /// Creates a sync server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<RecordStore>) -> Self {
        let handler = RequestHandler::new(config, Arc::clone(&store));
        Self { handler, store }
    }

    /// Returns the record store.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        self.handler.handle_pull(request)
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        self.handler.handle_push(request)
    }

    /// Decodes a CBOR body, dispatches on `path`, and encodes the response.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> ServerResult<Vec<u8>> {
        let result = match path {
            PUSH_PATH => {
                let request = PushRequest::decode(body)?;
                self.handle_push(request)?.encode().map_err(ServerError::from)
            }
            PULL_PATH => {
                let request = PullRequest::decode(body)?;
                self.handle_pull(request)?.encode().map_err(ServerError::from)
            }
            other => Err(ServerError::NotFound(other.to_string())),
        };

        if let Err(e) = &result {
            warn!(path, status = e.status_code(), error = %e, "request failed");
        }
        result
    }
}
