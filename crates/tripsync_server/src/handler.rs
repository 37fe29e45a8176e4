//! Request handlers for sync endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::debug;
use tripsync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};

/// Handler for sync requests.
pub struct RequestHandler {
    config: ServerConfig,
    store: Arc<RecordStore>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(config: ServerConfig, store: Arc<RecordStore>) -> Self {
        Self { config, store }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handles a pull request, returning at most `max_pull_batch` records.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        if request.limit == 0 {
            return Err(ServerError::InvalidRequest("pull limit must be positive".into()));
        }
        let limit = request.limit.min(self.config.max_pull_batch) as usize;

        let (records, next_page) = self.store.page(request.since, request.page_after, limit);
        debug!(
            since = ?request.since.map(|t| t.as_millis()),
            count = records.len(),
            more = next_page.is_some(),
            "served pull page"
        );
        Ok(PullResponse::new(records, next_page))
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        let size = request.records.len();
        if size > self.config.max_push_batch as usize {
            return Err(ServerError::BatchTooLarge {
                size,
                max: self.config.max_push_batch,
            });
        }

        let changed = self.store.merge(&request.records);
        debug!(device = %request.device_id, size, changed, "merged push");

        let accepted = u32::try_from(size)
            .map_err(|_| ServerError::Internal(format!("batch size {} overflows", size)))?;
        let changed = u32::try_from(changed)
            .map_err(|_| ServerError::Internal(format!("change count {} overflows", changed)))?;
        Ok(PushResponse::new(accepted, changed))
    }
}
