//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, ureq, etc.).
//!
//! Bodies are CBOR-encoded protocol messages. Pull pagination and push
//! chunking happen here, so the orchestrator always sees complete batches.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use tripsync_protocol::{
    PageKey, PullRequest, PullResponse, PushRequest, PushResponse, RecordEnvelope, SyncBatch,
    Timestamp, PULL_PATH, PUSH_PATH,
};
use uuid::Uuid;

/// Failure reported by an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// HTTP status, or `None` if no response was received.
    pub status: Option<u16>,
    /// Error message.
    pub message: String,
}

impl HttpError {
    /// A failure before any response arrived (DNS, connect, reset).
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// A response with a non-success status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Network failures, 408, 429 and 5xx are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(code) => code == 408 || code == 429 || code >= 500,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<HttpError> for SyncError {
    fn from(err: HttpError) -> Self {
        SyncError::Transport {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based sync transport.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync server (e.g., "https://sync.example.com").
    base_url: String,
    /// Device pushing through this transport.
    device_id: Uuid,
    /// Records requested per pull page.
    pull_page_size: u32,
    /// Records sent per push request.
    push_batch_size: usize,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport from a sync configuration.
    pub fn new(config: &SyncConfig, client: C) -> Self {
        Self {
            base_url: config.server_url.clone(),
            device_id: config.device_id,
            pull_page_size: config.pull_page_size.max(1),
            push_batch_size: config.push_batch_size.max(1) as usize,
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Checks if the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Closes the transport; later calls fail with `NotConnected`.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn post(&self, endpoint: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        match self.client.post(&url, body) {
            Ok(response) => {
                *self.last_error.write() = None;
                Ok(response)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn pull_page(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        let body = self.post(PULL_PATH, request.encode()?)?;
        Ok(PullResponse::decode(&body)?)
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn push(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        for chunk in batch.chunks(self.push_batch_size) {
            let request = PushRequest::new(self.device_id, chunk.to_vec());
            let body = self.post(PUSH_PATH, request.encode()?)?;
            let response = PushResponse::decode(&body)?;

            if response.accepted as usize != chunk.len() {
                return Err(SyncError::Protocol(format!(
                    "server accepted {} of {} records",
                    response.accepted,
                    chunk.len()
                )));
            }
            debug!(
                accepted = response.accepted,
                changed = response.changed,
                "pushed chunk"
            );
        }
        Ok(())
    }

    fn pull(&self, since: Option<Timestamp>) -> SyncResult<SyncBatch> {
        let mut request = PullRequest::new(since, self.pull_page_size);
        let mut records = SyncBatch::new();
        let mut pages = 0usize;

        loop {
            let page = self.pull_page(&request)?;
            pages += 1;

            match page.next_page {
                Some(key) => {
                    check_continuation(request.page_after, &page.records, key)?;
                    records.extend(page.records);
                    request = request.next_page(key);
                }
                None => {
                    records.extend(page.records);
                    break;
                }
            }
        }

        debug!(count = records.len(), pages, "pulled");
        Ok(records)
    }
}

/// Validates a continuation key so every follow-up request makes progress.
///
/// A page that promises more must carry records, and its key must not fall
/// behind its own last record or the previous key.
fn check_continuation(
    previous: Option<PageKey>,
    page: &[RecordEnvelope],
    next: PageKey,
) -> SyncResult<()> {
    let last = page.last().map(PageKey::of).ok_or_else(|| {
        SyncError::Protocol("server sent an empty page with a continuation key".into())
    })?;
    if next < last || previous.map_or(false, |prev| next <= prev) {
        return Err(SyncError::Protocol(
            "server continuation key does not advance".into(),
        ));
    }
    Ok(())
}

/// A loopback HTTP client that routes requests directly to a sync server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    healthy: AtomicBool,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            healthy: AtomicBool::new(true),
        }
    }

    /// Simulates the network going away or coming back.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Returns the wrapped server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, HttpError>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, HttpError> {
        (**self).handle_post(path, body)
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError> {
        if !self.is_healthy() {
            return Err(HttpError::network("loopback network is down"));
        }

        // Extract path from URL
        let path = url.find("/sync/").map(|i| &url[i..]).unwrap_or(url);

        self.server.handle_post(path, &body)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
