//! Protocol messages for push and pull.

use crate::codec::{from_cbor, to_cbor};
use crate::envelope::{RecordEnvelope, SyncBatch, Timestamp};
use crate::error::ProtocolResult;
use crate::kind::RecordKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Endpoint for push requests.
pub const PUSH_PATH: &str = "/sync/push";
/// Endpoint for pull requests.
pub const PULL_PATH: &str = "/sync/pull";

/// Push request from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Pushing device.
    pub device_id: Uuid,
    /// Envelopes to store remotely.
    pub records: SyncBatch,
}

impl PushRequest {
    /// Creates a new push request.
    pub fn new(device_id: Uuid, records: SyncBatch) -> Self {
        Self { device_id, records }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Push response from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Number of envelopes received.
    pub accepted: u32,
    /// Number of envelopes that changed remote state.
    pub changed: u32,
}

impl PushResponse {
    /// Creates a push response.
    pub fn new(accepted: u32, changed: u32) -> Self {
        Self { accepted, changed }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Position of the last record on a pull page.
///
/// Paging is keyed on `(updated_at, kind, id)` rather than on the timestamp
/// alone, so records sharing a timestamp are never split across pages and
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageKey {
    /// Timestamp of the last record returned.
    pub updated_at: Timestamp,
    /// Kind of the last record returned.
    pub kind: RecordKind,
    /// Id of the last record returned.
    pub id: Uuid,
}

impl PageKey {
    /// Returns the page key of an envelope.
    pub fn of(envelope: &RecordEnvelope) -> Self {
        Self {
            updated_at: envelope.updated_at,
            kind: envelope.kind,
            id: envelope.id,
        }
    }
}

/// Pull request from a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Return records with `updated_at` strictly greater than this; all if absent.
    pub since: Option<Timestamp>,
    /// Continue after this record (from a previous page).
    pub page_after: Option<PageKey>,
    /// Maximum number of records per page.
    pub limit: u32,
}

impl PullRequest {
    /// Creates a request for the first page.
    pub fn new(since: Option<Timestamp>, limit: u32) -> Self {
        Self {
            since,
            page_after: None,
            limit,
        }
    }

    /// Returns the request for the page after `key`.
    pub fn next_page(&self, key: PageKey) -> Self {
        Self {
            page_after: Some(key),
            ..self.clone()
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Pull response from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Records on this page, in `(updated_at, kind, id)` order.
    pub records: SyncBatch,
    /// Key to continue from if more records remain.
    pub next_page: Option<PageKey>,
}

impl PullResponse {
    /// Creates a pull response.
    pub fn new(records: SyncBatch, next_page: Option<PageKey>) -> Self {
        Self { records, next_page }
    }

    /// Returns true if more pages remain.
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}
