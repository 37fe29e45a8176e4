//! Envelope fixtures and builders.

use tempfile::TempDir;
use tripsync_engine::FileCursorStore;
use tripsync_protocol::{RecordEnvelope, RecordKind, SyncBatch, Timestamp};
use uuid::Uuid;

/// Returns a deterministic id, handy for readable assertions.
pub fn fixed_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Returns a timestamp from milliseconds.
pub fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

/// Creates a live envelope.
pub fn live(kind: RecordKind, id: Uuid, millis: i64, payload: &[u8]) -> RecordEnvelope {
    RecordEnvelope::new(kind, id, ts(millis), payload.to_vec())
}

/// Creates a tombstone.
pub fn tombstone(kind: RecordKind, id: Uuid, millis: i64) -> RecordEnvelope {
    RecordEnvelope::tombstone(kind, id, ts(millis))
}

/// Creates one live envelope per timestamp, each with a fresh fixed id.
pub fn batch_at(kind: RecordKind, times: &[i64]) -> SyncBatch {
    times
        .iter()
        .enumerate()
        .map(|(i, &millis)| live(kind, fixed_id(i as u128 + 1), millis, &millis.to_be_bytes()))
        .collect()
}

/// Builder for envelopes with defaults for every field.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    kind: RecordKind,
    id: Uuid,
    updated_at: Timestamp,
    payload: Vec<u8>,
    is_deleted: bool,
}

impl EnvelopeBuilder {
    /// Starts a live `Place` at the epoch with a random id.
    pub fn new() -> Self {
        Self {
            kind: RecordKind::Place,
            id: Uuid::new_v4(),
            updated_at: Timestamp::EPOCH,
            payload: Vec::new(),
            is_deleted: false,
        }
    }

    /// Sets the kind.
    pub fn kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the id.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Sets `updated_at` in milliseconds.
    pub fn at(mut self, millis: i64) -> Self {
        self.updated_at = ts(millis);
        self
    }

    /// Sets the payload.
    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Marks the envelope as a tombstone.
    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    /// Builds the envelope.
    pub fn build(self) -> RecordEnvelope {
        RecordEnvelope {
            kind: self.kind,
            id: self.id,
            updated_at: self.updated_at,
            payload: self.payload,
            is_deleted: self.is_deleted,
        }
    }
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A file cursor store in a temporary directory removed on drop.
pub struct TempCursor {
    /// The store.
    pub store: FileCursorStore,
    _dir: TempDir,
}

impl TempCursor {
    /// Creates an empty cursor file in a fresh temp directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileCursorStore::open(dir.path().join("cursor.json"))
            .expect("Failed to open cursor store");
        Self { store, _dir: dir }
    }
}

impl Default for TempCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempCursor {
    type Target = FileCursorStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
