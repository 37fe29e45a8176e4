//! # Tripsync Protocol
//!
//! Record envelopes, conflict resolution and wire codecs for tripsync.
//!
//! This crate provides:
//! - `RecordEnvelope`, the unit of synchronization
//! - `RecordKind` / `RecordIdentity` for addressing logical entities
//! - Last-write-wins conflict resolution (value-level and tombstone-aware)
//! - Batch merge and identity deduplication with deterministic ordering
//! - A per-writer monotonic clock
//! - Protocol messages (Push, Pull) and their CBOR codecs
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod codec;
mod conflict;
mod envelope;
mod error;
mod kind;
mod merge;
mod messages;

pub use clock::MonotonicClock;
pub use codec::{decode_batch, encode_batch, from_cbor, to_cbor};
pub use conflict::{lww, resolve, resolve_with_tombstones, ConflictResolution, Versioned};
pub use envelope::{RecordEnvelope, RecordIdentity, SyncBatch, Timestamp};
pub use error::{ProtocolError, ProtocolResult};
pub use kind::RecordKind;
pub use merge::{dedupe_by_identity, max_updated_at, merge, sort_by_kind, sort_by_time};
pub use messages::{
    PageKey, PullRequest, PullResponse, PushRequest, PushResponse, PULL_PATH, PUSH_PATH,
};
