//! # Tripsync Engine
//!
//! Offline-first synchronization engine for tripsync.
//!
//! This crate provides:
//! - Collaborator traits: `SyncTransport`, `LocalChangeStore`, `CursorStore`
//! - The sync orchestrator (one push-then-pull cycle per call)
//! - Echo suppression for records this device just pushed
//! - A feature-flag gate with a single-flight guard
//! - HTTP transport abstraction with internal paging
//! - In-memory and file-backed stores
//!
//! ## Architecture
//!
//! Each cycle runs **push-then-pull**:
//! 1. Push pending local changes, then mark them pushed
//! 2. Pull remote changes since the cursor
//! 3. Deduplicate by identity and strip echoes of what was just pushed
//! 4. Apply the survivors locally
//! 5. Advance the cursor to the newest pulled timestamp
//!
//! ## Key Invariants
//!
//! - Conflicts are whole-record last-write-wins on `updated_at`
//! - The cursor only moves when something was pulled
//! - A failed cycle leaves unpushed changes pending; re-pushing is idempotent
//! - The orchestrator never retries; scheduling is the caller's job
//! - At most one cycle per store is in flight

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod error;
mod gate;
mod http;
mod orchestrator;
mod persist;
mod store;
mod transport;

pub use config::{ConfigFlags, FeatureFlagProvider, FileFeatureFlags, SyncConfig};
pub use cursor::{CursorStore, FileCursorStore, MemoryCursorStore};
pub use error::{SyncError, SyncResult};
pub use gate::SyncGate;
pub use http::{HttpClient, HttpError, HttpTransport, LoopbackClient, LoopbackServer};
pub use orchestrator::{
    strip_echoes, CancelHandle, EchoOutcome, SyncOrchestrator, SyncRunReport, SyncState,
    SyncStats,
};
pub use store::{LocalChangeStore, MemoryChangeStore, RecordingStore};
pub use transport::{MockTransport, SyncTransport};
