//! Last-write-wins conflict resolution.
//!
//! Two rules live here:
//!
//! - [`resolve`] / [`lww`]: value-level LWW. The larger timestamp wins; exact
//!   ties go to the remote side.
//! - [`resolve_with_tombstones`]: envelope-level LWW used when merging whole
//!   batches. On an exact timestamp tie a tombstone beats a live record, so
//!   an equally-stamped stale write cannot resurrect a deleted entity.

use crate::envelope::{RecordEnvelope, Timestamp};
use std::cmp::Ordering;

/// Which side of a conflict is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictResolution {
    /// Keep the local version.
    KeepLocal,
    /// Accept the remote version.
    AcceptRemote,
}

impl ConflictResolution {
    /// Returns true if the remote version wins.
    pub fn is_remote(&self) -> bool {
        matches!(self, ConflictResolution::AcceptRemote)
    }

    /// Picks the winning value.
    pub fn pick<T>(self, local: T, remote: T) -> T {
        match self {
            ConflictResolution::KeepLocal => local,
            ConflictResolution::AcceptRemote => remote,
        }
    }
}

/// A value paired with the timestamp it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The value.
    pub value: T,
    /// When the value was written.
    pub timestamp: Timestamp,
}

impl<T> Versioned<T> {
    /// Creates a versioned value.
    pub fn new(value: T, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }
}

impl From<RecordEnvelope> for Versioned<RecordEnvelope> {
    fn from(envelope: RecordEnvelope) -> Self {
        let timestamp = envelope.updated_at;
        Self::new(envelope, timestamp)
    }
}

/// Value-level LWW decision on timestamps alone. Ties go to remote.
#[inline]
pub fn lww(local: Timestamp, remote: Timestamp) -> ConflictResolution {
    if local > remote {
        ConflictResolution::KeepLocal
    } else {
        ConflictResolution::AcceptRemote
    }
}

/// Resolves two versions of one logical value, returning the current one.
///
/// Pure and total: the larger timestamp wins, and on an exact tie the
/// remote version is returned.
pub fn resolve<T>(local: Versioned<T>, remote: Versioned<T>) -> Versioned<T> {
    lww(local.timestamp, remote.timestamp).pick(local, remote)
}

/// Tombstone-aware LWW for two versions of the same envelope identity.
///
/// 1. The later `updated_at` wins.
/// 2. On an exact tie, a tombstone beats a live record.
/// 3. On a tie with equal deletion state, the lexicographically greater
///    payload wins. This rule has no business meaning; it only makes the
///    outcome independent of argument order so merges are reproducible.
/// 4. Fully identical envelopes resolve to remote.
pub fn resolve_with_tombstones(
    local: &RecordEnvelope,
    remote: &RecordEnvelope,
) -> ConflictResolution {
    let ordering = local
        .updated_at
        .cmp(&remote.updated_at)
        .then_with(|| local.is_deleted.cmp(&remote.is_deleted))
        .then_with(|| local.payload.cmp(&remote.payload));

    match ordering {
        Ordering::Greater => ConflictResolution::KeepLocal,
        Ordering::Less | Ordering::Equal => ConflictResolution::AcceptRemote,
    }
}
