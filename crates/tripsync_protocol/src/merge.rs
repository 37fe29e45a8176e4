//! Batch merge and identity deduplication.
//!
//! Output ordering here exists for reproducibility only and must never be
//! read as causality.

use crate::conflict::{lww, resolve_with_tombstones};
use crate::envelope::{RecordEnvelope, RecordIdentity, SyncBatch, Timestamp};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Merges two batches into one canonical batch with one entry per identity.
///
/// The map is seeded from `local`, then each `remote` entry is inserted if
/// its identity is new or resolved against the existing entry with
/// [`resolve_with_tombstones`]. Duplicate identities inside `local` are
/// folded with the same rule. The result is sorted by
/// `(kind, updated_at, id)`.
pub fn merge(local: SyncBatch, remote: SyncBatch) -> SyncBatch {
    let mut by_identity: HashMap<RecordIdentity, RecordEnvelope> =
        HashMap::with_capacity(local.len() + remote.len());

    for envelope in local.into_iter().chain(remote) {
        match by_identity.entry(envelope.identity()) {
            Entry::Vacant(slot) => {
                slot.insert(envelope);
            }
            Entry::Occupied(mut slot) => {
                if resolve_with_tombstones(slot.get(), &envelope).is_remote() {
                    slot.insert(envelope);
                }
            }
        }
    }

    let mut merged: SyncBatch = by_identity.into_values().collect();
    sort_by_kind(&mut merged);
    merged
}

/// Collapses a batch to one envelope per identity using value-level LWW.
///
/// Entries are folded in input order, each later duplicate playing the
/// remote side, so on an exact timestamp tie the later entry wins. The
/// result is sorted by `(updated_at, kind, id)`.
pub fn dedupe_by_identity(batch: SyncBatch) -> SyncBatch {
    let mut by_identity: HashMap<RecordIdentity, RecordEnvelope> =
        HashMap::with_capacity(batch.len());

    for envelope in batch {
        match by_identity.entry(envelope.identity()) {
            Entry::Vacant(slot) => {
                slot.insert(envelope);
            }
            Entry::Occupied(mut slot) => {
                if lww(slot.get().updated_at, envelope.updated_at).is_remote() {
                    slot.insert(envelope);
                }
            }
        }
    }

    let mut deduped: SyncBatch = by_identity.into_values().collect();
    sort_by_time(&mut deduped);
    deduped
}

/// Sorts by `(kind, updated_at, id)`, the canonical merge order.
pub fn sort_by_kind(batch: &mut [RecordEnvelope]) {
    batch.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.updated_at.cmp(&b.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Sorts by `(updated_at, kind, id)`, the order pulled records are applied in.
pub fn sort_by_time(batch: &mut [RecordEnvelope]) {
    batch.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Returns the greatest `updated_at` in a batch, or `None` if it is empty.
pub fn max_updated_at(batch: &[RecordEnvelope]) -> Option<Timestamp> {
    batch.iter().map(|e| e.updated_at).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::RecordKind;
    use uuid::Uuid;

    fn id(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    fn env(kind: RecordKind, n: u8, ts: i64, payload: &[u8]) -> RecordEnvelope {
        RecordEnvelope::new(kind, id(n), Timestamp::from_millis(ts), payload.to_vec())
    }

    #[test]
    fn merge_keeps_newer_version() {
        let local = vec![env(RecordKind::Place, 1, 100, b"old")];
        let remote = vec![env(RecordKind::Place, 1, 200, b"new")];

        let merged = merge(local, remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].payload, b"new");
    }

    #[test]
    fn merge_tombstone_beats_equal_live_record() {
        let local = vec![RecordEnvelope::tombstone(
            RecordKind::Trip,
            id(1),
            Timestamp::from_millis(50),
        )];
        let remote = vec![env(RecordKind::Trip, 1, 50, b"stale")];

        let merged = merge(local, remote);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_deleted);
    }

    #[test]
    fn merge_orders_by_kind_then_time_then_id() {
        let local = vec![
            env(RecordKind::Visit, 1, 10, b""),
            env(RecordKind::Place, 2, 30, b""),
        ];
        let remote = vec![
            env(RecordKind::Place, 3, 20, b""),
            env(RecordKind::Media, 4, 99, b""),
            env(RecordKind::Place, 1, 20, b""),
        ];

        let merged = merge(local, remote);
        let keys: Vec<_> = merged
            .iter()
            .map(|e| (e.kind, e.updated_at.as_millis(), e.id))
            .collect();
        assert_eq!(
            keys,
            vec![
                (RecordKind::Media, 99, id(4)),
                (RecordKind::Place, 20, id(1)),
                (RecordKind::Place, 20, id(3)),
                (RecordKind::Place, 30, id(2)),
                (RecordKind::Visit, 10, id(1)),
            ]
        );
    }

    #[test]
    fn merge_with_empty_is_canonical_input() {
        let batch = vec![
            env(RecordKind::Tag, 9, 5, b"t"),
            env(RecordKind::Spot, 2, 1, b"s"),
        ];
        let mut expected = batch.clone();
        sort_by_kind(&mut expected);

        assert_eq!(merge(batch.clone(), Vec::new()), expected);
        assert_eq!(merge(Vec::new(), batch), expected);
    }

    #[test]
    fn merge_same_identity_different_kind_is_distinct() {
        let merged = merge(
            vec![env(RecordKind::Place, 1, 1, b"")],
            vec![env(RecordKind::Spot, 1, 1, b"")],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn dedupe_prefers_newest_and_later_on_tie() {
        let batch = vec![
            env(RecordKind::Place, 1, 100, b"first"),
            env(RecordKind::Place, 1, 300, b"newest"),
            env(RecordKind::Place, 1, 200, b"middle"),
            env(RecordKind::Spot, 2, 50, b"a"),
            env(RecordKind::Spot, 2, 50, b"b"),
        ];

        let deduped = dedupe_by_identity(batch);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].payload, b"b");
        assert_eq!(deduped[1].payload, b"newest");
    }

    #[test]
    fn dedupe_sorts_by_time_first() {
        let batch = vec![
            env(RecordKind::Media, 1, 120, b""),
            env(RecordKind::Visit, 2, 50, b""),
            env(RecordKind::Place, 3, 120, b""),
        ];

        let deduped = dedupe_by_identity(batch);
        let keys: Vec<_> = deduped
            .iter()
            .map(|e| (e.updated_at.as_millis(), e.kind))
            .collect();
        assert_eq!(
            keys,
            vec![
                (50, RecordKind::Visit),
                (120, RecordKind::Media),
                (120, RecordKind::Place),
            ]
        );
    }

    #[test]
    fn max_updated_at_of_batch() {
        assert_eq!(max_updated_at(&[]), None);
        let batch = vec![
            env(RecordKind::Place, 1, 7, b""),
            env(RecordKind::Place, 2, 70, b""),
            env(RecordKind::Place, 3, 17, b""),
        ];
        assert_eq!(max_updated_at(&batch), Some(Timestamp::from_millis(70)));
    }
}
