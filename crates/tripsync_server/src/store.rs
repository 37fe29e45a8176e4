//! Server-side record store.

use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tripsync_protocol::{
    resolve_with_tombstones, sort_by_kind, sort_by_time, PageKey, RecordEnvelope,
    RecordIdentity, SyncBatch, Timestamp,
};

/// Remote record store: the current envelope for every identity.
///
/// All access goes through one mutex, so concurrent pushes are applied one
/// batch at a time and every read is a consistent snapshot.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Mutex<HashMap<RecordIdentity, RecordEnvelope>>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a batch with tombstone-aware LWW.
    ///
    /// Returns the number of envelopes that changed stored state. An
    /// envelope identical to the stored one is a no-op.
    pub fn merge(&self, batch: &[RecordEnvelope]) -> usize {
        let mut records = self.records.lock();
        let mut changed = 0;

        for envelope in batch {
            match records.entry(envelope.identity()) {
                Entry::Vacant(slot) => {
                    slot.insert(envelope.clone());
                    changed += 1;
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get();
                    if current != envelope && resolve_with_tombstones(current, envelope).is_remote()
                    {
                        slot.insert(envelope.clone());
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Returns every record with `updated_at > since` (all if `None`), in
    /// `(updated_at, kind, id)` order.
    pub fn changes_since(&self, since: Option<Timestamp>) -> SyncBatch {
        let mut changes: SyncBatch = self
            .records
            .lock()
            .values()
            .filter(|e| is_after(e, since))
            .cloned()
            .collect();
        sort_by_time(&mut changes);
        changes
    }

    /// Returns one page of `changes_since(since)` starting after `after`,
    /// plus the key to continue from if more records remain.
    pub fn page(
        &self,
        since: Option<Timestamp>,
        after: Option<PageKey>,
        limit: usize,
    ) -> (SyncBatch, Option<PageKey>) {
        let mut candidates: SyncBatch = self
            .records
            .lock()
            .values()
            .filter(|e| is_after(e, since))
            .filter(|e| after.map_or(true, |key| PageKey::of(e) > key))
            .cloned()
            .collect();
        sort_by_time(&mut candidates);

        let limit = limit.max(1);
        if candidates.len() > limit {
            candidates.truncate(limit);
            let next = candidates.last().map(PageKey::of);
            (candidates, next)
        } else {
            (candidates, None)
        }
    }

    /// Returns the stored version of an identity.
    pub fn get(&self, identity: &RecordIdentity) -> Option<RecordEnvelope> {
        self.records.lock().get(identity).cloned()
    }

    /// Returns every stored record, tombstones included, in canonical order.
    pub fn snapshot(&self) -> SyncBatch {
        let mut all: SyncBatch = self.records.lock().values().cloned().collect();
        sort_by_kind(&mut all);
        all
    }

    /// Returns the number of stored identities.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn is_after(envelope: &RecordEnvelope, since: Option<Timestamp>) -> bool {
    since.map_or(true, |s| envelope.updated_at > s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripsync_protocol::RecordKind;
    use uuid::Uuid;

    fn env(id: Uuid, ts: i64, payload: &[u8]) -> RecordEnvelope {
        RecordEnvelope::new(RecordKind::Trip, id, Timestamp::from_millis(ts), payload.to_vec())
    }

    #[test]
    fn merge_counts_changes() {
        let store = RecordStore::new();
        let id = Uuid::new_v4();

        assert_eq!(store.merge(&[env(id, 10, b"a")]), 1);
        assert_eq!(store.merge(&[env(id, 10, b"a")]), 0);
        assert_eq!(store.merge(&[env(id, 5, b"old")]), 0);
        assert_eq!(store.merge(&[env(id, 20, b"b")]), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&RecordIdentity::new(RecordKind::Trip, id)).unwrap().payload, b"b");
    }

    #[test]
    fn tombstone_wins_tie() {
        let store = RecordStore::new();
        let id = Uuid::new_v4();
        let tomb = RecordEnvelope::tombstone(RecordKind::Trip, id, Timestamp::from_millis(10));

        store.merge(&[tomb.clone()]);
        assert_eq!(store.merge(&[env(id, 10, b"resurrect")]), 0);
        assert_eq!(store.snapshot(), vec![tomb]);
    }

    #[test]
    fn changes_since_is_strict_and_ordered() {
        let store = RecordStore::new();
        store.merge(&[
            env(Uuid::new_v4(), 30, b"c"),
            env(Uuid::new_v4(), 10, b"a"),
            env(Uuid::new_v4(), 20, b"b"),
        ]);

        let all = store.changes_since(None);
        let times: Vec<i64> = all.iter().map(|e| e.updated_at.as_millis()).collect();
        assert_eq!(times, vec![10, 20, 30]);

        let later = store.changes_since(Some(Timestamp::from_millis(20)));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].updated_at, Timestamp::from_millis(30));
    }

    #[test]
    fn paging_does_not_split_equal_timestamps() {
        let store = RecordStore::new();
        let batch: Vec<_> = (0..5).map(|_| env(Uuid::new_v4(), 7, b"same")).collect();
        store.merge(&batch);

        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let (page, next) = store.page(None, after, 2);
            seen.extend(page);
            match next {
                Some(key) => after = Some(key),
                None => break,
            }
        }
        assert_eq!(seen, store.changes_since(None));
    }
}
