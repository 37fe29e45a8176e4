//! Local change store: pending local writes and application of pulled records.

use crate::error::SyncResult;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tripsync_protocol::{
    resolve_with_tombstones, sort_by_kind, MonotonicClock, RecordEnvelope, RecordIdentity,
    RecordKind, SyncBatch,
};
use uuid::Uuid;

/// Local side of synchronization.
///
/// Implementations must treat each call as atomic: a batch is marked pushed
/// or applied as a whole, never partially.
pub trait LocalChangeStore: Send + Sync {
    /// Returns the locally modified envelopes not yet pushed.
    fn pending_push_batch(&self) -> SyncResult<SyncBatch>;

    /// Marks a batch as pushed. Envelopes recorded after `batch` was taken
    /// must stay pending.
    fn mark_batch_as_pushed(&self, batch: &[RecordEnvelope]) -> SyncResult<()>;

    /// Applies a batch of remote records, in the given order.
    fn apply_pulled_batch(&self, batch: &[RecordEnvelope]) -> SyncResult<()>;
}

impl<S: LocalChangeStore + ?Sized> LocalChangeStore for Arc<S> {
    fn pending_push_batch(&self) -> SyncResult<SyncBatch> {
        (**self).pending_push_batch()
    }

    fn mark_batch_as_pushed(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        (**self).mark_batch_as_pushed(batch)
    }

    fn apply_pulled_batch(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        (**self).apply_pulled_batch(batch)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    /// Current version per identity, tombstones included.
    records: HashMap<RecordIdentity, RecordEnvelope>,
    /// Unpushed local writes, at most one per identity, oldest first.
    pending: Vec<RecordEnvelope>,
}

/// An in-memory local change store.
///
/// Local writes are stamped by a [`MonotonicClock`] that also observes every
/// applied remote timestamp, so a write made after a pull always sorts after
/// what was pulled.
#[derive(Debug, Default)]
pub struct MemoryChangeStore {
    state: RwLock<StoreState>,
    clock: MonotonicClock,
}

impl MemoryChangeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a live record stamped with the next clock tick.
    pub fn put(&self, kind: RecordKind, id: Uuid, payload: Vec<u8>) -> RecordEnvelope {
        let envelope = RecordEnvelope::new(kind, id, self.clock.tick(), payload);
        self.record_local_change(envelope.clone());
        envelope
    }

    /// Deletes a record by writing a tombstone stamped with the next tick.
    pub fn delete(&self, kind: RecordKind, id: Uuid) -> RecordEnvelope {
        let envelope = RecordEnvelope::tombstone(kind, id, self.clock.tick());
        self.record_local_change(envelope.clone());
        envelope
    }

    /// Records an already-stamped local write and queues it for push.
    ///
    /// A newer pending write for the same identity replaces the older one.
    pub fn record_local_change(&self, envelope: RecordEnvelope) {
        self.clock.observe(envelope.updated_at);

        let mut state = self.state.write();
        let identity = envelope.identity();
        state.pending.retain(|p| p.identity() != identity);
        state.pending.push(envelope.clone());
        state.records.insert(identity, envelope);
    }

    /// Returns the current version of a record, tombstones included.
    pub fn get(&self, kind: RecordKind, id: Uuid) -> Option<RecordEnvelope> {
        self.state
            .read()
            .records
            .get(&RecordIdentity::new(kind, id))
            .cloned()
    }

    /// Returns all non-deleted records in canonical order.
    pub fn live_records(&self) -> SyncBatch {
        let mut live: SyncBatch = self
            .state
            .read()
            .records
            .values()
            .filter(|e| !e.is_deleted)
            .cloned()
            .collect();
        sort_by_kind(&mut live);
        live
    }

    /// Returns every record, tombstones included, in canonical order.
    pub fn snapshot(&self) -> SyncBatch {
        let mut all: SyncBatch = self.state.read().records.values().cloned().collect();
        sort_by_kind(&mut all);
        all
    }

    /// Returns the number of unpushed writes.
    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Returns the store's clock.
    pub fn clock(&self) -> &MonotonicClock {
        &self.clock
    }
}

impl LocalChangeStore for MemoryChangeStore {
    fn pending_push_batch(&self) -> SyncResult<SyncBatch> {
        Ok(self.state.read().pending.clone())
    }

    fn mark_batch_as_pushed(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        let mut state = self.state.write();
        state.pending.retain(|p| !batch.contains(p));
        Ok(())
    }

    fn apply_pulled_batch(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        let mut state = self.state.write();
        for envelope in batch {
            self.clock.observe(envelope.updated_at);
            let identity = envelope.identity();
            let accept = match state.records.get(&identity) {
                Some(current) => resolve_with_tombstones(current, envelope).is_remote(),
                None => true,
            };
            if accept {
                state.records.insert(identity, envelope.clone());
            }
        }
        Ok(())
    }
}

/// A [`MemoryChangeStore`] that also records every applied batch.
///
/// Test double for asserting what an orchestrator handed to
/// `apply_pulled_batch`, and in which order.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryChangeStore,
    applied: Mutex<Vec<SyncBatch>>,
}

impl RecordingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every batch applied so far.
    pub fn applied_batches(&self) -> Vec<SyncBatch> {
        self.applied.lock().clone()
    }
}

impl Deref for RecordingStore {
    type Target = MemoryChangeStore;

    fn deref(&self) -> &MemoryChangeStore {
        &self.inner
    }
}

impl LocalChangeStore for RecordingStore {
    fn pending_push_batch(&self) -> SyncResult<SyncBatch> {
        self.inner.pending_push_batch()
    }

    fn mark_batch_as_pushed(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        self.inner.mark_batch_as_pushed(batch)
    }

    fn apply_pulled_batch(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        self.inner.apply_pulled_batch(batch)?;
        self.applied.lock().push(batch.to_vec());
        Ok(())
    }
}
