//! Sync orchestrator: one push-then-pull cycle.

use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::store::LocalChangeStore;
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};
use tripsync_protocol::{
    dedupe_by_identity, lww, max_updated_at, ConflictResolution, RecordEnvelope, RecordIdentity,
    SyncBatch, Timestamp,
};

/// The current state of the orchestrator.
///
/// Observation only; the state never influences a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No cycle has run yet.
    Idle,
    /// Fetching and pushing pending local changes.
    Pushing,
    /// Reading the cursor and pulling remote changes.
    Pulling,
    /// Applying pulled records and advancing the cursor.
    Applying,
    /// The last cycle completed.
    Synced,
    /// The last cycle aborted with an error.
    Error,
}

impl SyncState {
    /// Returns true while a cycle is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Pushing | SyncState::Pulling | SyncState::Applying
        )
    }
}

/// Cumulative statistics across cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that completed.
    pub cycles_completed: u64,
    /// Cycles that aborted.
    pub cycles_failed: u64,
    /// Envelopes pushed.
    pub records_pushed: u64,
    /// Envelopes pulled, before filtering.
    pub records_pulled: u64,
    /// Envelopes applied locally.
    pub records_applied: u64,
    /// Pulled envelopes dropped as echoes of our own pushes.
    pub echoes_suppressed: u64,
    /// Pulled envelopes dropped as older than a pending local write.
    pub stale_dropped: u64,
    /// When the last cycle completed.
    pub last_sync_time: Option<Instant>,
    /// Message of the last abort, cleared by the next success.
    pub last_error: Option<String>,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunReport {
    /// Size of the pending batch pushed.
    pub pushed: usize,
    /// Size of the pulled batch, before deduplication and echo stripping.
    pub pulled: usize,
    /// Number of records passed to `apply_pulled_batch`.
    pub applied: usize,
    /// Cursor after the cycle.
    pub cursor: Option<Timestamp>,
    /// Pulled records identical to something just pushed.
    pub echoes_suppressed: usize,
    /// Pulled records older than a just-pushed local version.
    pub stale_dropped: usize,
    /// Wall time of the cycle.
    pub duration: Duration,
}

/// Cooperative cancellation flag shared with an orchestrator.
///
/// The orchestrator checks the flag between steps. The flag is cleared when
/// a cycle starts, so cancelling an idle orchestrator has no effect on the
/// next cycle.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation of the running cycle.
    ///
    /// Only a cycle already in flight observes the request. `run_once`
    /// clears the flag as it starts, so a cancel issued while idle is
    /// discarded rather than aborting the next cycle.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Pulled records split by echo stripping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoOutcome {
    /// Records to apply, in input order.
    pub survivors: SyncBatch,
    /// Number of exact echoes dropped.
    pub echoes: usize,
    /// Number of records dropped because a pending write is newer.
    pub stale: usize,
}

/// Removes pulled records that carry no new information.
///
/// A pulled record exactly equal to a pending entry is an echo and is
/// dropped; each pending entry cancels at most one pulled record. A pulled
/// record sharing an identity with a pending entry but differing from it is
/// resolved with value-level LWW, pending as local: if the pending version
/// wins the pulled record is dropped as stale, otherwise (including ties) it
/// survives. When several pending entries share an identity the newest is
/// used.
pub fn strip_echoes(deduped: SyncBatch, pending: &[RecordEnvelope]) -> EchoOutcome {
    let mut unmatched: HashMap<&RecordEnvelope, usize> = HashMap::with_capacity(pending.len());
    let mut newest: HashMap<RecordIdentity, &RecordEnvelope> = HashMap::with_capacity(pending.len());
    for entry in pending {
        *unmatched.entry(entry).or_default() += 1;
        newest
            .entry(entry.identity())
            .and_modify(|current| {
                if entry.updated_at >= current.updated_at {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    let mut outcome = EchoOutcome::default();
    for record in deduped {
        if let Some(count) = unmatched.get_mut(&record) {
            if *count > 0 {
                *count -= 1;
                outcome.echoes += 1;
                continue;
            }
        }

        if let Some(local) = newest.get(&record.identity()) {
            if lww(local.updated_at, record.updated_at) == ConflictResolution::KeepLocal {
                outcome.stale += 1;
                continue;
            }
        }

        outcome.survivors.push(record);
    }
    outcome
}

/// Runs synchronization cycles between a local store and a remote transport.
///
/// Each [`run_once`](Self::run_once) is a single, non-looping cycle; callers
/// schedule repetition and must not overlap cycles on the same store (see
/// [`SyncGate`](crate::SyncGate)). The orchestrator holds no lock across a
/// cycle and performs no retry or rollback: any collaborator error aborts
/// the cycle and is returned unchanged.
pub struct SyncOrchestrator<T: SyncTransport, S: LocalChangeStore, C: CursorStore> {
    transport: Arc<T>,
    store: Arc<S>,
    cursor: Arc<C>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancel: CancelHandle,
}

impl<T: SyncTransport, S: LocalChangeStore, C: CursorStore> SyncOrchestrator<T, S, C> {
    /// Creates an orchestrator owning its collaborators.
    pub fn new(transport: T, store: S, cursor: C) -> Self {
        Self::with_shared(Arc::new(transport), Arc::new(store), Arc::new(cursor))
    }

    /// Creates an orchestrator over shared collaborators.
    pub fn with_shared(transport: Arc<T>, store: Arc<S>, cursor: Arc<C>) -> Self {
        Self {
            transport,
            store,
            cursor,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancel: CancelHandle::default(),
        }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the local change store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the cursor store.
    pub fn cursor_store(&self) -> &Arc<C> {
        &self.cursor
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the cumulative stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns a handle that cancels the running cycle.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Runs one synchronization cycle.
    ///
    /// Push pending, mark pushed, read cursor, pull, deduplicate, strip
    /// echoes, apply survivors, then advance the cursor to the newest pulled
    /// timestamp if anything was pulled.
    pub fn run_once(&self) -> SyncResult<SyncRunReport> {
        let span = info_span!("sync_cycle");
        let _enter = span.enter();
        let start = Instant::now();
        self.cancel.reset();

        match self.cycle(start) {
            Ok(report) => {
                self.set_state(SyncState::Synced);
                self.record_success(&report);
                info!(
                    pushed = report.pushed,
                    pulled = report.pulled,
                    applied = report.applied,
                    echoes = report.echoes_suppressed,
                    stale = report.stale_dropped,
                    cursor = ?report.cursor.map(|t| t.as_millis()),
                    "sync cycle complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(SyncState::Error);
                {
                    let mut stats = self.stats.write();
                    stats.cycles_failed += 1;
                    stats.last_error = Some(e.to_string());
                }
                warn!(error = %e, "sync cycle aborted");
                Err(e)
            }
        }
    }

    fn cycle(&self, start: Instant) -> SyncResult<SyncRunReport> {
        // Push
        self.set_state(SyncState::Pushing);
        let pending = self.store.pending_push_batch()?;
        debug!(count = pending.len(), "fetched pending batch");

        if !pending.is_empty() {
            self.transport.push(&pending)?;
            debug!(count = pending.len(), "pushed");
            // A cancel here leaves the batch pending; re-pushing is a no-op.
            self.cancel.check()?;
            self.store.mark_batch_as_pushed(&pending)?;
            debug!("marked batch as pushed");
        }
        self.cancel.check()?;

        // Pull
        self.set_state(SyncState::Pulling);
        let current = self.cursor.last_pulled_at()?;
        debug!(cursor = ?current.map(|t| t.as_millis()), "read cursor");

        let pulled = self.transport.pull(current)?;
        let pulled_count = pulled.len();
        let observed = max_updated_at(&pulled);
        debug!(count = pulled_count, "pulled");
        self.cancel.check()?;

        // Filter and apply
        self.set_state(SyncState::Applying);
        let deduped = dedupe_by_identity(pulled);
        let EchoOutcome {
            survivors,
            echoes,
            stale,
        } = strip_echoes(deduped, &pending);
        debug!(
            survivors = survivors.len(),
            echoes, stale, "stripped echoes"
        );

        if !survivors.is_empty() {
            self.store.apply_pulled_batch(&survivors)?;
            debug!(count = survivors.len(), "applied pulled batch");
        }

        let cursor = match observed {
            Some(newest) => {
                self.cursor.save(Some(newest))?;
                debug!(cursor = newest.as_millis(), "advanced cursor");
                Some(newest)
            }
            None => current,
        };

        Ok(SyncRunReport {
            pushed: pending.len(),
            pulled: pulled_count,
            applied: survivors.len(),
            cursor,
            echoes_suppressed: echoes,
            stale_dropped: stale,
            duration: start.elapsed(),
        })
    }

    fn record_success(&self, report: &SyncRunReport) {
        let mut stats = self.stats.write();
        stats.cycles_completed += 1;
        stats.records_pushed += report.pushed as u64;
        stats.records_pulled += report.pulled as u64;
        stats.records_applied += report.applied as u64;
        stats.echoes_suppressed += report.echoes_suppressed as u64;
        stats.stale_dropped += report.stale_dropped as u64;
        stats.last_sync_time = Some(Instant::now());
        stats.last_error = None;
    }
}
