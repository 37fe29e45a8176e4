//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tripsync_protocol::{RecordEnvelope, SyncBatch, Timestamp};

/// A sync transport moves envelopes to and from the remote record store.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, mock for testing, etc.).
pub trait SyncTransport: Send + Sync {
    /// Pushes local changes to the remote store.
    ///
    /// Re-pushing an identical envelope must be a no-op overwrite on the
    /// remote side, since an interrupted cycle pushes the same batch again.
    fn push(&self, batch: &[RecordEnvelope]) -> SyncResult<()>;

    /// Pulls every record with `updated_at` strictly greater than `since`,
    /// or every record if `since` is `None`.
    ///
    /// The result must be complete: any pagination happens inside the
    /// implementation.
    fn pull(&self, since: Option<Timestamp>) -> SyncResult<SyncBatch>;
}

impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    fn push(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        (**self).push(batch)
    }

    fn pull(&self, since: Option<Timestamp>) -> SyncResult<SyncBatch> {
        (**self).pull(since)
    }
}

/// A mock transport for testing.
///
/// Pull results are served from a queue (empty batch once drained); pushes
/// and pull cursors are recorded for inspection. Failures can be injected
/// for the next push or pull.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    pull_queue: Mutex<VecDeque<SyncBatch>>,
    pushed: Mutex<Vec<SyncBatch>>,
    pull_calls: Mutex<Vec<Option<Timestamp>>>,
    push_failure: Mutex<Option<SyncError>>,
    pull_failure: Mutex<Option<SyncError>>,
}

impl MockTransport {
    /// Creates a new connected mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            pull_queue: Mutex::new(VecDeque::new()),
            pushed: Mutex::new(Vec::new()),
            pull_calls: Mutex::new(Vec::new()),
            push_failure: Mutex::new(None),
            pull_failure: Mutex::new(None),
        }
    }

    /// Queues the batch returned by a future pull.
    pub fn queue_pull(&self, batch: SyncBatch) {
        self.pull_queue.lock().push_back(batch);
    }

    /// Makes the next push fail with `error`.
    pub fn fail_next_push(&self, error: SyncError) {
        *self.push_failure.lock() = Some(error);
    }

    /// Makes the next pull fail with `error`.
    pub fn fail_next_pull(&self, error: SyncError) {
        *self.pull_failure.lock() = Some(error);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns every batch pushed so far.
    pub fn pushed_batches(&self) -> Vec<SyncBatch> {
        self.pushed.lock().clone()
    }

    /// Returns the `since` argument of every pull so far.
    pub fn pull_calls(&self) -> Vec<Option<Timestamp>> {
        self.pull_calls.lock().clone()
    }

    /// Returns the number of push calls, including failed ones.
    pub fn push_count(&self) -> usize {
        self.pushed.lock().len()
    }

    /// Returns the number of pull calls, including failed ones.
    pub fn pull_count(&self) -> usize {
        self.pull_calls.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for MockTransport {
    fn push(&self, batch: &[RecordEnvelope]) -> SyncResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        self.pushed.lock().push(batch.to_vec());
        match self.push_failure.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn pull(&self, since: Option<Timestamp>) -> SyncResult<SyncBatch> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        self.pull_calls.lock().push(since);
        if let Some(error) = self.pull_failure.lock().take() {
            return Err(error);
        }
        Ok(self.pull_queue.lock().pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripsync_protocol::RecordKind;
    use uuid::Uuid;

    fn sample() -> RecordEnvelope {
        RecordEnvelope::new(
            RecordKind::Place,
            Uuid::new_v4(),
            Timestamp::from_millis(1),
            vec![1],
        )
    }

    #[test]
    fn mock_transport_serves_queue_then_empty() {
        let transport = MockTransport::new();
        transport.queue_pull(vec![sample()]);

        assert_eq!(transport.pull(None).unwrap().len(), 1);
        assert!(transport
            .pull(Some(Timestamp::from_millis(1)))
            .unwrap()
            .is_empty());
        assert_eq!(
            transport.pull_calls(),
            vec![None, Some(Timestamp::from_millis(1))]
        );
    }

    #[test]
    fn mock_transport_records_pushes() {
        let transport = MockTransport::new();
        let batch = vec![sample(), sample()];
        transport.push(&batch).unwrap();

        assert_eq!(transport.push_count(), 1);
        assert_eq!(transport.pushed_batches()[0], batch);
    }

    #[test]
    fn mock_transport_injected_failure_is_one_shot() {
        let transport = MockTransport::new();
        transport.fail_next_pull(SyncError::transport_retryable("timeout"));

        assert!(matches!(
            transport.pull(None),
            Err(SyncError::Transport { .. })
        ));
        assert!(transport.pull(None).is_ok());
    }

    #[test]
    fn mock_transport_not_connected_error() {
        let transport = MockTransport::new();
        transport.set_connected(false);

        assert!(matches!(transport.push(&[]), Err(SyncError::NotConnected)));
        assert!(matches!(transport.pull(None), Err(SyncError::NotConnected)));
        assert_eq!(transport.pull_count(), 0);
    }
}
