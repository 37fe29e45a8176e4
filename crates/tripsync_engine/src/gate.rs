//! Feature-flag gate and single-flight guard around the orchestrator.

use crate::config::FeatureFlagProvider;
use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::orchestrator::{SyncOrchestrator, SyncRunReport};
use crate::store::LocalChangeStore;
use crate::transport::SyncTransport;
use parking_lot::Mutex;
use tracing::debug;

/// Runs sync cycles only when the user has opted in, one at a time.
pub struct SyncGate<F, T, S, C>
where
    F: FeatureFlagProvider,
    T: SyncTransport,
    S: LocalChangeStore,
    C: CursorStore,
{
    flags: F,
    orchestrator: SyncOrchestrator<T, S, C>,
    in_flight: Mutex<()>,
}

impl<F, T, S, C> SyncGate<F, T, S, C>
where
    F: FeatureFlagProvider,
    T: SyncTransport,
    S: LocalChangeStore,
    C: CursorStore,
{
    /// Wraps an orchestrator behind a feature flag.
    pub fn new(flags: F, orchestrator: SyncOrchestrator<T, S, C>) -> Self {
        Self {
            flags,
            orchestrator,
            in_flight: Mutex::new(()),
        }
    }

    /// Returns the flag provider.
    pub fn flags(&self) -> &F {
        &self.flags
    }

    /// Returns the wrapped orchestrator.
    pub fn orchestrator(&self) -> &SyncOrchestrator<T, S, C> {
        &self.orchestrator
    }

    /// Runs one cycle if sync is enabled.
    ///
    /// Returns `Ok(None)` without touching any collaborator when the flag is
    /// off. Returns [`SyncError::AlreadyRunning`] if another call through
    /// this gate is still in its cycle. Cycle errors are propagated
    /// unchanged.
    pub fn run_if_enabled(&self) -> SyncResult<Option<SyncRunReport>> {
        if !self.flags.is_sync_enabled() {
            debug!("sync disabled, skipping cycle");
            return Ok(None);
        }

        let _guard = self.in_flight.try_lock().ok_or(SyncError::AlreadyRunning)?;
        self.orchestrator.run_once().map(Some)
    }
}
