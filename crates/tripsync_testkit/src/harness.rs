//! Multi-device simulation harness.
//!
//! A [`Cluster`] wires several [`Device`]s to one in-process
//! [`SyncServer`] through the real HTTP transport and a loopback client.
//!
//! Devices stamp writes from one shared [`MonotonicClock`], standing in for
//! synchronized wall clocks. The pull cursor is the newest `updated_at` a
//! device has seen, so a record that reaches the server after a newer one
//! was already pulled is skipped by that puller. Scenarios that expect
//! convergence must therefore push writes in timestamp order, which holds
//! whenever each device syncs before another device writes.

use std::sync::Arc;
use tripsync_engine::{
    HttpTransport, LoopbackClient, MemoryChangeStore, MemoryCursorStore, SyncConfig,
    SyncOrchestrator, SyncResult, SyncRunReport,
};
use tripsync_protocol::{MonotonicClock, RecordEnvelope, RecordKind, SyncBatch};
use tripsync_server::{ServerConfig, SyncServer};
use uuid::Uuid;

/// Transport used by harness devices.
pub type DeviceTransport = HttpTransport<LoopbackClient<Arc<SyncServer>>>;

/// Orchestrator used by harness devices.
pub type DeviceOrchestrator =
    SyncOrchestrator<DeviceTransport, MemoryChangeStore, MemoryCursorStore>;

/// One simulated device.
pub struct Device {
    name: String,
    clock: Arc<MonotonicClock>,
    sync: DeviceOrchestrator,
}

impl Device {
    /// Creates a device connected to `server`.
    pub fn new(
        name: impl Into<String>,
        server: &Arc<SyncServer>,
        config: &SyncConfig,
        clock: Arc<MonotonicClock>,
    ) -> Self {
        let client = LoopbackClient::new(Arc::clone(server));
        let sync = SyncOrchestrator::new(
            HttpTransport::new(config, client),
            MemoryChangeStore::new(),
            MemoryCursorStore::new(),
        );
        Self {
            name: name.into(),
            clock,
            sync,
        }
    }

    /// Returns the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes a live record.
    pub fn put(&self, kind: RecordKind, id: Uuid, payload: Vec<u8>) -> RecordEnvelope {
        self.record(RecordEnvelope::new(kind, id, self.clock.tick(), payload))
    }

    /// Deletes a record.
    pub fn delete(&self, kind: RecordKind, id: Uuid) -> RecordEnvelope {
        self.record(RecordEnvelope::tombstone(kind, id, self.clock.tick()))
    }

    /// Records an explicitly stamped local write.
    pub fn record(&self, envelope: RecordEnvelope) -> RecordEnvelope {
        self.clock.observe(envelope.updated_at);
        self.sync.store().record_local_change(envelope.clone());
        envelope
    }

    /// Runs one sync cycle.
    pub fn sync(&self) -> SyncResult<SyncRunReport> {
        self.sync.run_once()
    }

    /// Cuts the device off from the server.
    pub fn go_offline(&self) {
        self.sync.transport().client().set_healthy(false);
    }

    /// Reconnects the device.
    pub fn go_online(&self) {
        self.sync.transport().client().set_healthy(true);
    }

    /// Returns true if the device can reach the server.
    pub fn is_online(&self) -> bool {
        self.sync.transport().is_connected()
    }

    /// Returns the local store.
    pub fn store(&self) -> &MemoryChangeStore {
        self.sync.store()
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> &DeviceOrchestrator {
        &self.sync
    }

    /// Returns every local record, tombstones included, in canonical order.
    pub fn snapshot(&self) -> SyncBatch {
        self.sync.store().snapshot()
    }
}

/// Several devices sharing one server.
pub struct Cluster {
    server: Arc<SyncServer>,
    devices: Vec<Device>,
}

impl Cluster {
    /// Creates a cluster of `devices` devices with default limits.
    pub fn new(devices: usize) -> Self {
        Self::with_config(devices, ServerConfig::default(), 500, 500)
    }

    /// Creates a cluster with explicit server limits and client batch sizes.
    pub fn with_config(
        devices: usize,
        server_config: ServerConfig,
        pull_page_size: u32,
        push_batch_size: u32,
    ) -> Self {
        let server = Arc::new(SyncServer::new(server_config));
        let clock = Arc::new(MonotonicClock::new());
        let devices = (0..devices)
            .map(|i| {
                let config = SyncConfig::new(Uuid::new_v4(), "loopback://")
                    .with_sync_enabled(true)
                    .with_pull_page_size(pull_page_size)
                    .with_push_batch_size(push_batch_size);
                Device::new(format!("device-{}", i), &server, &config, Arc::clone(&clock))
            })
            .collect();
        Self { server, devices }
    }

    /// Returns the server.
    pub fn server(&self) -> &Arc<SyncServer> {
        &self.server
    }

    /// Returns device `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn device(&self, index: usize) -> &Device {
        &self.devices[index]
    }

    /// Returns all devices.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Runs one cycle on every online device, in order.
    pub fn sync_all(&self) -> SyncResult<Vec<SyncRunReport>> {
        self.devices
            .iter()
            .filter(|d| d.is_online())
            .map(Device::sync)
            .collect()
    }

    /// Runs two rounds of [`sync_all`](Self::sync_all).
    pub fn converge(&self) -> SyncResult<Vec<SyncRunReport>> {
        let mut reports = self.sync_all()?;
        reports.extend(self.sync_all()?);
        Ok(reports)
    }

    /// Returns true if every device holds exactly the server's records.
    pub fn is_converged(&self) -> bool {
        let expected = self.server.store().snapshot();
        self.devices.iter().all(|d| d.snapshot() == expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_have_distinct_names() {
        let cluster = Cluster::new(2);
        assert_eq!(cluster.device(0).name(), "device-0");
        assert_eq!(cluster.device(1).name(), "device-1");
    }

    #[test]
    fn shared_clock_never_ties() {
        let cluster = Cluster::new(2);
        let a = cluster.device(0).put(RecordKind::Trip, Uuid::new_v4(), vec![]);
        let b = cluster.device(1).put(RecordKind::Trip, Uuid::new_v4(), vec![]);
        assert!(b.updated_at > a.updated_at);
    }

    #[test]
    fn offline_devices_are_skipped() {
        let cluster = Cluster::new(2);
        cluster.device(1).go_offline();
        assert!(!cluster.device(1).is_online());

        let reports = cluster.sync_all().unwrap();
        assert_eq!(reports.len(), 1);

        cluster.device(1).go_online();
        assert_eq!(cluster.sync_all().unwrap().len(), 2);
    }
}
