//! Simulate command implementation.
//!
//! Runs several devices against one in-process server over the loopback
//! HTTP transport and reports whether they converged.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tripsync_engine::{
    HttpTransport, LoopbackClient, MemoryChangeStore, MemoryCursorStore, SyncConfig,
    SyncOrchestrator, SyncRunReport,
};
use tripsync_protocol::{MonotonicClock, RecordEnvelope, RecordKind};
use tripsync_server::{ServerConfig, SyncServer};
use uuid::Uuid;

/// Sync rounds run after the initial writes.
const SETTLE_ROUNDS: usize = 2;

type SimTransport = HttpTransport<LoopbackClient<Arc<SyncServer>>>;
type SimOrchestrator = SyncOrchestrator<SimTransport, MemoryChangeStore, MemoryCursorStore>;

/// Simulation result.
#[derive(Debug, Serialize)]
pub struct SimulationResult {
    /// Number of devices.
    pub devices: usize,
    /// Records written per device, excluding shared edits.
    pub records_per_device: usize,
    /// Whether devices wrote everything before the first sync.
    pub seed_offline: bool,
    /// Records held by the server at the end.
    pub server_records: usize,
    /// Sync cycles run.
    pub cycles: usize,
    /// Records pushed across all cycles.
    pub pushed: usize,
    /// Records pulled across all cycles.
    pub pulled: usize,
    /// Records applied across all cycles.
    pub applied: usize,
    /// Pulled records recognised as echoes.
    pub echoes_suppressed: usize,
    /// Pulled records dropped as stale.
    pub stale_dropped: usize,
    /// True if every device holds exactly the server's records.
    pub converged: bool,
    /// Wall time in milliseconds.
    pub duration_ms: u128,
}

impl SimulationResult {
    fn absorb(&mut self, report: &SyncRunReport) {
        self.cycles += 1;
        self.pushed += report.pushed;
        self.pulled += report.pulled;
        self.applied += report.applied;
        self.echoes_suppressed += report.echoes_suppressed;
        self.stale_dropped += report.stale_dropped;
    }
}

/// Runs a simulation and returns its result.
pub fn simulate(
    devices: usize,
    records: usize,
    seed_offline: bool,
) -> Result<SimulationResult, Box<dyn std::error::Error>> {
    if devices == 0 {
        return Err("at least one device is required".into());
    }

    let start = Instant::now();
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let clock = MonotonicClock::new();
    let shared_id = Uuid::new_v4();

    let fleet: Vec<SimOrchestrator> = (0..devices)
        .map(|_| {
            let config = SyncConfig::new(Uuid::new_v4(), "loopback://").with_sync_enabled(true);
            let client = LoopbackClient::new(Arc::clone(&server));
            SyncOrchestrator::new(
                HttpTransport::new(&config, client),
                MemoryChangeStore::new(),
                MemoryCursorStore::new(),
            )
        })
        .collect();

    let mut result = SimulationResult {
        devices,
        records_per_device: records,
        seed_offline,
        server_records: 0,
        cycles: 0,
        pushed: 0,
        pulled: 0,
        applied: 0,
        echoes_suppressed: 0,
        stale_dropped: 0,
        converged: false,
        duration_ms: 0,
    };

    // Writes are stamped from one clock in device order, so pushes reach
    // the server in timestamp order in both modes.
    for (index, device) in fleet.iter().enumerate() {
        for n in 0..records {
            let kind = RecordKind::ALL[n % RecordKind::ALL.len()];
            let payload = format!("device {} record {}", index, n).into_bytes();
            let envelope = RecordEnvelope::new(kind, Uuid::new_v4(), clock.tick(), payload);
            device.store().record_local_change(envelope);
        }
        let edit = format!("shared edit from device {}", index).into_bytes();
        let envelope = RecordEnvelope::new(RecordKind::Trip, shared_id, clock.tick(), edit);
        device.store().record_local_change(envelope);

        if !seed_offline {
            result.absorb(&device.run_once()?);
        }
    }

    for round in 0..SETTLE_ROUNDS {
        tracing::debug!(round, "settle round");
        for device in &fleet {
            result.absorb(&device.run_once()?);
        }
    }

    let expected = server.store().snapshot();
    result.server_records = expected.len();
    result.converged = fleet.iter().all(|d| d.store().snapshot() == expected);
    result.duration_ms = start.elapsed().as_millis();

    tracing::info!(
        devices,
        server_records = result.server_records,
        converged = result.converged,
        "simulation finished"
    );
    Ok(result)
}

/// Runs the simulate command.
pub fn run(
    devices: usize,
    records: usize,
    seed_offline: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = simulate(devices, records, seed_offline)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    if result.converged {
        Ok(())
    } else {
        Err("devices did not converge".into())
    }
}

fn print_text_output(result: &SimulationResult) {
    println!("Sync Simulation");
    println!("===============");
    println!();
    println!("Setup:");
    println!("  Devices:            {}", result.devices);
    println!("  Records per device: {}", result.records_per_device);
    println!("  Seed offline:       {}", result.seed_offline);
    println!();
    println!("Traffic ({} cycles):", result.cycles);
    println!("  Pushed:             {}", result.pushed);
    println!("  Pulled:             {}", result.pulled);
    println!("  Applied:            {}", result.applied);
    println!("  Echoes suppressed:  {}", result.echoes_suppressed);
    println!("  Stale dropped:      {}", result.stale_dropped);
    println!();
    println!("Outcome:");
    println!("  Server records:     {}", result.server_records);
    println!(
        "  Converged:          {}",
        if result.converged { "yes" } else { "NO" }
    );
    println!("  Duration:           {} ms", result.duration_ms);
}
