//! Multi-device convergence scenarios.

use tripsync_server::ServerConfig;
use tripsync_testkit::prelude::*;

#[test]
fn independent_writes_reach_every_device() {
    let cluster = Cluster::new(3);
    for (i, device) in cluster.devices().iter().enumerate() {
        for n in 0..4u128 {
            device.put(RecordKind::Place, fixed_id(i as u128 * 100 + n), vec![i as u8]);
        }
        device.sync().unwrap();
    }

    cluster.converge().unwrap();
    assert!(cluster.is_converged());
    assert_eq!(cluster.server().store().len(), 12);
}

#[test]
fn last_writer_wins_everywhere() {
    let cluster = Cluster::new(3);
    let id = fixed_id(7);
    for (i, device) in cluster.devices().iter().enumerate() {
        device.put(RecordKind::Trip, id, format!("edit {}", i).into_bytes());
        device.sync().unwrap();
    }

    cluster.converge().unwrap();
    assert!(cluster.is_converged());
    for device in cluster.devices() {
        let current = device.store().get(RecordKind::Trip, id).unwrap();
        assert_eq!(current.payload, b"edit 2");
    }
}

#[test]
fn deletes_propagate_and_are_not_resurrected() {
    let cluster = Cluster::new(2);
    let id = fixed_id(1);
    cluster.device(0).put(RecordKind::Spot, id, b"alive".to_vec());
    cluster.converge().unwrap();

    cluster.device(1).delete(RecordKind::Spot, id);
    cluster.device(1).sync().unwrap();

    // A stale write stamped at the tombstone's timestamp loses the tie.
    let tomb = cluster.server().store().snapshot()[0].clone();
    cluster.device(0).record(live(
        RecordKind::Spot,
        id,
        tomb.updated_at.as_millis(),
        b"zombie",
    ));

    cluster.converge().unwrap();
    assert!(cluster.is_converged());
    for device in cluster.devices() {
        assert!(device.store().live_records().is_empty());
    }
}

#[test]
fn offline_device_catches_up() {
    let cluster = Cluster::new(3);
    cluster.device(2).go_offline();

    cluster.device(0).put(RecordKind::Visit, fixed_id(1), b"v".to_vec());
    cluster.device(0).sync().unwrap();
    cluster.device(1).put(RecordKind::Media, fixed_id(2), b"m".to_vec());
    cluster.device(1).sync().unwrap();

    assert!(cluster.device(2).sync().is_err());
    assert!(cluster.device(2).snapshot().is_empty());

    cluster.device(2).go_online();
    cluster.device(2).put(RecordKind::Tag, fixed_id(3), b"t".to_vec());
    cluster.converge().unwrap();

    assert!(cluster.is_converged());
    assert_eq!(cluster.server().store().len(), 3);
}

#[test]
fn small_pages_and_chunks_still_converge() {
    let cluster = Cluster::with_config(
        2,
        ServerConfig::new().with_max_pull_batch(3).with_max_push_batch(2),
        100,
        2,
    );
    for n in 0..10u128 {
        cluster.device(0).put(RecordKind::Place, fixed_id(n), vec![n as u8]);
    }

    let reports = cluster.converge().unwrap();
    assert_eq!(reports[0].pushed, 10);
    assert_eq!(reports[0].echoes_suppressed, 10);
    assert_eq!(reports[1].applied, 10);
    assert!(cluster.is_converged());
}

#[test]
fn second_round_is_quiet() {
    let cluster = Cluster::new(2);
    cluster.device(0).put(RecordKind::Trip, fixed_id(1), vec![1]);
    cluster.device(0).sync().unwrap();
    cluster.device(1).put(RecordKind::Trip, fixed_id(2), vec![2]);
    cluster.converge().unwrap();

    let reports = cluster.sync_all().unwrap();
    assert!(reports.iter().all(|r| r.pushed == 0 && r.applied == 0));
}
