//! Benchmark utilities.

use tripsync_protocol::{RecordEnvelope, RecordKind, SyncBatch, Timestamp};
use uuid::Uuid;

/// Deterministic payload of the specified size.
pub fn payload(seed: u64, size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (seed.wrapping_mul(31).wrapping_add(i as u64) % 251) as u8)
        .collect()
}

/// Generate a batch of `count` envelopes spread over `identities` ids.
///
/// Every fifth envelope is a tombstone. Timestamps increase with the index,
/// shifted by `offset` so two batches can overlap.
pub fn generate_batch(
    count: usize,
    identities: usize,
    offset: i64,
    payload_size: usize,
) -> SyncBatch {
    let identities = identities.max(1);
    (0..count)
        .map(|i| {
            let slot = i % identities;
            let kind = RecordKind::ALL[slot % RecordKind::ALL.len()];
            let id = Uuid::from_u128(slot as u128 + 1);
            let at = Timestamp::from_millis(offset + i as i64);
            if i % 5 == 4 {
                RecordEnvelope::tombstone(kind, id, at)
            } else {
                RecordEnvelope::new(kind, id, at, payload(i as u64, payload_size))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_reuses_identities() {
        let batch = generate_batch(20, 4, 0, 8);
        assert_eq!(batch.len(), 20);
        assert_eq!(batch[0].identity(), batch[4].identity());
        assert!(batch[4].is_deleted);
        assert!(batch[4].payload.is_empty());
    }
}
