//! Property-based test generators using proptest.
//!
//! Ids and timestamps are drawn from small pools so generated batches
//! collide on identity and tie on `updated_at` often enough to exercise
//! conflict resolution.

use proptest::prelude::*;
use tripsync_protocol::{RecordEnvelope, RecordKind, SyncBatch, Timestamp};
use uuid::Uuid;

/// Strategy for record kinds.
pub fn record_kind_strategy() -> impl Strategy<Value = RecordKind> {
    prop::sample::select(RecordKind::ALL.to_vec())
}

/// Strategy for ids drawn from a pool of `pool` values.
pub fn pooled_id_strategy(pool: u128) -> impl Strategy<Value = Uuid> {
    (1..=pool.max(1)).prop_map(Uuid::from_u128)
}

/// Strategy for arbitrary ids.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for timestamps in `0..max`.
pub fn timestamp_strategy(max: i64) -> impl Strategy<Value = Timestamp> {
    (0..max.max(1)).prop_map(Timestamp::from_millis)
}

/// Strategy for short payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..16)
}

/// Strategy for envelopes with colliding identities and timestamps.
pub fn envelope_strategy() -> impl Strategy<Value = RecordEnvelope> {
    (
        record_kind_strategy(),
        pooled_id_strategy(8),
        timestamp_strategy(20),
        payload_strategy(),
        prop::bool::weighted(0.2),
    )
        .prop_map(|(kind, id, updated_at, payload, is_deleted)| RecordEnvelope {
            kind,
            id,
            updated_at,
            payload: if is_deleted { Vec::new() } else { payload },
            is_deleted,
        })
}

/// Strategy for batches of up to `max_len` envelopes.
pub fn batch_strategy(max_len: usize) -> impl Strategy<Value = SyncBatch> {
    prop::collection::vec(envelope_strategy(), 0..=max_len)
}

/// Strategy for two versions of the same identity.
pub fn conflicting_pair_strategy() -> impl Strategy<Value = (RecordEnvelope, RecordEnvelope)> {
    (envelope_strategy(), envelope_strategy()).prop_map(|(local, mut remote)| {
        remote.kind = local.kind;
        remote.id = local.id;
        (local, remote)
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn tombstones_have_empty_payload(env in envelope_strategy()) {
            prop_assert!(!env.is_deleted || env.payload.is_empty());
        }

        #[test]
        fn conflicting_pairs_share_identity((a, b) in conflicting_pair_strategy()) {
            prop_assert_eq!(a.identity(), b.identity());
        }

        #[test]
        fn pooled_ids_stay_in_pool(id in pooled_id_strategy(4)) {
            let n = id.as_u128();
            prop_assert!((1..=4).contains(&n));
        }
    }
}
