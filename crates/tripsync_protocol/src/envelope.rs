//! Record envelopes, the unit of synchronization.

use crate::kind::RecordKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Logical timestamp in milliseconds since the Unix epoch.
///
/// `updated_at` is the sole ordering key for conflict resolution, so a
/// writer must produce strictly increasing values (see
/// [`MonotonicClock`](crate::MonotonicClock)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from milliseconds since the epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns milliseconds since the epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time.
    ///
    /// Clocks set before the epoch read as [`Timestamp::EPOCH`].
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(Self::since_epoch)
            .unwrap_or(Self::EPOCH)
    }

    /// Converts a duration since the epoch, saturating at `i64::MAX` ms.
    #[must_use]
    pub fn since_epoch(elapsed: Duration) -> Self {
        Self(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }

    /// Returns the timestamp one millisecond later.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

/// Stable identity of a logical entity: `(kind, id)`.
///
/// Identity survives deletion; a tombstone carries the same identity as the
/// live record it replaces. Ordering is by kind (lexical), then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Entity type.
    pub kind: RecordKind,
    /// Globally unique identifier.
    pub id: Uuid,
}

impl RecordIdentity {
    /// Creates a new identity.
    pub fn new(kind: RecordKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A versioned, identified, optionally-tombstoned payload.
///
/// Envelopes are immutable values: resolving a conflict selects one of the
/// inputs and never mutates either. The payload is opaque to the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordEnvelope {
    /// Entity type.
    pub kind: RecordKind,
    /// Entity identifier.
    pub id: Uuid,
    /// Logical timestamp of this version.
    pub updated_at: Timestamp,
    /// Serialized entity state.
    #[serde(with = "payload_bytes")]
    pub payload: Vec<u8>,
    /// Tombstone flag.
    pub is_deleted: bool,
}

impl RecordEnvelope {
    /// Creates a live record version.
    pub fn new(kind: RecordKind, id: Uuid, updated_at: Timestamp, payload: Vec<u8>) -> Self {
        Self {
            kind,
            id,
            updated_at,
            payload,
            is_deleted: false,
        }
    }

    /// Creates a tombstone with an empty payload.
    pub fn tombstone(kind: RecordKind, id: Uuid, updated_at: Timestamp) -> Self {
        Self {
            kind,
            id,
            updated_at,
            payload: Vec::new(),
            is_deleted: true,
        }
    }

    /// Returns the record identity.
    #[inline]
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity::new(self.kind, self.id)
    }

    /// Returns the size of the payload in bytes.
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }
}

/// An ordered collection of envelopes.
///
/// A batch has no identity-uniqueness invariant until it has been through
/// [`dedupe_by_identity`](crate::dedupe_by_identity) or
/// [`merge`](crate::merge). An empty batch means "no changes".
pub type SyncBatch = Vec<RecordEnvelope>;

/// Serializes payloads as a CBOR byte string rather than an array of
/// integers, while still accepting sequences (as produced by JSON).
mod payload_bytes {
    use serde::de::{SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_byte_buf(PayloadVisitor)
    }

    struct PayloadVisitor;

    impl<'de> Visitor<'de> for PayloadVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string or a sequence of bytes")
        }

        fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tombstone_keeps_identity() {
        let id = Uuid::new_v4();
        let live = RecordEnvelope::new(RecordKind::Trip, id, Timestamp::from_millis(10), vec![1]);
        let dead = RecordEnvelope::tombstone(RecordKind::Trip, id, Timestamp::from_millis(20));

        assert_eq!(live.identity(), dead.identity());
        assert!(dead.is_deleted);
        assert_eq!(dead.payload_size(), 0);
    }

    #[test]
    fn identity_orders_by_kind_then_id() {
        let low = Uuid::from_bytes([0u8; 16]);
        let high = Uuid::from_bytes([0xFF; 16]);

        let media_high = RecordIdentity::new(RecordKind::Media, high);
        let place_low = RecordIdentity::new(RecordKind::Place, low);
        let place_high = RecordIdentity::new(RecordKind::Place, high);

        assert!(media_high < place_low);
        assert!(place_low < place_high);
    }

    #[test]
    fn timestamp_next_saturates() {
        assert_eq!(Timestamp::from_millis(5).next(), Timestamp::from_millis(6));
        assert_eq!(
            Timestamp::from_millis(i64::MAX).next(),
            Timestamp::from_millis(i64::MAX)
        );
    }

    #[test]
    fn since_epoch_saturates() {
        assert_eq!(
            Timestamp::since_epoch(Duration::from_millis(1_500)),
            Timestamp::from_millis(1_500)
        );
        assert_eq!(
            Timestamp::since_epoch(Duration::MAX),
            Timestamp::from_millis(i64::MAX)
        );
        assert!(Timestamp::now() > Timestamp::EPOCH);
    }

    #[test]
    fn payload_accepts_json_sequence() {
        let json = format!(
            r#"{{"kind":"spot","id":"{}","updated_at":42,"payload":[1,2,3],"is_deleted":false}}"#,
            Uuid::nil()
        );
        let env: RecordEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env.payload, vec![1, 2, 3]);
        assert_eq!(env.updated_at, Timestamp::from_millis(42));
        assert_eq!(env.kind, RecordKind::Spot);
    }
}
