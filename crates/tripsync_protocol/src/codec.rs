//! CBOR encoding via `ciborium`.

use crate::envelope::SyncBatch;
use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| ProtocolError::encoding(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::decoding(e.to_string()))
}

/// Encodes a standalone batch of envelopes.
pub fn encode_batch(batch: &SyncBatch) -> ProtocolResult<Vec<u8>> {
    to_cbor(batch)
}

/// Decodes a standalone batch of envelopes.
pub fn decode_batch(bytes: &[u8]) -> ProtocolResult<SyncBatch> {
    from_cbor(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{RecordEnvelope, Timestamp};
    use crate::kind::RecordKind;
    use uuid::Uuid;

    #[test]
    fn batch_roundtrip_preserves_order_and_tombstones() {
        let batch = vec![
            RecordEnvelope::new(
                RecordKind::Media,
                Uuid::new_v4(),
                Timestamp::from_millis(1_700_000_000_123),
                vec![0xDE, 0xAD, 0xBE, 0xEF],
            ),
            RecordEnvelope::tombstone(RecordKind::Tag, Uuid::new_v4(), Timestamp::from_millis(9)),
        ];

        let bytes = encode_batch(&batch).unwrap();
        assert_eq!(decode_batch(&bytes).unwrap(), batch);
    }

    #[test]
    fn payload_is_a_byte_string() {
        let env = RecordEnvelope::new(
            RecordKind::Place,
            Uuid::nil(),
            Timestamp::EPOCH,
            vec![7; 32],
        );
        let bytes = to_cbor(&env).unwrap();
        // A 32-byte CBOR byte string header is 0x58 0x20.
        assert!(bytes.windows(2).any(|w| w == [0x58, 0x20]));
    }

    #[test]
    fn truncated_input_is_a_decoding_error() {
        let bytes = encode_batch(&vec![RecordEnvelope::tombstone(
            RecordKind::Trip,
            Uuid::nil(),
            Timestamp::EPOCH,
        )])
        .unwrap();

        let result = decode_batch(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(ProtocolError::DecodingFailed { .. })));
    }
}
