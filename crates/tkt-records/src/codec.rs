//! Collection blob codec: an ordered list of records as one JSON array.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{RecordError, RecordResult};

/// Encode records as a compact JSON array.
pub fn encode<T: Serialize>(records: &[T]) -> RecordResult<Bytes> {
    serde_json::to_vec(records)
        .map(Bytes::from)
        .map_err(|e| RecordError::Codec(e.to_string()))
}

/// Strict decode of a collection blob.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Decode a collection blob, treating a malformed value as an empty
/// collection. The failure is logged, not returned.
pub fn decode_or_empty<T: DeserializeOwned>(key: &str, raw: &[u8]) -> Vec<T> {
    match decode(raw) {
        Ok(records) => records,
        Err(e) => {
            warn!(key, error = %e, "malformed collection blob; treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u64,
        name: String,
    }

    #[test]
    fn encodes_compact_array_in_order() {
        let rows = vec![
            Row { id: 2, name: "b".into() },
            Row { id: 1, name: "a".into() },
        ];
        let raw = encode(&rows).unwrap();
        assert_eq!(&raw[..], br#"[{"id":2,"name":"b"},{"id":1,"name":"a"}]"#);
        assert_eq!(decode::<Row>(&raw).unwrap(), rows);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let rows: Vec<Row> = decode(br#"[{"id":1,"name":"a","legacy":true}]"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn malformed_values_decode_as_empty() {
        assert!(decode_or_empty::<Row>("k", b"{not json").is_empty());
        assert!(decode_or_empty::<Row>("k", b"null").is_empty());
        assert!(decode_or_empty::<Row>("k", br#"{"id":1}"#).is_empty());
        assert!(decode_or_empty::<Row>("k", br#"[{"id":"x"}]"#).is_empty());
    }
}
