//! Cursor encoding.
//!
//! A cursor names a position inside an ordered connection: the values of
//! the row's sort keys, in sort-key order. The ordering's fingerprint is
//! stored alongside the values so that a cursor issued under one ordering
//! is rejected by a connection sorted differently.
//!
//! ```text
//! base64url_nopad({"k": "name,id:ASC", "v": [{"s": "U1"}, {"i": 1}]})
//! ```
//!
//! Cursors and global IDs are both opaque strings but are produced by
//! unrelated codecs and are never interchangeable.

use std::borrow::Cow;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::CursorError;
use crate::models::FieldValue;
use crate::ports::{Cursor, OrderSpec};

/// Maximum length of an encoded cursor accepted by [`decode`].
pub const MAX_CURSOR_LENGTH: usize = 1024;

/// Sort-key values of a row, in sort-key order.
///
/// Positions compare lexicographically, matching SQL row-value comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(pub Vec<FieldValue>);

impl Position {
    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct CursorDocument<'a> {
    k: String,
    v: Cow<'a, [FieldValue]>,
}

/// Encode a position under the given ordering.
pub fn encode(order: &OrderSpec, position: &Position) -> Cursor {
    let doc = CursorDocument {
        k: order.fingerprint(),
        v: Cow::Borrowed(position.values()),
    };
    // Field values always serialize: tagged scalars with string map keys.
    let json = serde_json::to_vec(&doc).unwrap_or_default();
    Cursor {
        value: URL_SAFE_NO_PAD.encode(json),
    }
}

/// Decode a cursor into its ordering fingerprint and position.
///
/// This does not check the position against any ordering; see
/// [`OrderSpec::decode_cursor`].
pub fn decode(cursor: &Cursor) -> Result<(String, Position), CursorError> {
    if cursor.value.len() > MAX_CURSOR_LENGTH {
        return Err(CursorError::TooLong {
            max: MAX_CURSOR_LENGTH,
        });
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(&cursor.value)
        .map_err(|e| CursorError::Encoding(e.to_string()))?;
    let doc: CursorDocument =
        serde_json::from_slice(&bytes).map_err(|e| CursorError::Malformed(e.to_string()))?;

    Ok((doc.k, Position(doc.v.into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValueKind;
    use crate::ports::{OrderDirection, SortKey};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    const ID: SortKey = SortKey::new("id", ValueKind::Int);
    const NAME: SortKey = SortKey::new("name", ValueKind::Text);

    // Test critique: decode(encode(p)) == p, y compris timestamps à la nanoseconde
    #[test]
    fn test_roundtrip_preserves_position() {
        let order = OrderSpec::new(NAME, ID, OrderDirection::Asc);
        let position = Position(vec![FieldValue::from("U1"), FieldValue::Int(1)]);
        let cursor = encode(&order, &position);
        let (fingerprint, decoded) = decode(&cursor).unwrap();
        assert_eq!(fingerprint, "name,id:ASC");
        assert_eq!(decoded, position);

        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let position = Position(vec![
            FieldValue::Timestamp(ts),
            FieldValue::Uuid(Uuid::new_v4()),
        ]);
        let (_, decoded) = decode(&encode(&order, &position)).unwrap();
        assert_eq!(decoded, position);
    }

    // Test critique: le format JSON encodé est celui que decode accepte
    #[test]
    fn test_encoded_document_layout() {
        let order = OrderSpec::new(NAME, ID, OrderDirection::Asc);
        let position = Position(vec![FieldValue::from("U1"), FieldValue::Int(1)]);
        let bytes = URL_SAFE_NO_PAD
            .decode(encode(&order, &position).value)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"k": "name,id:ASC", "v": [{"s": "U1"}, {"i": 1}]})
        );
    }

    // Test critique: les curseurs corrompus sont rejetés sans panic
    #[test]
    fn test_decode_rejects_garbage() {
        let bad = |s: &str| Cursor { value: s.into() };
        assert!(matches!(decode(&bad("***")), Err(CursorError::Encoding(_))));
        assert!(matches!(
            decode(&bad(&URL_SAFE_NO_PAD.encode("not json"))),
            Err(CursorError::Malformed(_))
        ));
        assert!(matches!(
            decode(&bad(&URL_SAFE_NO_PAD.encode(r#"{"k":"id:ASC","v":[{"x":1}]}"#))),
            Err(CursorError::Malformed(_))
        ));
        assert!(matches!(
            decode(&bad(&"A".repeat(MAX_CURSOR_LENGTH + 1))),
            Err(CursorError::TooLong { .. })
        ));
    }

    // Test critique: un curseur n'est pas un ID global
    #[test]
    fn test_cursor_is_not_a_global_id() {
        let order = OrderSpec::by_key(ID, OrderDirection::Asc);
        let cursor = encode(&order, &Position(vec![FieldValue::Int(1)]));
        assert!(crate::ids::GlobalId::decode(&cursor.value).is_err());

        let id = crate::ids::GlobalId::new("User", 1i64).encode();
        assert!(decode(&Cursor { value: id }).is_err());
    }
}
