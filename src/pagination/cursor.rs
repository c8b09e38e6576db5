//! Opaque keyset cursors.
//!
//! A cursor is a versioned JSON envelope, base64url-encoded without padding.
//! Unknown versions and corrupt tokens decode to `None`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{SortField, SortOrder, SortSpec, SortValue};

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("invalid cursor encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("invalid cursor payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "v")]
enum CursorEnvelope {
    #[serde(rename = "1")]
    V1(CursorPayloadV1),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorPayloadV1 {
    field: SortField,
    order: SortOrder,
    value: SortValue,
    id: i64,
    limit: u32,
    fp: String,
}

/// A page boundary: the sort value and id of the row at the edge of a page,
/// plus the conditions it was minted under.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    sort: SortSpec,
    boundary_value: SortValue,
    boundary_id: i64,
    limit: u32,
    filter_fingerprint: String,
}

impl Cursor {
    pub fn new(
        sort: SortSpec,
        boundary_value: SortValue,
        boundary_id: i64,
        limit: u32,
        filter_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            sort,
            boundary_value,
            boundary_id,
            limit,
            filter_fingerprint: filter_fingerprint.into(),
        }
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn sort_field(&self) -> SortField {
        self.sort.field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort.order
    }

    pub fn boundary_value(&self) -> &SortValue {
        &self.boundary_value
    }

    pub fn boundary_id(&self) -> i64 {
        self.boundary_id
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn filter_fingerprint(&self) -> &str {
        &self.filter_fingerprint
    }

    /// Deterministic token for this cursor.
    pub fn encode(&self) -> String {
        let envelope = CursorEnvelope::V1(CursorPayloadV1 {
            field: self.sort.field,
            order: self.sort.order,
            value: self.boundary_value.clone(),
            id: self.boundary_id,
            limit: self.limit,
            fp: self.filter_fingerprint.clone(),
        });
        let serialized =
            serde_json::to_vec(&envelope).expect("serializing cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    /// Decodes a token, returning `None` for anything malformed.
    pub fn decode(token: &str) -> Option<Self> {
        match Self::try_decode(token) {
            Ok(cursor) => Some(cursor),
            Err(err) => {
                debug!(error = %err, "Discarding undecodable cursor");
                None
            }
        }
    }

    pub fn try_decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
        let envelope: CursorEnvelope = serde_json::from_slice(&bytes)?;
        let CursorEnvelope::V1(payload) = envelope;
        Ok(Self {
            sort: SortSpec::new(payload.field, payload.order),
            boundary_value: payload.value,
            boundary_id: payload.id,
            limit: payload.limit,
            filter_fingerprint: payload.fp,
        })
    }

    /// True only when the cursor was minted under this exact field and order.
    ///
    /// Replaying a boundary under another ordering would skip or repeat rows.
    pub fn validate_sort_condition(&self, field: SortField, order: SortOrder) -> bool {
        self.sort.field == field && self.sort.order == order
    }

    /// True only when the cursor was minted under the same filters.
    pub fn validate_filters(&self, fingerprint: &str) -> bool {
        self.filter_fingerprint == fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn sample() -> Cursor {
        Cursor::new(
            SortSpec::new(SortField::PublishedAt, SortOrder::Desc),
            SortValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap()),
            42,
            20,
            "0123456789abcdef",
        )
    }

    #[test]
    fn test_encode_is_deterministic_and_url_safe() {
        let token = sample().encode();
        assert_eq!(token, sample().encode());
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_decode_roundtrip() {
        let cursor = sample();
        assert_eq!(Cursor::decode(&cursor.encode()), Some(cursor));
    }

    #[test]
    fn test_garbage_decodes_to_none() {
        assert_eq!(Cursor::decode(""), None);
        assert_eq!(Cursor::decode("not a cursor!"), None);
        assert_eq!(Cursor::decode(&URL_SAFE_NO_PAD.encode("{}")), None);
        assert!(matches!(
            Cursor::try_decode("%%%"),
            Err(CursorError::Encoding(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let future = r#"{"v":"2","field":"id","order":"asc","value":{"int":1},"id":1,"limit":10,"fp":"x"}"#;
        let token = URL_SAFE_NO_PAD.encode(future);
        assert!(matches!(
            Cursor::try_decode(&token),
            Err(CursorError::Payload(_))
        ));
        assert_eq!(Cursor::decode(&token), None);
    }

    #[test]
    fn test_validate_sort_condition() {
        let cursor = sample();
        assert!(cursor.validate_sort_condition(SortField::PublishedAt, SortOrder::Desc));
        assert!(!cursor.validate_sort_condition(SortField::QualityScore, SortOrder::Desc));
        assert!(!cursor.validate_sort_condition(SortField::PublishedAt, SortOrder::Asc));
    }

    #[test]
    fn test_validate_filters() {
        let cursor = sample();
        assert!(cursor.validate_filters("0123456789abcdef"));
        assert!(!cursor.validate_filters("fedcba9876543210"));
    }

    fn sort_value_strategy() -> impl Strategy<Value = SortValue> {
        prop_oneof![
            any::<i64>().prop_map(SortValue::Int),
            (-4_000_000i64..4_000_000).prop_map(|n| SortValue::Float(n as f64 / 8.0)),
            "[a-zA-Z0-9 ]{0,24}".prop_map(SortValue::Text),
            (0i64..4_000_000_000).prop_map(|secs| {
                SortValue::Timestamp(Utc.timestamp_opt(secs, 0).unwrap())
            }),
        ]
    }

    fn sort_field_strategy() -> impl Strategy<Value = SortField> {
        prop_oneof![
            Just(SortField::PublishedAt),
            Just(SortField::CreatedAt),
            Just(SortField::QualityScore),
            Just(SortField::Title),
            Just(SortField::Id),
        ]
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            field in sort_field_strategy(),
            desc in any::<bool>(),
            value in sort_value_strategy(),
            id in any::<i64>(),
            limit in 1u32..500,
            fp in "[0-9a-f]{16}"
        ) {
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            let cursor = Cursor::new(SortSpec::new(field, order), value, id, limit, fp);
            prop_assert_eq!(Cursor::decode(&cursor.encode()), Some(cursor));
        }

        #[test]
        fn prop_decode_never_panics(token in ".{0,64}") {
            let _ = Cursor::decode(&token);
        }
    }
}
