//! Structured query transport.
//!
//! Clients may send an arbitrarily nested query object as a single field,
//! `__erpc_query`, holding base64url-encoded JSON. The field is expanded
//! before the query schema runs; any other query is passed through as is.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationFailure;

/// Query field carrying an encoded query object.
pub const ENCODED_QUERY_FIELD: &str = "__erpc_query";

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Expand the raw query map into the value handed to a query schema.
pub fn decode_query(raw: &Map<String, Value>) -> Result<Value, ValidationFailure> {
    match raw.get(ENCODED_QUERY_FIELD) {
        Some(Value::String(blob)) => {
            let bytes = URL_SAFE_LENIENT
                .decode(blob.as_bytes())
                .map_err(|e| ValidationFailure::new(format!("malformed encoded query: {e}")))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| ValidationFailure::new(format!("malformed encoded query: {e}")))
        }
        _ => Ok(Value::Object(raw.clone())),
    }
}

/// Encode a query object the way [`decode_query`] expects it.
pub fn encode_query<T: Serialize>(query: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(query)?;
    Ok(URL_SAFE_LENIENT.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn plain_query_passes_through() {
        let q = raw(json!({"page": "2"}));
        assert_eq!(decode_query(&q).unwrap(), json!({"page": "2"}));
    }

    #[test]
    fn encoded_query_expands_nested_objects() {
        let nested = json!({"filter": {"tags": ["a", "b"], "depth": 3}});
        let blob = encode_query(&nested).unwrap();
        let q = raw(json!({ ENCODED_QUERY_FIELD: blob }));
        assert_eq!(decode_query(&q).unwrap(), nested);
    }

    #[test]
    fn padded_blob_is_accepted() {
        // base64url of `{"a":1}` with padding
        let q = raw(json!({ ENCODED_QUERY_FIELD: "eyJhIjoxfQ==" }));
        assert_eq!(decode_query(&q).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn garbage_blob_is_a_validation_failure() {
        let q = raw(json!({ ENCODED_QUERY_FIELD: "%%%not-base64" }));
        assert!(decode_query(&q).is_err());

        let not_json = URL_SAFE_LENIENT.encode("not json");
        let q = raw(json!({ ENCODED_QUERY_FIELD: not_json }));
        assert!(decode_query(&q).is_err());
    }
}
