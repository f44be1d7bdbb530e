//! Two-pass decoding of polymorphic stage documents.
//!
//! The first pass reads only the `type` discriminator; the second decodes the
//! whole document into the variant the discriminator names. Shared by tasks,
//! fetchers and transformers.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;

#[derive(Deserialize)]
struct Header {
  #[serde(rename = "type")]
  type_name: Option<String>,
}

/// Read the discriminator of the document at `index`.
pub fn peek_type(index: usize, document: &Value) -> Result<String, DecodeError> {
  let header = Header::deserialize(document).map_err(|source| DecodeError::InvalidHeader {
    index,
    document: document.to_string(),
    source,
  })?;
  header.type_name.ok_or_else(|| DecodeError::MissingType {
    index,
    document: document.to_string(),
  })
}

/// Decode the full document into the variant named by `type_name`.
pub fn decode_variant<T: DeserializeOwned>(
  index: usize,
  type_name: &str,
  document: Value,
) -> Result<T, DecodeError> {
  serde_json::from_value(document).map_err(|source| DecodeError::Malformed {
    index,
    type_name: type_name.to_string(),
    source,
  })
}

/// Split a JSON array into its element documents.
pub fn split_collection(bytes: &[u8]) -> Result<Vec<Value>, DecodeError> {
  serde_json::from_slice(bytes).map_err(DecodeError::Collection)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_peek_type() {
    assert_eq!(peek_type(0, &json!({"type": "median", "x": 1})).unwrap(), "median");
    assert!(matches!(
      peek_type(3, &json!({"x": 1})),
      Err(DecodeError::MissingType { index: 3, .. })
    ));
    assert!(matches!(
      peek_type(0, &json!({"type": 7})),
      Err(DecodeError::InvalidHeader { .. })
    ));
    assert!(matches!(
      peek_type(0, &json!("http")),
      Err(DecodeError::InvalidHeader { .. })
    ));
  }

  #[test]
  fn test_split_collection_rejects_objects() {
    assert!(split_collection(b"[{\"type\":\"http\"}]").is_ok());
    assert!(matches!(
      split_collection(b"{\"type\":\"http\"}"),
      Err(DecodeError::Collection(_))
    ));
  }
}
