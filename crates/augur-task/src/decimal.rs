//! Exact decimal handling for numeric task values.
//!
//! JSON numbers are carried as their original text (serde_json is built with
//! `arbitrary_precision`) and parsed into `BigDecimal`, so a value such as
//! `123456789012.123456789012345678` survives decoding and aggregation with
//! every digit intact.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;

use crate::error::TaskError;

/// Largest decimal exponent accepted from input text.
const MAX_EXPONENT: i64 = 1024;

/// Parse decimal text, accepting plain and scientific notation.
pub fn parse_decimal(text: &str) -> Result<BigDecimal, TaskError> {
  let text = text.trim();
  let value = BigDecimal::from_str(text).map_err(|e| TaskError::InvalidValue {
    message: format!("'{}' is not a decimal number: {}", text, e),
  })?;
  let (_, scale) = value.as_bigint_and_exponent();
  if scale.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
    return Err(TaskError::InvalidValue {
      message: format!("'{}' is out of range", text),
    });
  }
  Ok(value)
}

/// Interpret a JSON number or numeric string as a decimal.
pub fn decimal_from_json(value: &Value) -> Result<BigDecimal, TaskError> {
  match value {
    Value::Number(n) => parse_decimal(&n.to_string()),
    Value::String(s) => parse_decimal(s),
    other => Err(TaskError::InvalidValue {
      message: format!("expected a number, got {}", other),
    }),
  }
}

/// Plain (non-scientific) text of a decimal with trailing zeros removed.
pub fn decimal_to_string(value: &BigDecimal) -> String {
  value.normalized().to_plain_string()
}

/// Render a decimal as a JSON number without losing digits.
pub fn decimal_to_json(value: &BigDecimal) -> Value {
  let text = decimal_to_string(value);
  serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// `#[serde(with = "augur_task::decimal::serde")]` for decimal fields.
pub mod serde {
  use bigdecimal::BigDecimal;
  use ::serde::de::Error as _;
  use ::serde::{Deserialize, Deserializer, Serialize, Serializer};
  use serde_json::Value;

  pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    super::decimal_to_json(value).serialize(serializer)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    let value = Value::deserialize(deserializer)?;
    super::decimal_from_json(&value).map_err(D::Error::custom)
  }
}

/// `#[serde(default, with = "augur_task::decimal::serde_option")]` for
/// optional decimal fields.
pub mod serde_option {
  use bigdecimal::BigDecimal;
  use ::serde::de::Error as _;
  use ::serde::{Deserialize, Deserializer, Serializer};
  use serde_json::Value;

  pub fn serialize<S: Serializer>(
    value: &Option<BigDecimal>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(value) => super::serde::serialize(value, serializer),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<BigDecimal>, D::Error> {
    match Value::deserialize(deserializer)? {
      Value::Null => Ok(None),
      value => super::decimal_from_json(&value).map(Some).map_err(D::Error::custom),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn decimal(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).unwrap()
  }

  #[test]
  fn test_parse_plain_and_scientific() {
    assert_eq!(parse_decimal("12.50").unwrap(), decimal("12.5"));
    assert_eq!(parse_decimal(" -3 ").unwrap(), BigDecimal::from(-3));
    assert_eq!(parse_decimal("1e-3").unwrap(), decimal("0.001"));
    assert!(parse_decimal("twelve").is_err());
  }

  #[test]
  fn test_json_number_keeps_digits() {
    let value: Value = serde_json::from_str("0.123456789012345678").unwrap();
    let decimal = decimal_from_json(&value).unwrap();
    assert_eq!(decimal_to_string(&decimal), "0.123456789012345678");
    assert_eq!(decimal_to_json(&decimal).to_string(), "0.123456789012345678");
  }

  #[test]
  fn test_thirty_digit_value_is_exact() {
    let text = "123456789012.123456789012345678";
    let value: Value = serde_json::from_str(text).unwrap();
    let decimal = decimal_from_json(&value).unwrap();
    assert_eq!(decimal_to_string(&decimal), text);
    assert_eq!(decimal_to_json(&decimal).to_string(), text);
  }

  #[test]
  fn test_whole_numbers_render_plain() {
    assert_eq!(decimal_to_string(&decimal("1.2300")), "1.23");
    assert_eq!(decimal_to_string(&BigDecimal::from(123450)), "123450");
  }

  #[test]
  fn test_huge_exponent_is_rejected() {
    assert!(parse_decimal("1e999999999").is_err());
  }

  #[test]
  fn test_non_numeric_json() {
    assert!(decimal_from_json(&Value::Bool(true)).is_err());
    assert_eq!(
      decimal_from_json(&Value::String("42".into())).unwrap(),
      BigDecimal::from(42)
    );
  }
}
