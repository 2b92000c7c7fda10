//! Codec Module
//!
//! Serializes values to a single text representation that survives text-only
//! storage media (cookies, structured stores, SQL text columns).
//!
//! The wire grammar is two-part: structured payloads are the `J::O` tag
//! sentinel followed by JSON text; primitives are stored bare. On decode,
//! bare text that parses as a number is coerced to a number — which is why
//! the encoder routes number-looking *strings* through the tagged form, so
//! the coercion can never corrupt them.

use serde_json::{Number, Value};

use crate::error::Result;

// == Tag Sentinel ==
/// Marker prefix for structured (JSON) payloads.
///
/// Fixed at four characters so decoding is a cheap prefix check, and unlikely
/// enough to collide with user data in practice.
pub const TAG: &str = "J::O";

// == Encode ==
/// Encodes a value into its text wire form.
///
/// - Strings encode as themselves, unless they would be mistaken for a
///   number on decode, in which case they are tagged JSON.
/// - Numbers encode as their canonical decimal text.
/// - Everything else (null, booleans, arrays, objects) encodes as
///   [`TAG`] + JSON.
pub fn encode(value: &Value) -> Result<String> {
    match value {
        Value::String(text) if parse_number(text).is_none() => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        other => Ok(format!("{}{}", TAG, serde_json::to_string(other)?)),
    }
}

// == Decode ==
/// Decodes a text wire form back into a value.
///
/// # Errors
/// Returns [`crate::error::StoreError::Codec`] when the text carries the
/// structured tag but the remainder is not valid JSON. Callers recover by
/// emitting an `Error` event and treating the entry as absent.
pub fn decode(text: &str) -> Result<Value> {
    if let Some(json) = text.strip_prefix(TAG) {
        return Ok(serde_json::from_str(json)?);
    }
    match parse_number(text) {
        Some(number) => Ok(Value::Number(number)),
        None => Ok(Value::String(text.to_string())),
    }
}

// == Numeric Coercion ==
/// Parses text as a JSON number, integers before floats.
///
/// Empty and whitespace-padded text never coerces; neither do non-finite
/// float forms, which JSON cannot represent.
fn parse_number(text: &str) -> Option<Number> {
    if text.is_empty() || text.trim() != text {
        return None;
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => Number::from_f64(float),
        _ => None,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_plain_string_identity() {
        assert_eq!(encode(&json!("hello world")).unwrap(), "hello world");
    }

    #[test]
    fn test_encode_number_decimal_text() {
        assert_eq!(encode(&json!(42)).unwrap(), "42");
        assert_eq!(encode(&json!(-7)).unwrap(), "-7");
        assert_eq!(encode(&json!(2.5)).unwrap(), "2.5");
    }

    #[test]
    fn test_encode_structured_is_tagged() {
        let encoded = encode(&json!({"a": 1})).unwrap();
        assert!(encoded.starts_with(TAG));
        assert_eq!(&encoded[TAG.len()..], r#"{"a":1}"#);

        assert!(encode(&json!([1, 2, 3])).unwrap().starts_with(TAG));
        assert_eq!(encode(&json!(true)).unwrap(), "J::Otrue");
    }

    #[test]
    fn test_numeric_string_is_tagged() {
        // "123" must not come back as the number 123
        let encoded = encode(&json!("123")).unwrap();
        assert_eq!(encoded, "J::O\"123\"");
        assert_eq!(decode(&encoded).unwrap(), json!("123"));

        // scientific notation and leading zeros are number-looking too
        assert!(encode(&json!("1e3")).unwrap().starts_with(TAG));
        assert!(encode(&json!("007")).unwrap().starts_with(TAG));
    }

    #[test]
    fn test_decode_bare_number_coerces() {
        assert_eq!(decode("42").unwrap(), json!(42));
        assert_eq!(decode("-7").unwrap(), json!(-7));
        assert_eq!(decode("2.5").unwrap(), json!(2.5));
    }

    #[test]
    fn test_decode_bare_text_stays_string() {
        assert_eq!(decode("hello").unwrap(), json!("hello"));
        assert_eq!(decode("4 score").unwrap(), json!("4 score"));
        // padded digits are not coerced
        assert_eq!(decode(" 42").unwrap(), json!(" 42"));
    }

    #[test]
    fn test_decode_tagged_json() {
        assert_eq!(
            decode(r#"J::O{"a":[1,2]}"#).unwrap(),
            json!({"a": [1, 2]})
        );
        assert_eq!(decode("J::Onull").unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_malformed_tagged_json() {
        let err = decode("J::O{broken").unwrap_err();
        assert!(matches!(err, crate::error::StoreError::Codec(_)));
    }

    #[test]
    fn test_round_trip() {
        let values = vec![
            json!("plain"),
            json!("123"),
            json!(123),
            json!(-0.5),
            json!(true),
            json!([1, "two", {"three": 3}]),
            json!({"nested": {"deep": [null, false]}}),
        ];
        for value in values {
            let encoded = encode(&value).unwrap();
            assert_eq!(decode(&encoded).unwrap(), value, "wire form: {encoded}");
        }
    }
}
