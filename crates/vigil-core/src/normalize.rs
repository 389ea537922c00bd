//! Alert normalization.
//!
//! Turns one inbound payload into an [`AlertRecord`]. The stream task calls
//! [`normalize_alert`] on every text frame; REST alert lists go through
//! [`normalize_value`] entry by entry so both paths share one schema.
//!
//! Schema:
//!
//! | field | accepted | on anything else |
//! |-------|----------|------------------|
//! | `timestamp` | string (required) | reject |
//! | `src_ip`, `dest_ip`, `signature`, `category` | string, null, absent | reject |
//! | `severity` | integer, integral float, numeric string, null, absent | treated as absent |
//!
//! Unknown fields are kept in [`AlertRecord::raw`] and otherwise ignored.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, VigilError};
use crate::types::{AlertRecord, AlertTime};

/// Parse a raw text payload into an alert.
pub fn normalize_alert(payload: &str) -> Result<AlertRecord> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| VigilError::malformed_alert(format!("not valid JSON: {e}")))?;
    normalize_value(value)
}

/// Validate an already-decoded JSON value as an alert.
pub fn normalize_value(value: Value) -> Result<AlertRecord> {
    let Value::Object(fields) = &value else {
        return Err(VigilError::malformed_alert(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        )));
    };

    let timestamp = match fields.get("timestamp") {
        Some(Value::String(ts)) => AlertTime::parse(ts),
        Some(other) => {
            return Err(VigilError::malformed_alert(format!(
                "timestamp must be a string, got {}",
                kind_of(other)
            )));
        }
        None => return Err(VigilError::malformed_alert("missing timestamp")),
    };

    let src_ip = optional_string(fields, "src_ip")?;
    let dest_ip = optional_string(fields, "dest_ip")?;
    let signature = optional_string(fields, "signature")?;
    let category = optional_string(fields, "category")?;
    let severity = coerce_severity(fields.get("severity"));

    Ok(AlertRecord {
        timestamp,
        src_ip,
        dest_ip,
        signature,
        category,
        severity,
        raw: value,
    })
}

fn optional_string(fields: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(VigilError::malformed_alert(format!(
            "{key} must be a string, got {}",
            kind_of(other)
        ))),
    }
}

/// Coerce a severity field to an integer.
///
/// Severity is optional, so a value that cannot be coerced is dropped rather
/// than rejecting the whole alert.
pub fn coerce_severity(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    let coerced = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if coerced.is_none() {
        debug!(severity = %value, "ignoring non-integer severity");
    }
    coerced
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeverityBucket;
    use serde_json::json;

    #[test]
    fn test_normalize_full_payload() {
        let record = normalize_alert(concat!(
            r#"{"timestamp":"2025-01-15T10:30:00Z","src_ip":"10.0.0.5","#,
            r#""dest_ip":"192.168.1.10","signature":"SQLi attempt","severity":1}"#,
        ))
        .unwrap();

        assert_eq!(record.src_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(record.dest_ip.as_deref(), Some("192.168.1.10"));
        assert_eq!(record.signature.as_deref(), Some("SQLi attempt"));
        assert_eq!(record.severity, Some(1));
        assert_eq!(record.bucket(), Some(SeverityBucket::Critical));
    }

    #[test]
    fn test_normalize_optional_fields_absent() {
        let record = normalize_alert(r#"{"timestamp":"2025-01-15T10:30:00Z"}"#).unwrap();
        assert!(record.src_ip.is_none());
        assert!(record.signature.is_none());
        assert!(record.severity.is_none());
        assert_eq!(record.src_ip_display(), "N/A");
    }

    #[test]
    fn test_normalize_rejects_non_json() {
        let err = normalize_alert("not json at all").unwrap_err();
        assert!(matches!(err, VigilError::MalformedAlert { .. }));
    }

    #[test]
    fn test_normalize_rejects_non_object() {
        assert!(normalize_alert("[1,2,3]").is_err());
        assert!(normalize_alert("42").is_err());
        assert!(normalize_alert("\"alert\"").is_err());
    }

    #[test]
    fn test_normalize_requires_timestamp() {
        let err = normalize_alert(r#"{"src_ip":"10.0.0.5","severity":2}"#).unwrap_err();
        assert!(err.to_string().contains("missing timestamp"));
    }

    #[test]
    fn test_normalize_rejects_wrong_typed_field() {
        let err =
            normalize_alert(r#"{"timestamp":"2025-01-15T10:30:00Z","src_ip":1234}"#).unwrap_err();
        assert!(err.to_string().contains("src_ip"));
    }

    #[test]
    fn test_severity_coercion() {
        assert_eq!(coerce_severity(Some(&json!(2))), Some(2));
        assert_eq!(coerce_severity(Some(&json!(3.0))), Some(3));
        assert_eq!(coerce_severity(Some(&json!("4"))), Some(4));
        assert_eq!(coerce_severity(Some(&json!(" 1 "))), Some(1));
        assert_eq!(coerce_severity(Some(&json!(2.5))), None);
        assert_eq!(coerce_severity(Some(&json!("high"))), None);
        assert_eq!(coerce_severity(Some(&json!(true))), None);
        assert_eq!(coerce_severity(Some(&Value::Null)), None);
        assert_eq!(coerce_severity(None), None);
    }

    #[test]
    fn test_uncoercible_severity_keeps_alert() {
        let record =
            normalize_alert(r#"{"timestamp":"2025-01-15T10:30:00Z","severity":"urgent"}"#).unwrap();
        assert_eq!(record.severity, None);
        assert_eq!(record.bucket(), None);
    }

    #[test]
    fn test_raw_payload_preserved() {
        let record = normalize_value(json!({
            "timestamp": "2025-01-15T10:30:00Z",
            "flow_id": 42
        }))
        .unwrap();
        assert_eq!(record.raw["flow_id"], 42);
        assert!(record.detail_json().contains("flow_id"));
    }
}
