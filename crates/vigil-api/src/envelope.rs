//! Response envelope handling.
//!
//! Every backend response is a JSON object that may carry `success` and
//! `error`. A response counts as successful when the status is 2xx and
//! `success` is not `false`. `204 No Content` is treated as `{"success": true}`.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{ApiError, Result};

/// Interpret a raw response into the envelope value.
pub fn interpret(status: u16, body: &[u8]) -> Result<Value> {
    if status == 204 {
        return Ok(json!({ "success": true }));
    }

    if !(200..300).contains(&status) {
        let text = String::from_utf8_lossy(body);
        return Err(ApiError::from_http_status(status, &text));
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        endpoint: String::new(),
        message: format!("body is not JSON: {e}"),
    })?;

    if !value.is_object() {
        return Err(ApiError::Decode {
            endpoint: String::new(),
            message: "body is not a JSON object".to_string(),
        });
    }

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(ApiError::Rejected(message));
    }

    Ok(value)
}

/// Decode an envelope value into a typed payload.
pub fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Attach the endpoint to a decode error raised before it was known.
pub(crate) fn with_endpoint(err: ApiError, label: &str) -> ApiError {
    match err {
        ApiError::Decode { endpoint, message } if endpoint.is_empty() => ApiError::Decode {
            endpoint: label.to_string(),
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_content_is_success() {
        let value = interpret(204, b"").unwrap();
        assert_eq!(value["success"], true);
    }

    #[test]
    fn test_success_false_on_200_is_error() {
        let err = interpret(200, br#"{"success":false,"error":"IP already blocked"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "IP already blocked"));
    }

    #[test]
    fn test_success_false_without_message() {
        let err = interpret(200, br#"{"success":false}"#).unwrap_err();
        assert_eq!(err.to_string(), "Request failed");
    }

    #[test]
    fn test_missing_success_field_is_ok() {
        let value = interpret(200, br#"{"timeline":[]}"#).unwrap();
        assert!(value["timeline"].is_array());
    }

    #[test]
    fn test_non_2xx_reads_error_field() {
        let err = interpret(404, br#"{"error":"Report not found"}"#).unwrap_err();
        assert_eq!(err.friendly_message(), "Report not found");
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert!(matches!(interpret(200, b"[1,2]"), Err(ApiError::Decode { .. })));
        assert!(matches!(interpret(200, b"ok"), Err(ApiError::Decode { .. })));
    }

    #[test]
    fn test_with_endpoint_fills_blank() {
        let err = with_endpoint(interpret(200, b"ok").unwrap_err(), "/api/get-stats");
        assert!(err.to_string().contains("/api/get-stats"));
    }
}
