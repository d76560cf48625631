//! The store's bit-exact JSON response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use membridge_core::MemoryError;

/// `{"status": "ok"|"error", "result"?, "error"?}`.
#[derive(Debug, Deserialize)]
pub struct StoreEnvelope {
    /// `"ok"` or `"error"`.
    pub status: String,
    /// Present on success; shape depends on the operation.
    #[serde(default)]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(default)]
    pub error: Option<StoreErrorBody>,
}

/// The error object nested in a failed envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct StoreErrorBody {
    /// Machine-readable error code, if the store supplied one.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Arbitrary structured detail.
    #[serde(default)]
    pub details: Option<Value>,
}

impl StoreEnvelope {
    /// Parse raw response bytes, treating an empty 2xx body as success with
    /// an empty result.
    ///
    /// `status_is_retryable` must reflect the HTTP status the body came with
    /// (5xx or 429): a non-2xx response is `Transport` when the status is
    /// retryable, `Protocol` otherwise — the envelope's own `status`/`error`
    /// fields never override that classification.
    pub fn parse(
        status_is_2xx: bool,
        status_is_retryable: bool,
        status_text: &str,
        raw_body: &str,
    ) -> Result<Value, MemoryError> {
        if raw_body.trim().is_empty() {
            if status_is_2xx {
                return Ok(Value::Null);
            }
            return Err(MemoryError::from_envelope(None, raw_body, status_text, status_is_retryable));
        }

        let envelope: StoreEnvelope = serde_json::from_str(raw_body)
            .map_err(|e| MemoryError::Protocol(format!("malformed envelope: {e}")))?;

        if envelope.status != "ok" || !status_is_2xx {
            let message = envelope.error.as_ref().and_then(|e| e.message.as_deref());
            return Err(MemoryError::from_envelope(message, raw_body, status_text, status_is_retryable));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_envelope() {
        let body = r#"{"status":"ok","result":{"session_id":"abc"}}"#;
        let result = StoreEnvelope::parse(true, false, "200 OK", body).unwrap();
        assert_eq!(result["session_id"], "abc");
    }

    #[test]
    fn empty_2xx_body_is_success_with_null() {
        let result = StoreEnvelope::parse(true, false, "204 No Content", "").unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn empty_error_body_uses_status_text() {
        let err = StoreEnvelope::parse(false, false, "404 Not Found", "").unwrap_err();
        assert_eq!(err.to_string(), "store protocol error: 404 Not Found");
    }

    #[test]
    fn empty_retryable_error_body_becomes_transport() {
        let err = StoreEnvelope::parse(false, true, "503 Service Unavailable", "").unwrap_err();
        assert!(matches!(err, MemoryError::Transport(_)));
        assert_eq!(err.to_string(), "store request failed: 503 Service Unavailable");
    }

    #[test]
    fn error_status_prefers_error_message() {
        let body = r#"{"status":"error","error":{"code":"not_found","message":"no such session"}}"#;
        let err = StoreEnvelope::parse(true, false, "200 OK", body).unwrap_err();
        assert_eq!(err.to_string(), "store protocol error: no such session");
    }

    #[test]
    fn error_status_falls_back_to_raw_body_without_message() {
        let body = r#"{"status":"error","error":{}}"#;
        let err = StoreEnvelope::parse(true, false, "200 OK", body).unwrap_err();
        assert_eq!(err.to_string(), format!("store protocol error: {body}"));
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        let err = StoreEnvelope::parse(true, false, "200 OK", "not json").unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }

    #[test]
    fn non_2xx_with_ok_status_is_still_an_error() {
        let body = r#"{"status":"ok","result":{}}"#;
        let err = StoreEnvelope::parse(false, true, "500 Internal Server Error", body).unwrap_err();
        assert!(matches!(err, MemoryError::Transport(_)));
        assert!(err.to_string().contains("ok"));
    }
}
