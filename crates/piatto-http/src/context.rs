//! Per-request context.
//!
//! A fresh context is constructed by the first pipeline stage for every
//! request and handed to the handler; it owns the response envelope
//! helpers so that all success and error payloads share one shape.

use crate::errors::{error_hint, ApiError, ApiResult};
use crate::response::ApiResponse;
use axum::http::StatusCode;
use serde_json::{Map, Value};

/// Context constructed once per request.
///
/// Applications can define their own context types (carrying auth state,
/// request ids, ...) by implementing this trait; handlers pick theirs via
/// `type Context`.
pub trait RequestContext: Default + Send + Sync + 'static {
    /// Success envelope with the default message and status
    fn success(&self, data: Value) -> ApiResult<ApiResponse> {
        self.success_with("ok", 200, data)
    }

    /// Success envelope: `{"success": true, "status_code": ..,
    /// "status_message": .., ..data}`
    fn success_with(
        &self,
        status_message: &str,
        status_code: u16,
        data: Value,
    ) -> ApiResult<ApiResponse> {
        if !(200..=299).contains(&status_code) {
            return Err(ApiError::internal("success status_code should be 200~299"));
        }
        let payload = envelope(true, status_code, status_message, None, data)?;
        let status = StatusCode::from_u16(status_code)
            .map_err(|_| ApiError::internal(format!("invalid status code {status_code}")))?;
        Ok(ApiResponse::with_status(status).json(payload))
    }

    /// Error envelope with no extra payload
    fn error(&self, status_message: &str, status_code: u16) -> ApiResult<ApiResponse> {
        self.error_with(status_message, status_code, Value::Null)
    }

    /// Error envelope: carries an opaque `error_hint` for support
    /// correlation, never internal detail
    fn error_with(
        &self,
        status_message: &str,
        status_code: u16,
        data: Value,
    ) -> ApiResult<ApiResponse> {
        if (200..=299).contains(&status_code) {
            return Err(ApiError::internal("error status_code can not be 2XX"));
        }
        let payload = envelope(false, status_code, status_message, Some(error_hint()), data)?;
        let status = StatusCode::from_u16(status_code)
            .map_err(|_| ApiError::internal(format!("invalid status code {status_code}")))?;
        Ok(ApiResponse::with_status(status).json(payload))
    }
}

fn envelope(
    success: bool,
    status_code: u16,
    status_message: &str,
    hint: Option<String>,
    data: Value,
) -> ApiResult<Value> {
    let mut payload = Map::new();
    payload.insert("success".to_string(), Value::Bool(success));
    payload.insert("status_code".to_string(), Value::from(status_code));
    payload.insert(
        "status_message".to_string(),
        Value::String(status_message.to_string()),
    );
    if let Some(hint) = hint {
        payload.insert("error_hint".to_string(), Value::String(hint));
    }
    match data {
        Value::Object(extra) => payload.extend(extra),
        Value::Null => {}
        _ => return Err(ApiError::internal("envelope data must be a JSON object")),
    }
    Ok(Value::Object(payload))
}

/// Minimal context for handlers that need nothing beyond the envelope
/// helpers
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleContext;

impl RequestContext for SimpleContext {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let context = SimpleContext;
        let response = context.success(json!({"user": "ada"})).unwrap();
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_success_rejects_error_codes() {
        let context = SimpleContext;
        assert!(context.success_with("nope", 400, Value::Null).is_err());
    }

    #[test]
    fn test_error_rejects_success_codes() {
        let context = SimpleContext;
        assert!(context.error("ok?", 204).is_err());
        assert!(context.error("bad", 400).is_ok());
    }

    #[test]
    fn test_envelope_shape() {
        let payload = envelope(false, 404, "missing", Some("abc123".to_string()), Value::Null)
            .unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["status_code"], 404);
        assert_eq!(payload["status_message"], "missing");
        assert_eq!(payload["error_hint"], "abc123");
    }

    #[test]
    fn test_envelope_rejects_scalar_data() {
        assert!(envelope(true, 200, "ok", None, json!(42)).is_err());
    }
}
