//! Response abstraction for building HTTP responses

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use crate::errors::{ApiError, ApiResult};
use serde_json::Value;

/// Response builder handed back by handlers and pipeline stages
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

/// Response body variants
#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Html(String),
    Json(Value),
}

impl ApiResponse {
    /// Create an empty response with OK status
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// Create an empty response with the given status
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Set the status code
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a JSON body
    pub fn json(mut self, value: Value) -> Self {
        self.body = ResponseBody::Json(value);
        self
    }

    /// Set a plain-text body
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(text.into());
        self
    }

    /// Set an HTML body
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.body = ResponseBody::Html(html.into());
        self
    }

    /// Current status code
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether a header is already present
    pub fn has_header(&self, name: &str) -> bool {
        HeaderName::try_from(name)
            .map(|name| self.headers.contains_key(&name))
            .unwrap_or(false)
    }

    /// Add a header (consuming)
    pub fn header(mut self, name: &str, value: &str) -> ApiResult<Self> {
        self.insert_header(name, value)?;
        Ok(self)
    }

    /// Add a header in place (for pipeline stages)
    pub fn insert_header(&mut self, name: &str, value: &str) -> ApiResult<()> {
        let name = HeaderName::try_from(name)
            .map_err(|e| ApiError::internal(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| ApiError::internal(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Convert into the host framework's response type
    pub fn into_axum(self) -> axum::response::Response {
        let (content_type, body) = match self.body {
            ResponseBody::Empty => (None, Body::empty()),
            ResponseBody::Text(text) => (Some("text/plain; charset=utf-8"), Body::from(text)),
            ResponseBody::Html(html) => (Some("text/html; charset=utf-8"), Body::from(html)),
            ResponseBody::Json(value) => match serde_json::to_string(&value) {
                Ok(json) => (Some("application/json"), Body::from(json)),
                Err(e) => {
                    tracing::error!("response serialization failed: {e}");
                    return axum::response::Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Body::empty())
                        .unwrap_or_default();
                }
            },
        };

        let mut builder = axum::http::Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
            if let Some(content_type) = content_type {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    if let Ok(value) = HeaderValue::try_from(content_type) {
                        headers.insert(header::CONTENT_TYPE, value);
                    }
                }
            }
        }
        builder.body(body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_response() {
        let response = ApiResponse::ok().json(json!({"success": true}));
        assert_eq!(response.status_code(), StatusCode::OK);
        let axum_response = response.into_axum();
        assert_eq!(
            axum_response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn test_header_insertion() {
        let mut response = ApiResponse::ok();
        response
            .insert_header("Access-Control-Allow-Origin", "*")
            .unwrap();
        assert!(response.has_header("Access-Control-Allow-Origin"));
        assert!(!response.has_header("Access-Control-Allow-Headers"));
    }

    #[test]
    fn test_invalid_header_name() {
        let mut response = ApiResponse::ok();
        assert!(response.insert_header("bad header\n", "x").is_err());
    }
}
