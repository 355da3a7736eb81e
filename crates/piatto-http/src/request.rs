//! Request abstraction over the host framework.
//!
//! `ApiRequest` is the per-request object the binder pipeline works on:
//! multi-valued query pairs, the raw body, the converter-typed path
//! variables, and a typed extension map that carries values between
//! pipeline stages (the context and the bound arguments).

use crate::errors::{ApiError, ApiResult};
use crate::method::Method;
use crate::pattern::RoutePattern;
use axum::body::Bytes;
use axum::http::HeaderMap;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Largest request body the binder will buffer
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// An inbound request as seen by the pipeline stages
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    query: Vec<(String, String)>,
    path_vars: Map<String, Value>,
    body: Bytes,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ApiRequest {
    /// Create a request from already-decomposed parts (used by tests and
    /// by hosts other than axum)
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        query: Vec<(String, String)>,
        path_vars: Map<String, Value>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            query,
            path_vars,
            body,
            extensions: HashMap::new(),
        }
    }

    /// Adapt an axum request, typing the matched path variables through
    /// the route pattern's converters
    pub async fn from_axum(
        request: axum::extract::Request,
        pattern: &RoutePattern,
        raw_params: HashMap<String, String>,
    ) -> ApiResult<Self> {
        let (parts, body) = request.into_parts();

        let method = Method::from_axum(&parts.method)
            .ok_or_else(|| ApiError::bad_request(format!("unsupported method {}", parts.method)))?;

        let query = match parts.uri.query() {
            Some(raw) => serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
                .map_err(|e| ApiError::bad_request(format!("malformed query string: {e}")))?,
            None => Vec::new(),
        };

        let path_vars = pattern.coerce(&raw_params)?;

        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::bad_request(format!("unreadable request body: {e}")))?;

        Ok(Self {
            method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            query,
            path_vars,
            body,
            extensions: HashMap::new(),
        })
    }

    /// Multi-valued query pairs in request order
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Converter-typed path variables
    pub fn path_vars(&self) -> &Map<String, Value> {
        &self.path_vars
    }

    /// Content type, without parameters
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// Raw body bytes
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON. An empty body parses as an empty object.
    pub fn json_body(&self) -> ApiResult<Value> {
        if self.body.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// Parse the body as urlencoded form pairs
    pub fn form_pairs(&self) -> ApiResult<Vec<(String, String)>> {
        serde_urlencoded::from_bytes(&self.body)
            .map_err(|e| ApiError::bad_request(format!("invalid form body: {e}")))
    }

    /// Store a typed value for a later pipeline stage
    pub fn insert_extension<T: Any + Send + Sync>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Remove and return a typed value stored by an earlier stage
    pub fn take_extension<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}
