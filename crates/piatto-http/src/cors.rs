//! CORS policy stage.
//!
//! A route with a CORS policy gets an extra outermost pipeline stage:
//! preflight OPTIONS requests are answered directly (before any binding
//! runs), and every other response gets the policy headers injected
//! unless the handler already set an origin itself.

use crate::method::Method;
use crate::pipeline::{Next, Stage, StageFuture};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use axum::http::StatusCode;

/// CORS response header policy
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<Method>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: vec![
                "Keep-Alive".to_string(),
                "User-Agent".to_string(),
                "X-Requested-With".to_string(),
                "If-Modified-Since".to_string(),
                "Cache-Control".to_string(),
                "Content-Type".to_string(),
            ],
            allow_methods: vec![Method::Get, Method::Post, Method::Options],
        }
    }
}

impl CorsConfig {
    /// Policy allowing any origin with the default header set
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Restrict the allowed origin
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.allow_origin = origin.to_string();
        self
    }

    /// Replace the allowed methods
    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.allow_methods = methods;
        self
    }

    /// Apply the policy headers, keeping any origin the handler set
    pub fn apply(&self, response: &mut ApiResponse) {
        if response.has_header("Access-Control-Allow-Origin") {
            return;
        }
        let methods = self
            .allow_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",");
        // Header names and the joined lists are plain ASCII.
        let _ = response.insert_header("Access-Control-Allow-Origin", &self.allow_origin);
        let _ = response.insert_header("Access-Control-Allow-Headers", &self.allow_headers.join(","));
        let _ = response.insert_header("Access-Control-Allow-Methods", &methods);
    }
}

/// Pipeline stage injecting the policy headers
pub struct CorsStage {
    config: CorsConfig,
}

impl CorsStage {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }
}

impl Stage for CorsStage {
    fn handle(&self, request: ApiRequest, next: Next) -> StageFuture<'static> {
        let config = self.config.clone();
        Box::pin(async move {
            if request.method == Method::Options {
                let mut response = ApiResponse::with_status(StatusCode::NO_CONTENT);
                config.apply(&mut response);
                return Ok(response);
            }
            let mut response = next.run(request).await?;
            config.apply(&mut response);
            Ok(response)
        })
    }

    fn name(&self) -> &'static str {
        "cors"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Endpoint, StagePipeline};
    use axum::http::HeaderMap;
    use serde_json::Map;
    use std::sync::Arc;

    fn request(method: Method) -> ApiRequest {
        ApiRequest::new(
            method,
            "/test",
            HeaderMap::new(),
            Vec::new(),
            Map::new(),
            axum::body::Bytes::new(),
        )
    }

    fn ok_endpoint() -> Endpoint {
        Arc::new(|_request| {
            Box::pin(async { Ok(ApiResponse::ok()) }) as crate::pipeline::StageFuture<'static>
        })
    }

    #[tokio::test]
    async fn test_headers_added_to_response() {
        let mut pipeline = StagePipeline::new();
        pipeline.add(CorsStage::new(CorsConfig::default()));

        let response = pipeline
            .execute(request(Method::Get), ok_endpoint())
            .await
            .unwrap();
        assert!(response.has_header("Access-Control-Allow-Origin"));
        assert!(response.has_header("Access-Control-Allow-Methods"));
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let mut pipeline = StagePipeline::new();
        pipeline.add(CorsStage::new(CorsConfig::default().with_origin("https://app.example")));

        let endpoint: Endpoint = Arc::new(|_request| {
            Box::pin(async {
                let r: crate::errors::ApiResult<ApiResponse> =
                    panic!("preflight must not reach the endpoint");
                r
            }) as crate::pipeline::StageFuture<'static>
        });

        let response = pipeline
            .execute(request(Method::Options), endpoint)
            .await
            .unwrap();
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "https://app.example"
        );
    }

    #[tokio::test]
    async fn test_existing_origin_header_wins() {
        let mut pipeline = StagePipeline::new();
        pipeline.add(CorsStage::new(CorsConfig::default()));

        let endpoint: Endpoint = Arc::new(|_request| {
            Box::pin(async {
                ApiResponse::ok().header("Access-Control-Allow-Origin", "https://other.example")
            }) as crate::pipeline::StageFuture<'static>
        });

        let response = pipeline
            .execute(request(Method::Get), endpoint)
            .await
            .unwrap();
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "https://other.example"
        );
    }
}
