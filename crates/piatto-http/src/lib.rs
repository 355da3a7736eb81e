/*!
# piatto-http

Class-based request handlers for axum with declarative schema validation
and automatic OpenAPI 3.0 documentation.

A handler declares the shape of its query, body, path, and response
parts as plain structs; the framework validates every incoming request
against those shapes, injects the typed values, and projects the same
declarations into a machine-readable API document served alongside the
routes.

## Usage

```rust,no_run
use async_trait::async_trait;
use piatto_http::{
    ApiConfig, ApiQuery, ApiResult, App, ApiResponse, Args, Handler, NoArgs, RouteGroup,
    SimpleContext, RequestContext,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoQuery {
    ids: Vec<String>,
}
impl ApiQuery for EchoQuery {}

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    type Context = SimpleContext;
    type Query = EchoQuery;
    type Body = NoArgs;
    type Path = NoArgs;
    type Response = NoArgs;

    /// Echo the requested ids back.
    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({ "ids": args.query.ids }))
    }
}

let mut api = RouteGroup::new("api");
api.get("/echo", EchoHandler).unwrap();

let app = App::new(ApiConfig::new("Demo", "1.0.0")).mount(api);
let router = app.into_router().unwrap();
# let _ = router;
```
*/

// Re-export main types
pub use crate::{
    app::{App, DocsConfig, ErrorHook},
    args::{ApiBody, ApiPath, ApiQuery, ApiResp, NoArgs},
    context::{RequestContext, SimpleContext},
    cors::CorsConfig,
    errors::{ApiError, ApiResult, SetupError, SetupResult, ValidationErrors},
    group::RouteGroup,
    handler::{Args, Handler},
    method::Method,
    request::ApiRequest,
    response::ApiResponse,
};

// Document types come from the openapi crate
pub use piatto_openapi::{ApiConfig, OpenApiError, OpenApiResult, OpenApiSpec};

// Core modules
pub mod app;
pub mod args;
pub mod context;
pub mod errors;
pub mod group;
pub mod handler;
pub mod method;
pub mod pattern;
pub mod pipeline;
pub mod request;
pub mod response;

// Cross-cutting stages
pub mod cors;
