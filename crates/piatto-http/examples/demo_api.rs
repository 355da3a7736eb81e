//! Small demo API: an echo endpoint, a user-creation endpoint with a
//! nested body model, and a health check.
//!
//! Run with `cargo run --example demo_api`, then open
//! http://127.0.0.1:8000/docs for the interactive explorer.

use async_trait::async_trait;
use piatto_http::{
    ApiBody, ApiConfig, ApiQuery, ApiResp, ApiResponse, ApiResult, App, Args, CorsConfig, Handler,
    NoArgs, RequestContext, RouteGroup, SimpleContext,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoQuery {
    /// Values to echo back
    ids: Vec<String>,
    verbose: Option<bool>,
}
impl ApiQuery for EchoQuery {
    fn description() -> Option<&'static str> {
        Some("Echo filters")
    }
}

#[derive(Debug, Serialize, JsonSchema)]
struct EchoResp {
    ids: Vec<String>,
    count: usize,
}
impl ApiResp for EchoResp {}

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    type Context = SimpleContext;
    type Query = EchoQuery;
    type Body = NoArgs;
    type Path = NoArgs;
    type Response = EchoResp;

    fn summary() -> Option<&'static str> {
        Some("Echo the requested ids back")
    }

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        if args.query.verbose.unwrap_or(false) {
            tracing::info!(count = args.query.ids.len(), "echoing ids");
        }
        context.success(json!({
            "ids": args.query.ids,
            "count": args.query.ids.len(),
        }))
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct User {
    name: String,
    emails: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateUserBody {
    user: User,
    inviter: String,
}
impl ApiBody for CreateUserBody {}

struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = CreateUserBody;
    type Path = NoArgs;
    type Response = NoArgs;

    fn summary() -> Option<&'static str> {
        Some("Create a user")
    }

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({
            "user": {"name": args.body.user.name, "emails": args.body.user.emails},
            "inviter": args.body.inviter,
        }))
    }
}

struct HealthCheckHandler;

#[async_trait]
impl Handler for HealthCheckHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = NoArgs;
    type Path = NoArgs;
    type Response = NoArgs;

    fn summary() -> Option<&'static str> {
        Some("Liveness probe")
    }

    fn cors() -> Option<CorsConfig> {
        Some(CorsConfig::permissive())
    }

    async fn handle(&self, context: Self::Context, _args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({"healthy": true}))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,piatto_http=debug".into()),
        )
        .init();

    let mut api = RouteGroup::new("demo").with_tag_description("demo endpoints");
    api.get("/echo", EchoHandler)
        .expect("echo route")
        .post("/user", UserHandler)
        .expect("user route")
        .get("/health_check", HealthCheckHandler)
        .expect("health route");

    let app = App::new(
        ApiConfig::new("piatto demo", "0.1.0")
            .with_description("Demo application for the piatto handler framework")
            .add_server("http://127.0.0.1:8000", Some("local")),
    )
    .mount(api);

    let router = app.into_router().expect("router");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8000")
        .await
        .expect("bind");
    tracing::info!("demo api listening on http://127.0.0.1:8000 (docs at /docs)");
    axum::serve(listener, router).await.expect("serve");
}
