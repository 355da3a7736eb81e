//! End-to-end request binding: raw requests in, typed handler calls out.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use piatto_http::{
    ApiBody, ApiConfig, ApiPath, ApiQuery, ApiResponse, ApiResult, App, Args, CorsConfig, Handler,
    NoArgs, RequestContext, RouteGroup, SimpleContext,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoQuery {
    ids: Vec<String>,
    limit: Option<i64>,
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

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({
            "ids": args.query.ids,
            "limit": args.query.limit,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ShowPath {
    id: i64,
    suffix: String,
}
impl ApiPath for ShowPath {}

struct ShowHandler;

#[async_trait]
impl Handler for ShowHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = NoArgs;
    type Path = ShowPath;
    type Response = NoArgs;

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({
            "id": args.path.id,
            "suffix": args.path.suffix,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct User {
    name: String,
    emails: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateBody {
    user: User,
    inviter: String,
}
impl ApiBody for CreateBody {}

struct CreateHandler;

#[async_trait]
impl Handler for CreateHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = CreateBody;
    type Path = NoArgs;
    type Response = NoArgs;

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({
            "name": args.body.user.name,
            "inviter": args.body.inviter,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TagsForm {
    tags: Vec<String>,
    note: Option<String>,
}
impl ApiBody for TagsForm {}

struct TagsHandler;

#[async_trait]
impl Handler for TagsHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = TagsForm;
    type Path = NoArgs;
    type Response = NoArgs;

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({
            "tags": args.body.tags,
            "note": args.body.note,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SparseBody {
    note: Option<String>,
}
impl ApiBody for SparseBody {}

struct SparseHandler;

#[async_trait]
impl Handler for SparseHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = SparseBody;
    type Path = NoArgs;
    type Response = NoArgs;

    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({ "note": args.body.note }))
    }
}

struct OpenHandler;

#[async_trait]
impl Handler for OpenHandler {
    type Context = SimpleContext;
    type Query = NoArgs;
    type Body = NoArgs;
    type Path = NoArgs;
    type Response = NoArgs;

    fn cors() -> Option<CorsConfig> {
        Some(CorsConfig::default().with_origin("https://app.example"))
    }

    async fn handle(&self, context: Self::Context, _args: Args<Self>) -> ApiResult<ApiResponse> {
        context.success(json!({"open": true}))
    }
}

fn router() -> axum::Router {
    let mut api = RouteGroup::new("api");
    api.get("/echo", EchoHandler)
        .unwrap()
        .get("/users/<int:id>/<suffix>", ShowHandler)
        .unwrap()
        .post("/users", CreateHandler)
        .unwrap()
        .post("/tags", TagsHandler)
        .unwrap()
        .post("/sparse", SparseHandler)
        .unwrap()
        .get("/open", OpenHandler)
        .unwrap();

    App::new(ApiConfig::new("Demo API", "1.0.0"))
        .mount(api)
        .into_router()
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn query_bracket_value_parses_as_json_list() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/echo?ids=%5B%22a%22,%22b%22%5D&limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["ids"], json!(["a", "b"]));
    assert_eq!(payload["limit"], 10);
}

#[tokio::test]
async fn query_comma_value_splits_into_strings() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/echo?ids=a,b,c")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let payload = body_json(response).await;
    assert_eq!(payload["ids"], json!(["a", "b", "c"]));
    assert_eq!(payload["limit"], Value::Null);
}

#[tokio::test]
async fn missing_required_query_field_is_a_validation_error() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/echo?limit=3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let payload = body_json(response).await;
    assert_eq!(payload["success"], false);
    assert_eq!(payload["status_code"], 400);
    assert!(payload["error_hint"].as_str().unwrap().len() >= 5);
    assert_eq!(payload["errors"][0]["field"], "ids");
}

#[tokio::test]
async fn path_variables_bind_typed() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/users/42/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(payload["id"], 42);
    assert_eq!(payload["suffix"], "abc");
}

#[tokio::test]
async fn path_converter_mismatch_is_not_found() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/users/forty-two/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let payload = body_json(response).await;
    assert_eq!(payload["success"], false);
}

#[tokio::test]
async fn json_body_binds_nested_descriptor() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "user": {"name": "ada", "emails": ["ada@example.com"]},
                        "inviter": "grace"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(payload["name"], "ada");
    assert_eq!(payload["inviter"], "grace");
}

#[tokio::test]
async fn json_body_validation_failure_reports_fields() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header("content-type", "application/json")
                .body(Body::from(json!({"user": {"name": "ada"}}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let payload = body_json(response).await;
    assert_eq!(payload["errors"][0]["field"], "inviter");
}

#[tokio::test]
async fn form_body_accepts_single_quoted_lists() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tags")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("tags=%5B%27a%27,%27b%27%5D&note=hi"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(payload["tags"], json!(["a", "b"]));
    assert_eq!(payload["note"], "hi");
}

#[tokio::test]
async fn form_body_comma_list() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tags")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("tags=a,b"))
                .unwrap(),
        )
        .await
        .unwrap();
    let payload = body_json(response).await;
    assert_eq!(payload["tags"], json!(["a", "b"]));
}

#[tokio::test]
async fn unknown_content_type_builds_body_from_defaults() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sparse")
                .header("content-type", "text/plain")
                .body(Body::from("whatever"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload = body_json(response).await;
    assert_eq!(payload["note"], Value::Null);
}

#[tokio::test]
async fn cors_preflight_short_circuits_with_headers() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/open")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example"
    );
}

#[tokio::test]
async fn cors_headers_applied_to_normal_responses() {
    let response = router()
        .oneshot(Request::builder().uri("/open").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example"
    );
}

#[tokio::test]
async fn undeclared_method_is_rejected() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/echo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
}
