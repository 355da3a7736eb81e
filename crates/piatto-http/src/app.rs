//! Application object.
//!
//! `App` collects route groups, owns the document configuration and the
//! cached OpenAPI JSON, and wires everything into the host framework's
//! router. The document is built lazily on first access and the cached
//! snapshot is replaced atomically (build into a new `Arc`, then a
//! single swap under the write lock), so concurrent readers never see a
//! partially built document. Routes mounted after the first build only
//! appear after an explicit forced rebuild.

use crate::errors::{error_hint, ApiError, SetupResult};
use crate::group::RouteGroup;
use crate::method::Method;
use crate::pattern::RoutePattern;
use crate::pipeline::{Endpoint, StagePipeline};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use axum::extract::Path;
use axum::http::StatusCode;
use piatto_openapi::{ui, ApiConfig, DocumentBuilder, OpenApiResult, OpenApiSpec};
use schemars::JsonSchema;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Paths for the OpenAPI JSON document and the documentation UI pages.
/// Any page can be disabled by setting its path to `None`.
#[derive(Debug, Clone)]
pub struct DocsConfig {
    /// Master switch for all documentation endpoints
    pub enabled: bool,
    /// Optional prefix prepended to every documentation path
    pub url_prefix: Option<String>,
    pub spec_path: Option<String>,
    pub docs_path: Option<String>,
    pub redoc_path: Option<String>,
    pub oauth2_redirect_path: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_prefix: None,
            spec_path: Some("/openapi.json".to_string()),
            docs_path: Some("/docs".to_string()),
            redoc_path: Some("/redoc".to_string()),
            oauth2_redirect_path: Some("/docs/oauth2-redirect".to_string()),
        }
    }
}

impl DocsConfig {
    /// Disable every documentation endpoint
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the documentation URL prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.url_prefix = Some(prefix.trim_end_matches('/').to_string());
        self
    }

    /// Move the spec document path
    pub fn with_spec_path(mut self, path: &str) -> Self {
        self.spec_path = Some(path.to_string());
        self
    }

    fn prefixed(&self, path: &str) -> String {
        match &self.url_prefix {
            Some(prefix) => format!("{prefix}{path}"),
            None => path.to_string(),
        }
    }
}

/// Hook turning a request-time error into the client response
pub type ErrorHook = Arc<dyn Fn(&ApiError) -> ApiResponse + Send + Sync>;

/// The application: groups, document configuration, and the cached spec
pub struct App {
    config: ApiConfig,
    docs: DocsConfig,
    groups: Vec<RouteGroup>,
    shared_schemas: BTreeSet<String>,
    error_hook: ErrorHook,
    spec_cache: RwLock<Option<Arc<String>>>,
}

impl App {
    /// Create an application with the given document configuration
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            docs: DocsConfig::default(),
            groups: Vec::new(),
            shared_schemas: BTreeSet::new(),
            error_hook: Arc::new(default_error_response),
            spec_cache: RwLock::new(None),
        }
    }

    /// Replace the documentation endpoint configuration
    pub fn with_docs(mut self, docs: DocsConfig) -> Self {
        self.docs = docs;
        self
    }

    /// Mount a route group
    pub fn mount(mut self, group: RouteGroup) -> Self {
        tracing::debug!(group = group.name(), routes = group.routes().len(), "mounted group");
        self.groups.push(group);
        self
    }

    /// Register a model type under its bare schema name, shared across
    /// handlers instead of being namespaced per handler
    pub fn share_schema<T: JsonSchema>(mut self) -> Self {
        self.shared_schemas.insert(T::schema_name());
        self
    }

    /// Replace the request-time error hook
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiError) -> ApiResponse + Send + Sync + 'static,
    {
        self.error_hook = Arc::new(hook);
        self
    }

    /// Build the document tree from the currently mounted groups.
    /// Uncached; `openapi_json` is the cached entry point.
    pub fn openapi_document(&self) -> OpenApiResult<OpenApiSpec> {
        let tags: Vec<_> = self.groups.iter().map(|g| g.tag_doc()).collect();
        let routes: Vec<_> = self.groups.iter().flat_map(|g| g.route_docs()).collect();
        DocumentBuilder::new(self.config.clone())
            .with_shared(self.shared_schemas.iter().cloned())
            .generate(&tags, &routes)
    }

    /// The OpenAPI document as JSON text. Cached after the first build;
    /// `force_update` rebuilds and atomically replaces the snapshot.
    pub fn openapi_json(&self, force_update: bool) -> OpenApiResult<Arc<String>> {
        if !force_update {
            if let Ok(cache) = self.spec_cache.read() {
                if let Some(cached) = cache.as_ref() {
                    return Ok(cached.clone());
                }
            }
        }

        let spec = self.openapi_document()?;
        let json = Arc::new(spec.to_json(false)?);
        if let Ok(mut cache) = self.spec_cache.write() {
            *cache = Some(json.clone());
        }
        Ok(json)
    }

    /// Wire every route and documentation endpoint into an axum router
    pub fn into_router(self) -> SetupResult<axum::Router> {
        let docs = self.docs.clone();
        let error_hook = self.error_hook.clone();
        let app = Arc::new(self);

        // One axum route per path; dispatch by method inside so routes
        // from different groups can share a rule.
        let mut by_path: BTreeMap<String, Vec<RouteDispatch>> = BTreeMap::new();
        for group in &app.groups {
            for route in group.routes() {
                by_path
                    .entry(route.pattern.to_axum())
                    .or_default()
                    .push(RouteDispatch {
                        methods: route.methods.clone(),
                        pattern: route.pattern.clone(),
                        pipeline: route.pipeline.clone(),
                        endpoint: route.endpoint.clone(),
                    });
            }
        }

        let mut router = axum::Router::new();
        for (path, dispatches) in by_path {
            let mut seen = BTreeSet::new();
            for dispatch in &dispatches {
                for method in &dispatch.methods {
                    if !seen.insert(*method) {
                        return Err(crate::errors::SetupError::DuplicateRoute {
                            method: method.to_string(),
                            rule: path.clone(),
                        });
                    }
                }
            }

            let dispatches = Arc::new(dispatches);
            let hook = error_hook.clone();
            let handler = move |Path(raw): Path<HashMap<String, String>>,
                                request: axum::extract::Request| {
                let dispatches = dispatches.clone();
                let hook = hook.clone();
                async move { dispatch_request(&dispatches, &hook, raw, request).await }
            };
            router = router.route(&path, axum::routing::any(handler));
        }

        if docs.enabled {
            router = mount_docs(router, &docs, app.clone());
        }

        Ok(router)
    }
}

/// Per-path dispatch entry used by the router glue
struct RouteDispatch {
    methods: BTreeSet<Method>,
    pattern: Arc<RoutePattern>,
    pipeline: StagePipeline,
    endpoint: Endpoint,
}

async fn dispatch_request(
    dispatches: &[RouteDispatch],
    hook: &ErrorHook,
    raw_params: HashMap<String, String>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let method = Method::from_axum(request.method());
    let dispatch = method.and_then(|m| dispatches.iter().find(|d| d.methods.contains(&m)));
    let Some(dispatch) = dispatch else {
        return ApiResponse::with_status(StatusCode::METHOD_NOT_ALLOWED).into_axum();
    };

    let result = match ApiRequest::from_axum(request, &dispatch.pattern, raw_params).await {
        Ok(api_request) => {
            dispatch
                .pipeline
                .execute(api_request, dispatch.endpoint.clone())
                .await
        }
        Err(error) => Err(error),
    };

    match result {
        Ok(response) => response.into_axum(),
        Err(error) => hook(&error).into_axum(),
    }
}

/// Register the spec document and the documentation UI pages
fn mount_docs(mut router: axum::Router, docs: &DocsConfig, app: Arc<App>) -> axum::Router {
    let spec_url = docs.prefixed(docs.spec_path.as_deref().unwrap_or("/openapi.json"));

    if let Some(spec_path) = &docs.spec_path {
        let app = app.clone();
        let handler = move || {
            let app = app.clone();
            async move {
                match app.openapi_json(false) {
                    Ok(json) => serve_json((*json).clone()),
                    Err(error) => {
                        tracing::error!("document build failed: {error}");
                        ApiResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR)
                            .json(json!({
                                "success": false,
                                "status_code": 500,
                                "status_message": "failed to build the API document",
                                "error_hint": error_hint(),
                            }))
                            .into_axum()
                    }
                }
            }
        };
        router = router.route(&docs.prefixed(spec_path), axum::routing::get(handler));
    }

    if let Some(docs_path) = &docs.docs_path {
        let oauth2_redirect_url = docs
            .oauth2_redirect_path
            .as_deref()
            .map(|path| docs.prefixed(path));
        let page = ui::swagger_html(&spec_url, oauth2_redirect_url.as_deref());
        let handler = move || {
            let page = page.clone();
            async move { ApiResponse::ok().html(page).into_axum() }
        };
        router = router.route(&docs.prefixed(docs_path), axum::routing::get(handler));
    }

    if let Some(redoc_path) = &docs.redoc_path {
        let page = ui::redoc_html(&spec_url);
        let handler = move || {
            let page = page.clone();
            async move { ApiResponse::ok().html(page).into_axum() }
        };
        router = router.route(&docs.prefixed(redoc_path), axum::routing::get(handler));
    }

    if let Some(oauth2_path) = &docs.oauth2_redirect_path {
        let handler = || async { ApiResponse::ok().html(ui::oauth2_redirect_html()).into_axum() };
        router = router.route(&docs.prefixed(oauth2_path), axum::routing::get(handler));
    }

    router
}

fn serve_json(json: String) -> axum::response::Response {
    match ApiResponse::ok()
        .text(json)
        .header("Content-Type", "application/json")
    {
        Ok(response) => response.into_axum(),
        Err(_) => ApiResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR).into_axum(),
    }
}

/// Default error hook: the uniform client envelope. Carries an opaque
/// hint for log correlation and no internal detail.
fn default_error_response(error: &ApiError) -> ApiResponse {
    let status_code = error.status_code();
    let hint = error_hint();
    tracing::error!(status_code, hint = %hint, "request failed: {error}");

    let status_message = match error {
        ApiError::Validation(_) => "validation failed".to_string(),
        ApiError::BadRequest { message } => message.clone(),
        ApiError::NotFound { message } => message.clone(),
        ApiError::Internal { .. } => "internal server error".to_string(),
    };

    let mut payload = json!({
        "success": false,
        "status_code": status_code,
        "status_message": status_message,
        "error_hint": hint,
    });
    if let ApiError::Validation(errors) = error {
        if let Ok(fields) = serde_json::to_value(&errors.errors) {
            payload["errors"] = fields;
        }
    }

    ApiResponse::with_status(
        StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    )
    .json(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::NoArgs;
    use crate::context::SimpleContext;
    use crate::errors::ApiResult;
    use crate::handler::{Args, Handler};
    use async_trait::async_trait;

    struct PingHandler;

    #[async_trait]
    impl Handler for PingHandler {
        type Context = SimpleContext;
        type Query = NoArgs;
        type Body = NoArgs;
        type Path = NoArgs;
        type Response = NoArgs;

        async fn handle(
            &self,
            context: Self::Context,
            _args: Args<Self>,
        ) -> ApiResult<ApiResponse> {
            context.success(json!({"pong": true}))
        }
    }

    fn app_with_ping() -> App {
        let mut group = RouteGroup::new("misc");
        group.get("/ping", PingHandler).unwrap();
        App::new(ApiConfig::new("Test API", "1.0.0")).mount(group)
    }

    #[test]
    fn test_document_is_cached_until_forced() {
        let app = app_with_ping();
        let first = app.openapi_json(false).unwrap();
        let second = app.openapi_json(false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stale_after_mount_until_forced_rebuild() {
        let mut app = app_with_ping();
        let before = app.openapi_json(false).unwrap();
        assert!(before.contains("/ping"));
        assert!(!before.contains("/late"));

        let mut late = RouteGroup::new("late");
        late.get("/late", PingHandler).unwrap();
        app = app.mount(late);

        // Cached document does not reflect the new route.
        let stale = app.openapi_json(false).unwrap();
        assert!(!stale.contains("/late"));

        // Forced rebuild does.
        let rebuilt = app.openapi_json(true).unwrap();
        assert!(rebuilt.contains("/late"));
    }

    #[test]
    fn test_error_envelope_has_hint() {
        let error = ApiError::Validation(crate::errors::ValidationErrors::single(
            "ids",
            "field is required",
        ));
        let response = default_error_response(&error);
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_into_router_rejects_cross_group_duplicates() {
        let mut first = RouteGroup::new("a");
        first.get("/ping", PingHandler).unwrap();
        let mut second = RouteGroup::new("b");
        second.get("/ping", PingHandler).unwrap();

        let app = App::new(ApiConfig::new("Test API", "1.0.0"))
            .mount(first)
            .mount(second);
        assert!(app.into_router().is_err());
    }
}
