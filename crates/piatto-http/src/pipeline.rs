//! Request pipeline.
//!
//! Cross-cutting request processing is an explicit, ordered list of
//! stages composed once at route registration: each stage receives the
//! request and a continue capability ([`Next`]), and the chain bottoms
//! out in the typed endpoint that invokes the handler. The standard
//! stack is CORS (when configured), context construction, then argument
//! binding.

use crate::args::plan::FieldPlan;
use crate::args::{ApiBody, ApiPath, ApiQuery};
use crate::errors::{ApiError, ApiResult};
use crate::handler::{Args, Handler, HandlerParts};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use serde_json::{Map, Value};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by stages and endpoints
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = ApiResult<ApiResponse>> + Send + 'a>>;

/// The terminal, handler-invoking end of a pipeline
pub type Endpoint = Arc<dyn Fn(ApiRequest) -> StageFuture<'static> + Send + Sync>;

/// The rest of the chain after the current stage
pub struct Next {
    handler: Box<dyn FnOnce(ApiRequest) -> StageFuture<'static> + Send>,
}

impl Next {
    /// Create a continuation from a handler function
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(ApiRequest) -> StageFuture<'static> + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Run the rest of the chain with the given request
    pub async fn run(self, request: ApiRequest) -> ApiResult<ApiResponse> {
        (self.handler)(request).await
    }
}

/// One stage of the request pipeline
pub trait Stage: Send + Sync {
    /// Process the request and call the rest of the chain
    fn handle(&self, request: ApiRequest, next: Next) -> StageFuture<'static>;

    /// Stage name for diagnostics
    fn name(&self) -> &'static str {
        "Stage"
    }
}

/// Ordered stage list composed at registration time
#[derive(Clone, Default)]
pub struct StagePipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl StagePipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage
    pub fn add<S: Stage + 'static>(&mut self, stage: S) {
        self.stages.push(Arc::new(stage));
    }

    /// Stage names, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Execute the pipeline, ending in the given endpoint
    pub async fn execute(&self, request: ApiRequest, endpoint: Endpoint) -> ApiResult<ApiResponse> {
        let mut chain: Box<dyn FnOnce(ApiRequest) -> StageFuture<'static> + Send> =
            Box::new(move |req| endpoint(req));

        for stage in self.stages.iter().rev() {
            let stage = stage.clone();
            let next_handler = chain;
            chain = Box::new(move |req| {
                let next = Next::new(next_handler);
                stage.handle(req, next)
            });
        }

        chain(request).await
    }
}

/// Constructs the per-request context and stores it for the endpoint
pub struct ContextStage<C> {
    _context: PhantomData<fn() -> C>,
}

impl<C> ContextStage<C> {
    pub fn new() -> Self {
        Self {
            _context: PhantomData,
        }
    }
}

impl<C> Default for ContextStage<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: crate::context::RequestContext> Stage for ContextStage<C> {
    fn handle(&self, mut request: ApiRequest, next: Next) -> StageFuture<'static> {
        Box::pin(async move {
            request.insert_extension(C::default());
            next.run(request).await
        })
    }

    fn name(&self) -> &'static str {
        "context"
    }
}

/// Parses the declared request parts and stores the typed [`Args`] for
/// the endpoint. Plans are computed once, at registration.
pub struct BindStage<H: Handler> {
    query_plan: Option<Arc<FieldPlan>>,
    body_plan: Option<Arc<FieldPlan>>,
    path_plan: Option<Arc<FieldPlan>>,
    _handler: PhantomData<fn() -> H>,
}

impl<H: Handler> BindStage<H> {
    /// Build the binder from the handler's declared parts
    pub fn from_parts(parts: &HandlerParts) -> Self {
        let plan = |part: &'static str, source: &Option<piatto_openapi::SchemaSource>| {
            source
                .as_ref()
                .map(|source| Arc::new(FieldPlan::from_schema(part, &source.schema)))
        };
        Self {
            query_plan: plan("query", &parts.query),
            body_plan: plan("body", &parts.body),
            path_plan: plan("path", &parts.path),
            _handler: PhantomData,
        }
    }
}

impl<H: Handler> Stage for BindStage<H> {
    fn handle(&self, mut request: ApiRequest, next: Next) -> StageFuture<'static> {
        let query_plan = self.query_plan.clone();
        let body_plan = self.body_plan.clone();
        let path_plan = self.path_plan.clone();

        Box::pin(async move {
            let query: H::Query = match &query_plan {
                Some(plan) => H::Query::parse_query(plan, request.query_pairs())?,
                None => H::Query::absent()?,
            };

            let body: H::Body = match &body_plan {
                Some(plan) => match request.content_type() {
                    Some("application/json") => H::Body::parse_json(plan, request.json_body()?)?,
                    Some("application/x-www-form-urlencoded") => {
                        H::Body::parse_form(plan, &request.form_pairs()?)?
                    }
                    // Unrecognized content type: the descriptor is built
                    // from an empty object and field defaults apply.
                    _ => H::Body::parse_json(plan, Value::Object(Map::new()))?,
                },
                None => H::Body::absent()?,
            };

            let path: H::Path = match &path_plan {
                Some(plan) => H::Path::parse_path(plan, request.path_vars())?,
                None => H::Path::absent()?,
            };

            request.insert_extension(Args::<H> { query, body, path });
            next.run(request).await
        })
    }

    fn name(&self) -> &'static str {
        "bind"
    }
}

/// Build the typed endpoint closure that unpacks the context and bound
/// arguments and invokes the handler
pub fn endpoint_for<H: Handler>(handler: H) -> Endpoint {
    let handler = Arc::new(handler);
    Arc::new(move |mut request: ApiRequest| {
        let handler = handler.clone();
        Box::pin(async move {
            let context = request
                .take_extension::<H::Context>()
                .ok_or_else(|| ApiError::internal("request context was not constructed"))?;
            let args = request
                .take_extension::<Args<H>>()
                .ok_or_else(|| ApiError::internal("request arguments were not bound"))?;
            handler.handle(context, args).await
        }) as StageFuture<'static>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use axum::http::HeaderMap;

    fn empty_request() -> ApiRequest {
        ApiRequest::new(
            Method::Get,
            "/test",
            HeaderMap::new(),
            Vec::new(),
            Map::new(),
            axum::body::Bytes::new(),
        )
    }

    struct RecordStage(&'static str);

    impl Stage for RecordStage {
        fn handle(&self, mut request: ApiRequest, next: Next) -> StageFuture<'static> {
            let label = self.0;
            Box::pin(async move {
                let mut seen = request.take_extension::<Vec<&'static str>>().unwrap_or_default();
                seen.push(label);
                request.insert_extension(seen);
                next.run(request).await
            })
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_registration_order() {
        let mut pipeline = StagePipeline::new();
        pipeline.add(RecordStage("first"));
        pipeline.add(RecordStage("second"));

        let endpoint: Endpoint = Arc::new(|mut request: ApiRequest| {
            Box::pin(async move {
                let seen = request.take_extension::<Vec<&'static str>>().unwrap_or_default();
                assert_eq!(seen, vec!["first", "second"]);
                Ok(ApiResponse::ok())
            }) as StageFuture<'static>
        });

        pipeline.execute(empty_request(), endpoint).await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        struct Reject;
        impl Stage for Reject {
            fn handle(&self, _request: ApiRequest, _next: Next) -> StageFuture<'static> {
                Box::pin(async { Err(ApiError::bad_request("rejected")) })
            }
        }

        let mut pipeline = StagePipeline::new();
        pipeline.add(Reject);
        let endpoint: Endpoint = Arc::new(|_request| {
            Box::pin(async {
                let r: ApiResult<ApiResponse> = panic!("endpoint must not run");
                r
            }) as StageFuture<'static>
        });

        let err = pipeline.execute(empty_request(), endpoint).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }
}
