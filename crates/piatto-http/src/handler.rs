//! Class-based request handlers.
//!
//! A handler declares its contract entirely through associated types:
//! which context it runs with and which query/body/path/response
//! descriptors it consumes ([`NoArgs`](crate::args::NoArgs) for the
//! parts it does not). The declaration is checked once, at registration,
//! and the compiler enforces that the `handle` signature matches it —
//! there is no runtime signature inspection.

use crate::args::{ApiBody, ApiPath, ApiQuery, ApiResp};
use crate::context::RequestContext;
use crate::cors::CorsConfig;
use crate::errors::{ApiResult, SetupResult};
use crate::response::ApiResponse;
use async_trait::async_trait;
use piatto_openapi::SchemaSource;

/// A class-based request handler bound to one route
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Per-request context type, constructed fresh for every call
    type Context: RequestContext;
    /// Query descriptor, or `NoArgs`
    type Query: ApiQuery;
    /// Body descriptor, or `NoArgs`
    type Body: ApiBody;
    /// Path descriptor, or `NoArgs`
    type Path: ApiPath;
    /// Response descriptor, or `NoArgs`
    type Response: ApiResp;

    /// Handler name used to namespace descriptor aliases
    fn name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }

    /// One-line operation summary shown in the document
    fn summary() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// CORS policy; a route with one automatically accepts OPTIONS
    fn cors() -> Option<CorsConfig>
    where
        Self: Sized,
    {
        None
    }

    /// Handle one request with the validated, typed arguments
    async fn handle(&self, context: Self::Context, args: Args<Self>) -> ApiResult<ApiResponse>;
}

/// The typed arguments bound for one request. Parts the handler did not
/// declare are `NoArgs`.
pub struct Args<H: Handler + ?Sized> {
    pub query: H::Query,
    pub body: H::Body,
    pub path: H::Path,
}

/// The declared parts of a handler, with namespaced aliases assigned
#[derive(Debug, Clone)]
pub struct HandlerParts {
    pub query: Option<SchemaSource>,
    pub body: Option<SchemaSource>,
    pub path: Option<SchemaSource>,
    pub response: Option<SchemaSource>,
    pub response_status: u16,
}

impl HandlerParts {
    /// Collect a handler's declared descriptors and assign each the
    /// alias `<HandlerName>$<DescriptorName>`. Deterministic, and
    /// collision-free across handlers that reuse descriptor names.
    pub fn of<H: Handler>() -> SetupResult<Self> {
        let handler = H::name();
        let namespace =
            |source: SchemaSource| -> SchemaSource {
                let alias = format!("{handler}${}", source.name);
                source.with_alias(alias)
            };
        Ok(Self {
            query: <H::Query as ApiQuery>::descriptor()?.map(namespace),
            body: <H::Body as ApiBody>::descriptor()?.map(namespace),
            path: <H::Path as ApiPath>::descriptor()?.map(namespace),
            response: <H::Response as ApiResp>::descriptor()?.map(namespace),
            response_status: <H::Response as ApiResp>::status_code(),
        })
    }
}

/// Last path segment of a type name
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}
