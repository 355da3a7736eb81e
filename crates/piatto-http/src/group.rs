//! Route groups and the route registrar.
//!
//! A [`RouteGroup`] binds handlers to method + rule pairs and owns the
//! registration-time validation: rules must parse, path descriptors must
//! agree with the rule's variables, and duplicate registrations are
//! rejected. Everything here fails before the server starts serving —
//! configuration errors never reach a client.

use crate::cors::CorsStage;
use crate::errors::{SetupError, SetupResult};
use crate::handler::{Handler, HandlerParts};
use crate::method::Method;
use crate::pattern::RoutePattern;
use crate::pipeline::{endpoint_for, BindStage, ContextStage, Endpoint, StagePipeline};
use piatto_openapi::{RouteDoc, TagDoc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// One registered route: immutable after registration
pub struct Route {
    pub(crate) methods: BTreeSet<Method>,
    pub(crate) pattern: Arc<RoutePattern>,
    pub(crate) pipeline: StagePipeline,
    pub(crate) endpoint: Endpoint,
    pub(crate) parts: HandlerParts,
    pub(crate) summary: Option<String>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// A named group of routes sharing a URL prefix and a document tag
pub struct RouteGroup {
    name: String,
    prefix: Option<String>,
    tag: Option<String>,
    tag_description: Option<String>,
    routes: Vec<Route>,
}

impl RouteGroup {
    /// Create a group; its name doubles as the default tag
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: None,
            tag: None,
            tag_description: None,
            routes: Vec::new(),
        }
    }

    /// Prepend a static prefix to every rule registered on this group
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.trim_end_matches('/').to_string());
        self
    }

    /// Override the document tag (defaults to the group name)
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Set the tag description shown in the document
    pub fn with_tag_description(mut self, description: &str) -> Self {
        self.tag_description = Some(description.to_string());
        self
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective document tag
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.name)
    }

    /// Register a handler for GET on the given rule
    pub fn get<H: Handler>(&mut self, rule: &str, handler: H) -> SetupResult<&mut Self> {
        self.register(Method::Get, rule, handler)
    }

    /// Register a handler for POST on the given rule
    pub fn post<H: Handler>(&mut self, rule: &str, handler: H) -> SetupResult<&mut Self> {
        self.register(Method::Post, rule, handler)
    }

    /// Register a handler for PUT on the given rule
    pub fn put<H: Handler>(&mut self, rule: &str, handler: H) -> SetupResult<&mut Self> {
        self.register(Method::Put, rule, handler)
    }

    /// Register a handler for DELETE on the given rule
    pub fn delete<H: Handler>(&mut self, rule: &str, handler: H) -> SetupResult<&mut Self> {
        self.register(Method::Delete, rule, handler)
    }

    /// Register a handler for PATCH on the given rule
    pub fn patch<H: Handler>(&mut self, rule: &str, handler: H) -> SetupResult<&mut Self> {
        self.register(Method::Patch, rule, handler)
    }

    /// Register a handler for one method on one rule.
    ///
    /// Validates the rule, the path descriptor against the rule's
    /// variables, and duplicate registrations; computes the descriptor
    /// aliases; composes the request pipeline (CORS when configured,
    /// context construction, argument binding) around the handler. A
    /// CORS policy adds OPTIONS to the accepted method set.
    pub fn register<H: Handler>(
        &mut self,
        method: Method,
        rule: &str,
        handler: H,
    ) -> SetupResult<&mut Self> {
        let full_rule = match &self.prefix {
            Some(prefix) => format!("{prefix}{rule}"),
            None => rule.to_string(),
        };
        let pattern = RoutePattern::parse(&full_rule)?;

        if self
            .routes
            .iter()
            .any(|route| route.pattern.rule() == pattern.rule() && route.methods.contains(&method))
        {
            return Err(SetupError::DuplicateRoute {
                method: method.to_string(),
                rule: full_rule,
            });
        }

        let parts = HandlerParts::of::<H>()?;
        validate_path_descriptor::<H>(&pattern, &parts)?;

        let cors = H::cors();
        let mut methods = BTreeSet::from([method]);
        if cors.is_some() {
            methods.insert(Method::Options);
        }

        let mut pipeline = StagePipeline::new();
        if let Some(config) = cors {
            pipeline.add(CorsStage::new(config));
        }
        pipeline.add(ContextStage::<H::Context>::new());
        pipeline.add(BindStage::<H>::from_parts(&parts));

        tracing::debug!(
            handler = H::name(),
            rule = %pattern,
            method = %method,
            stages = ?pipeline.names(),
            "registered route"
        );

        self.routes.push(Route {
            methods,
            pattern: Arc::new(pattern),
            pipeline,
            endpoint: endpoint_for(handler),
            parts,
            summary: H::summary().map(str::to_string),
        });
        Ok(self)
    }

    /// Registered routes
    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Tag metadata for the document builder
    pub(crate) fn tag_doc(&self) -> TagDoc {
        TagDoc {
            name: self.tag().to_string(),
            description: self.tag_description.clone(),
        }
    }

    /// Route metadata for the document builder: one record per accepted
    /// method on each route
    pub(crate) fn route_docs(&self) -> Vec<RouteDoc> {
        let mut docs = Vec::new();
        for route in &self.routes {
            for method in &route.methods {
                docs.push(RouteDoc {
                    method: method.as_str().to_string(),
                    path: route.pattern.to_openapi(),
                    tag: self.tag().to_string(),
                    summary: route.summary.clone(),
                    query: route.parts.query.clone(),
                    body: route.parts.body.clone(),
                    path_args: route.parts.path.clone(),
                    response: route.parts.response.clone(),
                    response_status: route.parts.response_status,
                });
            }
        }
        docs
    }
}

/// The rule's variables and the path descriptor's fields must agree
/// exactly; a mismatch is a configuration error raised at registration,
/// never deferred to request time.
fn validate_path_descriptor<H: Handler>(
    pattern: &RoutePattern,
    parts: &HandlerParts,
) -> SetupResult<()> {
    let params = pattern.params();
    match (&parts.path, params.is_empty()) {
        (None, true) => Ok(()),
        (None, false) => Err(SetupError::path_mismatch(
            H::name(),
            pattern.rule(),
            "rule declares variables but the handler has no path descriptor",
        )),
        (Some(_), true) => Err(SetupError::path_mismatch(
            H::name(),
            pattern.rule(),
            "handler declares a path descriptor but the rule has no variables",
        )),
        (Some(source), false) => {
            let fields: BTreeSet<&str> = source
                .schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|properties| properties.keys().map(String::as_str).collect())
                .unwrap_or_default();

            for param in &params {
                if !fields.contains(param.name.as_str()) {
                    return Err(SetupError::path_mismatch(
                        H::name(),
                        pattern.rule(),
                        format!("rule variable `{}` has no descriptor field", param.name),
                    ));
                }
            }
            let param_names: BTreeSet<&str> =
                params.iter().map(|p| p.name.as_str()).collect();
            for field in fields {
                if !param_names.contains(field) {
                    return Err(SetupError::path_mismatch(
                        H::name(),
                        pattern.rule(),
                        format!("descriptor field `{field}` has no rule variable"),
                    ));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::NoArgs;
    use crate::context::{RequestContext, SimpleContext};
    use crate::cors::CorsConfig;
    use crate::errors::{ApiResult, SetupError};
    use crate::handler::Args;
    use crate::response::ApiResponse;
    use async_trait::async_trait;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct ShowPath {
        id: i64,
    }
    impl crate::args::ApiPath for ShowPath {}

    struct ShowHandler;

    #[async_trait]
    impl Handler for ShowHandler {
        type Context = SimpleContext;
        type Query = NoArgs;
        type Body = NoArgs;
        type Path = ShowPath;
        type Response = NoArgs;

        async fn handle(
            &self,
            context: Self::Context,
            args: Args<Self>,
        ) -> ApiResult<ApiResponse> {
            context.success(json!({ "id": args.path.id }))
        }
    }

    struct PlainHandler;

    #[async_trait]
    impl Handler for PlainHandler {
        type Context = SimpleContext;
        type Query = NoArgs;
        type Body = NoArgs;
        type Path = NoArgs;
        type Response = NoArgs;

        fn cors() -> Option<CorsConfig> {
            Some(CorsConfig::default())
        }

        async fn handle(
            &self,
            context: Self::Context,
            _args: Args<Self>,
        ) -> ApiResult<ApiResponse> {
            context.success(json!({}))
        }
    }

    #[test]
    fn test_register_and_docs() {
        let mut group = RouteGroup::new("users").with_prefix("/users");
        group.get("/<int:id>", ShowHandler).unwrap();

        let docs = group.route_docs();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].method, "GET");
        assert_eq!(docs[0].path, "/users/{id}");
        assert_eq!(docs[0].tag, "users");
        assert_eq!(docs[0].path_args.as_ref().unwrap().alias, "ShowHandler$ShowPath");
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut group = RouteGroup::new("users");
        group.get("/<int:id>", ShowHandler).unwrap();
        let err = group.get("/<int:id>", ShowHandler).unwrap_err();
        assert!(matches!(err, SetupError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_missing_path_descriptor_fails_fast() {
        let mut group = RouteGroup::new("users");
        let err = group.get("/<int:id>", PlainHandler).unwrap_err();
        assert!(matches!(err, SetupError::PathMismatch { .. }));
    }

    #[test]
    fn test_unused_path_descriptor_fails_fast() {
        let mut group = RouteGroup::new("users");
        let err = group.get("/all", ShowHandler).unwrap_err();
        assert!(matches!(err, SetupError::PathMismatch { .. }));
    }

    #[test]
    fn test_variable_without_descriptor_field_fails_fast() {
        let mut group = RouteGroup::new("users");
        let err = group.get("/<int:id>/<extra>", ShowHandler).unwrap_err();
        assert!(matches!(err, SetupError::PathMismatch { .. }));
    }

    #[test]
    fn test_descriptor_field_without_variable_fails_fast() {
        #[derive(Debug, Deserialize, JsonSchema)]
        struct WidePath {
            id: i64,
            name: String,
        }
        impl crate::args::ApiPath for WidePath {}

        struct WideHandler;

        #[async_trait]
        impl Handler for WideHandler {
            type Context = SimpleContext;
            type Query = NoArgs;
            type Body = NoArgs;
            type Path = WidePath;
            type Response = NoArgs;

            async fn handle(
                &self,
                context: Self::Context,
                args: Args<Self>,
            ) -> ApiResult<ApiResponse> {
                context.success(json!({ "id": args.path.id, "name": args.path.name }))
            }
        }

        let mut group = RouteGroup::new("users");
        let err = group.get("/<int:id>", WideHandler).unwrap_err();
        assert!(matches!(err, SetupError::PathMismatch { .. }));
    }

    #[test]
    fn test_cors_adds_options() {
        let mut group = RouteGroup::new("misc");
        group.get("/ping", PlainHandler).unwrap();
        let route = &group.routes()[0];
        assert!(route.methods.contains(&Method::Options));
        assert_eq!(route.pipeline.names(), vec!["cors", "context", "bind"]);
    }

    #[test]
    fn test_tag_override() {
        let group = RouteGroup::new("users").with_tag("Accounts");
        assert_eq!(group.tag(), "Accounts");
        assert_eq!(group.tag_doc().name, "Accounts");
    }
}
