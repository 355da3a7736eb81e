//! Document assembly.
//!
//! [`DocumentBuilder`] turns the route metadata collected at registration
//! time into a complete [`OpenApiSpec`]: one operation per (method, rule)
//! pair, component entries for every registered descriptor, and a
//! components/schemas section filled by draining the registry until no
//! queued definition remains. A builder is single-use: `generate`
//! consumes it together with its registry, so each document is assembled
//! from a fresh arena and the drain can only ever happen once.

use crate::config::ApiConfig;
use crate::error::{OpenApiError, OpenApiResult};
use crate::registry::{SchemaRegistry, SchemaSource};
use crate::resolve::translate_schema;
use crate::specification::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Route metadata for document generation, produced by the registrar
#[derive(Debug, Clone)]
pub struct RouteDoc {
    /// HTTP method, uppercase
    pub method: String,
    /// Path in OpenAPI form, e.g. `/users/{id}`
    pub path: String,
    /// Tag of the owning route group
    pub tag: String,
    /// Operation summary (the handler's documentation line)
    pub summary: Option<String>,
    /// Query descriptor, if declared
    pub query: Option<SchemaSource>,
    /// Body descriptor, if declared
    pub body: Option<SchemaSource>,
    /// Path descriptor, if declared
    pub path_args: Option<SchemaSource>,
    /// Response descriptor, if declared
    pub response: Option<SchemaSource>,
    /// Status code the response descriptor documents
    pub response_status: u16,
}

/// Tag metadata for a route group
#[derive(Debug, Clone)]
pub struct TagDoc {
    pub name: String,
    pub description: Option<String>,
}

/// Single-use OpenAPI document builder
pub struct DocumentBuilder {
    config: ApiConfig,
    registry: SchemaRegistry,
}

impl DocumentBuilder {
    /// Create a builder with a fresh registry
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            registry: SchemaRegistry::new(),
        }
    }

    /// Declare schema names registered under their bare name instead of
    /// a handler-namespaced alias
    pub fn with_shared<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry = SchemaRegistry::with_shared(names);
        self
    }

    /// Assemble the document from the registered routes
    pub fn generate(mut self, tags: &[TagDoc], routes: &[RouteDoc]) -> OpenApiResult<OpenApiSpec> {
        let mut spec = OpenApiSpec::new(&self.config.info.title, &self.config.info.version);
        spec.openapi = self.config.openapi_version.clone();
        spec.info = ApiInfo {
            title: self.config.info.title.clone(),
            description: self.config.info.description.clone(),
            terms_of_service: self.config.info.terms_of_service.clone(),
            contact: self.config.info.contact.as_ref().map(|c| Contact {
                name: c.name.clone(),
                url: c.url.clone(),
                email: c.email.clone(),
            }),
            license: self.config.info.license.as_ref().map(|l| License {
                name: l.name.clone(),
                url: l.url.clone(),
            }),
            version: self.config.info.version.clone(),
        };
        spec.servers = self
            .config
            .servers
            .iter()
            .map(|s| Server {
                url: s.url.clone(),
                description: s.description.clone(),
                variables: None,
            })
            .collect();
        spec.external_docs = self.config.external_docs.as_ref().map(|ed| {
            ExternalDocumentation {
                url: ed.url.clone(),
                description: ed.description.clone(),
            }
        });
        spec.tags = tags
            .iter()
            .map(|t| Tag {
                name: t.name.clone(),
                description: t.description.clone(),
                external_docs: None,
            })
            .collect();

        for route in routes {
            self.process_route(&mut spec, route)?;
        }

        spec.components = self.drain_components()?;

        tracing::info!(
            paths = spec.paths.len(),
            tags = spec.tags.len(),
            "assembled OpenAPI document"
        );
        Ok(spec)
    }

    /// Emit the operation object for one route and hook its descriptors
    /// into the registry
    fn process_route(&mut self, spec: &mut OpenApiSpec, route: &RouteDoc) -> OpenApiResult<()> {
        let mut parameters = Vec::new();

        if let Some(path_args) = &route.path_args {
            parameters.extend(path_parameters(path_args));
        }
        if let Some(query) = &route.query {
            let pointer = self.registry.register_query(query.clone())?;
            parameters.push(RefOr::reference(pointer));
        }

        let request_body = match &route.body {
            Some(body) => {
                let pointer = self.registry.register_body(body.clone())?;
                Some(RefOr::reference(pointer))
            }
            None => None,
        };

        let mut responses = BTreeMap::new();
        match &route.response {
            Some(response) => {
                let pointer = self.registry.register_response(response.clone())?;
                responses.insert(route.response_status.to_string(), RefOr::reference(pointer));
            }
            None => {
                responses.insert(
                    "200".to_string(),
                    RefOr::Item(Response {
                        description: "Successful operation".to_string(),
                        content: BTreeMap::new(),
                    }),
                );
            }
        }

        let operation = Operation {
            tags: vec![route.tag.clone()],
            summary: route.summary.clone(),
            description: None,
            operation_id: None,
            parameters,
            request_body,
            responses,
            deprecated: None,
        };

        let path_item = spec.paths.entry(route.path.clone()).or_default();
        match route.method.as_str() {
            "GET" => path_item.get = Some(operation),
            "POST" => path_item.post = Some(operation),
            "PUT" => path_item.put = Some(operation),
            "DELETE" => path_item.delete = Some(operation),
            "PATCH" => path_item.patch = Some(operation),
            "OPTIONS" => path_item.options = Some(operation),
            "HEAD" => path_item.head = Some(operation),
            other => {
                return Err(OpenApiError::UnsupportedMethod {
                    method: other.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Drain the registry into the components section. Runs exactly once
    /// per build; queued definitions produced while translating are
    /// popped and translated until the queue is empty.
    fn drain_components(&mut self) -> OpenApiResult<Option<Components>> {
        let mut components = Components::default();

        for (alias, source) in self.registry.take_parameters() {
            let schema = translate_schema(&mut self.registry, &alias, source.schema)?;
            let name = alias.rsplit('$').next().unwrap_or(&alias).to_string();
            components.parameters.insert(
                alias,
                Parameter {
                    name,
                    location: "query".to_string(),
                    description: source.description,
                    required: Some(true),
                    deprecated: Some(false),
                    allow_empty_value: Some(false),
                    schema: Some(schema),
                },
            );
        }

        for (alias, source) in self.registry.take_request_bodies() {
            let schema = translate_schema(&mut self.registry, &alias, source.schema)?;
            let mut content = BTreeMap::new();
            content.insert(source.content_type, MediaType { schema: Some(schema) });
            components.request_bodies.insert(
                alias,
                RequestBody {
                    description: source.description,
                    content,
                    required: Some(true),
                },
            );
        }

        // A response's object schema lands in components.schemas under
        // the same alias; the response entry only carries a ref to it.
        for (alias, source) in self.registry.take_responses() {
            self.registry.queue_schema(alias.clone(), source.schema);
            let mut content = BTreeMap::new();
            content.insert(
                source.content_type,
                MediaType {
                    schema: Some(json!({ "$ref": format!("#/components/schemas/{alias}") })),
                },
            );
            components.responses.insert(
                alias,
                Response {
                    description: source.description.unwrap_or_default(),
                    content,
                },
            );
        }

        while let Some((alias, fragment)) = self.registry.pop_queued() {
            let translated = translate_schema(&mut self.registry, &alias, fragment)?;
            self.registry.insert_resolved(alias, translated);
        }
        components.schemas = self.registry.take_resolved();

        let empty = components.schemas.is_empty()
            && components.responses.is_empty()
            && components.parameters.is_empty()
            && components.request_bodies.is_empty();
        Ok(if empty { None } else { Some(components) })
    }
}

/// One `in: path` parameter object per property of the path descriptor
fn path_parameters(source: &SchemaSource) -> Vec<RefOr<Parameter>> {
    let properties = match source.schema.get("properties").and_then(Value::as_object) {
        Some(map) => map,
        None => return Vec::new(),
    };
    let required: Vec<&str> = source
        .schema
        .get("required")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            RefOr::Item(Parameter {
                name: name.clone(),
                location: "path".to_string(),
                description: property
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                required: Some(required.contains(&name.as_str())),
                deprecated: None,
                allow_empty_value: None,
                schema: Some(json!({ "type": scalar_type(property) })),
            })
        })
        .collect()
}

/// First non-null `type` entry of a property schema
fn scalar_type(property: &Value) -> String {
    match property.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string")
            .to_string(),
        _ => "string".to_string(),
    }
}
