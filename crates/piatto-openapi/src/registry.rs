//! Per-build schema registry.
//!
//! One registry is constructed for every document build and threaded
//! through the whole assembly: route processing registers descriptor
//! schemas and receives `$ref` pointers back, the resolution pass queues
//! nested definitions it discovers, and the builder drains everything
//! into the components section exactly once. Nothing here outlives a
//! build, so stale schemas can never leak from one document into the
//! next.

use crate::error::{OpenApiError, OpenApiResult};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A reflected descriptor schema awaiting registration in a document build.
///
/// Carries the descriptor type's name, its raw draft-07 root schema as
/// produced by the reflection layer (a `definitions` block plus
/// `#/definitions/...` refs), and the component alias assigned by the
/// route registrar.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    /// Component alias, `<Handler>$<Descriptor>` once the registrar has
    /// namespaced it. Defaults to the bare type name.
    pub alias: String,
    /// The descriptor type's schema name
    pub name: String,
    /// Human-readable description for the component entry
    pub description: Option<String>,
    /// Media type used for body/response content
    pub content_type: String,
    /// Raw root schema
    pub schema: Value,
}

impl SchemaSource {
    /// Reflect a schema source from a type
    pub fn of<T: JsonSchema>() -> OpenApiResult<Self> {
        let root = SchemaSettings::draft07()
            .into_generator()
            .into_root_schema_for::<T>();
        let name = T::schema_name();
        Ok(Self {
            alias: name.clone(),
            name,
            description: None,
            content_type: "application/json".to_string(),
            schema: serde_json::to_value(root)?,
        })
    }

    /// Set the component description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the content media type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Assign the namespaced component alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

/// Registry of schema definitions collected while assembling one document.
///
/// Four component maps (query parameters, request bodies, responses,
/// plain schemas) plus the overflow buffer for definitions discovered
/// while resolving one schema but consumed while resolving another.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    parameters: BTreeMap<String, SchemaSource>,
    request_bodies: BTreeMap<String, SchemaSource>,
    responses: BTreeMap<String, SchemaSource>,
    /// Raw fragments queued for translation, keyed by final alias
    queue: BTreeMap<String, Value>,
    /// Fully translated component schemas
    resolved: BTreeMap<String, Value>,
    /// Definitions stripped from processed schemas, awaiting a consumer
    pending: BTreeMap<String, Value>,
    /// Names registered under their bare name instead of a namespaced alias
    shared: BTreeSet<String>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the given set of shared schema names
    pub fn with_shared<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether a referenced name belongs to the shared set
    pub fn is_shared(&self, name: &str) -> bool {
        self.shared.contains(name)
    }

    /// Register a query descriptor and return its `$ref` pointer
    pub fn register_query(&mut self, source: SchemaSource) -> OpenApiResult<String> {
        let alias = source.alias.clone();
        Self::insert_source(&mut self.parameters, source)?;
        tracing::debug!(alias = %alias, "registered query parameter component");
        Ok(format!("#/components/parameters/{}", alias))
    }

    /// Register a body descriptor and return its `$ref` pointer
    pub fn register_body(&mut self, source: SchemaSource) -> OpenApiResult<String> {
        let alias = source.alias.clone();
        Self::insert_source(&mut self.request_bodies, source)?;
        tracing::debug!(alias = %alias, "registered request body component");
        Ok(format!("#/components/requestBodies/{}", alias))
    }

    /// Register a response descriptor and return its `$ref` pointer
    pub fn register_response(&mut self, source: SchemaSource) -> OpenApiResult<String> {
        let alias = source.alias.clone();
        Self::insert_source(&mut self.responses, source)?;
        tracing::debug!(alias = %alias, "registered response component");
        Ok(format!("#/components/responses/{}", alias))
    }

    fn insert_source(
        map: &mut BTreeMap<String, SchemaSource>,
        source: SchemaSource,
    ) -> OpenApiResult<()> {
        if let Some(existing) = map.get(&source.alias) {
            if existing.schema != source.schema {
                return Err(OpenApiError::AliasConflict {
                    alias: source.alias,
                });
            }
            return Ok(());
        }
        map.insert(source.alias.clone(), source);
        Ok(())
    }

    /// Queue a raw schema fragment for translation under its final alias
    pub fn queue_schema(&mut self, alias: impl Into<String>, fragment: Value) {
        self.queue.insert(alias.into(), fragment);
    }

    /// Whether an alias is already queued or fully translated
    pub fn knows_schema(&self, alias: &str) -> bool {
        self.queue.contains_key(alias) || self.resolved.contains_key(alias)
    }

    /// Pop the next queued fragment, if any
    pub fn pop_queued(&mut self) -> Option<(String, Value)> {
        self.queue.pop_first()
    }

    /// Store a translated schema under its alias
    pub fn insert_resolved(&mut self, alias: impl Into<String>, schema: Value) {
        self.resolved.insert(alias.into(), schema);
    }

    /// Take a definition out of the overflow buffer
    pub fn take_pending(&mut self, name: &str) -> Option<Value> {
        self.pending.remove(name)
    }

    /// Merge leftover definitions into the overflow buffer
    pub fn stash_pending(&mut self, definitions: serde_json::Map<String, Value>) {
        for (name, definition) in definitions {
            self.pending.insert(name, definition);
        }
    }

    /// Drain the registered query parameters
    pub fn take_parameters(&mut self) -> BTreeMap<String, SchemaSource> {
        std::mem::take(&mut self.parameters)
    }

    /// Drain the registered request bodies
    pub fn take_request_bodies(&mut self) -> BTreeMap<String, SchemaSource> {
        std::mem::take(&mut self.request_bodies)
    }

    /// Drain the registered responses
    pub fn take_responses(&mut self) -> BTreeMap<String, SchemaSource> {
        std::mem::take(&mut self.responses)
    }

    /// Drain the translated schemas
    pub fn take_resolved(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut self.resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_returns_ref_pointer() {
        let mut registry = SchemaRegistry::new();
        let source = SchemaSource {
            alias: "Echo$Query".to_string(),
            name: "Query".to_string(),
            description: None,
            content_type: "application/json".to_string(),
            schema: json!({"type": "object"}),
        };
        let pointer = registry.register_query(source).unwrap();
        assert_eq!(pointer, "#/components/parameters/Echo$Query");
    }

    #[test]
    fn test_identical_re_registration_is_noop() {
        let mut registry = SchemaRegistry::new();
        let source = SchemaSource {
            alias: "Echo$Body".to_string(),
            name: "Body".to_string(),
            description: None,
            content_type: "application/json".to_string(),
            schema: json!({"type": "object"}),
        };
        registry.register_body(source.clone()).unwrap();
        registry.register_body(source).unwrap();
        assert_eq!(registry.take_request_bodies().len(), 1);
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let mut registry = SchemaRegistry::new();
        let first = SchemaSource {
            alias: "Echo$Body".to_string(),
            name: "Body".to_string(),
            description: None,
            content_type: "application/json".to_string(),
            schema: json!({"type": "object"}),
        };
        let mut second = first.clone();
        second.schema = json!({"type": "object", "properties": {"x": {"type": "string"}}});

        registry.register_body(first).unwrap();
        let err = registry.register_body(second).unwrap_err();
        assert!(matches!(err, OpenApiError::AliasConflict { .. }));
    }

    #[test]
    fn test_pending_buffer_roundtrip() {
        let mut registry = SchemaRegistry::new();
        let mut definitions = serde_json::Map::new();
        definitions.insert("Shared".to_string(), json!({"type": "string"}));
        registry.stash_pending(definitions);

        assert_eq!(registry.take_pending("Shared"), Some(json!({"type": "string"})));
        assert_eq!(registry.take_pending("Shared"), None);
    }
}
