//! Reference-resolution pass.
//!
//! Rewrites a raw reflected schema (draft-07: a `definitions` block and
//! `#/definitions/...` refs) into OpenAPI-legal form. Every internal
//! reference is repointed at `#/components/schemas/<alias>`; definitions
//! private to one descriptor are namespaced `<owner>$<Name>` so that
//! unrelated handlers reusing a type name can never collide, while names
//! in the registry's shared set keep their bare name. Resolved
//! definitions are queued in the registry and translated recursively
//! when the builder drains the queue.

use crate::error::{OpenApiError, OpenApiResult};
use crate::registry::SchemaRegistry;
use serde_json::{Map, Value};

/// Translate one schema into OpenAPI form, queueing every definition it
/// references. `owner` is the alias nested definitions are namespaced
/// under.
pub fn translate_schema(
    registry: &mut SchemaRegistry,
    owner: &str,
    schema: Value,
) -> OpenApiResult<Value> {
    let mut root = match schema {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    // Draft-07 housekeeping that has no OpenAPI counterpart.
    root.remove("$schema");

    let mut definitions = match root.remove("definitions") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if let Some(Value::Object(properties)) = root.get_mut("properties") {
        for (_, property) in properties.iter_mut() {
            rewrite_property(registry, owner, &mut definitions, property)?;
        }
    }

    // Whatever was not consumed above belongs to a schema that will be
    // translated in a later call; carry it forward.
    registry.stash_pending(definitions);

    Ok(Value::Object(root))
}

fn rewrite_property(
    registry: &mut SchemaRegistry,
    owner: &str,
    definitions: &mut Map<String, Value>,
    property: &mut Value,
) -> OpenApiResult<()> {
    if has_type(property, "object") {
        rewrite_object(registry, owner, definitions, property)?;
    } else if has_type(property, "array") {
        if let Some(items) = property.get_mut("items") {
            if items.get("$ref").is_some() {
                resolve_ref(registry, owner, definitions, items)?;
            } else if has_type(items, "object") {
                rewrite_object(registry, owner, definitions, items)?;
            }
        }
    } else if property.get("$ref").is_some() {
        resolve_ref(registry, owner, definitions, property)?;
    } else if property.get("allOf").is_some() {
        rewrite_composition(registry, owner, definitions, property, "allOf")?;
    } else if property.get("anyOf").is_some() {
        rewrite_composition(registry, owner, definitions, property, "anyOf")?;
    }
    Ok(())
}

fn rewrite_object(
    registry: &mut SchemaRegistry,
    owner: &str,
    definitions: &mut Map<String, Value>,
    value: &mut Value,
) -> OpenApiResult<()> {
    if let Some(additional) = value.get_mut("additionalProperties") {
        if additional.get("$ref").is_some() {
            resolve_ref(registry, owner, definitions, additional)?;
        }
    }
    Ok(())
}

fn rewrite_composition(
    registry: &mut SchemaRegistry,
    owner: &str,
    definitions: &mut Map<String, Value>,
    property: &mut Value,
    keyword: &str,
) -> OpenApiResult<()> {
    if let Some(Value::Array(entries)) = property.get_mut(keyword) {
        for entry in entries.iter_mut() {
            if entry.get("$ref").is_some() {
                resolve_ref(registry, owner, definitions, entry)?;
            }
        }
    }
    Ok(())
}

/// Rewrite one `$ref` and register the definition it points at.
fn resolve_ref(
    registry: &mut SchemaRegistry,
    owner: &str,
    definitions: &mut Map<String, Value>,
    value: &mut Value,
) -> OpenApiResult<()> {
    let name = match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => reference
            .rsplit('/')
            .next()
            .unwrap_or(reference)
            .to_string(),
        None => return Ok(()),
    };

    let alias = if registry.is_shared(&name) {
        name.clone()
    } else {
        format!("{owner}${name}")
    };

    if let Some(definition) = definitions.remove(&name) {
        registry.queue_schema(alias.clone(), definition);
    } else if let Some(definition) = registry.take_pending(&name) {
        registry.queue_schema(alias.clone(), definition);
    } else if !registry.knows_schema(&alias) {
        return Err(OpenApiError::reference(name, owner));
    }

    if let Some(object) = value.as_object_mut() {
        object.insert(
            "$ref".to_string(),
            Value::String(format!("#/components/schemas/{alias}")),
        );
    }
    Ok(())
}

/// Check a schema's `type` keyword, which may be a single string or a
/// list (nullable fields reflect as `["array", "null"]` and similar).
fn has_type(value: &Value, expected: &str) -> bool {
    match value.get("type") {
        Some(Value::String(t)) => t == expected,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(expected)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[test]
    fn test_plain_schema_passes_through() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": ["array", "null"], "items": {"type": "integer"}}
            },
            "required": ["a"]
        });
        let out = translate_schema(&mut reg, "Echo$Resp", schema.clone()).unwrap();
        assert_eq!(out, schema);
    }

    #[test]
    fn test_direct_ref_is_namespaced_and_queued() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {
                "user": {"$ref": "#/definitions/User"}
            },
            "definitions": {
                "User": {"type": "object", "properties": {"name": {"type": "string"}}}
            }
        });
        let out = translate_schema(&mut reg, "Create$Body", schema).unwrap();
        assert_eq!(
            out["properties"]["user"]["$ref"],
            "#/components/schemas/Create$Body$User"
        );
        assert!(out.get("definitions").is_none());
        assert!(reg.knows_schema("Create$Body$User"));
    }

    #[test]
    fn test_array_items_ref() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {
                "users": {"type": "array", "items": {"$ref": "#/definitions/User"}}
            },
            "definitions": {"User": {"type": "object"}}
        });
        let out = translate_schema(&mut reg, "List$Resp", schema).unwrap();
        assert_eq!(
            out["properties"]["users"]["items"]["$ref"],
            "#/components/schemas/List$Resp$User"
        );
    }

    #[test]
    fn test_additional_properties_ref() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {
                "by_name": {
                    "type": "object",
                    "additionalProperties": {"$ref": "#/definitions/User"}
                }
            },
            "definitions": {"User": {"type": "object"}}
        });
        let out = translate_schema(&mut reg, "Index$Resp", schema).unwrap();
        assert_eq!(
            out["properties"]["by_name"]["additionalProperties"]["$ref"],
            "#/components/schemas/Index$Resp$User"
        );
    }

    #[test]
    fn test_any_of_ref_for_optional_nested() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {
                "owner": {"anyOf": [{"$ref": "#/definitions/User"}, {"type": "null"}]}
            },
            "definitions": {"User": {"type": "object"}}
        });
        let out = translate_schema(&mut reg, "Show$Resp", schema).unwrap();
        assert_eq!(
            out["properties"]["owner"]["anyOf"][0]["$ref"],
            "#/components/schemas/Show$Resp$User"
        );
    }

    #[test]
    fn test_shared_name_keeps_bare_alias() {
        let mut reg = SchemaRegistry::with_shared(["User"]);
        let schema = json!({
            "type": "object",
            "properties": {"user": {"$ref": "#/definitions/User"}},
            "definitions": {"User": {"type": "object"}}
        });
        let out = translate_schema(&mut reg, "Create$Body", schema).unwrap();
        assert_eq!(
            out["properties"]["user"]["$ref"],
            "#/components/schemas/User"
        );
        assert!(reg.knows_schema("User"));
    }

    #[test]
    fn test_leftover_definitions_feed_later_calls() {
        let mut reg = registry();
        // First schema references User; Address is left over.
        let first = json!({
            "type": "object",
            "properties": {"user": {"$ref": "#/definitions/User"}},
            "definitions": {
                "User": {"type": "object"},
                "Address": {"type": "object", "properties": {"street": {"type": "string"}}}
            }
        });
        translate_schema(&mut reg, "A$Body", first).unwrap();

        // Second schema references Address without carrying its definition.
        let second = json!({
            "type": "object",
            "properties": {"address": {"$ref": "#/definitions/Address"}}
        });
        let out = translate_schema(&mut reg, "B$Body", second).unwrap();
        assert_eq!(
            out["properties"]["address"]["$ref"],
            "#/components/schemas/B$Body$Address"
        );
    }

    #[test]
    fn test_missing_definition_fails_loudly() {
        let mut reg = registry();
        let schema = json!({
            "type": "object",
            "properties": {"ghost": {"$ref": "#/definitions/Ghost"}}
        });
        let err = translate_schema(&mut reg, "Spooky$Body", schema).unwrap_err();
        assert!(matches!(err, OpenApiError::Reference { .. }));
    }

    #[test]
    fn test_meta_schema_key_is_stripped() {
        let mut reg = registry();
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {}
        });
        let out = translate_schema(&mut reg, "X$Query", schema).unwrap();
        assert!(out.get("$schema").is_none());
    }
}
