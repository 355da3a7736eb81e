//! Field parse plans.
//!
//! A [`FieldPlan`] is computed once per descriptor at registration time
//! from its reflected schema: which fields are container-typed (and what
//! their elements are), which are coercible scalars, and which are
//! required. Per-request work is then bounded to pure parsing against
//! the precomputed plan.

use crate::args::parse::{coerce_scalar, container_value, structured_value, ParseMode, ScalarShape};
use crate::errors::ValidationErrors;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// The shape of one declared field, as far as parsing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldShape {
    /// list/set/map typed: gets the bracket/brace/comma heuristic
    Container(Option<ScalarShape>),
    /// coercible scalar
    Scalar(ScalarShape),
    /// strings, nested models: handed to deserialization as-is
    Passthrough,
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    shape: FieldShape,
}

/// Precomputed parse plan for one descriptor
#[derive(Debug, Clone)]
pub struct FieldPlan {
    part: &'static str,
    fields: Vec<FieldSpec>,
    required: Vec<String>,
}

impl FieldPlan {
    /// Build a plan from a descriptor's reflected root schema. `part`
    /// names the request part for error messages (`query`, `body`,
    /// `path`).
    pub fn from_schema(part: &'static str, schema: &Value) -> Self {
        let mut fields = Vec::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                fields.push(FieldSpec {
                    name: name.clone(),
                    shape: classify(property),
                });
            }
        }
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            part,
            fields,
            required,
        }
    }

    /// Parse a flat key/value part (query string or form body).
    /// First-value semantics for repeated keys; undeclared keys pass
    /// through untouched for deserialization to ignore.
    pub fn parse_pairs<T: DeserializeOwned>(
        &self,
        pairs: &[(String, String)],
        mode: ParseMode,
    ) -> Result<T, ValidationErrors> {
        let mut object = Map::new();
        for (key, value) in pairs {
            object
                .entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }

        let mut errors = ValidationErrors::new();
        for field in &self.fields {
            let raw = match object.get(&field.name).and_then(Value::as_str) {
                Some(raw) => raw.to_string(),
                None => continue,
            };
            let parsed = match field.shape {
                FieldShape::Container(items) => {
                    container_value(&raw, mode).map(|value| coerce_items(value, items))
                }
                FieldShape::Scalar(shape) => coerce_scalar(shape, &raw),
                FieldShape::Passthrough => match mode {
                    // Nested models may arrive as JSON strings in form data.
                    ParseMode::Form => match structured_value(&raw, mode) {
                        Some(result) => result,
                        None => Ok(Value::String(raw.clone())),
                    },
                    ParseMode::Query => Ok(Value::String(raw.clone())),
                },
            };
            match parsed {
                Ok(value) => {
                    object.insert(field.name.clone(), value);
                }
                Err(message) => errors.add(&field.name, message),
            }
        }

        self.finish(object, errors)
    }

    /// Parse an already-structured part (JSON body, typed path
    /// variables). String values in scalar-typed fields are still
    /// coerced, matching the tolerant behavior of the validation layer.
    pub fn parse_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, ValidationErrors> {
        let mut object = match value {
            Value::Object(object) => object,
            _ => {
                return Err(ValidationErrors::single(
                    self.part,
                    "expected a JSON object",
                ))
            }
        };

        let mut errors = ValidationErrors::new();
        for field in &self.fields {
            if let FieldShape::Scalar(shape) = field.shape {
                let raw = match object.get(&field.name).and_then(Value::as_str) {
                    Some(raw) => raw.to_string(),
                    None => continue,
                };
                match coerce_scalar(shape, &raw) {
                    Ok(value) => {
                        object.insert(field.name.clone(), value);
                    }
                    Err(message) => errors.add(&field.name, message),
                }
            }
        }

        self.finish(object, errors)
    }

    fn finish<T: DeserializeOwned>(
        &self,
        object: Map<String, Value>,
        mut errors: ValidationErrors,
    ) -> Result<T, ValidationErrors> {
        for name in &self.required {
            match object.get(name) {
                None | Some(Value::Null) => errors.add(name, "field is required"),
                Some(_) => {}
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        serde_json::from_value(Value::Object(object))
            .map_err(|e| ValidationErrors::single(self.part, e.to_string()))
    }
}

/// Classify a property schema into its parse shape
fn classify(property: &Value) -> FieldShape {
    if type_is(property, "array") {
        let items = property
            .get("items")
            .and_then(|items| scalar_shape(items));
        return FieldShape::Container(items);
    }
    if type_is(property, "object") {
        return FieldShape::Container(None);
    }
    match scalar_shape(property) {
        Some(shape) => FieldShape::Scalar(shape),
        None => FieldShape::Passthrough,
    }
}

fn scalar_shape(schema: &Value) -> Option<ScalarShape> {
    if type_is(schema, "integer") {
        Some(ScalarShape::Integer)
    } else if type_is(schema, "number") {
        Some(ScalarShape::Number)
    } else if type_is(schema, "boolean") {
        Some(ScalarShape::Boolean)
    } else {
        None
    }
}

/// The `type` keyword may be a single string or a list with `"null"`
fn type_is(schema: &Value, expected: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == expected,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(expected)),
        _ => false,
    }
}

/// Coerce string elements of a parsed container per the items shape
fn coerce_items(value: Value, items: Option<ScalarShape>) -> Value {
    let (Value::Array(entries), Some(shape)) = (&value, items) else {
        return value;
    };
    let coerced: Vec<Value> = entries
        .iter()
        .map(|entry| match entry.as_str() {
            // Leave failures in place for deserialization to report.
            Some(raw) => coerce_scalar(shape, raw).unwrap_or_else(|_| entry.clone()),
            None => entry.clone(),
        })
        .collect();
    Value::Array(coerced)
}
