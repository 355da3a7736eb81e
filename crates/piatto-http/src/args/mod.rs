//! Argument descriptors.
//!
//! Handlers declare the shape of each request/response part as a plain
//! struct deriving `Deserialize`/`Serialize` and `JsonSchema`, then mark
//! it as a descriptor by implementing the matching trait. Every trait
//! exposes a `descriptor()` hook returning `Option<SchemaSource>`; the
//! explicit [`NoArgs`] type returns `None`, so the registrar resolves
//! the optional parts by pattern matching instead of probing.

pub mod parse;
pub mod plan;

use crate::errors::{SetupResult, ValidationErrors};
use parse::ParseMode;
use piatto_openapi::SchemaSource;
use plan::FieldPlan;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query-string descriptor.
///
/// Parsing follows the container convention: bracket/brace-delimited
/// values are JSON, everything else destined for a container field is
/// split on commas, the empty string means absent.
pub trait ApiQuery: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Component description shown in the document
    fn description() -> Option<&'static str> {
        None
    }

    /// Schema source registered for this descriptor; `None` opts the
    /// part out entirely
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        let mut source = SchemaSource::of::<Self>()?;
        if let Some(description) = Self::description() {
            source = source.with_description(description);
        }
        Ok(Some(source))
    }

    /// Parse the multi-valued query map
    fn parse_query(plan: &FieldPlan, pairs: &[(String, String)]) -> Result<Self, ValidationErrors> {
        plan.parse_pairs(pairs, ParseMode::Query)
    }

    /// Value bound when the handler declares no query part
    fn absent() -> Result<Self, ValidationErrors> {
        Err(ValidationErrors::single("query", "no query descriptor declared"))
    }
}

/// Request-body descriptor for JSON and urlencoded form bodies
pub trait ApiBody: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Media type documented for this body
    fn content_type() -> &'static str {
        "application/json"
    }

    /// Component description shown in the document
    fn description() -> Option<&'static str> {
        None
    }

    /// Schema source registered for this descriptor
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        let mut source = SchemaSource::of::<Self>()?.with_content_type(Self::content_type());
        if let Some(description) = Self::description() {
            source = source.with_description(description);
        }
        Ok(Some(source))
    }

    /// Parse a JSON body
    fn parse_json(plan: &FieldPlan, body: Value) -> Result<Self, ValidationErrors> {
        plan.parse_value(body)
    }

    /// Parse an urlencoded form body. Same container convention as the
    /// query part, plus the lenient fallback for single-quoted literals.
    fn parse_form(plan: &FieldPlan, pairs: &[(String, String)]) -> Result<Self, ValidationErrors> {
        plan.parse_pairs(pairs, ParseMode::Form)
    }

    /// Value bound when the handler declares no body part
    fn absent() -> Result<Self, ValidationErrors> {
        Err(ValidationErrors::single("body", "no body descriptor declared"))
    }
}

/// Path-variable descriptor. Parses the router-matched, converter-typed
/// variable map; there is nothing ambiguous left to interpret.
pub trait ApiPath: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Schema source registered for this descriptor
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        Ok(Some(SchemaSource::of::<Self>()?))
    }

    /// Parse the matched path variables
    fn parse_path(plan: &FieldPlan, vars: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        plan.parse_value(Value::Object(vars.clone()))
    }

    /// Value bound when the handler declares no path part
    fn absent() -> Result<Self, ValidationErrors> {
        Err(ValidationErrors::single("path", "no path descriptor declared"))
    }
}

/// Response descriptor: a pure schema declaration, never parsed from a
/// request
pub trait ApiResp: Serialize + JsonSchema + Send + Sync + 'static {
    /// Status code this response documents
    fn status_code() -> u16 {
        200
    }

    /// Component description shown in the document
    fn description() -> Option<&'static str> {
        None
    }

    /// Media type documented for this response
    fn content_type() -> &'static str {
        "application/json"
    }

    /// Schema source registered for this descriptor
    fn descriptor() -> SetupResult<Option<SchemaSource>>
    where
        Self: Sized,
    {
        let mut source = SchemaSource::of::<Self>()?.with_content_type(Self::content_type());
        if let Some(description) = Self::description() {
            source = source.with_description(description);
        }
        Ok(Some(source))
    }
}

/// The explicit "this part is not declared" type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoArgs;

impl ApiQuery for NoArgs {
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        Ok(None)
    }

    fn absent() -> Result<Self, ValidationErrors> {
        Ok(NoArgs)
    }
}

impl ApiBody for NoArgs {
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        Ok(None)
    }

    fn absent() -> Result<Self, ValidationErrors> {
        Ok(NoArgs)
    }
}

impl ApiPath for NoArgs {
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        Ok(None)
    }

    fn absent() -> Result<Self, ValidationErrors> {
        Ok(NoArgs)
    }
}

impl ApiResp for NoArgs {
    fn descriptor() -> SetupResult<Option<SchemaSource>> {
        Ok(None)
    }
}
