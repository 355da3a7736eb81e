//! Raw value heuristics.
//!
//! Query and form values arrive as flat strings; these helpers decide
//! how a string becomes a structured value. Bracket-delimited values are
//! parsed as JSON (with a lenient single-quote fallback for form data),
//! brace-delimited values as JSON objects, everything else destined for
//! a container field is split on commas. The empty string means absent.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// How strictly bracket-delimited values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Query strings: JSON only
    Query,
    /// Form bodies: JSON, then the single-quote fallback
    Form,
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[.*\]$").expect("bracket pattern"))
}

fn brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{.*\}$").expect("brace pattern"))
}

/// Interpret a raw string destined for a container-typed field
pub fn container_value(raw: &str, mode: ParseMode) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    if let Some(structured) = structured_value(raw, mode) {
        return structured;
    }
    Ok(Value::Array(
        raw.split(',')
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

/// Parse a bracket- or brace-delimited string, if it is one
pub fn structured_value(raw: &str, mode: ParseMode) -> Option<Result<Value, String>> {
    if !bracket_re().is_match(raw) && !brace_re().is_match(raw) {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(Ok(value)),
        Err(first) => {
            if mode == ParseMode::Form {
                // Single-quoted literals (`['a','b']`) are common in
                // hand-written form data; retry with normalized quotes.
                if let Ok(value) = serde_json::from_str(&raw.replace('\'', "\"")) {
                    return Some(Ok(value));
                }
            }
            Some(Err(format!("invalid structured value: {first}")))
        }
    }
}

/// Scalar kinds the coercion layer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarShape {
    Integer,
    Number,
    Boolean,
}

/// Coerce a raw string into a typed scalar
pub fn coerce_scalar(shape: ScalarShape, raw: &str) -> Result<Value, String> {
    match shape {
        ScalarShape::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid integer: `{raw}`")),
        ScalarShape::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .ok_or_else(|| format!("invalid number: `{raw}`")),
        ScalarShape::Boolean => match raw {
            "true" | "True" | "1" => Ok(Value::Bool(true)),
            "false" | "False" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("invalid boolean: `{raw}`")),
        },
    }
}
