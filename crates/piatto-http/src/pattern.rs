//! Route rule parsing.
//!
//! A rule is a `/`-separated path whose dynamic segments use the
//! `<name>` or `<converter:name>` form, e.g. `/users/<int:id>/posts`.
//! The converter types a matched segment before the path descriptor ever
//! sees it, so descriptor parsing works on unambiguous values.

use crate::errors::{ApiError, SetupError, SetupResult};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Segment converter for typed path variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Str,
    Int,
    Float,
    Uuid,
}

impl Converter {
    /// Coerce one matched raw segment into its typed value
    fn coerce(&self, name: &str, raw: &str) -> Result<Value, ApiError> {
        match self {
            Converter::Str => Ok(Value::String(raw.to_string())),
            Converter::Int => raw
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .map_err(|_| ApiError::not_found(format!("path segment `{name}` is not an integer"))),
            Converter::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| ApiError::not_found(format!("path segment `{name}` is not a number"))),
            Converter::Uuid => Uuid::parse_str(raw)
                .map(|u| Value::String(u.to_string()))
                .map_err(|_| ApiError::not_found(format!("path segment `{name}` is not a uuid"))),
        }
    }
}

impl FromStr for Converter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(Converter::Str),
            "int" => Ok(Converter::Int),
            "float" => Ok(Converter::Float),
            "uuid" => Ok(Converter::Uuid),
            _ => Err(()),
        }
    }
}

/// One segment of a parsed rule
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { name: String, converter: Converter },
}

/// A typed path variable declared by a rule
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub converter: Converter,
}

/// A parsed URL rule
#[derive(Debug, Clone)]
pub struct RoutePattern {
    rule: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a rule string, validating every dynamic segment
    pub fn parse(rule: &str) -> SetupResult<Self> {
        if !rule.starts_with('/') {
            return Err(SetupError::invalid_rule(rule, "rule must start with `/`"));
        }

        let mut segments = Vec::new();
        let mut seen = Vec::new();
        for part in rule.split('/').filter(|p| !p.is_empty()) {
            if let Some(inner) = part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                let (converter, name) = match inner.split_once(':') {
                    Some((converter, name)) => {
                        let converter = Converter::from_str(converter).map_err(|_| {
                            SetupError::invalid_rule(
                                rule,
                                format!("unknown converter `{converter}`"),
                            )
                        })?;
                        (converter, name)
                    }
                    None => (Converter::Str, inner),
                };
                if name.is_empty() {
                    return Err(SetupError::invalid_rule(rule, "empty variable name"));
                }
                if seen.contains(&name) {
                    return Err(SetupError::invalid_rule(
                        rule,
                        format!("duplicate variable `{name}`"),
                    ));
                }
                seen.push(name);
                segments.push(Segment::Param {
                    name: name.to_string(),
                    converter,
                });
            } else if part.contains('<') || part.contains('>') {
                return Err(SetupError::invalid_rule(
                    rule,
                    format!("malformed segment `{part}`"),
                ));
            } else {
                segments.push(Segment::Static(part.to_string()));
            }
        }

        Ok(Self {
            rule: rule.to_string(),
            segments,
        })
    }

    /// The rule as written at registration
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Declared path variables, in order of appearance
    pub fn params(&self) -> Vec<ParamSpec> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param { name, converter } => Some(ParamSpec {
                    name: name.clone(),
                    converter: *converter,
                }),
                Segment::Static(_) => None,
            })
            .collect()
    }

    /// Render for the host framework's router (`/users/:id`)
    pub fn to_axum(&self) -> String {
        self.render(|name| format!(":{name}"))
    }

    /// Render for the OpenAPI document (`/users/{id}`)
    pub fn to_openapi(&self) -> String {
        self.render(|name| format!("{{{name}}}"))
    }

    fn render(&self, param: impl Fn(&str) -> String) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(s) => out.push_str(s),
                Segment::Param { name, .. } => out.push_str(&param(name)),
            }
        }
        out
    }

    /// Coerce the raw matched variables into their converter-typed values
    pub fn coerce(&self, raw: &HashMap<String, String>) -> Result<Map<String, Value>, ApiError> {
        let mut typed = Map::new();
        for segment in &self.segments {
            if let Segment::Param { name, converter } = segment {
                let value = raw.get(name).ok_or_else(|| {
                    ApiError::internal(format!("router did not supply path variable `{name}`"))
                })?;
                typed.insert(name.clone(), converter.coerce(name, value)?);
            }
        }
        Ok(typed)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}
