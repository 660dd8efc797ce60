// SPDX-License-Identifier: MIT

//! Declared port types and the conversions applied when values enter the store

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

use crate::sdk::error::{EnactError, Result};

/// Type tag declared on data ports and function outputs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    #[default]
    String,
    Number,
    Collection,
    Boolean,
}

impl PortType {
    /// Parse a type tag; the comparison ignores case
    pub fn parse_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "collection" => Ok(Self::Collection),
            "boolean" => Ok(Self::Boolean),
            other => Err(EnactError::invalid_value(other, "unexpected type")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Collection => "collection",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a raw textual value as produced by a remote function
    pub fn parse_raw(&self, raw: &str) -> Result<Value> {
        match self {
            Self::String => Ok(Value::String(raw.replace('"', ""))),
            Self::Number => parse_number(raw),
            Self::Collection => self.parse_collection(raw),
            Self::Boolean => Ok(Value::Bool(raw.trim().eq_ignore_ascii_case("true"))),
        }
    }

    /// Coerce an already-structured value to this type
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match (self, value) {
            (Self::String, Value::String(s)) => Ok(Value::String(s)),
            (Self::String, other) => Ok(Value::String(other.to_string())),
            (Self::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (Self::Number, Value::String(s)) => parse_number(&s),
            (Self::Collection, v @ (Value::Array(_) | Value::Object(_))) => Ok(v),
            (Self::Collection, Value::String(s)) => self.parse_collection(&s),
            (Self::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Self::Boolean, Value::String(s)) => self.parse_raw(&s),
            (ty, other) => Err(EnactError::invalid_value(
                ty.as_str(),
                format!("cannot store {}", other),
            )),
        }
    }

    /// Unwrap a single distributed element into a bare scalar of this type.
    ///
    /// Numbers stay numeric; every other declared type collapses to a string.
    pub fn collapse(&self, element: Value) -> Result<Value> {
        match (self, element) {
            (Self::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (Self::Number, Value::String(s)) => parse_number(&s),
            (Self::Number, other) => Err(EnactError::invalid_value(
                "number",
                format!("cannot collapse {}", other),
            )),
            (_, Value::String(s)) => Ok(Value::String(s)),
            (_, other) => Ok(Value::String(other.to_string())),
        }
    }

    fn parse_collection(&self, raw: &str) -> Result<Value> {
        let trimmed = raw.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
                return Ok(value);
            }

            let cleaned = trimmed.replace(|c: char| c == '"' || c == '\\', "");
            let inner = cleaned[1..cleaned.len() - 1].trim();
            if inner.is_empty() {
                return Ok(Value::Array(vec![]));
            }
            if inner.starts_with('{') && inner.ends_with('}') {
                return serde_json::from_str(&format!("[{}]", inner))
                    .map_err(|e| EnactError::invalid_value("collection", e.to_string()));
            }
            let items = inner
                .split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect();
            return Ok(Value::Array(items));
        }

        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return serde_json::from_str(trimmed)
                .map_err(|e| EnactError::invalid_value("collection", e.to_string()));
        }

        Err(EnactError::invalid_value(
            "collection",
            format!("'{}' is neither an array nor an object", raw),
        ))
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PortType {
    type Err = EnactError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_tag(s)
    }
}

fn parse_number(raw: &str) -> Result<Value> {
    let cleaned = raw.replace(|c: char| c == '"' || c == '\\', "");
    let cleaned = cleaned.trim();

    if !cleaned.contains('.') {
        if let Ok(i) = cleaned.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
    }

    cleaned
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| EnactError::invalid_value("number", format!("'{}' is not a number", raw)))
}

/// Read a JSON value as an integer loop bound (`5`, `5.0`, `"5"`)
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim().trim_matches('"');
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}
