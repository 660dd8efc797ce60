//! Addressing grammar for the state store
//!
//! ```text
//! source := '['? alt (',' alt)* ']'?
//! alt    := segment ('/' segment)*
//! ```
//!
//! Whitespace is insignificant. A bracketed source is a collection literal:
//! every resolvable alternative is merged into one array. An unbracketed list
//! is a set of alternatives.

use std::fmt;
use std::str::FromStr;

use crate::sdk::error::{EnactError, Result};

/// A slash-delimited path into the state store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    segments: Vec<String>,
}

impl StatePath {
    /// Parse a single path such as `fn/out` or `fn/out/field`
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(EnactError::InvalidPath(text.to_string()));
        }

        let segments: Vec<String> = cleaned.split('/').map(str::to_string).collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.contains(|c| matches!(c, '[' | ']' | ',')))
        {
            return Err(EnactError::InvalidPath(text.to_string()));
        }

        Ok(Self { segments })
    }

    /// Build a path from a node name and a sub-key (`name/port`)
    pub fn join(name: &str, key: &str) -> Result<Self> {
        Self::parse(&format!("{}/{}", name, key))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The flat store key for this path
    pub fn key(&self) -> String {
        self.segments.join("/")
    }

    /// The store key with an iteration suffix (`path/id`), or the bare key for id 0
    pub fn key_with_id(&self, id: u32) -> String {
        if id == 0 {
            self.key()
        } else {
            format!("{}/{}", self.key(), id)
        }
    }

    /// Proper prefixes of this path, longest first, paired with the remaining segments
    pub fn prefixes(&self) -> impl Iterator<Item = (String, &[String])> + '_ {
        (1..self.segments.len())
            .rev()
            .map(move |n| (self.segments[..n].join("/"), &self.segments[n..]))
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for StatePath {
    type Err = EnactError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A parsed `source` expression of a data port or loop bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExpr {
    /// Alternatives in declaration order
    pub alternatives: Vec<StatePath>,
    /// True when the source was written as a bracketed collection literal
    pub collection: bool,
}

impl SourceExpr {
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        let (inner, collection) = match cleaned
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            Some(inner) => (inner, true),
            None => (cleaned.as_str(), false),
        };

        if inner.is_empty() {
            return Err(EnactError::InvalidPath(text.to_string()));
        }

        let alternatives = inner
            .split(',')
            .map(|alt| StatePath::parse(alt).map_err(|_| EnactError::InvalidPath(text.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            alternatives,
            collection,
        })
    }

    /// Bare keys of all alternatives
    pub fn keys(&self) -> Vec<String> {
        self.alternatives.iter().map(StatePath::key).collect()
    }
}

impl FromStr for SourceExpr {
    type Err = EnactError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.keys().join(",");
        if self.collection {
            write!(f, "[{}]", joined)
        } else {
            write!(f, "{}", joined)
        }
    }
}
