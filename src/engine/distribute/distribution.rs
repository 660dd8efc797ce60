use std::fmt;

use crate::sdk::error::{EnactError, Result};

/// Value of a `distribution` constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Consecutive chunks of the given size
    Block(usize),
    /// The given number of full copies
    Replicate(usize),
    /// One full copy per branch (`REPLICATE(*)`)
    ReplicateAll,
}

impl Distribution {
    pub fn parse(value: &str) -> Result<Self> {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let not_implemented = || {
            EnactError::NotImplemented(format!(
                "Distribution type for {} not implemented",
                value
            ))
        };

        let (keyword, arg) = cleaned
            .strip_suffix(')')
            .and_then(|rest| rest.split_once('('))
            .ok_or_else(not_implemented)?;

        match keyword.to_ascii_uppercase().as_str() {
            "BLOCK" => match arg.parse::<usize>() {
                Ok(size) if size > 0 => Ok(Self::Block(size)),
                _ => Err(EnactError::invalid_constraint(
                    "distribution",
                    value,
                    "block size must be a positive integer",
                )),
            },
            "REPLICATE" if arg == "*" => Ok(Self::ReplicateAll),
            "REPLICATE" => arg.parse::<usize>().map(Self::Replicate).map_err(|_| {
                EnactError::invalid_constraint(
                    "distribution",
                    value,
                    "replica count must be an integer or *",
                )
            }),
            _ => Err(not_implemented()),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(n) => write!(f, "BLOCK({})", n),
            Self::Replicate(n) => write!(f, "REPLICATE({})", n),
            Self::ReplicateAll => write!(f, "REPLICATE(*)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(Distribution::parse("BLOCK(2)").unwrap(), Distribution::Block(2));
        assert_eq!(
            Distribution::parse("REPLICATE( 3 )").unwrap(),
            Distribution::Replicate(3)
        );
        assert_eq!(
            Distribution::parse("REPLICATE(*)").unwrap(),
            Distribution::ReplicateAll
        );
        assert_eq!(Distribution::parse("block(1)").unwrap(), Distribution::Block(1));
    }

    #[test]
    fn test_unknown_keyword() {
        for value in ["CYCLIC(2)", "BLOCK", "scatter"] {
            assert!(matches!(
                Distribution::parse(value),
                Err(EnactError::NotImplemented(_))
            ));
        }
    }

    #[test]
    fn test_malformed_sizes() {
        assert!(matches!(
            Distribution::parse("BLOCK(0)"),
            Err(EnactError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            Distribution::parse("REPLICATE(x)"),
            Err(EnactError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_display_round_trips_keyword() {
        assert_eq!(Distribution::Block(4).to_string(), "BLOCK(4)");
        assert_eq!(Distribution::ReplicateAll.to_string(), "REPLICATE(*)");
    }
}
