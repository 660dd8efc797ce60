//! Engine configuration

use std::env;

use crate::sdk::error::{EnactError, Result};

pub const MAX_POOL_SIZE_VAR: &str = "ENACTMENT_MAX_POOL_SIZE";
pub const LOOP_CONCURRENCY_VAR: &str = "ENACTMENT_LOOP_CONCURRENCY";
pub const MAX_ITERATIONS_VAR: &str = "ENACTMENT_MAX_ITERATIONS";

/// Limits applied by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on the branch pool of a parallel node
    pub max_pool_size: usize,
    /// Concurrency of a parallel-for without a `concurrency` constraint
    pub default_loop_concurrency: usize,
    /// Largest number of clones a single parallel-for may unroll into
    pub max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 1000,
            default_loop_concurrency: 1000,
            max_iterations: 100_000,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by environment variables, when set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_POOL_SIZE_VAR) {
            config.max_pool_size = parse_positive(MAX_POOL_SIZE_VAR, &raw)?;
        }
        if let Some(raw) = lookup(LOOP_CONCURRENCY_VAR) {
            config.default_loop_concurrency = parse_positive(LOOP_CONCURRENCY_VAR, &raw)?;
        }
        if let Some(raw) = lookup(MAX_ITERATIONS_VAR) {
            config.max_iterations = parse_positive(MAX_ITERATIONS_VAR, &raw)?;
        }
        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(EnactError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_pool_size, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (MAX_POOL_SIZE_VAR, "16"),
            (LOOP_CONCURRENCY_VAR, " 4 "),
            (MAX_ITERATIONS_VAR, "500"),
        ]))
        .unwrap();
        assert_eq!(config.max_pool_size, 16);
        assert_eq!(config.default_loop_concurrency, 4);
        assert_eq!(config.max_iterations, 500);
    }

    #[test]
    fn test_invalid_value() {
        let err = EngineConfig::from_lookup(lookup(&[(MAX_POOL_SIZE_VAR, "0")])).unwrap_err();
        assert!(matches!(err, EnactError::Config(_)));
        assert!(EngineConfig::from_lookup(lookup(&[(LOOP_CONCURRENCY_VAR, "lots")])).is_err());
    }
}
