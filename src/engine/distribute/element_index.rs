//! Parser for `element-index` constraint values
//!
//! Accepts an optional bracketed, comma-separated list where every item is an
//! index `i`, an inclusive range `start:end`, or a strided range
//! `start:end:stride`. Order and repetitions are preserved.

use crate::sdk::error::{EnactError, Result};

pub fn parse_indices(value: &str) -> Result<Vec<usize>> {
    let invalid = |reason: &str| EnactError::invalid_constraint("element-index", value, reason);

    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = cleaned
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(&cleaned);

    if inner.is_empty() {
        return Err(invalid("empty index list"));
    }

    let mut indices = vec![];
    for item in inner.split(',') {
        let parts: Vec<&str> = item.split(':').collect();
        let numbers = parts
            .iter()
            .map(|p| p.parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| invalid(&format!("'{}' is not an index or range", item)))?;

        match numbers.as_slice() {
            [index] => indices.push(*index),
            [start, end] => indices.extend(*start..=*end),
            [start, end, stride] => {
                if *stride == 0 {
                    return Err(invalid("stride must be positive"));
                }
                indices.extend((*start..=*end).step_by(*stride));
            }
            _ => return Err(invalid(&format!("'{}' has too many parts", item))),
        }
    }

    Ok(indices)
}
