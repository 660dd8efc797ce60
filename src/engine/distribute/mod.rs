// SPDX-License-Identifier: MIT

//! Data distribution for loop unrolling
//!
//! Decides which part of a collection-valued input each unrolled branch
//! receives. The rules, applied in order:
//! - `element-index` selects (and may repeat or reorder) elements first
//! - `distribution` then splits the selection: `BLOCK(n)`, `REPLICATE(n)`,
//!   `REPLICATE(*)`; without it every branch gets the full selection
//! - a chunk holding exactly one element is collapsed to a bare scalar

mod distribution;
mod element_index;

pub use distribution::Distribution;
pub use element_index::parse_indices;

use serde_json::Value;

use crate::engine::node::{Constraint, ConstraintKind, DataPort};
use crate::sdk::error::{EnactError, Result};

/// Split `elements` into chunks according to `constraints`.
///
/// The first `element-index` and the first `distribution` constraint win;
/// `concurrency` is a node-level constraint and is ignored here.
pub fn distribute(
    elements: Vec<Value>,
    constraints: &[Constraint],
    branch_count: usize,
) -> Result<Vec<Vec<Value>>> {
    let mut element_index = None;
    let mut distribution = None;
    for constraint in constraints {
        match constraint.kind()? {
            ConstraintKind::ElementIndex(indices) => {
                element_index.get_or_insert(indices);
            }
            ConstraintKind::Distribution(d) => {
                distribution.get_or_insert(d);
            }
            ConstraintKind::Concurrency(_) => {}
        }
    }

    let elements = match element_index {
        Some(indices) => select(&elements, &indices)?,
        None => elements,
    };

    let chunks = match distribution {
        Some(Distribution::Block(size)) => block(unwrap_nested(elements), size),
        Some(Distribution::Replicate(n)) => vec![elements; n],
        Some(Distribution::ReplicateAll) | None => vec![elements; branch_count],
    };
    Ok(chunks)
}

/// Pick elements by index, in the given order
pub fn select(elements: &[Value], indices: &[usize]) -> Result<Vec<Value>> {
    indices
        .iter()
        .map(|&i| {
            elements.get(i).cloned().ok_or_else(|| {
                EnactError::invalid_constraint(
                    "element-index",
                    i.to_string(),
                    format!("index out of range for {} elements", elements.len()),
                )
            })
        })
        .collect()
}

/// Consecutive chunks of `size`; the last one may be shorter
pub fn block(elements: Vec<Value>, size: usize) -> Vec<Vec<Value>> {
    elements.chunks(size.max(1)).map(<[Value]>::to_vec).collect()
}

/// A collection that arrived as one element wrapping the real array is unwrapped
fn unwrap_nested(elements: Vec<Value>) -> Vec<Value> {
    if elements.len() != 1 {
        return elements;
    }

    match &elements[0] {
        Value::Array(items) => items.clone(),
        Value::String(text) => {
            let trimmed = text.trim();
            if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
                return elements;
            }
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                return items;
            }
            let inner = &trimmed[1..trimmed.len() - 1];
            if inner.trim().is_empty() {
                return vec![];
            }
            inner
                .split(',')
                .map(|item| Value::String(item.trim().trim_matches('"').to_string()))
                .collect()
        }
        _ => elements,
    }
}

/// Per-branch values of one loop input port.
///
/// Ports with constraints are distributed (a non-array value counts as a
/// one-element collection). Unconstrained `passing` ports forward their value
/// to every branch. Anything else yields no per-branch values.
pub fn plan_port(port: &DataPort, value: &Value, branch_count: usize) -> Result<Vec<Value>> {
    if port.constraints.is_empty() {
        if port.passing {
            return Ok(vec![value.clone(); branch_count]);
        }
        return Ok(vec![]);
    }

    let elements = match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };

    distribute(elements, &port.constraints, branch_count)?
        .into_iter()
        .map(|mut chunk| {
            if chunk.len() == 1 {
                port.port_type.collapse(chunk.remove(0))
            } else {
                Ok(Value::Array(chunk))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::PortType;
    use serde_json::json;

    fn values(v: Value) -> Vec<Value> {
        match v {
            Value::Array(items) => items,
            _ => panic!("expected an array"),
        }
    }

    fn constraint(name: &str, value: &str) -> Vec<Constraint> {
        vec![Constraint::new(name, value)]
    }

    #[test]
    fn test_block_chunk_counts() {
        for len in 0..12usize {
            for size in 1..5usize {
                let elements: Vec<Value> = (0..len).map(|i| json!(i)).collect();
                let chunks = distribute(
                    elements.clone(),
                    &constraint("distribution", &format!("BLOCK({})", size)),
                    3,
                )
                .unwrap();

                // a lone element is not an array wrapper, so nothing is unwrapped
                assert_eq!(chunks.len(), len.div_ceil(size), "len={} size={}", len, size);
                for chunk in chunks.iter().take(chunks.len().saturating_sub(1)) {
                    assert_eq!(chunk.len(), size);
                }
                let flat: Vec<Value> = chunks.into_iter().flatten().collect();
                assert_eq!(flat, elements);
            }
        }
    }

    #[test]
    fn test_block_unwraps_nested_array_string() {
        let chunks = distribute(
            vec![json!("[1, 2, 3]")],
            &constraint("distribution", "BLOCK(2)"),
            1,
        )
        .unwrap();
        assert_eq!(chunks, vec![vec![json!(1), json!(2)], vec![json!(3)]]);

        let chunks = distribute(
            vec![json!("[a, b]")],
            &constraint("distribution", "BLOCK(1)"),
            1,
        )
        .unwrap();
        assert_eq!(chunks, vec![vec![json!("a")], vec![json!("b")]]);
    }

    #[test]
    fn test_replicate() {
        let elements = values(json!(["a", "b"]));
        let chunks = distribute(
            elements.clone(),
            &constraint("distribution", "REPLICATE(3)"),
            5,
        )
        .unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| *c == elements));

        let chunks = distribute(
            elements.clone(),
            &constraint("distribution", "REPLICATE(*)"),
            5,
        )
        .unwrap();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| *c == elements));
    }

    #[test]
    fn test_broadcast_without_distribution() {
        let elements = values(json!([1, 2]));
        let chunks = distribute(elements.clone(), &[], 4).unwrap();
        assert_eq!(chunks, vec![elements; 4]);
    }

    #[test]
    fn test_element_index_applies_first() {
        let elements = values(json!(["a", "b", "c"]));
        let chunks = distribute(elements.clone(), &constraint("element-index", "[2,0]"), 1).unwrap();
        assert_eq!(chunks, vec![vec![json!("c"), json!("a")]]);

        let constraints = vec![
            Constraint::new("distribution", "BLOCK(1)"),
            Constraint::new("element-index", "[2,0]"),
        ];
        let chunks = distribute(elements, &constraints, 2).unwrap();
        assert_eq!(chunks, vec![vec![json!("c")], vec![json!("a")]]);
    }

    #[test]
    fn test_element_index_out_of_range() {
        let err = distribute(values(json!([1])), &constraint("element-index", "3"), 1).unwrap_err();
        assert!(matches!(err, EnactError::InvalidConstraint { .. }));
    }

    #[test]
    fn test_unknown_constraint_or_keyword() {
        let err = distribute(vec![], &constraint("shuffle", "yes"), 1).unwrap_err();
        assert!(matches!(err, EnactError::NotImplemented(_)));

        let err = distribute(vec![], &constraint("distribution", "CYCLIC(2)"), 1).unwrap_err();
        assert!(matches!(err, EnactError::NotImplemented(_)));
    }

    #[test]
    fn test_plan_port_collapses_single_elements() {
        let port = DataPort::new("n", "wf/nums", PortType::Number)
            .with_constraint("distribution", "BLOCK(1)");
        let plan = plan_port(&port, &json!(["1", 2, "3.5"]), 3).unwrap();
        assert_eq!(plan, vec![json!(1), json!(2), json!(3.5)]);

        let port = DataPort::new("s", "wf/items", PortType::Collection)
            .with_constraint("distribution", "BLOCK(2)");
        let plan = plan_port(&port, &json!([1, 2, 3]), 2).unwrap();
        assert_eq!(plan, vec![json!([1, 2]), json!("3")]);
    }

    #[test]
    fn test_plan_port_scalar_value_is_wrapped() {
        let port = DataPort::new("x", "wf/x", PortType::String)
            .with_constraint("distribution", "REPLICATE(*)");
        let plan = plan_port(&port, &json!("seed"), 3).unwrap();
        assert_eq!(plan, vec![json!("seed"); 3]);
    }

    #[test]
    fn test_plan_port_passing_and_plain() {
        let port = DataPort::new("cfg", "wf/cfg", PortType::String).passing();
        let plan = plan_port(&port, &json!({"a": 1}), 2).unwrap();
        assert_eq!(plan, vec![json!({"a": 1}); 2]);

        let port = DataPort::new("cfg", "wf/cfg", PortType::String);
        assert!(plan_port(&port, &json!(1), 2).unwrap().is_empty());
    }
}
