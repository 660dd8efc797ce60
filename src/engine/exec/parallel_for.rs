// SPDX-License-Identifier: MIT

//! Run-time unrolling of parallel-for loops
//!
//! A loop node owns a single body that ends at its matching
//! `parallel-for-end`. At execution time the body is cloned once per
//! iteration, each clone is tagged with its 1-based iteration id, the input
//! collections are split across the clones, and the clones run in a pool
//! bounded by the loop's `concurrency` constraint. The original body stays in
//! the arena as an unreachable template.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;

use super::executor::{Executor, NodeView};
use crate::engine::distribute::plan_port;
use crate::engine::node::{ConstraintKind, LoopBound, NodeId, ParallelForSpec, RuntimeContext};
use crate::engine::state::as_integer;
use crate::sdk::error::{EnactError, Result};

/// Number of iterations: every `i` with `from <= i < to - 1`, stepping by `step`
pub fn iteration_count(from: i64, to: i64, step: i64) -> usize {
    let last = to.saturating_sub(1);
    if step <= 0 || last <= from {
        return 0;
    }
    // widened so that extreme bounds cannot overflow
    let span = (i128::from(last) - i128::from(from)) as u128;
    let count = span.div_ceil(step as u128);
    usize::try_from(count).unwrap_or(usize::MAX)
}

impl Executor {
    pub(super) async fn execute_parallel_for(
        &self,
        view: &NodeView,
        spec: &ParallelForSpec,
    ) -> Result<Vec<NodeId>> {
        // inputs and bounds first, nothing is cloned on failure
        let values = self.resolve_ports(view, &spec.inputs).await?;
        let from = self.resolve_bound(view, &spec.loop_spec.from).await?;
        let to = self.resolve_bound(view, &spec.loop_spec.to).await?;
        let step = self.resolve_bound(view, &spec.loop_spec.step).await?;
        if step <= 0 {
            return Err(EnactError::invalid_constraint(
                "step",
                step.to_string(),
                "loop step must be positive",
            ));
        }
        let count = iteration_count(from, to, step);
        if count > self.config.max_iterations {
            return Err(EnactError::invalid_constraint(
                "loop",
                format!("{}..{} step {}", from, to, step),
                format!(
                    "{} iterations exceed the limit of {}",
                    count, self.config.max_iterations
                ),
            ));
        }
        let limit = self.loop_concurrency(view, spec)?;

        let mut plans = Vec::with_capacity(spec.inputs.len());
        for (port, value) in spec.inputs.iter().zip(&values) {
            plans.push((port.name.as_str(), plan_port(port, value, count)?));
        }

        let (clones, end) = self.unroll(view, from, to, step, count, limit).await?;
        log::info!(
            "{} unrolled into {} iterations (from {} to {} step {}, limit {})",
            view.name,
            count,
            from,
            to,
            step,
            limit
        );

        for (port, chunks) in plans {
            for (index, chunk) in chunks.into_iter().take(count).enumerate() {
                let key = format!("{}/{}/{}", view.name, port, index + 1);
                self.store.write(key, chunk).await;
            }
        }

        if count == 0 {
            log::debug!("{} has no iterations, continuing after {}", view.name, end);
            return self.continue_after(end).await;
        }

        self.fan_out(clones, limit).await?;
        Ok(vec![])
    }

    async fn resolve_bound(&self, view: &NodeView, bound: &LoopBound) -> Result<i64> {
        match bound {
            LoopBound::Literal(n) => Ok(*n),
            LoopBound::Variable(name) => {
                let value = self.resolve_source(view, name).await?;
                integer_bound(name, &value)
            }
        }
    }

    /// The node's `concurrency` constraint, else the configured default
    fn loop_concurrency(&self, view: &NodeView, spec: &ParallelForSpec) -> Result<usize> {
        let mut limit = self.config.default_loop_concurrency;
        for constraint in &spec.constraints {
            match constraint.kind()? {
                ConstraintKind::Concurrency(n) => limit = n,
                _ => log::warn!(
                    "{} ignores port constraint {} on the loop node",
                    view.name,
                    constraint.name
                ),
            }
        }
        Ok(limit)
    }

    /// Replace the loop's body by `count` tagged clones; returns the clone heads and the end node
    async fn unroll(
        &self,
        view: &NodeView,
        from: i64,
        to: i64,
        step: i64,
        count: usize,
        limit: usize,
    ) -> Result<(Vec<NodeId>, NodeId)> {
        let mut arena = self.arena.write().await;

        let body = match arena.node(view.id)?.children.as_slice() {
            [head] => *head,
            other => {
                return Err(EnactError::CloneFailure(format!(
                    "{} must have exactly one body node, found {}",
                    view.name,
                    other.len()
                )))
            }
        };
        let end = arena.matching_end(view.id)?;
        let template: HashSet<NodeId> = arena.subtree(&[body], end)?.into_iter().collect();
        let start_time = view.runtime.start_time.unwrap_or_else(Utc::now);

        let mut heads = Vec::with_capacity(count);
        for index in 0..count {
            let iteration = u32::try_from(index + 1).map_err(|_| {
                EnactError::invalid_constraint("loop", count.to_string(), "too many iterations")
            })?;
            let cloned = arena.clone_subtree(&[body], end)?;
            arena.retag(&cloned.nodes, iteration)?;

            let context = RuntimeContext {
                loop_counter: Some(from + index as i64 * step),
                max_loop_counter: Some(to - 1),
                concurrency_limit: Some(limit),
                start_time: Some(start_time),
                ..RuntimeContext::default()
            };
            // every node of the iteration, not only its head, runs under the loop budget
            for &node in &cloned.nodes {
                arena.node_mut(node)?.runtime.inherit_loop(&context);
            }
            for &head in &cloned.roots {
                let node = arena.node_mut(head)?;
                if node.kind.accepts_nested_offset() {
                    node.runtime.nested_offset = Some(0);
                }
            }
            heads.extend(cloned.roots);
        }

        arena.replace_children(view.id, heads.clone())?;
        arena.detach_parents(end, &template)?;
        if count > 0 {
            arena.set_expected(end, count)?;
        }
        Ok((heads, end))
    }
}

fn integer_bound(name: &str, value: &Value) -> Result<i64> {
    as_integer(value).ok_or_else(|| {
        EnactError::invalid_constraint("loop", name, format!("{} is not an integer", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iteration_count_keeps_exclusive_upper_bound_minus_one() {
        assert_eq!(iteration_count(0, 5, 1), 4);
        assert_eq!(iteration_count(0, 5, 2), 2);
        assert_eq!(iteration_count(0, 6, 2), 3);
        assert_eq!(iteration_count(2, 3, 1), 0);
        assert_eq!(iteration_count(5, 0, 1), 0);
        assert_eq!(iteration_count(-3, 1, 1), 3);
    }

    #[test]
    fn test_iteration_count_extreme_bounds() {
        assert_eq!(iteration_count(i64::MIN, i64::MAX, i64::MAX), 2);
        assert_eq!(iteration_count(0, 1_000_000_000_000_000_000, 1), 999_999_999_999_999_999);
    }

    #[test]
    fn test_iteration_count_non_positive_step() {
        assert_eq!(iteration_count(0, 5, 0), 0);
        assert_eq!(iteration_count(0, 5, -1), 0);
    }

    #[test]
    fn test_integer_bound() {
        assert_eq!(integer_bound("n", &json!(5)).unwrap(), 5);
        assert_eq!(integer_bound("n", &json!("7")).unwrap(), 7);
        assert!(matches!(
            integer_bound("n", &json!([1])),
            Err(EnactError::InvalidConstraint { .. })
        ));
    }
}
