use serde_json::Value;
use std::collections::HashMap;

use super::executor::{Executor, NodeView};
use crate::engine::condition;
use crate::engine::node::{IfSpec, NodeId, SwitchSpec};
use crate::sdk::error::{EnactError, Result};

impl Executor {
    /// Child 0 runs when the condition holds, child 1 (if any) otherwise
    pub(super) async fn execute_if(&self, view: &NodeView, spec: &IfSpec) -> Result<Vec<NodeId>> {
        let expr = condition::parse(&spec.condition)?;

        let mut bindings = HashMap::new();
        for path in expr.paths() {
            match self.resolve_source(view, path).await {
                Ok(value) => {
                    bindings.insert(path.to_string(), value);
                }
                Err(e) if e.is_missing_input() => {}
                Err(e) => return Err(e),
            }
        }

        let taken = condition::evaluate(&expr, &bindings);
        log::info!("{}: '{}' is {}", view.name, spec.condition, taken);
        self.select_branch(view, if taken { 0 } else { 1 }).await
    }

    /// Run the branch of the first matching case, else the default branch
    pub(super) async fn execute_switch(
        &self,
        view: &NodeView,
        spec: &SwitchSpec,
    ) -> Result<Vec<NodeId>> {
        let value = self.resolve_source(view, &spec.input.source).await?;
        let branch = spec
            .cases
            .iter()
            .find(|case| case_matches(&case.value, &value))
            .map(|case| case.branch)
            .or(spec.default_branch);

        match branch {
            Some(index) if index >= view.children.len() => Err(EnactError::InvalidWorkflow(
                format!("{} has no branch {}", view.name, index),
            )),
            Some(index) => {
                log::info!("{}: {} selects branch {}", view.name, value, index);
                self.select_branch(view, index).await
            }
            None => {
                log::info!("{}: no case matches {}", view.name, value);
                self.skip_to_end(view.id).await
            }
        }
    }

    async fn select_branch(&self, view: &NodeView, index: usize) -> Result<Vec<NodeId>> {
        match view.children.get(index) {
            Some(&child) => Ok(vec![child]),
            None => self.skip_to_end(view.id).await,
        }
    }
}

/// JSON equality, or equal text for values of different JSON types
fn case_matches(case: &Value, value: &Value) -> bool {
    case == value || as_text(case) == as_text(value)
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
