// SPDX-License-Identifier: MIT

//! Workflow builder - turns workflow files into runnable executors
//!
//! The builder resolves node keys to arena handles, links children in
//! declaration order and validates everything that can be checked before a
//! run: constraint values, source paths, conditions, switch branches and the
//! pairing of start and end nodes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::engine::condition;
use crate::engine::config::EngineConfig;
use crate::engine::exec::Executor;
use crate::engine::loader::WorkflowLoader;
use crate::engine::node::{DataPort, NodeArena, NodeId, NodeKind};
use crate::engine::registry::FunctionRegistry;
use crate::engine::state::{SourceExpr, StateStore};
use crate::engine::types::WorkflowDefinition;
use crate::sdk::error::{EnactError, Result};

/// High-level builder for constructing executors from YAML definitions
pub struct Builder {
    loader: WorkflowLoader,
    registry: FunctionRegistry,
    config: EngineConfig,
}

impl Builder {
    pub fn new(registry: FunctionRegistry, config: EngineConfig) -> Self {
        Self {
            loader: WorkflowLoader::new(),
            registry,
            config,
        }
    }

    /// Load a workflow file and build an executor for it
    pub fn build_executor<P: AsRef<Path>>(&self, file_path: P) -> Result<Executor> {
        let def = self.loader.load_workflow(file_path)?;
        self.build_from_def(&def)
    }

    /// Build an executor from a parsed definition, seeding the store with its state
    pub fn build_from_def(&self, def: &WorkflowDefinition) -> Result<Executor> {
        let arena = build_arena(def)?;
        let store = StateStore::with_values(def.state.clone());
        log::info!(
            "Built workflow '{}' with {} nodes",
            def.name,
            arena.len()
        );
        Ok(Executor::new(arena, store, self.registry.clone()).with_config(self.config.clone()))
    }
}

/// Build and validate the node arena of a workflow definition
pub fn build_arena(def: &WorkflowDefinition) -> Result<NodeArena> {
    let mut arena = NodeArena::new();
    let mut ids: HashMap<&str, NodeId> = HashMap::new();

    for node in &def.nodes {
        let id = arena.add_node(node.state_name(), node.kind.clone());
        if ids.insert(node.key.as_str(), id).is_some() {
            return Err(EnactError::InvalidWorkflow(format!(
                "duplicate node key '{}'",
                node.key
            )));
        }
    }

    let lookup = |key: &str| {
        ids.get(key)
            .copied()
            .ok_or_else(|| EnactError::InvalidWorkflow(format!("unknown node key '{}'", key)))
    };

    for node in &def.nodes {
        let parent = lookup(&node.key)?;
        for child in &node.children {
            arena.link(parent, lookup(child)?)?;
        }
    }

    let root = lookup(&def.root)?;
    arena.set_root(root)?;

    check_acyclic(&arena, root)?;
    for id in arena.reachable(root)? {
        validate_node(&arena, id)?;
    }
    Ok(arena)
}

/// Every child edge must point away from the root
fn check_acyclic(arena: &NodeArena, root: NodeId) -> Result<()> {
    let mut done = HashSet::new();
    let mut on_path = HashSet::new();
    // (node, next child index)
    let mut stack = vec![(root, 0usize)];
    on_path.insert(root);

    while let Some((id, next)) = stack.pop() {
        let children = &arena.node(id)?.children;
        match children.get(next) {
            Some(&child) => {
                stack.push((id, next + 1));
                if on_path.contains(&child) {
                    return Err(EnactError::InvalidWorkflow(format!(
                        "cycle through node '{}'",
                        arena.node(child)?.name
                    )));
                }
                if done.insert(child) {
                    on_path.insert(child);
                    stack.push((child, 0));
                }
            }
            None => {
                on_path.remove(&id);
            }
        }
    }
    Ok(())
}

fn validate_node(arena: &NodeArena, id: NodeId) -> Result<()> {
    let node = arena.node(id)?;
    let invalid = |reason: String| EnactError::InvalidWorkflow(format!("{}: {}", node.name, reason));

    for port in node.kind.inputs() {
        validate_port(port)?;
    }

    match &node.kind {
        NodeKind::ParallelForStart(spec) => {
            if node.children.len() != 1 {
                return Err(invalid(format!(
                    "a loop needs exactly one body node, found {}",
                    node.children.len()
                )));
            }
            for constraint in &spec.constraints {
                constraint.kind()?;
            }
            for var in spec.loop_spec.variables() {
                SourceExpr::parse(var)?;
            }
        }
        NodeKind::IfStart(spec) => {
            condition::parse(&spec.condition)?;
            if node.children.is_empty() || node.children.len() > 2 {
                return Err(invalid("an if node needs one or two branches".into()));
            }
        }
        NodeKind::SwitchStart(spec) => {
            let branches = node.children.len();
            let targets = spec.cases.iter().map(|c| c.branch).chain(spec.default_branch);
            for branch in targets {
                if branch >= branches {
                    return Err(invalid(format!("branch {} out of {}", branch, branches)));
                }
            }
        }
        NodeKind::ParallelStart(_) if node.children.is_empty() => {
            return Err(invalid("a parallel node needs at least one branch".into()));
        }
        _ => {}
    }

    if node.kind.opens().is_some() {
        arena
            .matching_end(id)
            .map_err(|_| invalid("no matching end node".into()))?;
    }
    Ok(())
}

fn validate_port(port: &DataPort) -> Result<()> {
    port.source_expr()?;
    for constraint in &port.constraints {
        constraint.kind()?;
    }
    Ok(())
}
