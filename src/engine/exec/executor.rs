// SPDX-License-Identifier: MIT

//! Workflow executor

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::engine::config::EngineConfig;
use crate::engine::node::{
    DataPort, NodeArena, NodeId, NodeKind, NodeStatus, PendingInputs, RuntimeContext,
};
use crate::engine::registry::FunctionRegistry;
use crate::engine::state::{SourceExpr, StateStore};
use crate::sdk::error::{EnactError, Result};

/// Copy of the fields of a node needed to execute it, taken under a short read lock
#[derive(Debug, Clone)]
pub(super) struct NodeView {
    pub id: NodeId,
    pub name: String,
    /// Iteration id used for writes
    pub own_id: u32,
    /// Iteration id used for reads
    pub scope: u32,
    pub kind: NodeKind,
    pub runtime: RuntimeContext,
    pub children: Vec<NodeId>,
    pub pending: PendingInputs,
}

/// Executes one workflow run over a node arena and a state store
#[derive(Clone)]
pub struct Executor {
    pub(super) arena: Arc<RwLock<NodeArena>>,
    pub(super) store: StateStore,
    pub(super) registry: FunctionRegistry,
    pub(super) config: EngineConfig,
    run_id: Uuid,
}

impl Executor {
    pub fn new(arena: NodeArena, store: StateStore, registry: FunctionRegistry) -> Self {
        Self {
            arena: Arc::new(RwLock::new(arena)),
            store,
            registry,
            config: EngineConfig::default(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Shared handle to the arena, for inspection after (or during) a run
    pub fn arena(&self) -> Arc<RwLock<NodeArena>> {
        self.arena.clone()
    }

    pub async fn status(&self, id: NodeId) -> Result<NodeStatus> {
        Ok(self.arena.read().await.node(id)?.status.clone())
    }

    /// Execute the workflow from its root node
    pub async fn run(&self) -> Result<()> {
        let root = {
            let mut arena = self.arena.write().await;
            let root = arena
                .root()
                .ok_or_else(|| EnactError::InvalidWorkflow("workflow has no root node".into()))?;
            let node = arena.node_mut(root)?;
            if node.runtime.start_time.is_none() {
                node.runtime.start_time = Some(Utc::now());
            }
            root
        };

        log::info!("Run {} started at node {}", self.run_id, root);
        let started = Utc::now();
        let result = self.execute(root).await;
        let elapsed = Utc::now() - started;

        match &result {
            Ok(()) => log::info!(
                "Run {} completed in {} ms",
                self.run_id,
                elapsed.num_milliseconds()
            ),
            Err(e) => log::error!("Run {} failed: {}", self.run_id, e),
        }
        result
    }

    /// Execute one node, then its successors.
    ///
    /// End nodes only continue once their join barrier is reached.
    pub fn execute(&self, id: NodeId) -> BoxFuture<'static, Result<()>> {
        let executor = self.clone();
        async move {
            let view = executor.view(id).await?;
            let is_end = view.kind.is_end();
            if !is_end {
                executor.set_status(id, NodeStatus::Running).await?;
            }
            log::debug!("Executing {} {} (id {})", view.kind.type_tag(), view.name, view.own_id);

            let outcome = match &view.kind {
                NodeKind::Function(spec) => executor.execute_function(&view, spec).await,
                NodeKind::ParallelStart(spec) => executor.execute_parallel(&view, spec).await,
                NodeKind::ParallelForStart(spec) => {
                    executor.execute_parallel_for(&view, spec).await
                }
                NodeKind::IfStart(spec) => executor.execute_if(&view, spec).await,
                NodeKind::SwitchStart(spec) => executor.execute_switch(&view, spec).await,
                NodeKind::ParallelEnd
                | NodeKind::ParallelForEnd
                | NodeKind::IfEnd
                | NodeKind::SwitchEnd => executor.execute_end(&view).await,
            };

            let successors = match outcome {
                Ok(successors) => successors,
                Err(e) => {
                    log::error!("Node {} failed: {}", view.name, e);
                    executor
                        .set_status(id, NodeStatus::Failed(e.to_string()))
                        .await?;
                    return Err(e);
                }
            };

            if !is_end {
                executor.set_status(id, NodeStatus::Completed).await?;
            }
            for next in successors {
                executor.execute(next).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Merge values pushed by a predecessor into a node's pending inputs.
    ///
    /// Only keys naming one of the node's sources or loop variables are kept;
    /// returns how many were merged.
    pub async fn pass_result(&self, id: NodeId, values: HashMap<String, Value>) -> Result<usize> {
        let (accepted, pending, name) = {
            let arena = self.arena.read().await;
            let node = arena.node(id)?;
            (node.kind.accepted_keys(), node.pending.clone(), node.name.clone())
        };

        let mut slot = pending.lock().await;
        let mut merged = 0;
        for (key, value) in values {
            if accepted.contains(&key) {
                slot.insert(key, value);
                merged += 1;
            } else {
                log::debug!("{} ignores passed value {}", name, key);
            }
        }
        Ok(merged)
    }

    pub(super) async fn view(&self, id: NodeId) -> Result<NodeView> {
        let arena = self.arena.read().await;
        let node = arena.node(id)?;
        Ok(NodeView {
            id,
            name: node.name.clone(),
            own_id: node.id,
            scope: arena.scope_id(id)?,
            kind: node.kind.clone(),
            runtime: node.runtime.clone(),
            children: node.children.clone(),
            pending: node.pending.clone(),
        })
    }

    pub(super) async fn set_status(&self, id: NodeId, status: NodeStatus) -> Result<()> {
        self.arena.write().await.node_mut(id)?.status = status;
        Ok(())
    }

    /// Resolve a source expression for a node.
    ///
    /// Each alternative is looked up in the store under the node's scope id,
    /// then in the node's pending inputs. A collection literal merges every
    /// resolved alternative into an array; otherwise the last one wins.
    pub(super) async fn resolve_source(&self, view: &NodeView, source: &str) -> Result<Value> {
        let expr = SourceExpr::parse(source)?;
        let pending = view.pending.lock().await.clone();

        let mut found = Vec::with_capacity(expr.alternatives.len());
        for alt in &expr.alternatives {
            let value = match self.store.resolve(alt, view.scope).await {
                Some(value) => Some(value),
                None => pending.get(&alt.key()).cloned(),
            };
            found.extend(value);
        }

        if expr.collection && !found.is_empty() {
            return Ok(Value::Array(found));
        }
        found
            .pop()
            .or_else(|| pending.get(source.trim()).cloned())
            .ok_or_else(|| EnactError::missing_input(&view.name, source))
    }

    /// Resolve every port, failing on the first unresolved one
    pub(super) async fn resolve_ports(&self, view: &NodeView, ports: &[DataPort]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(ports.len());
        for port in ports {
            values.push(self.resolve_source(view, &port.source).await?);
        }
        Ok(values)
    }

    /// Run `children` in a pool of at most `limit` concurrent branches.
    ///
    /// Every branch runs to completion; the first failure in submission order
    /// is returned and the others are logged.
    pub(super) async fn fan_out(&self, children: Vec<NodeId>, limit: usize) -> Result<()> {
        if children.is_empty() {
            return Ok(());
        }

        let pool = children.len().min(limit.max(1));
        let semaphore = Arc::new(Semaphore::new(pool));
        let mut join_set = JoinSet::new();
        log::debug!("Submitting {} branches to a pool of {}", children.len(), pool);

        for (index, child) in children.into_iter().enumerate() {
            let executor = self.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => executor.execute(child).await,
                    Err(e) => Err(EnactError::Join(e.to_string())),
                };
                (index, result)
            });
        }

        let mut failures = vec![];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(e))) => failures.push((index, e)),
                Err(e) => failures.push((usize::MAX, EnactError::Join(e.to_string()))),
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some((_, first)) => {
                for (index, e) in failures {
                    log::error!("Branch {} also failed: {}", index, e);
                }
                Err(first)
            }
        }
    }
}
