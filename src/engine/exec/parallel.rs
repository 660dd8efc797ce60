use super::executor::{Executor, NodeView};
use crate::engine::node::{NodeId, ParallelSpec};
use crate::engine::state::key_for;
use crate::sdk::error::Result;

impl Executor {
    /// Write the node's inputs, then run every branch in a bounded pool
    pub(super) async fn execute_parallel(
        &self,
        view: &NodeView,
        spec: &ParallelSpec,
    ) -> Result<Vec<NodeId>> {
        let values = self.resolve_ports(view, &spec.inputs).await?;
        for (port, value) in spec.inputs.iter().zip(values) {
            let key = key_for(&format!("{}/{}", view.name, port.name), view.own_id);
            self.store.write(key, value).await;
        }

        if view.children.is_empty() {
            return self.skip_to_end(view.id).await;
        }

        self.prepare_branches(view).await?;

        let limit = view
            .runtime
            .concurrency_limit
            .unwrap_or(self.config.max_pool_size);
        log::info!(
            "{} fans out {} branches (limit {})",
            view.name,
            view.children.len(),
            limit
        );
        self.fan_out(view.children.clone(), limit).await?;
        Ok(vec![])
    }

    /// Forward the loop context and nested offsets to the branch heads
    async fn prepare_branches(&self, view: &NodeView) -> Result<()> {
        let mut arena = self.arena.write().await;

        let mut functions = 0u64;
        for &child in &view.children {
            if arena.node(child)?.kind.is_function() {
                functions += 1;
            }
        }

        for &child in &view.children {
            let node = arena.node_mut(child)?;
            if view.runtime.in_loop() {
                node.runtime.inherit_loop(&view.runtime);
            }
            if let Some(offset) = view.runtime.nested_offset {
                if node.kind.accepts_nested_offset() {
                    node.runtime.nested_offset = Some(offset + functions);
                } else if node.kind.is_function() {
                    node.runtime.parallel_functions = Some(offset + functions);
                }
            }
        }
        Ok(())
    }
}
