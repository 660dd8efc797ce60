use super::executor::{Executor, NodeView};
use crate::engine::node::{NodeId, NodeStatus};
use crate::sdk::error::Result;

impl Executor {
    /// Count an arrival; the arrival that completes the barrier continues past the end
    pub(super) async fn execute_end(&self, view: &NodeView) -> Result<Vec<NodeId>> {
        let complete = self.arena.write().await.arrive(view.id)?;
        if complete {
            log::debug!("{} joined", view.name);
            Ok(view.children.clone())
        } else {
            Ok(vec![])
        }
    }

    /// Mark the end matching `start` as done without any arrivals
    pub(super) async fn skip_to_end(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let end = self.arena.read().await.matching_end(start)?;
        self.continue_after(end).await
    }

    /// Mark `end` as done without any arrivals and return its successors
    pub(super) async fn continue_after(&self, end: NodeId) -> Result<Vec<NodeId>> {
        let mut arena = self.arena.write().await;
        let node = arena.node_mut(end)?;
        node.status = NodeStatus::Completed;
        log::debug!("continuing after {}", node.name);
        Ok(node.children.clone())
    }
}
