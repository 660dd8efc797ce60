// SPDX-License-Identifier: MIT

//! Arena holding the control-node tree of one run
//!
//! Nodes refer to each other through [`NodeId`] handles. `children` is the
//! ownership edge; `parents` is kept for lookups only (scope ids, join
//! thresholds) and is rebuilt whenever nodes are linked or cloned.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::runtime::{JoinBarrier, NodeStatus, RuntimeContext};
use super::types::NodeKind;
use crate::sdk::error::{EnactError, Result};

/// Handle of a node inside a [`NodeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Values pushed into a node ahead of its execution
pub type PendingInputs = Arc<Mutex<HashMap<String, Value>>>;

/// One control node
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Loop iteration id; 0 outside of unrolled loop bodies
    pub id: u32,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
    pub runtime: RuntimeContext,
    pub status: NodeStatus,
    pub barrier: JoinBarrier,
    pub pending: PendingInputs,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            id: 0,
            children: vec![],
            parents: vec![],
            runtime: RuntimeContext::default(),
            status: NodeStatus::default(),
            barrier: JoinBarrier::default(),
            pending: PendingInputs::default(),
        }
    }

    /// Copy of the configuration with fresh runtime fields and no edges
    fn fresh_copy(&self) -> Self {
        let mut copy = Self::new(self.name.clone(), self.kind.clone());
        copy.id = self.id;
        copy
    }

    /// Arrivals needed when no explicit threshold was set
    fn default_threshold(&self) -> usize {
        match self.kind {
            NodeKind::ParallelEnd | NodeKind::ParallelForEnd => self.parents.len(),
            _ => 1,
        }
    }
}

/// Result of [`NodeArena::clone_subtree`]
#[derive(Debug, Clone)]
pub struct ClonedSubtree {
    /// Copies of the requested roots, in order
    pub roots: Vec<NodeId>,
    /// Every node allocated for the copy
    pub nodes: Vec<NodeId>,
}

/// Owner of all nodes of a workflow run
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Shorthand for `add(Node::new(name, kind))`
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.add(Node::new(name, kind))
    }

    /// Append `child` to `parent`'s children
    pub fn link(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parents.push(parent);
        Ok(())
    }

    pub fn set_root(&mut self, root: NodeId) -> Result<()> {
        self.node(root)?;
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(EnactError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(EnactError::UnknownNode(id))
    }

    /// All nodes with the given name (clones share their template's name)
    pub fn find_all(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.name == name)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Id used to suffix state keys for this node.
    ///
    /// The node's own id, else the first parent's id unless that parent closes
    /// a parallel-for, else 0.
    pub fn scope_id(&self, id: NodeId) -> Result<u32> {
        let node = self.node(id)?;
        if node.id != 0 {
            return Ok(node.id);
        }
        if let Some(&parent) = node.parents.first() {
            let parent = self.node(parent)?;
            if parent.id != 0 && !matches!(parent.kind, NodeKind::ParallelForEnd) {
                return Ok(parent.id);
            }
        }
        Ok(0)
    }

    /// Replace `parent`'s children, keeping parent lists consistent
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<()> {
        for &child in &children {
            self.node(child)?;
        }
        let old = std::mem::replace(&mut self.node_mut(parent)?.children, children.clone());
        for child in old {
            self.node_mut(child)?.parents.retain(|p| *p != parent);
        }
        for child in children {
            self.node_mut(child)?.parents.push(parent);
        }
        Ok(())
    }

    /// Drop `removed` from `id`'s parent list
    pub fn detach_parents(&mut self, id: NodeId, removed: &HashSet<NodeId>) -> Result<()> {
        self.node_mut(id)?.parents.retain(|p| !removed.contains(p));
        Ok(())
    }

    /// Set the iteration id of every listed node
    pub fn retag(&mut self, nodes: &[NodeId], id: u32) -> Result<()> {
        for &node in nodes {
            self.node_mut(node)?.id = id;
        }
        Ok(())
    }

    pub fn set_expected(&mut self, end: NodeId, count: usize) -> Result<()> {
        self.node_mut(end)?.barrier.expect(count);
        Ok(())
    }

    /// Count one arrival at an end node; true for the arrival that completes it
    pub fn arrive(&mut self, end: NodeId) -> Result<bool> {
        let node = self.node_mut(end)?;
        let fallback = node.default_threshold();
        let complete = node.barrier.arrive(fallback);
        if complete {
            node.status = NodeStatus::Completed;
        }
        Ok(complete)
    }

    /// End node closing the construct opened by `start`.
    ///
    /// Walks first children from the body head, skipping over nested pairs of
    /// the same family.
    pub fn matching_end(&self, start: NodeId) -> Result<NodeId> {
        let node = self.node(start)?;
        let family = node.kind.opens().ok_or_else(|| {
            EnactError::CloneFailure(format!("{} does not open a construct", node.name))
        })?;

        let mut depth = 0usize;
        let mut current = node.children.first().copied();
        for _ in 0..=self.nodes.len() {
            let Some(id) = current else { break };
            let candidate = self.node(id)?;
            if candidate.kind.opens() == Some(family) {
                depth += 1;
            } else if candidate.kind.closes() == Some(family) {
                if depth == 0 {
                    return Ok(id);
                }
                depth -= 1;
            }
            current = candidate.children.first().copied();
        }

        Err(EnactError::CloneFailure(format!(
            "no matching end node for {}",
            node.name
        )))
    }

    /// Nodes reachable from `roots` without passing through `end`
    pub fn subtree(&self, roots: &[NodeId], end: NodeId) -> Result<Vec<NodeId>> {
        let mut seen = HashSet::new();
        let mut order = vec![];
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if id == end || !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.node(id)?.children.iter().rev().copied());
        }
        Ok(order)
    }

    /// Copy the subtree under `roots`, stopping at `end`.
    ///
    /// Copies get fresh runtime fields and configuration copied by value.
    /// `end` itself is shared: copied tails link to it and are added to its
    /// parents.
    pub fn clone_subtree(&mut self, roots: &[NodeId], end: NodeId) -> Result<ClonedSubtree> {
        self.node(end)?;
        let originals = self.subtree(roots, end)?;

        let mut memo = HashMap::with_capacity(originals.len());
        for &original in &originals {
            let copy = self.node(original)?.fresh_copy();
            memo.insert(original, self.add(copy));
        }

        for &original in &originals {
            let copy = memo[&original];
            let children = self.node(original)?.children.clone();
            for child in children {
                let mapped = if child == end {
                    end
                } else {
                    *memo.get(&child).ok_or_else(|| {
                        EnactError::CloneFailure(format!("child {} escaped the loop body", child))
                    })?
                };
                self.link(copy, mapped)?;
            }
        }

        let roots = roots
            .iter()
            .map(|r| {
                memo.get(r).copied().ok_or_else(|| {
                    EnactError::CloneFailure(format!("loop body {} reaches its end directly", r))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let nodes = originals.iter().map(|o| memo[o]).collect();
        Ok(ClonedSubtree { roots, nodes })
    }

    /// Every node reachable from `from`, in depth-first order
    pub fn reachable(&self, from: NodeId) -> Result<Vec<NodeId>> {
        let mut seen = HashSet::new();
        let mut order = vec![];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.node(id)?.children.iter().rev().copied());
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::node::types::{FunctionSpec, LoopSpec, ParallelForSpec, ParallelSpec};

    fn function() -> NodeKind {
        NodeKind::Function(FunctionSpec {
            function_type: String::new(),
            inputs: vec![],
            outputs: vec![],
        })
    }

    fn parallel_for() -> NodeKind {
        NodeKind::ParallelForStart(ParallelForSpec {
            inputs: vec![],
            loop_spec: LoopSpec::new("0", "3", "1"),
            constraints: vec![],
        })
    }

    /// loop -> par -> (a, b) -> par_end -> loop_end
    fn loop_with_parallel_body() -> (NodeArena, NodeId, NodeId, NodeId) {
        let mut arena = NodeArena::new();
        let start = arena.add_node("loop", parallel_for());
        let par = arena.add_node("par", NodeKind::ParallelStart(ParallelSpec::default()));
        let a = arena.add_node("a", function());
        let b = arena.add_node("b", function());
        let par_end = arena.add_node("par_end", NodeKind::ParallelEnd);
        let end = arena.add_node("loop_end", NodeKind::ParallelForEnd);
        arena.link(start, par).unwrap();
        arena.link(par, a).unwrap();
        arena.link(par, b).unwrap();
        arena.link(a, par_end).unwrap();
        arena.link(b, par_end).unwrap();
        arena.link(par_end, end).unwrap();
        (arena, start, par, end)
    }

    #[test]
    fn test_unknown_node() {
        let arena = NodeArena::new();
        assert!(matches!(
            arena.node(NodeId::new(3)),
            Err(EnactError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_matching_end_skips_nested_pairs() {
        let mut arena = NodeArena::new();
        let outer = arena.add_node("outer", parallel_for());
        let inner = arena.add_node("inner", parallel_for());
        let body = arena.add_node("body", function());
        let inner_end = arena.add_node("inner_end", NodeKind::ParallelForEnd);
        let outer_end = arena.add_node("outer_end", NodeKind::ParallelForEnd);
        arena.link(outer, inner).unwrap();
        arena.link(inner, body).unwrap();
        arena.link(body, inner_end).unwrap();
        arena.link(inner_end, outer_end).unwrap();

        assert_eq!(arena.matching_end(outer).unwrap(), outer_end);
        assert_eq!(arena.matching_end(inner).unwrap(), inner_end);
    }

    #[test]
    fn test_matching_end_missing() {
        let mut arena = NodeArena::new();
        let start = arena.add_node("loop", parallel_for());
        let body = arena.add_node("body", function());
        arena.link(start, body).unwrap();

        assert!(matches!(
            arena.matching_end(start),
            Err(EnactError::CloneFailure(_))
        ));
        assert!(arena.matching_end(body).is_err());
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let (mut arena, _start, par, end) = loop_with_parallel_body();
        let before = arena.len();

        let cloned = arena.clone_subtree(&[par], end).unwrap();
        assert_eq!(cloned.nodes.len(), 4);
        assert_eq!(arena.len(), before + 4);

        let copy = cloned.roots[0];
        assert_ne!(copy, par);
        assert_eq!(arena.node(copy).unwrap().name, "par");
        assert_eq!(arena.node(copy).unwrap().children.len(), 2);

        // the copied join node has exactly the two copied branches as parents
        let copy_end = arena.matching_end(copy).unwrap();
        assert!(cloned.nodes.contains(&copy_end));
        assert_eq!(arena.node(copy_end).unwrap().parents.len(), 2);
        // the shared end now also has the copied tail as a parent
        assert!(arena.node(end).unwrap().parents.contains(&copy_end));

        // runtime fields of copies are fresh
        arena.node_mut(par).unwrap().status = NodeStatus::Running;
        let cloned = arena.clone_subtree(&[par], end).unwrap();
        assert_eq!(arena.node(cloned.roots[0]).unwrap().status, NodeStatus::Pending);
    }

    #[test]
    fn test_scope_id_rules() {
        let (mut arena, start, par, end) = loop_with_parallel_body();
        let after = arena.add_node("after", function());
        arena.link(end, after).unwrap();

        let cloned = arena.clone_subtree(&[par], end).unwrap();
        arena.retag(&cloned.nodes, 3).unwrap();
        arena.node_mut(end).unwrap().id = 3;

        assert_eq!(arena.scope_id(cloned.roots[0]).unwrap(), 3);
        assert_eq!(arena.scope_id(start).unwrap(), 0);
        // parent closes a parallel-for, so its id is not inherited
        assert_eq!(arena.scope_id(after).unwrap(), 0);
    }

    #[test]
    fn test_join_thresholds() {
        let (mut arena, start, _par, end) = loop_with_parallel_body();
        let par_end = arena.find_all("par_end")[0];

        assert!(!arena.arrive(par_end).unwrap());
        assert!(arena.arrive(par_end).unwrap());
        assert_eq!(arena.node(par_end).unwrap().status, NodeStatus::Completed);

        arena.set_expected(end, 2).unwrap();
        assert!(!arena.arrive(end).unwrap());
        assert!(arena.arrive(end).unwrap());

        assert_eq!(arena.reachable(start).unwrap().len(), 6);
    }

    #[test]
    fn test_replace_children() {
        let (mut arena, start, par, end) = loop_with_parallel_body();
        let cloned = arena.clone_subtree(&[par], end).unwrap();
        arena.replace_children(start, cloned.roots.clone()).unwrap();

        assert_eq!(arena.node(start).unwrap().children, cloned.roots);
        assert!(arena.node(par).unwrap().parents.is_empty());
        assert_eq!(arena.node(cloned.roots[0]).unwrap().parents, vec![start]);
    }
}
