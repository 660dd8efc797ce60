// SPDX-License-Identifier: MIT

//! Control nodes
//!
//! This module provides:
//! - `NodeKind` and the per-variant specs (ports, loop bounds, constraints)
//! - `NodeArena` - index-addressed storage of the node tree, subtree cloning
//! - `RuntimeContext` / `NodeStatus` / `JoinBarrier` - per-run node state

mod arena;
mod runtime;
mod types;

pub use arena::{ClonedSubtree, Node, NodeArena, NodeId, PendingInputs};
pub use runtime::{JoinBarrier, NodeStatus, RuntimeContext};
pub use types::{
    Constraint, ConstraintKind, DataOut, DataPort, Family, FunctionSpec, IfSpec, LoopBound,
    LoopSpec, NodeKind, ParallelForSpec, ParallelSpec, SwitchCase, SwitchSpec,
};
