// SPDX-License-Identifier: MIT

//! Workflow enactment engine
//!
//! This module provides:
//! - `state` - the per-run, path-addressed state store
//! - `node` - control node variants and the node arena
//! - `distribute` - splitting input collections across loop iterations
//! - `exec` - the executor that walks the node tree
//! - `loader` / `builder` - workflow files to runnable executors

pub mod builder;
pub mod condition;
pub mod config;
pub mod distribute;
pub mod exec;
pub mod loader;
pub mod node;
pub mod registry;
pub mod state;
pub mod types;

pub use builder::Builder;
pub use config::EngineConfig;
pub use exec::Executor;
pub use loader::WorkflowLoader;
pub use registry::FunctionRegistry;
pub use state::StateStore;
pub use types::{NodeDefinition, WorkflowDefinition};
