//! Workflow file type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::engine::node::NodeKind;

/// A workflow file: initial state plus a flat list of nodes linked by key
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowDefinition {
    /// Name of the workflow
    pub name: String,
    /// Description of the workflow
    #[serde(default)]
    pub description: String,
    /// Values seeded into the state store before the run
    #[serde(default)]
    pub state: HashMap<String, Value>,
    /// Key of the node the run starts from
    pub root: String,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// One node of a workflow file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeDefinition {
    /// Unique key used to reference this node in `children` and `root`
    pub key: String,
    /// Name used for state paths; defaults to the key
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Keys of the child nodes, in execution order
    #[serde(default)]
    pub children: Vec<String>,
}

impl NodeDefinition {
    pub fn state_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}
