// SPDX-License-Identifier: MIT

//! Typed error handling for enactment-rs
//!
//! Every failure raised while executing a workflow maps onto one variant of
//! [`EnactError`]. All of them are fatal to the branch that raises them; the
//! enclosing join re-raises the error once every sibling has finished.

use thiserror::Error;

use crate::engine::node::NodeId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EnactError>;

/// Top-level error type for enactment-rs
#[derive(Debug, Error)]
pub enum EnactError {
    /// A required source or loop bound cannot be resolved in the state store
    #[error("{node} needs {needs}")]
    MissingInputData { node: String, needs: String },

    /// A declared function output is absent from the invocation result
    #[error("Output {output} of {function} could not be found")]
    MissingOutputData { function: String, output: String },

    /// Unsupported constraint or distribution keyword
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Subtree cloning could not produce a valid copy
    #[error("Clone failure: {0}")]
    CloneFailure(String),

    /// A value could not be stored under the declared type tag
    #[error("Invalid state value for type '{type_tag}': {reason}")]
    InvalidStateValue { type_tag: String, reason: String },

    /// A recognized constraint carries a malformed value
    #[error("Invalid constraint {name}={value}: {reason}")]
    InvalidConstraint {
        name: String,
        value: String,
        reason: String,
    },

    /// Malformed source path expression
    #[error("Invalid source path '{0}'")]
    InvalidPath(String),

    /// Malformed condition expression on an if node
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// A node handle that does not belong to the arena
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// No invoker registered for a function type
    #[error("No function invoker registered for type '{0}'")]
    FunctionNotFound(String),

    /// The external invoker reported a failure
    #[error("Function {node} failed: {message}")]
    Function { node: String, message: String },

    /// A branch task panicked or was aborted
    #[error("Branch task failed to join: {0}")]
    Join(String),

    /// The workflow file describes an inconsistent tree
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// Configuration errors (bad env values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl EnactError {
    /// Create a missing input error
    pub fn missing_input(node: impl Into<String>, needs: impl Into<String>) -> Self {
        Self::MissingInputData {
            node: node.into(),
            needs: needs.into(),
        }
    }

    /// Create a missing output error
    pub fn missing_output(function: impl Into<String>, output: impl Into<String>) -> Self {
        Self::MissingOutputData {
            function: function.into(),
            output: output.into(),
        }
    }

    /// Create an invalid state value error
    pub fn invalid_value(type_tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStateValue {
            type_tag: type_tag.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid constraint error
    pub fn invalid_constraint(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConstraint {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True for the errors raised while resolving inputs, before any work is scheduled
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInputData { .. })
    }
}
