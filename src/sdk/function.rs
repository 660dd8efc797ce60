use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;

use crate::engine::node::{NodeId, RuntimeContext};

/// Everything a function invoker gets to see about one leaf invocation
#[derive(Debug, Clone)]
pub struct FunctionCall {
    /// Arena handle of the calling node
    pub node: NodeId,
    /// Workflow-level name of the function node
    pub name: String,
    /// Function type used to pick the invoker
    pub function_type: String,
    /// Loop iteration id (0 outside of loops)
    pub id: u32,
    /// Resolved input ports, keyed by port name
    pub input: Map<String, Value>,
    /// Loop and concurrency context propagated from enclosing constructs
    pub context: RuntimeContext,
}

/// Trait for the collaborator that actually runs leaf functions.
///
/// Implementations return a JSON object whose keys must cover the outputs
/// declared on the node; extra keys are ignored.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Returns the invoker name (used in logs)
    fn name(&self) -> &str;

    /// Invoke the function and return its result object
    async fn invoke(&self, call: FunctionCall) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Invoker that returns its input unchanged.
///
/// Handy for dry runs of a workflow file: every output named like an input
/// port is satisfied by that port's value.
#[derive(Debug, Default)]
pub struct EchoFunction;

#[async_trait]
impl FunctionInvoker for EchoFunction {
    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, call: FunctionCall) -> Result<Value, Box<dyn Error + Send + Sync>> {
        log::debug!("echo {} (id {})", call.name, call.id);
        Ok(Value::Object(call.input))
    }
}
