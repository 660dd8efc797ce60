use serde_json::Map;

use super::executor::{Executor, NodeView};
use crate::engine::node::{FunctionSpec, NodeId};
use crate::sdk::error::{EnactError, Result};
use crate::sdk::function::FunctionCall;

impl Executor {
    /// Invoke a leaf function and store its declared outputs
    pub(super) async fn execute_function(
        &self,
        view: &NodeView,
        spec: &FunctionSpec,
    ) -> Result<Vec<NodeId>> {
        let values = self.resolve_ports(view, &spec.inputs).await?;
        let input: Map<_, _> = spec
            .inputs
            .iter()
            .map(|port| port.name.clone())
            .zip(values)
            .collect();

        let invoker = self.registry.resolve(&spec.function_type).await?;
        log::info!(
            "Invoking {} (id {}) via {}",
            view.name,
            view.own_id,
            invoker.name()
        );

        let call = FunctionCall {
            node: view.id,
            name: view.name.clone(),
            function_type: spec.function_type.clone(),
            id: view.own_id,
            input,
            context: view.runtime.clone(),
        };
        let result = invoker.invoke(call).await.map_err(|e| EnactError::Function {
            node: view.name.clone(),
            message: e.to_string(),
        })?;

        self.store
            .add_result(&result, &view.name, view.own_id, &spec.outputs)
            .await?;
        Ok(view.children.clone())
    }
}
