// SPDX-License-Identifier: MIT

use crate::sdk::error::{EnactError, Result};
use crate::sdk::function::FunctionInvoker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Function invokers keyed by function type, with an optional fallback
#[derive(Clone)]
pub struct FunctionRegistry {
    invokers: Arc<RwLock<HashMap<String, Arc<dyn FunctionInvoker>>>>,
    default: Arc<RwLock<Option<Arc<dyn FunctionInvoker>>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            invokers: Arc::new(RwLock::new(HashMap::new())),
            default: Arc::new(RwLock::new(None)),
        }
    }

    /// Register under the invoker's own name
    pub async fn register(&self, invoker: Arc<dyn FunctionInvoker>) {
        let name = invoker.name().to_string();
        self.register_as(&name, invoker).await;
    }

    pub async fn register_as(&self, function_type: &str, invoker: Arc<dyn FunctionInvoker>) {
        let mut invokers = self.invokers.write().await;
        invokers.insert(function_type.to_string(), invoker);
    }

    /// Invoker used for function nodes without a registered type
    pub async fn set_default(&self, invoker: Arc<dyn FunctionInvoker>) {
        *self.default.write().await = Some(invoker);
    }

    pub async fn get(&self, function_type: &str) -> Option<Arc<dyn FunctionInvoker>> {
        let invokers = self.invokers.read().await;
        invokers.get(function_type).cloned()
    }

    /// Invoker for `function_type`, else the default
    pub async fn resolve(&self, function_type: &str) -> Result<Arc<dyn FunctionInvoker>> {
        if let Some(invoker) = self.get(function_type).await {
            return Ok(invoker);
        }
        self.default
            .read()
            .await
            .clone()
            .ok_or_else(|| EnactError::FunctionNotFound(function_type.to_string()))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
