// SPDX-License-Identifier: MIT

//! Runtime state storage for one workflow run

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::path::StatePath;
use super::value::PortType;
use crate::engine::node::DataOut;
use crate::sdk::error::{EnactError, Result};

/// Shared, path-addressed value store.
///
/// One store is created per run and handed to the executor; clones share the
/// same underlying map. Every mutation goes through the single write lock.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    fields: Arc<RwLock<HashMap<String, Value>>>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with initial values (workflow inputs)
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            fields: Arc::new(RwLock::new(values.into_iter().collect())),
        }
    }

    /// Store a value under `key`, replacing any previous value
    pub async fn write(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        log::debug!("state <- {}", key);
        self.fields.write().await.insert(key, value);
    }

    /// Parse a raw textual value per `type_tag` and store it under `name[/id]`
    pub async fn add_param(&self, raw: &str, name: &str, id: u32, type_tag: &str) -> Result<()> {
        let value = PortType::parse_tag(type_tag)?.parse_raw(raw)?;
        self.write(key_for(name, id), value).await;
        Ok(())
    }

    /// Coerce a structured value to `ty` and store it under `name[/id]`
    pub async fn add_value(&self, value: Value, name: &str, id: u32, ty: PortType) -> Result<()> {
        let value = ty.coerce(value)?;
        self.write(key_for(name, id), value).await;
        Ok(())
    }

    /// Store every declared output of a function result under `name/output[/id]`.
    ///
    /// Fails without writing anything when an output is missing.
    pub async fn add_result(
        &self,
        result: &Value,
        name: &str,
        id: u32,
        outputs: &[DataOut],
    ) -> Result<()> {
        let mut staged = Vec::with_capacity(outputs.len());
        for output in outputs {
            let value = result
                .get(&output.name)
                .cloned()
                .ok_or_else(|| EnactError::missing_output(name, &output.name))?;
            let key = key_for(&format!("{}/{}", name, output.name), id);
            staged.push((key, output.port_type.coerce(value)?));
        }

        let mut fields = self.fields.write().await;
        for (key, value) in staged {
            log::debug!("state <- {}", key);
            fields.insert(key, value);
        }
        Ok(())
    }

    /// Get a value by its exact key
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.fields.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.fields.read().await.contains_key(key)
    }

    /// Resolve a path, preferring the iteration-suffixed key when `id != 0`.
    ///
    /// Lookup order: `path/id`, longest prefix `q` with `q/id` present plus
    /// navigation into the remaining segments, then the same two steps
    /// without the suffix.
    pub async fn resolve(&self, path: &StatePath, id: u32) -> Option<Value> {
        let fields = self.fields.read().await;

        let mut ids = vec![];
        if id != 0 {
            ids.push(id);
        }
        ids.push(0);

        for id in ids {
            if let Some(value) = fields.get(&path.key_with_id(id)) {
                return Some(value.clone());
            }
            for (prefix, rest) in path.prefixes() {
                if let Some(base) = fields.get(&key_for(&prefix, id)) {
                    if let Some(found) = navigate(base, rest) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Copy of all entries
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.fields.read().await.clone()
    }

    /// Convert the store to a JSON object (keys sorted)
    pub async fn to_json(&self) -> Value {
        let fields = self.fields.read().await;
        let mut keys: Vec<&String> = fields.keys().collect();
        keys.sort();
        let map: Map<String, Value> = keys
            .into_iter()
            .map(|k| (k.clone(), fields[k].clone()))
            .collect();
        Value::Object(map)
    }

    pub async fn len(&self) -> usize {
        self.fields.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.fields.read().await.is_empty()
    }
}

/// Store key for a name and iteration id (`name` or `name/id`)
pub fn key_for(name: &str, id: u32) -> String {
    if id == 0 {
        name.to_string()
    } else {
        format!("{}/{}", name, id)
    }
}

/// Walk object keys / array indices; string values holding JSON are decoded on the way
fn navigate(base: &Value, rest: &[String]) -> Option<Value> {
    let mut current = base.clone();
    for segment in rest {
        if let Value::String(text) = &current {
            current = serde_json::from_str(text).ok()?;
        }
        current = match &current {
            Value::Object(map) => map.get(segment)?.clone(),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> StatePath {
        StatePath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = StateStore::new();
        assert!(store.get("anything").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_param_with_id() {
        let store = StateStore::new();
        store.add_param("5", "fn/count", 2, "number").await.unwrap();
        store.add_param("x", "fn/name", 0, "string").await.unwrap();

        assert_eq!(store.get("fn/count/2").await, Some(json!(5)));
        assert_eq!(store.get("fn/name").await, Some(json!("x")));
    }

    #[tokio::test]
    async fn test_add_param_unknown_type() {
        let store = StateStore::new();
        let err = store.add_param("5", "fn/x", 0, "decimal").await.unwrap_err();
        assert!(matches!(err, EnactError::InvalidStateValue { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_result_missing_output() {
        let store = StateStore::new();
        let outputs = vec![
            DataOut::new("sum", PortType::Number),
            DataOut::new("label", PortType::String),
        ];

        let err = store
            .add_result(&json!({"sum": 3}), "adder", 0, &outputs)
            .await
            .unwrap_err();
        assert!(matches!(err, EnactError::MissingOutputData { .. }));
        // nothing is written on failure
        assert!(store.get("adder/sum").await.is_none());

        store
            .add_result(&json!({"sum": "3", "label": "ok"}), "adder", 4, &outputs)
            .await
            .unwrap();
        assert_eq!(store.get("adder/sum/4").await, Some(json!(3)));
        assert_eq!(store.get("adder/label/4").await, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_resolve_prefers_suffixed_key() {
        let store = StateStore::with_values(vec![
            ("fn/out".to_string(), json!("bare")),
            ("fn/out/3".to_string(), json!("third")),
        ]);

        assert_eq!(store.resolve(&path("fn/out"), 3).await, Some(json!("third")));
        assert_eq!(store.resolve(&path("fn/out"), 2).await, Some(json!("bare")));
        assert_eq!(store.resolve(&path("fn/out"), 0).await, Some(json!("bare")));
    }

    #[tokio::test]
    async fn test_resolve_sub_object() {
        let store = StateStore::with_values(vec![
            ("fn/out".to_string(), json!({"data": {"value": 42}})),
            ("fn/list/1".to_string(), json!([10, 20])),
            ("fn/text".to_string(), json!(r#"{"k": "v"}"#)),
        ]);

        assert_eq!(
            store.resolve(&path("fn/out/data/value"), 0).await,
            Some(json!(42))
        );
        assert_eq!(store.resolve(&path("fn/list"), 1).await, Some(json!([10, 20])));
        assert_eq!(store.resolve(&path("fn/list/0"), 1).await, Some(json!(10)));
        assert_eq!(store.resolve(&path("fn/text/k"), 0).await, Some(json!("v")));
        assert_eq!(store.resolve(&path("fn/out/missing"), 0).await, None);
    }

    #[tokio::test]
    async fn test_disjoint_concurrent_writes() {
        let store = StateStore::new();
        let mut handles = vec![];
        for i in 1..=2u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.write(key_for("foo", i), json!(i * 10)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("foo/1").await, Some(json!(10)));
        assert_eq!(store.get("foo/2").await, Some(json!(20)));
    }

    #[tokio::test]
    async fn test_to_json() {
        let store = StateStore::new();
        store.write("a", json!(1)).await;
        store.write("b", json!("hello")).await;

        let json = store.to_json().await;
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"], "hello");
    }
}
