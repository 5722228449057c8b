// ── Aggregate document ──
//
// Every response of one fetch cycle merged into a single JSON object.
// Plant-level responses spread their top-level keys into the root (a later
// response overwrites an earlier one on collision); meter responses are
// stored whole under the portal call's name.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use esolar_api::Endpoint;

use crate::field::FieldPath;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregateDocument {
    root: Map<String, Value>,
}

impl AggregateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge a response body's top-level keys into the root.
    ///
    /// Non-object bodies carry no addressable keys and are dropped.
    pub fn merge(&mut self, endpoint: Endpoint, body: Value) {
        match body {
            Value::Object(map) => {
                debug!(endpoint = endpoint.name(), keys = map.len(), "merging response");
                self.root.extend(map);
            }
            other => {
                debug!(
                    endpoint = endpoint.name(),
                    kind = json_kind(&other),
                    "response is not an object, nothing merged"
                );
            }
        }
    }

    /// Store a response body under the endpoint's name.
    pub fn merge_named(&mut self, endpoint: Endpoint, body: Value) {
        debug!(endpoint = endpoint.name(), "storing nested response");
        self.root.insert(endpoint.name().to_owned(), body);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Resolve a field path against the document.
    pub fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        path.resolve_in(&self.root)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

impl From<Map<String, Value>> for AggregateDocument {
    fn from(root: Map<String, Value>) -> Self {
        Self { root }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
