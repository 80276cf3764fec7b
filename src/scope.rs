//! Variable Scope - Names Visible to a Template
//!
//! Ordered identifier -> value mapping handed from the caller to the view
//! stage, and from the view stage on to the layout stage.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key carrying the view stage's captured output into the layout.
pub const CONTENT_KEY: &str = "_content_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableScope {
    vars: IndexMap<String, Value>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Merge `overrides` on top of this scope. Same-named entries from
    /// `overrides` win; new names are appended in their order.
    pub fn merged(&self, overrides: &VariableScope) -> VariableScope {
        let mut merged = self.clone();
        for (name, value) in &overrides.vars {
            merged.vars.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Input scope for the layout stage: this scope plus exactly one
    /// `_content_` entry holding the captured view output.
    pub fn with_content(&self, content: impl Into<String>) -> VariableScope {
        let mut overrides = VariableScope::new();
        overrides.insert(CONTENT_KEY, Value::String(content.into()));
        self.merged(&overrides)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableScope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl IntoIterator for VariableScope {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_override_wins_and_keeps_order() {
        let base: VariableScope = [("a", json!(1)), ("b", json!(2))].into_iter().collect();
        let overrides: VariableScope = [("b", json!("x")), ("c", json!(3))].into_iter().collect();

        let merged = base.merged(&overrides);
        let names: Vec<_> = merged.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.get("b"), Some(&json!("x")));
    }

    #[test]
    fn test_with_content_replaces_caller_content() {
        let mut scope = VariableScope::new();
        scope.insert(CONTENT_KEY, "stale");
        scope.insert("title", "Hello");

        let layout_scope = scope.with_content("<p>fresh</p>");
        assert_eq!(layout_scope.get(CONTENT_KEY), Some(&json!("<p>fresh</p>")));
        assert_eq!(layout_scope.names().filter(|n| *n == CONTENT_KEY).count(), 1);
        assert_eq!(layout_scope.len(), 2);
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let scope: VariableScope = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        let names: Vec<_> = scope.names().collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}
