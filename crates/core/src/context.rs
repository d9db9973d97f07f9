//! Per-flow values captured from earlier responses

use serde_json::Value;
use std::collections::HashMap;

use crate::body::ResponseBody;

/// Key under which a response's `id` is captured
pub const ID_KEY: &str = "id";

/// Captured values for one flow execution. Created empty for every flow
/// and dropped when the flow finishes.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    values: HashMap<String, Value>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Capture `id` from an object body, replacing any earlier value.
    /// Returns whether anything was captured.
    pub fn capture(&mut self, body: &ResponseBody) -> bool {
        match body.as_object().and_then(|map| map.get(ID_KEY)) {
            Some(id) => {
                self.values.insert(ID_KEY.to_string(), id.clone());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_overwrites() {
        let mut ctx = FlowContext::new();
        assert!(ctx.capture(&ResponseBody::from(json!({"id": "1"}))));
        assert!(ctx.capture(&ResponseBody::from(json!({"id": 2, "title": "x"}))));
        assert_eq!(ctx.get("id"), Some(&json!(2)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_capture_ignores_non_objects() {
        let mut ctx = FlowContext::new();
        assert!(!ctx.capture(&ResponseBody::from(json!([{"id": "1"}]))));
        assert!(!ctx.capture(&ResponseBody::Text("id".into())));
        assert!(!ctx.capture(&ResponseBody::from(json!({"ok": true}))));
        assert!(ctx.is_empty());
    }
}
