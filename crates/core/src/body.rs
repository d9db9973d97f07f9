//! Response bodies as a tagged value
//!
//! A service may answer with a JSON object, a JSON array, a bare JSON
//! scalar, something that is not JSON at all, or nothing. Expectation
//! checks match on the shape instead of guessing at runtime.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseBody {
    /// No body bytes at all
    Empty,
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// `true`, `42`, `"text"` or `null` sent as JSON
    Scalar(Value),
    /// Body that did not parse as JSON, kept verbatim
    Text(String),
}

impl ResponseBody {
    /// Parse raw response text. Unparseable text is kept as [`ResponseBody::Text`].
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from(value),
            Err(_) => ResponseBody::Text(raw.to_string()),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ResponseBody::Empty => "empty",
            ResponseBody::Object(_) => "object",
            ResponseBody::Array(_) => "array",
            ResponseBody::Scalar(_) => "scalar",
            ResponseBody::Text(_) => "text",
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            ResponseBody::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            ResponseBody::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The whole body as one string, for substring matching
    pub fn render(&self) -> String {
        match self {
            ResponseBody::Empty => String::new(),
            ResponseBody::Text(raw) => raw.clone(),
            ResponseBody::Scalar(value) => render_value(value),
            ResponseBody::Object(map) => Value::Object(map.clone()).to_string(),
            ResponseBody::Array(items) => Value::Array(items.clone()).to_string(),
        }
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ResponseBody::Object(map),
            Value::Array(items) => ResponseBody::Array(items),
            other => ResponseBody::Scalar(other),
        }
    }
}

/// Strings render without quotes; everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON equality that treats `1` and `1.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}
