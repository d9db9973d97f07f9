//! Structural expectations on a step's response body
//!
//! Checks run in a fixed order: `has_fields`, `equals`, `contains`,
//! `length_equals`, `length_gte`, `all_have_fields`. The first failing
//! check ends evaluation of the step and later checks are not run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::body::{render_value, values_equal, ResponseBody};
use crate::context::FlowContext;

/// Expectations declared under a step's `expect_body`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSet {
    /// Object body must contain each field
    #[serde(default)]
    pub has_fields: Option<Vec<String>>,

    /// Object body fields must equal these values
    #[serde(default)]
    pub equals: Option<IndexMap<String, Value>>,

    /// Object body: field must contain the substring. Any other body: the
    /// whole rendered body must contain every value.
    #[serde(default)]
    pub contains: Option<IndexMap<String, Value>>,

    #[serde(default)]
    pub length_equals: Option<usize>,

    #[serde(default)]
    pub length_gte: Option<usize>,

    /// Every element of an array body must be an object with these fields
    #[serde(default)]
    pub all_have_fields: Option<Vec<String>>,
}

impl ExpectationSet {
    pub fn is_empty(&self) -> bool {
        self.has_fields.is_none()
            && self.equals.is_none()
            && self.contains.is_none()
            && self.length_equals.is_none()
            && self.length_gte.is_none()
            && self.all_have_fields.is_none()
    }
}

/// First unmet expectation of a step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpectationFailure {
    #[error("expected JSON {expected} body for {check}, got {actual}")]
    TypeMismatch {
        check: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("missing expected field '{0}'")]
    MissingField(String),

    #[error("expected body['{field}'] == {expected}, got {actual}")]
    NotEqual {
        field: String,
        expected: Value,
        actual: Value,
    },

    #[error("expected body['{field}'] to contain '{needle}', got {actual}")]
    FieldNotContaining {
        field: String,
        needle: String,
        actual: Value,
    },

    #[error("expected response body to contain '{needle}'")]
    BodyNotContaining { needle: String },

    #[error("expected array length {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("expected array length >= {min}, got {actual}")]
    LengthBelow { min: usize, actual: usize },

    #[error("expected object at index {index} in array")]
    ItemNotObject { index: usize },

    #[error("item {index} missing field '{field}'")]
    ItemMissingField { index: usize, field: String },
}

type Check = std::result::Result<(), ExpectationFailure>;

/// Check `body` against `expect`. When every declared check passes, an
/// `id` in an object body is captured into `context`.
pub fn evaluate(
    expect: &ExpectationSet,
    body: &ResponseBody,
    context: &mut FlowContext,
) -> Check {
    if let Some(fields) = &expect.has_fields {
        check_has_fields(fields, body)?;
    }
    if let Some(expected) = &expect.equals {
        check_equals(expected, body)?;
    }
    if let Some(needles) = &expect.contains {
        check_contains(needles, body)?;
    }
    if let Some(len) = expect.length_equals {
        check_length_equals(len, body)?;
    }
    if let Some(min) = expect.length_gte {
        check_length_gte(min, body)?;
    }
    if let Some(fields) = &expect.all_have_fields {
        check_all_have_fields(fields, body)?;
    }

    context.capture(body);
    Ok(())
}

fn mismatch(check: &'static str, expected: &'static str, body: &ResponseBody) -> ExpectationFailure {
    ExpectationFailure::TypeMismatch {
        check,
        expected,
        actual: body.shape(),
    }
}

fn check_has_fields(fields: &[String], body: &ResponseBody) -> Check {
    let map = body
        .as_object()
        .ok_or_else(|| mismatch("has_fields", "object", body))?;
    match fields.iter().find(|f| !map.contains_key(f.as_str())) {
        Some(missing) => Err(ExpectationFailure::MissingField(missing.clone())),
        None => Ok(()),
    }
}

fn check_equals(expected: &IndexMap<String, Value>, body: &ResponseBody) -> Check {
    let map = body
        .as_object()
        .ok_or_else(|| mismatch("equals", "object", body))?;
    for (field, want) in expected {
        let got = map.get(field).unwrap_or(&Value::Null);
        if !values_equal(got, want) {
            return Err(ExpectationFailure::NotEqual {
                field: field.clone(),
                expected: want.clone(),
                actual: got.clone(),
            });
        }
    }
    Ok(())
}

fn check_contains(needles: &IndexMap<String, Value>, body: &ResponseBody) -> Check {
    if let Some(map) = body.as_object() {
        for (field, needle) in needles {
            let needle = render_value(needle);
            let actual = map.get(field).cloned().unwrap_or(Value::Null);
            if !render_value(&actual).contains(&needle) {
                return Err(ExpectationFailure::FieldNotContaining {
                    field: field.clone(),
                    needle,
                    actual,
                });
            }
        }
        return Ok(());
    }

    let raw = body.render();
    for needle in needles.values() {
        let needle = render_value(needle);
        if !raw.contains(&needle) {
            return Err(ExpectationFailure::BodyNotContaining { needle });
        }
    }
    Ok(())
}

fn check_length_equals(expected: usize, body: &ResponseBody) -> Check {
    let items = body
        .as_array()
        .ok_or_else(|| mismatch("length_equals", "array", body))?;
    if items.len() != expected {
        return Err(ExpectationFailure::LengthMismatch {
            expected,
            actual: items.len(),
        });
    }
    Ok(())
}

fn check_length_gte(min: usize, body: &ResponseBody) -> Check {
    let items = body
        .as_array()
        .ok_or_else(|| mismatch("length_gte", "array", body))?;
    if items.len() < min {
        return Err(ExpectationFailure::LengthBelow {
            min,
            actual: items.len(),
        });
    }
    Ok(())
}

fn check_all_have_fields(fields: &[String], body: &ResponseBody) -> Check {
    let items = body
        .as_array()
        .ok_or_else(|| mismatch("all_have_fields", "array", body))?;
    for (index, item) in items.iter().enumerate() {
        let map = item
            .as_object()
            .ok_or(ExpectationFailure::ItemNotObject { index })?;
        if let Some(field) = fields.iter().find(|f| !map.contains_key(f.as_str())) {
            return Err(ExpectationFailure::ItemMissingField {
                index,
                field: field.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect(yaml: &str) -> ExpectationSet {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn body(value: Value) -> ResponseBody {
        ResponseBody::from(value)
    }

    #[test]
    fn test_has_fields_captures_id() {
        let mut ctx = FlowContext::new();
        let result = evaluate(
            &expect("has_fields: [id, title]"),
            &body(json!({"id": "42", "title": "x"})),
            &mut ctx,
        );
        assert!(result.is_ok());
        assert_eq!(ctx.get("id"), Some(&json!("42")));
    }

    #[test]
    fn test_empty_set_still_captures() {
        let mut ctx = FlowContext::new();
        evaluate(&ExpectationSet::default(), &body(json!({"id": 5})), &mut ctx).unwrap();
        assert_eq!(ctx.get("id"), Some(&json!(5)));
    }

    #[test]
    fn test_failure_skips_capture() {
        let mut ctx = FlowContext::new();
        let err = evaluate(
            &expect("has_fields: [done]"),
            &body(json!({"id": "1"})),
            &mut ctx,
        )
        .unwrap_err();
        assert_eq!(err, ExpectationFailure::MissingField("done".into()));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_length_equals() {
        let mut ctx = FlowContext::new();
        let list = body(json!(["a", "b"]));
        assert!(evaluate(&expect("length_equals: 2"), &list, &mut ctx).is_ok());
        assert_eq!(
            evaluate(&expect("length_equals: 3"), &list, &mut ctx).unwrap_err(),
            ExpectationFailure::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_length_gte() {
        let mut ctx = FlowContext::new();
        let list = body(json!([1, 2, 3]));
        assert!(evaluate(&expect("length_gte: 3"), &list, &mut ctx).is_ok());
        assert!(matches!(
            evaluate(&expect("length_gte: 4"), &list, &mut ctx),
            Err(ExpectationFailure::LengthBelow { min: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_shape_mismatch_is_failure() {
        let mut ctx = FlowContext::new();
        let err = evaluate(
            &expect("length_equals: 1"),
            &body(json!({"id": "1"})),
            &mut ctx,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExpectationFailure::TypeMismatch {
                check: "length_equals",
                expected: "array",
                actual: "object"
            }
        );
        assert_eq!(
            err.to_string(),
            "expected JSON array body for length_equals, got object"
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let mut ctx = FlowContext::new();
        let set = expect(
            r#"
has_fields: [title]
equals:
  title: other
length_equals: 9
"#,
        );
        let err = evaluate(&set, &body(json!({"title": "Buy milk"})), &mut ctx).unwrap_err();
        assert!(matches!(err, ExpectationFailure::NotEqual { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_equals_missing_field_is_null() {
        let mut ctx = FlowContext::new();
        assert!(evaluate(
            &expect("equals: {dueDate: null}"),
            &body(json!({"title": "x"})),
            &mut ctx
        )
        .is_ok());
        assert!(evaluate(
            &expect("equals: {completed: false}"),
            &body(json!({"completed": true})),
            &mut ctx
        )
        .is_err());
    }

    #[test]
    fn test_contains_on_object_fields() {
        let mut ctx = FlowContext::new();
        let todo = body(json!({"error": "validation: title", "code": 422}));
        assert!(evaluate(&expect("contains: {error: validation}"), &todo, &mut ctx).is_ok());
        assert!(evaluate(&expect("contains: {code: 42}"), &todo, &mut ctx).is_ok());
        assert!(matches!(
            evaluate(&expect("contains: {error: missing}"), &todo, &mut ctx),
            Err(ExpectationFailure::FieldNotContaining { .. })
        ));
    }

    #[test]
    fn test_contains_whole_body_fallback() {
        let mut ctx = FlowContext::new();
        let text = ResponseBody::Text("Service Unavailable: warming up".into());
        assert!(evaluate(
            &expect("contains: {a: Service, b: warming}"),
            &text,
            &mut ctx
        )
        .is_ok());
        assert_eq!(
            evaluate(&expect("contains: {a: Service, b: ready}"), &text, &mut ctx).unwrap_err(),
            ExpectationFailure::BodyNotContaining {
                needle: "ready".into()
            }
        );

        let list = body(json!(["alpha", "beta"]));
        assert!(evaluate(&expect("contains: {x: beta}"), &list, &mut ctx).is_ok());
    }

    #[test]
    fn test_all_have_fields() {
        let mut ctx = FlowContext::new();
        let set = expect("all_have_fields: [id, title]");
        assert!(evaluate(
            &set,
            &body(json!([{"id": "1", "title": "a"}, {"id": "2", "title": "b"}])),
            &mut ctx
        )
        .is_ok());
        assert!(evaluate(&set, &body(json!([])), &mut ctx).is_ok());
        assert_eq!(
            evaluate(&set, &body(json!([{"id": "1", "title": "a"}, {"id": "2"}])), &mut ctx)
                .unwrap_err(),
            ExpectationFailure::ItemMissingField {
                index: 1,
                field: "title".into()
            }
        );
        assert_eq!(
            evaluate(&set, &body(json!([{"id": "1", "title": "a"}, "x"])), &mut ctx).unwrap_err(),
            ExpectationFailure::ItemNotObject { index: 1 }
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(ExpectationSet::default().is_empty());
        assert!(!expect("length_gte: 0").is_empty());
    }
}
