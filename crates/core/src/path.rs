//! Path template filling
//!
//! Only the `{id}` placeholder is understood. Its value comes from the
//! flow context when the step names a key with `id_from_previous`, and
//! from the literal `id` parameter otherwise.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::body::render_value;
use crate::context::FlowContext;

const ID_PLACEHOLDER: &str = "{id}";
const PARAM_ID: &str = "id";
const PARAM_ID_FROM_PREVIOUS: &str = "id_from_previous";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path requires id param, but none provided")]
    MissingPathParam,

    #[error("missing '{0}' in flow context for path substitution")]
    MissingContextKey(String),
}

/// Fill `template` from `params` and `context`. Substituted values are
/// percent-encoded so they stay inside one path segment.
pub fn build_path(
    template: &str,
    params: &IndexMap<String, Value>,
    context: &FlowContext,
) -> Result<String, PathError> {
    if !template.contains(ID_PLACEHOLDER) {
        return Ok(template.to_string());
    }

    let raw = if let Some(key) = params.get(PARAM_ID_FROM_PREVIOUS) {
        let key = render_value(key);
        match context.get(&key) {
            Some(value) => render_value(value),
            None => return Err(PathError::MissingContextKey(key)),
        }
    } else if let Some(id) = params.get(PARAM_ID) {
        render_value(id)
    } else {
        return Err(PathError::MissingPathParam);
    };

    Ok(template.replace(ID_PLACEHOLDER, &urlencoding::encode(&raw)))
}
