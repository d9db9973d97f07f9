//! Action resolution: symbolic action names to HTTP method and path template
//!
//! The same table drives both the static contract check and the runtime
//! check, so a flow that passes one refers to the same endpoints in the
//! other.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StepFailure;

/// HTTP methods an action may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Key used for this method in an OpenAPI path item
    pub fn schema_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Where an action lands: method plus a path template with `{param}` holes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Immutable action table. Built once at load time and shared by reference.
#[derive(Debug, Clone)]
pub struct ActionTable {
    actions: IndexMap<String, Endpoint>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ActionTable {
    /// The built-in actions understood by every flow
    pub fn canonical() -> Self {
        let actions = [
            ("health_check", Endpoint::new(HttpMethod::Get, "/health")),
            ("create_todo", Endpoint::new(HttpMethod::Post, "/todos")),
            ("list_todos", Endpoint::new(HttpMethod::Get, "/todos")),
            ("get_todo", Endpoint::new(HttpMethod::Get, "/todos/{id}")),
        ]
        .into_iter()
        .map(|(name, endpoint)| (name.to_string(), endpoint))
        .collect();

        Self { actions }
    }

    /// Canonical table with `extra` layered on top. Entries in `extra`
    /// replace canonical actions of the same name.
    pub fn with_overrides(extra: &IndexMap<String, Endpoint>) -> Self {
        let mut table = Self::canonical();
        for (name, endpoint) in extra {
            table.actions.insert(name.clone(), endpoint.clone());
        }
        table
    }

    pub fn resolve(&self, action: &str) -> Result<&Endpoint, StepFailure> {
        self.actions
            .get(action)
            .ok_or_else(|| StepFailure::UnknownAction(action.to_string()))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}
