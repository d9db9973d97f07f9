//! Error types for flow evaluation
//!
//! Two layers of errors exist. [`Error`] covers conditions that abort a
//! whole run (no flows, a service that never became ready, unreadable
//! configuration). [`StepFailure`] and friends are recorded per step and
//! never stop evaluation.

use std::time::Duration;
use thiserror::Error;

use crate::action::HttpMethod;
use crate::expect::ExpectationFailure;
use crate::http::TransportError;
use crate::path::PathError;

/// Result type alias using the run-level [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level errors. Every variant is fatal to the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no flow files found for pinned version {version} in {dir}")]
    NoFlowFilesFound { version: String, dir: String },

    #[error("runtime did not become ready within {}s: {url}", .timeout.as_secs())]
    ReadinessTimeout { url: String, timeout: Duration },

    #[error("invalid version pin {path}: {reason}")]
    VersionPin { path: String, reason: String },

    #[error("failed to start runtime with `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why a single step failed. Rendered as the detail part of
/// `{flow}:step#{n} {detail}`.
#[derive(Error, Debug)]
pub enum StepFailure {
    #[error("invalid step: {0}")]
    Malformed(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("path build error: {0}")]
    Path(#[from] PathError),

    #[error("transport error for {method} {path}: {source}")]
    Transport {
        method: HttpMethod,
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("expected status {expected}, got {actual} for {method} {path}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        method: HttpMethod,
        path: String,
    },

    #[error("latency {latency_ms:.1}ms exceeds expect_latency_ms={limit_ms}")]
    LatencyExceeded { latency_ms: f64, limit_ms: f64 },

    #[error("expectation failed: {0}")]
    Expectation(#[from] ExpectationFailure),

    #[error("missing operation {method} {path} in {schema}")]
    MissingOperation {
        method: HttpMethod,
        path: String,
        schema: String,
    },

    #[error("expects status {status} but {method} {path} does not declare it")]
    UndeclaredStatus {
        status: u16,
        method: HttpMethod,
        path: String,
    },
}

/// A [`StepFailure`] located within its flow.
#[derive(Error, Debug)]
#[error("{flow}:step#{step} {failure}")]
pub struct StepError {
    pub flow: String,
    /// 1-based position of the step in its flow
    pub step: usize,
    #[source]
    pub failure: StepFailure,
}

impl StepError {
    pub fn new(flow: impl Into<String>, step: usize, failure: StepFailure) -> Self {
        Self {
            flow: flow.into(),
            step,
            failure,
        }
    }
}
