//! Static contract check: flows against the declared API schema
//!
//! No requests are sent. Each step's action must resolve, the resolved
//! method and path must be declared in the schema, and a declared
//! `expect_status` must be one of that operation's documented responses.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::action::{ActionTable, HttpMethod};
use crate::config::Workspace;
use crate::error::{Error, Result, StepError, StepFailure};
use crate::flow::{discover_flow_files, file_label, Flow, Step};
use crate::report::{EvaluationResult, Mode};

/// The parts of an OpenAPI document the contract check reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(default)]
    paths: IndexMap<String, YamlValue>,
}

/// A declared operation and the status codes it documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub responses: Vec<String>,
}

impl Operation {
    pub fn declares(&self, status: u16) -> bool {
        let code = status.to_string();
        self.responses.iter().any(|r| *r == code)
    }
}

impl Schema {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Look up `method` under `path`. `None` when either is undeclared.
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<Operation> {
        let op = self.paths.get(path)?.get(method.schema_key())?;
        if op.is_null() {
            return None;
        }

        let responses = op
            .get("responses")
            .and_then(YamlValue::as_mapping)
            .map(|m| m.keys().filter_map(status_key).collect())
            .unwrap_or_default();

        Some(Operation { responses })
    }
}

/// Response keys may be written as `"200"` or `200`
fn status_key(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Checks flow steps against a schema
pub struct ContractEvaluator<'a> {
    actions: &'a ActionTable,
    schema: &'a Schema,
    schema_label: String,
}

impl<'a> ContractEvaluator<'a> {
    pub fn new(actions: &'a ActionTable, schema: &'a Schema, schema_label: impl Into<String>) -> Self {
        Self {
            actions,
            schema,
            schema_label: schema_label.into(),
        }
    }

    pub fn check_step(&self, step: &Step) -> std::result::Result<(), StepFailure> {
        if let Some(reason) = &step.malformed {
            return Err(StepFailure::Malformed(reason.clone()));
        }
        let endpoint = self.actions.resolve(&step.action)?;

        let op = self
            .schema
            .operation(&endpoint.path, endpoint.method)
            .ok_or_else(|| StepFailure::MissingOperation {
                method: endpoint.method,
                path: endpoint.path.clone(),
                schema: self.schema_label.clone(),
            })?;

        if let Some(status) = step.expect_status {
            if !op.declares(status) {
                return Err(StepFailure::UndeclaredStatus {
                    status,
                    method: endpoint.method,
                    path: endpoint.path.clone(),
                });
            }
        }

        Ok(())
    }

    /// Check every step of `flow`, labelling failures with `label`
    pub fn check_flow(&self, label: &str, flow: &Flow, result: &mut EvaluationResult) {
        for (i, step) in flow.steps.iter().enumerate() {
            result.begin_step();
            if let Err(failure) = self.check_step(step) {
                result.record_step_failure(StepError::new(label, i + 1, failure));
            }
        }
    }

    pub fn check_files(&self, files: &[PathBuf], result: &mut EvaluationResult) {
        for path in files {
            let label = file_label(path);
            result.flow_files += 1;
            match Flow::from_file(path) {
                Ok(flow) => {
                    debug!(file = %label, steps = flow.steps.len(), "checking flow contract");
                    self.check_flow(&label, &flow, result);
                }
                Err(e) => result.record_load_failure(&label, e),
            }
        }
    }
}

/// Run the static check for the pinned version in `workspace`
pub fn run_contract(workspace: &Workspace, actions: &ActionTable) -> Result<EvaluationResult> {
    let version = workspace.pinned_version()?;
    let schema_path = workspace.schema_file();
    let schema = Schema::from_file(&schema_path)?;
    let files = discover_flow_files(&workspace.flows_dir(&version), &version)?;

    info!(version = %version, flows = files.len(), "RUN: flow contract eval");

    let schema_label = workspace.layout.schema_file.display().to_string();
    let evaluator = ContractEvaluator::new(actions, &schema, schema_label);
    let mut result = EvaluationResult::new(Mode::Contract, version);
    evaluator.check_files(&files, &mut result);
    Ok(result)
}
