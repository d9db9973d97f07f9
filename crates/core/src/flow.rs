//! Declarative YAML flow documents
//!
//! A flow is an ordered list of API calls with the outcome each one is
//! expected to produce. Flow files are discovered per pinned spec version
//! and always processed in sorted file-name order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::expect::ExpectationSet;
use crate::slo::Slo;

/// A flow parsed from one YAML file
#[derive(Debug, Clone, Serialize)]
pub struct Flow {
    /// Flow name; the file stem when the document does not set one
    pub name: String,

    /// Steps to execute in order
    pub steps: Vec<Step>,

    /// Thresholds checked once all steps have run
    pub slo: Option<Slo>,
}

/// A single API call and its expectations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Step {
    /// Symbolic action resolved through the action table
    #[serde(default)]
    pub action: String,

    /// Path parameters (`id`) or context references (`id_from_previous`)
    #[serde(default)]
    pub params: IndexMap<String, serde_json::Value>,

    /// JSON request body
    #[serde(default)]
    pub request: Option<serde_json::Value>,

    #[serde(default)]
    pub expect_status: Option<u16>,

    /// Runtime only: upper bound on this step's latency
    #[serde(default)]
    pub expect_latency_ms: Option<f64>,

    #[serde(default)]
    pub expect_body: ExpectationSet,

    /// Why this entry could not be read as a step. Such a step still
    /// counts toward the run and fails without being executed.
    #[serde(skip)]
    pub malformed: Option<String>,
}

/// Document shape before steps are read one at a time
#[derive(Deserialize)]
struct RawFlow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    steps: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    slo: Option<Slo>,
}

impl Step {
    /// Read one step entry. A bad value fails only this step.
    fn from_value(value: serde_yaml::Value) -> Self {
        serde_yaml::from_value(value).unwrap_or_else(|e| Step {
            malformed: Some(e.to_string()),
            ..Default::default()
        })
    }
}

impl Flow {
    /// Parse a flow from YAML. `fallback_name` is used when the document
    /// has no `name`.
    pub fn from_yaml(yaml: &str, fallback_name: &str) -> Result<Self> {
        let raw: RawFlow = serde_yaml::from_str(yaml)?;
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());
        Ok(Flow {
            name,
            steps: raw
                .steps
                .unwrap_or_default()
                .into_iter()
                .map(Step::from_value)
                .collect(),
            slo: raw.slo,
        })
    }

    /// Parse a flow from a YAML file, naming it after the file stem by default
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_yaml(&content, &stem)
    }
}

/// Every `*.yaml` file directly inside `dir`, sorted by file name.
///
/// Fails with [`Error::NoFlowFilesFound`] when there are none, including
/// when `dir` does not exist.
pub fn discover_flow_files(dir: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml")
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    if files.is_empty() {
        return Err(Error::NoFlowFilesFound {
            version: version.to_string(),
            dir: dir.display().to_string(),
        });
    }

    debug!(count = files.len(), dir = %dir.display(), "discovered flow files");
    Ok(files)
}

/// File name used to label a flow file in static-mode messages
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
