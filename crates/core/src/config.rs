//! Evaluator configuration
//!
//! Everything has a default, so a repository without `flowcheck.toml`
//! works out of the box. Command line flags override file values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::action::{ActionTable, Endpoint};
use crate::error::{Error, Result};

/// Name of the optional config file looked up in the repository root
pub const CONFIG_FILE_NAME: &str = "flowcheck.toml";

const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowcheckConfig {
    pub layout: LayoutConfig,
    pub runtime: RuntimeConfig,
    /// Extra or replacement actions layered over the canonical table
    pub actions: IndexMap<String, Endpoint>,
}

/// Where the pinned spec lives, relative to the repository root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Single-line file holding the pinned spec version
    pub version_file: PathBuf,
    /// Flow directory; `{version}` is replaced by the pinned version
    pub flows_dir: String,
    /// OpenAPI document the static check compares against
    pub schema_file: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            version_file: PathBuf::from("spec/VERSION"),
            flows_dir: "spec/starter-spec-v{version}/flows".to_string(),
            schema_file: PathBuf::from("api/openapi.yaml"),
        }
    }
}

/// Timeouts used by the runtime check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-step request timeout
    pub request_timeout_ms: u64,
    /// Per-probe timeout while waiting for readiness
    pub probe_timeout_ms: u64,
    /// Delay between readiness probes
    pub poll_interval_ms: u64,
    /// How long a stopped service gets before it is killed
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            probe_timeout_ms: 2_000,
            poll_interval_ms: 1_000,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl RuntimeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl FlowcheckConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: FlowcheckConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load `explicit` if given, else `<root>/flowcheck.toml` if present,
    /// else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.runtime.poll_interval_ms == 0 {
            return Err(Error::Config("runtime.poll_interval_ms must be > 0".into()));
        }
        for (name, endpoint) in &self.actions {
            if !endpoint.path.starts_with('/') {
                return Err(Error::Config(format!(
                    "action '{}' path must start with '/': {}",
                    name, endpoint.path
                )));
            }
        }
        Ok(())
    }

    pub fn action_table(&self) -> ActionTable {
        ActionTable::with_overrides(&self.actions)
    }
}

/// A repository root paired with its layout
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub layout: LayoutConfig,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Read the pinned spec version
    pub fn pinned_version(&self) -> Result<String> {
        let path = self.root.join(&self.layout.version_file);
        let text = std::fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let version = text.trim();
        if version.is_empty() {
            return Err(Error::VersionPin {
                path: path.display().to_string(),
                reason: "file is empty".into(),
            });
        }
        if version.contains(['/', '\\']) || version.contains("..") {
            return Err(Error::VersionPin {
                path: path.display().to_string(),
                reason: format!("'{}' is not a plain version string", version),
            });
        }
        Ok(version.to_string())
    }

    pub fn flows_dir(&self, version: &str) -> PathBuf {
        self.root
            .join(self.layout.flows_dir.replace(VERSION_PLACEHOLDER, version))
    }

    pub fn schema_file(&self) -> PathBuf {
        self.root.join(&self.layout.schema_file)
    }
}
