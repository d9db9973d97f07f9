//! Subcommand implementations

use anyhow::Context;
use std::path::Path;

use flowcheck_core::{ActionTable, FlowcheckConfig, Workspace};

pub mod contract;
pub mod runtime;

/// Configuration and repository layout shared by every subcommand
pub struct Session {
    pub config: FlowcheckConfig,
    pub workspace: Workspace,
    pub actions: ActionTable,
}

impl Session {
    pub fn load(root: &Path, config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = FlowcheckConfig::load(root, config_path)
            .with_context(|| format!("loading configuration for {}", root.display()))?;
        let workspace = Workspace::new(root, config.layout.clone());
        let actions = config.action_table();
        tracing::debug!(root = %root.display(), actions = actions.len(), "session loaded");
        Ok(Self {
            config,
            workspace,
            actions,
        })
    }
}
