//! `flowcheck runtime`

use clap::Args;
use std::time::Duration;

use flowcheck_core::{run_runtime, EvaluationResult, RuntimeOptions};

use super::Session;

#[derive(Args, Debug)]
pub struct RuntimeArgs {
    /// Base URL for the runtime under test
    #[arg(long, env = "FLOWCHECK_BASE_URL", default_value = "http://127.0.0.1:3000")]
    pub base_url: String,

    /// Optional shell command that starts the runtime before evaluation
    #[arg(long, env = "FLOWCHECK_START_CMD")]
    pub start_cmd: Option<String>,

    /// Path polled for readiness
    #[arg(long, default_value = "/health")]
    pub wait_path: String,

    /// Readiness wait timeout in seconds
    #[arg(long, default_value = "60")]
    pub wait_timeout_sec: u64,

    /// Per-step request timeout in milliseconds (overrides the config file)
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,
}

pub async fn execute(args: RuntimeArgs, session: &Session) -> anyhow::Result<EvaluationResult> {
    let mut runtime = session.config.runtime.clone();
    if let Some(ms) = args.request_timeout_ms {
        runtime.request_timeout_ms = ms;
    }

    let options = RuntimeOptions {
        base_url: args.base_url,
        start_cmd: args.start_cmd,
        wait_path: args.wait_path,
        wait_timeout: Duration::from_secs(args.wait_timeout_sec),
    };

    Ok(run_runtime(&session.workspace, &session.actions, &runtime, &options).await?)
}
