//! Runtime check: execute flows against a live service
//!
//! Flows run one after another and steps within a flow in order; there is
//! never more than one request in flight. A failing step is recorded and
//! evaluation moves on to the next step.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::action::ActionTable;
use crate::config::{RuntimeConfig, Workspace};
use crate::context::FlowContext;
use crate::error::{Result, StepError, StepFailure};
use crate::expect;
use crate::flow::{discover_flow_files, file_label, Flow, Step};
use crate::http::{normalize_base_url, HttpExecutor, HttpResponse};
use crate::lifecycle::{ReadinessProbe, ServiceHandle};
use crate::path::build_path;
use crate::report::{EvaluationResult, Mode};
use crate::slo::{self, FlowObservation};

/// Options for a runtime run, usually straight from the command line
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub base_url: String,
    /// Shell command that starts the service; `None` means it is already up
    pub start_cmd: Option<String>,
    pub wait_path: String,
    pub wait_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            start_cmd: None,
            wait_path: "/health".to_string(),
            wait_timeout: Duration::from_secs(60),
        }
    }
}

/// Executes flows against one base URL
pub struct RuntimeEvaluator<'a> {
    base_url: String,
    actions: &'a ActionTable,
    executor: HttpExecutor,
    request_timeout: Duration,
    startup: Option<Duration>,
}

impl<'a> RuntimeEvaluator<'a> {
    pub fn new(base_url: &str, actions: &'a ActionTable, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url),
            actions,
            executor: HttpExecutor::new()?,
            request_timeout,
            startup: None,
        })
    }

    /// Startup latency measured when the service was spawned by this run
    pub fn with_startup(mut self, startup: Option<Duration>) -> Self {
        self.startup = startup;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run every flow file in order, accumulating into `result`
    pub async fn run_files(&self, files: &[PathBuf], result: &mut EvaluationResult) {
        result.startup_ms = self.startup.map(|d| d.as_secs_f64() * 1000.0);
        for path in files {
            result.flow_files += 1;
            match Flow::from_file(path) {
                Ok(flow) => self.run_flow(&flow, path, result).await,
                Err(e) => {
                    warn!(file = %path.display(), "skipping unreadable flow: {}", e);
                    result.record_load_failure(&file_label(path), e);
                }
            }
        }
    }

    /// Run one flow with a fresh context, then check its SLOs against the
    /// run's counters as they stand afterwards
    pub async fn run_flow(&self, flow: &Flow, source: &Path, result: &mut EvaluationResult) {
        info!("RUN: {} ({})", flow.name, file_label(source));

        let mut context = FlowContext::new();
        let mut worst_latency: Option<Duration> = None;

        for (i, step) in flow.steps.iter().enumerate() {
            let index = i + 1;
            result.begin_step();

            let mut observed = None;
            let outcome = self.run_step(index, step, &mut context, &mut observed).await;
            if let Some(latency) = observed {
                worst_latency = Some(worst_latency.map_or(latency, |w| w.max(latency)));
            }
            if let Err(failure) = outcome {
                result.record_step_failure(StepError::new(&flow.name, index, failure));
            }
        }

        if let Some(slo) = &flow.slo {
            let observation = FlowObservation {
                startup: self.startup,
                worst_step_latency: worst_latency,
                total_steps: result.total_steps,
                failed_steps: result.failed_steps,
            };
            for violation in slo::check(slo, &observation) {
                result.record_violation(&flow.name, &violation);
            }
        }
    }

    /// Resolve, execute and check a single step. `latency` is set whenever
    /// a response came back, even if the step then fails.
    async fn run_step(
        &self,
        index: usize,
        step: &Step,
        context: &mut FlowContext,
        latency: &mut Option<Duration>,
    ) -> std::result::Result<(), StepFailure> {
        if let Some(reason) = &step.malformed {
            return Err(StepFailure::Malformed(reason.clone()));
        }
        let endpoint = self.actions.resolve(&step.action)?;
        let path = build_path(&endpoint.path, &step.params, context)?;
        let url = format!("{}{}", self.base_url, path);

        let response: HttpResponse = self
            .executor
            .execute(endpoint.method, &url, step.request.as_ref(), self.request_timeout)
            .await
            .map_err(|source| StepFailure::Transport {
                method: endpoint.method,
                path: path.clone(),
                source,
            })?;
        *latency = Some(response.latency);

        info!(
            step = index,
            method = %endpoint.method,
            path = %path,
            status = response.status,
            latency_ms = response.latency_ms(),
            "  STEP {}: {} {} -> {} ({:.1} ms)",
            index,
            endpoint.method,
            path,
            response.status,
            response.latency_ms()
        );

        if let Some(expected) = step.expect_status {
            if response.status != expected {
                return Err(StepFailure::UnexpectedStatus {
                    expected,
                    actual: response.status,
                    method: endpoint.method,
                    path,
                });
            }
        }

        if let Some(limit_ms) = step.expect_latency_ms {
            let latency_ms = response.latency_ms();
            if latency_ms > limit_ms {
                return Err(StepFailure::LatencyExceeded { latency_ms, limit_ms });
            }
        }

        expect::evaluate(&step.expect_body, &response.body, context)?;
        Ok(())
    }
}

/// Full runtime run: optionally start the service, evaluate every flow of
/// the pinned version, stop the service.
///
/// The service is stopped on every path out of this function, including
/// fatal errors after it became ready.
pub async fn run_runtime(
    workspace: &Workspace,
    actions: &ActionTable,
    runtime: &RuntimeConfig,
    options: &RuntimeOptions,
) -> Result<EvaluationResult> {
    let version = workspace.pinned_version()?;
    let base_url = normalize_base_url(&options.base_url);

    let mut service: Option<ServiceHandle> = None;
    let mut startup = None;
    if let Some(cmd) = options.start_cmd.as_deref().filter(|c| !c.trim().is_empty()) {
        let probe = ReadinessProbe {
            probe_timeout: runtime.probe_timeout(),
            interval: runtime.poll_interval(),
            ..ReadinessProbe::new(&base_url, &options.wait_path, options.wait_timeout)
        };
        let (handle, ready_in) =
            ServiceHandle::start(cmd, &workspace.root, runtime.shutdown_grace(), &probe).await?;
        service = Some(handle);
        startup = Some(ready_in);
    }

    let outcome = evaluate_pinned(workspace, actions, runtime, &base_url, &version, startup).await;

    if let Some(mut handle) = service.take() {
        if let Err(e) = handle.stop() {
            warn!("Failed to stop runtime `{}`: {}", handle.command(), e);
        }
    }
    outcome
}

async fn evaluate_pinned(
    workspace: &Workspace,
    actions: &ActionTable,
    runtime: &RuntimeConfig,
    base_url: &str,
    version: &str,
    startup: Option<Duration>,
) -> Result<EvaluationResult> {
    let files = discover_flow_files(&workspace.flows_dir(version), version)?;
    let evaluator =
        RuntimeEvaluator::new(base_url, actions, runtime.request_timeout())?.with_startup(startup);

    let mut result = EvaluationResult::new(Mode::Runtime, version);
    evaluator.run_files(&files, &mut result).await;
    Ok(result)
}
