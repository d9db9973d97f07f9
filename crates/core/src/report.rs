//! Run-wide accumulation of failures and the final verdict
//!
//! Nothing recorded here is ever removed: one failure anywhere in the run
//! makes the exit status 1, regardless of what passes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

use crate::error::{Result, StepError};
use crate::slo::SloViolation;

/// Which evaluator produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Contract,
    Runtime,
}

/// Accumulated outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub mode: Mode,
    pub version: String,
    pub flow_files: usize,
    pub total_steps: usize,
    pub failed_steps: usize,
    /// Formatted failures in the order they happened
    pub errors: Vec<String>,
    pub startup_ms: Option<f64>,
}

impl EvaluationResult {
    pub fn new(mode: Mode, version: impl Into<String>) -> Self {
        Self {
            mode,
            version: version.into(),
            flow_files: 0,
            total_steps: 0,
            failed_steps: 0,
            errors: Vec::new(),
            startup_ms: None,
        }
    }

    /// Count a step that is about to be evaluated
    pub fn begin_step(&mut self) {
        self.total_steps += 1;
    }

    /// Record a failed step
    pub fn record_step_failure(&mut self, err: StepError) {
        self.failed_steps += 1;
        self.errors.push(err.to_string());
    }

    /// Record a flow-level SLO breach. Does not touch step counters.
    pub fn record_violation(&mut self, flow: &str, violation: &SloViolation) {
        self.errors.push(format!("{}: {}", flow, violation));
    }

    /// Record a flow file that could not be loaded
    pub fn record_load_failure(&mut self, file: &str, reason: impl std::fmt::Display) {
        self.errors.push(format!("{}: failed to load flow: {}", file, reason));
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_rate_pct(&self) -> f64 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.failed_steps as f64 / self.total_steps as f64 * 100.0
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Log every failure, or the success summary
    pub fn log_summary(&self) {
        if !self.passed() {
            for e in &self.errors {
                error!("FAIL: {}", e);
            }
            info!(
                total_steps = self.total_steps,
                failed_steps = self.failed_steps,
                errors = self.errors.len(),
                "evaluation failed"
            );
            return;
        }

        match self.mode {
            Mode::Contract => info!(
                "OK: flow contract eval passed for spec v{} ({} flow files)",
                self.version, self.flow_files
            ),
            Mode::Runtime => info!(
                "OK: runtime flow evaluation passed ({} flow files, {} steps, error_rate={:.2}%)",
                self.flow_files,
                self.total_steps,
                self.error_rate_pct()
            ),
        }
    }

    /// Write the result as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let report = Report {
            generated_at: Utc::now(),
            passed: self.passed(),
            error_rate_pct: self.error_rate_pct(),
            result: self,
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("Results written to: {}", path.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    passed: bool,
    error_rate_pct: f64,
    #[serde(flatten)]
    result: &'a EvaluationResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepFailure;

    #[test]
    fn test_failures_force_exit_code() {
        let mut result = EvaluationResult::new(Mode::Runtime, "1.0.0");
        for _ in 0..4 {
            result.begin_step();
        }
        assert!(result.passed());
        assert_eq!(result.exit_code(), 0);

        result.record_step_failure(StepError::new(
            "smoke",
            3,
            StepFailure::UnknownAction("delete_todo".into()),
        ));
        assert_eq!(result.failed_steps, 1);
        assert_eq!(result.error_rate_pct(), 25.0);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.errors, vec!["smoke:step#3 unknown action 'delete_todo'"]);
    }

    #[test]
    fn test_violation_does_not_count_steps() {
        let mut result = EvaluationResult::new(Mode::Runtime, "1.0.0");
        result.record_violation(
            "smoke",
            &SloViolation::StepLatency {
                actual_ms: 120.0,
                limit_ms: 100.0,
            },
        );
        assert_eq!(result.failed_steps, 0);
        assert_eq!(
            result.errors[0],
            "smoke: worst step latency 120.0ms exceeds max_step_latency_ms=100"
        );
        assert!(!result.passed());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        let mut result = EvaluationResult::new(Mode::Contract, "1.0.0");
        result.flow_files = 2;
        result.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "contract");
        assert_eq!(value["passed"], true);
        assert_eq!(value["flow_files"], 2);
        assert!(value["generated_at"].is_string());
    }
}
