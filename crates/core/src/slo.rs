//! Flow-level service level objectives
//!
//! Evaluated once per flow after its last step. The error rate uses the
//! run's cumulative counters as they stand at that flow's boundary, so
//! later flows see the failures of earlier ones.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Thresholds declared under a flow's `slo` key
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Slo {
    #[serde(default)]
    pub max_startup_ms: Option<f64>,
    #[serde(default)]
    pub max_step_latency_ms: Option<f64>,
    #[serde(default)]
    pub max_error_rate_pct: Option<f64>,
}

/// What was measured by the time a flow finished
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowObservation {
    /// Spawn-to-ready time, only known when the service was started by us
    pub startup: Option<Duration>,
    /// Slowest step that got a response in this flow
    pub worst_step_latency: Option<Duration>,
    /// Steps evaluated so far in the run
    pub total_steps: usize,
    /// Steps failed so far in the run
    pub failed_steps: usize,
}

impl FlowObservation {
    pub fn error_rate_pct(&self) -> Option<f64> {
        if self.total_steps == 0 {
            return None;
        }
        Some(self.failed_steps as f64 / self.total_steps as f64 * 100.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SloViolation {
    #[error("startup {actual_ms:.1}ms exceeds max_startup_ms={limit_ms}")]
    Startup { actual_ms: f64, limit_ms: f64 },

    #[error("worst step latency {actual_ms:.1}ms exceeds max_step_latency_ms={limit_ms}")]
    StepLatency { actual_ms: f64, limit_ms: f64 },

    #[error("error rate {actual_pct:.2}% exceeds max_error_rate_pct={limit_pct}")]
    ErrorRate { actual_pct: f64, limit_pct: f64 },
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Every threshold in `slo` that `observed` breaches, in declaration order
pub fn check(slo: &Slo, observed: &FlowObservation) -> Vec<SloViolation> {
    let mut violations = Vec::new();

    if let (Some(limit_ms), Some(startup)) = (slo.max_startup_ms, observed.startup) {
        let actual_ms = millis(startup);
        if actual_ms > limit_ms {
            violations.push(SloViolation::Startup { actual_ms, limit_ms });
        }
    }

    if let (Some(limit_ms), Some(worst)) = (slo.max_step_latency_ms, observed.worst_step_latency) {
        let actual_ms = millis(worst);
        if actual_ms > limit_ms {
            violations.push(SloViolation::StepLatency { actual_ms, limit_ms });
        }
    }

    if let (Some(limit_pct), Some(actual_pct)) = (slo.max_error_rate_pct, observed.error_rate_pct()) {
        if actual_pct > limit_pct {
            violations.push(SloViolation::ErrorRate {
                actual_pct,
                limit_pct,
            });
        }
    }

    violations
}
