//! Flowcheck core
//!
//! Checks that an HTTP service honours a pinned set of flows: ordered API
//! calls with expected outcomes, defined in YAML next to an OpenAPI
//! document.
//!
//! Two evaluators share the flow model and the action table:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  contract (static)            runtime (live)                 │
//! │    flow ─► action ─► schema     [spawn service ─► readiness] │
//! │    declared status?             flow ─► action ─► path       │
//! │                                  ─► HTTP ─► status/latency   │
//! │                                  ─► expectations ─► context  │
//! │                                 per-flow SLOs                │
//! ├──────────────────────────────────────────────────────────────┤
//! │  EvaluationResult: every failure as `{flow}:step#{n} ...`    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod body;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod expect;
pub mod flow;
pub mod http;
pub mod lifecycle;
pub mod path;
pub mod report;
pub mod runtime;
pub mod slo;

pub use action::{ActionTable, Endpoint, HttpMethod};
pub use config::{FlowcheckConfig, Workspace};
pub use contract::{run_contract, ContractEvaluator, Schema};
pub use error::{Error, Result, StepError, StepFailure};
pub use flow::{Flow, Step};
pub use report::{EvaluationResult, Mode};
pub use runtime::{run_runtime, RuntimeEvaluator, RuntimeOptions};

/// Flowcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
