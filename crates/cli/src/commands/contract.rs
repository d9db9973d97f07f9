//! `flowcheck contract`

use flowcheck_core::{run_contract, EvaluationResult};

use super::Session;

pub fn execute(session: &Session) -> anyhow::Result<EvaluationResult> {
    Ok(run_contract(&session.workspace, &session.actions)?)
}
