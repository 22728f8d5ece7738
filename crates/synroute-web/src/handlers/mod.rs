//! HTTP handlers for all web routes.

pub mod api;
pub mod page;
pub mod system;

use std::sync::Arc;

use synroute_molecules::{action_span, ActionOutcome};
use tokio::task::JoinError;
use tracing::{error, Instrument, Span};

use crate::state::SharedState;

/// Run one action on its own task. Parsing and drawing go to the blocking
/// pool; the route request stays on the async workers. An `Err` carries the
/// description of a failure outside the action's own outcome (a panic in
/// either task).
pub(crate) async fn run_action(state: &SharedState, smiles: String) -> Result<ActionOutcome, String> {
    let planner = Arc::clone(&state.planner);
    let action = async move {
        let span = Span::current();
        let drawer = Arc::clone(&planner);
        let prepared = tokio::task::spawn_blocking(move || span.in_scope(|| drawer.prepare(&smiles)))
            .await
            .map_err(task_failed)?;
        Ok::<_, String>(planner.complete(prepared).await)
    };
    tokio::spawn(action.instrument(action_span()))
        .await
        .map_err(task_failed)?
}

fn task_failed(e: JoinError) -> String {
    error!(error = %e, "action task failed");
    e.to_string()
}
