//! The planning page.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::handlers::run_action;
use crate::state::SharedState;
use crate::view::{render_page, PageView};

#[derive(Debug, Deserialize)]
pub struct PlanForm {
    #[serde(default)]
    pub smiles: String,
}

pub async fn index(State(state): State<SharedState>) -> Response {
    respond(&state, &PageView::blank(&state.page))
}

pub async fn submit(State(state): State<SharedState>, Form(form): Form<PlanForm>) -> Response {
    let view = PageView::with_input(&state.page, form.smiles.clone());
    let view = match run_action(&state, form.smiles).await {
        Ok(outcome) => view.show_outcome(&outcome),
        Err(description) => view.show_failure(&description),
    };
    respond(&state, &view)
}

fn respond(state: &SharedState, view: &PageView) -> Response {
    match render_page(&state.templates, view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "page template failed to render");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}
