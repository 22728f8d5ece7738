//! JSON and image endpoints for scripted use.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use synroute_molecules::{ActionError, ActionOutcome};

use crate::handlers::run_action;
use crate::state::SharedState;
use crate::view::{failure_notice, invalid_input_notice, render_failed_notice, route_notice, Notice};

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub smiles: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Success,
    InvalidInput,
    RenderFailed,
    RouteFailed,
    Error,
}

#[derive(Debug, Serialize)]
pub struct RouteImageBody {
    pub locator: String,
    pub mime: &'static str,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub status: PlanStatus,
    pub smiles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub messages: Vec<Notice>,
    /// Base64 PNG of the input structure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_png: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_image: Option<RouteImageBody>,
}

impl PlanResponse {
    fn empty(status: PlanStatus, smiles: String) -> Self {
        Self { status, smiles, formula: None, messages: Vec::new(), structure_png: None, route_image: None }
    }

    fn from_outcome(smiles: String, outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::InvalidInput(e) => {
                let mut resp = Self::empty(PlanStatus::InvalidInput, smiles);
                resp.messages.push(invalid_input_notice(&e));
                resp
            }
            ActionOutcome::RenderFailed(e) => {
                let mut resp = Self::empty(PlanStatus::RenderFailed, smiles);
                resp.messages.push(render_failed_notice(&e));
                resp
            }
            ActionOutcome::Completed { structure, route } => {
                let status = if route.is_ok() { PlanStatus::Success } else { PlanStatus::RouteFailed };
                let mut resp = Self::empty(status, structure.smiles().to_string());
                resp.formula = Some(structure.formula().to_string());
                resp.structure_png = Some(STANDARD.encode(&structure.depiction().png));
                match route {
                    Ok(image) => {
                        resp.route_image = Some(RouteImageBody {
                            mime: image.format.mime(),
                            data: STANDARD.encode(&image.bytes),
                            locator: image.locator,
                        })
                    }
                    Err(e) => resp.messages.push(route_notice(&e)),
                }
                resp
            }
        }
    }
}

pub async fn api_plan(State(state): State<SharedState>, Json(payload): Json<PlanRequest>) -> Json<PlanResponse> {
    let smiles = payload.smiles.clone();
    match run_action(&state, payload.smiles).await {
        Ok(outcome) => Json(PlanResponse::from_outcome(smiles, outcome)),
        Err(description) => {
            let mut resp = PlanResponse::empty(PlanStatus::Error, smiles);
            resp.messages.push(failure_notice(&description));
            Json(resp)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepictParams {
    #[serde(default)]
    pub smiles: String,
}

/// The structure drawing alone. Never contacts the route service.
pub async fn api_depict(State(state): State<SharedState>, Query(params): Query<DepictParams>) -> Response {
    let planner = Arc::clone(&state.planner);
    let prepared = tokio::task::spawn_blocking(move || planner.prepare(&params.smiles)).await;

    match prepared {
        Ok(Ok(structure)) => (
            [(header::CONTENT_TYPE, "image/png")],
            structure.into_png(),
        )
            .into_response(),
        Ok(Err(ActionError::InvalidInput(e))) => {
            (StatusCode::UNPROCESSABLE_ENTITY, invalid_input_notice(&e).message).into_response()
        }
        Ok(Err(ActionError::RenderFailed(e))) => {
            (StatusCode::INTERNAL_SERVER_ERROR, render_failed_notice(&e).message).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, failure_notice(&e.to_string()).message).into_response(),
    }
}
