//! Router-level tests with a stubbed route service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use synroute_config::PageConfig;
use synroute_molecules::{
    Depicter, ImageFormat, RouteError, RouteImage, RoutePredictor, SynthesisPlanner,
};
use synroute_web::{router::build_router, state::AppState};
use tower::ServiceExt;

const ASPIRIN: &str = "CC(=O)Oc1ccccc1C(=O)O";

struct StubPredictor {
    calls: Mutex<Vec<String>>,
    answer: Result<RouteImage, RouteError>,
}

#[async_trait]
impl RoutePredictor for StubPredictor {
    async fn predict(&self, smiles: &str) -> Result<RouteImage, RouteError> {
        self.calls.lock().unwrap().push(smiles.to_string());
        self.answer.clone()
    }
}

/// A route service whose client blows up mid-request.
struct PanickingPredictor;

#[async_trait]
impl RoutePredictor for PanickingPredictor {
    async fn predict(&self, _smiles: &str) -> Result<RouteImage, RouteError> {
        panic!("route service client exploded");
    }
}

fn app(answer: Result<RouteImage, RouteError>) -> (Router, Arc<StubPredictor>) {
    let stub = Arc::new(StubPredictor { calls: Mutex::new(Vec::new()), answer });
    let planner = SynthesisPlanner::new(Depicter::new(160), stub.clone());
    (app_with(planner), stub)
}

fn app_with(planner: SynthesisPlanner) -> Router {
    let state = AppState::new(planner, PageConfig::default()).unwrap();
    build_router(state)
}

fn route_gif() -> RouteImage {
    RouteImage {
        locator: "http://stub/route.gif".into(),
        format: ImageFormat::Gif,
        bytes: b"GIF89a\x01\x00\x01\x00".to_vec(),
    }
}

fn form_post(smiles: &str) -> Request<Body> {
    let body = serde_urlencoded::to_string([("smiles", smiles)]).unwrap();
    Request::post("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_index_prefills_aspirin() {
    let (app, stub) = app(Ok(route_gif()));
    let resp = app.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert!(html.contains(&format!(r#"value="{}""#, ASPIRIN)));
    assert!(html.contains("Build synthesis route"));
    assert!(!html.contains("<img"));
    assert!(stub.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_success_shows_both_images() {
    let (app, stub) = app(Ok(route_gif()));
    let resp = app.oneshot(form_post(ASPIRIN)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert_eq!(html.matches("<img").count(), 2);
    assert!(html.contains("Synthetic route from RXNMapper"));
    assert!(html.contains("C9H8O4"));
    assert!(!html.contains("role=\"alert\""));
    assert_eq!(*stub.calls.lock().unwrap(), vec![ASPIRIN.to_string()]);
}

#[tokio::test]
async fn test_submit_invalid_input_never_calls_service() {
    let (app, stub) = app(Ok(route_gif()));
    let resp = app.oneshot(form_post("C1CC(")).await.unwrap();

    let html = body_text(resp).await;
    assert!(html.contains("Invalid SMILES string"));
    assert!(!html.contains("<img"));
    // The submitted value stays in the field
    assert!(html.contains(r#"value="C1CC(""#));
    assert!(stub.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_remote_error_keeps_structure() {
    let (app, _stub) = app(Err(RouteError::RemoteStatus(500)));
    let html = body_text(app.oneshot(form_post(ASPIRIN)).await.unwrap()).await;

    assert_eq!(html.matches("<img").count(), 1);
    assert!(html.contains(r#"class="notice notice-warning""#));
    assert!(html.contains("Error calling the route prediction service"));
}

#[tokio::test]
async fn test_submit_missing_locator_and_image_fetch() {
    let (router, _) = app(Err(RouteError::MissingImageLocator));
    let html = body_text(router.oneshot(form_post("CCO")).await.unwrap()).await;
    assert!(html.contains("The response does not contain a route image"));

    let (app, _) = app(Err(RouteError::ImageFetch(404)));
    let html = body_text(app.oneshot(form_post("CCO")).await.unwrap()).await;
    assert!(html.contains("Failed to load the result image"));
}

#[tokio::test]
async fn test_submit_transport_error_is_an_error() {
    let (app, _) = app(Err(RouteError::Transport("connection refused".into())));
    let html = body_text(app.oneshot(form_post("CCO")).await.unwrap()).await;
    assert!(html.contains(r#"class="notice notice-error""#));
    assert!(html.contains("Error calling the route prediction service: connection refused"));
}

#[tokio::test]
async fn test_api_plan_success() {
    let (app, _) = app(Ok(route_gif()));
    let req = Request::post("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"smiles":"{}"}}"#, ASPIRIN)))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["formula"], "C9H8O4");
    assert_eq!(json["route_image"]["mime"], "image/gif");
    assert_eq!(json["route_image"]["locator"], "http://stub/route.gif");
    assert!(json["structure_png"].as_str().unwrap().starts_with("iVBORw0KGgo"));
    assert_eq!(json["messages"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_plan_route_failure() {
    let (app, _) = app(Err(RouteError::ImageFetch(404)));
    let req = Request::post("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"smiles":"c1ccccc1"}"#))
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&body_text(app.oneshot(req).await.unwrap()).await).unwrap();

    assert_eq!(json["status"], "route_failed");
    assert_eq!(json["messages"][0]["level"], "warning");
    assert_eq!(json["messages"][0]["message"], "Failed to load the result image");
    assert!(json.get("route_image").is_none());
}

#[tokio::test]
async fn test_api_plan_invalid_input() {
    let (app, stub) = app(Ok(route_gif()));
    let req = Request::post("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"smiles":"   "}"#))
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&body_text(app.oneshot(req).await.unwrap()).await).unwrap();

    assert_eq!(json["status"], "invalid_input");
    assert_eq!(json["messages"][0]["level"], "error");
    assert!(json.get("structure_png").is_none());
    assert!(stub.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_depict() {
    let (app, stub) = app(Ok(route_gif()));
    let resp = app
        .clone()
        .oneshot(Request::get("/api/depict?smiles=CCO").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

    let resp = app
        .oneshot(Request::get("/api/depict?smiles=C%28").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(resp).await.starts_with("Invalid SMILES string"));
    assert!(stub.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_keeps_plus_and_hash_in_smiles() {
    let (app, stub) = app(Ok(route_gif()));
    let resp = app.oneshot(form_post("C[N+](C)(C)C.C#N")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*stub.calls.lock().unwrap(), vec!["C[N+](C)(C)C.C#N".to_string()]);
}

#[tokio::test]
async fn test_panicking_route_client_becomes_processing_error() {
    let planner = SynthesisPlanner::new(Depicter::new(160), Arc::new(PanickingPredictor));
    let app = app_with(planner);

    let resp = app.clone().oneshot(form_post(ASPIRIN)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Processing error"));
    assert!(html.contains(r#"class="notice notice-error""#));

    let req = Request::post("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"smiles":"{}"}}"#, ASPIRIN)))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["messages"][0]["level"], "error");
    assert!(json["messages"][0]["message"].as_str().unwrap().starts_with("Processing error"));
}

#[tokio::test]
async fn test_overlong_smiles_is_invalid_input() {
    let stub = Arc::new(StubPredictor { calls: Mutex::new(Vec::new()), answer: Ok(route_gif()) });
    let planner = SynthesisPlanner::new(Depicter::new(160), stub.clone()).with_max_smiles_len(16);
    let app = app_with(planner);

    let req = Request::post("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"smiles":"{}"}}"#, ASPIRIN)))
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&body_text(app.clone().oneshot(req).await.unwrap()).await).unwrap();
    assert_eq!(json["status"], "invalid_input");

    let resp = app
        .oneshot(Request::get("/api/depict?smiles=CCCCCCCCCCCCCCCCCCCC").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(stub.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_healthz() {
    let (app, _) = app(Ok(route_gif()));
    let resp = app.oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "ok");
}
