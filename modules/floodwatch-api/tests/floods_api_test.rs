//! HTTP surface of `POST /api/floods`, driven through the router with mocked
//! pipeline stages.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use floodwatch_api::{router, AppState};
use floodwatch_pipeline::testing::{
    candidate, geocoded, MockExtractor, MockGate, MockNewsSource, MockResolver,
};
use floodwatch_pipeline::{FloodPipeline, LocationExclusions};

const CONTEXT: &str = "Kattisangavi bridge on the Bhima was submerged as the Sonna barrage \
    released water. Residents of Dandoti were moved to relief camps by district officials.";

fn app(gate: MockGate, extractor: MockExtractor) -> Router {
    let resolver = MockResolver::new()
        .on_place(
            "Kattisangavi Bridge",
            geocoded(17.0401, 76.6903, "Kattisangavi, Jevargi, Kalaburagi, Karnataka, India"),
        )
        .on_place(
            "Dandoti",
            geocoded(17.0586, 76.9733, "Dandoti, Chittapur, Kalaburagi, Karnataka, India"),
        );
    let pipeline = FloodPipeline::new(
        Arc::new(gate),
        Arc::new(MockNewsSource::new(CONTEXT)),
        Arc::new(extractor),
        Arc::new(resolver),
    )
    .with_exclusions(LocationExclusions::new(["Raichur", "Yadgir"]));
    router(Arc::new(AppState { pipeline }))
}

async fn post(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/floods")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn kalaburagi() -> String {
    json!({"state": "Karnataka", "district": "Kalaburagi", "date": "August 2019"}).to_string()
}

#[tokio::test]
async fn confirmed_flood_returns_resolved_events() {
    let app = app(
        MockGate::confirming(),
        MockExtractor::returning(vec![
            candidate("Kattisangavi Bridge"),
            candidate("Dandoti"),
            candidate("Atlantis"),
        ]),
    );

    let (status, body) = post(app, &kalaburagi()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["location_name"], "Kattisangavi Bridge");
    assert_eq!(data[0]["coordinates"]["lng"], 76.6903);
    assert_eq!(data[1]["address"], "Dandoti, Chittapur, Kalaburagi, Karnataka, India");
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn rejected_gate_returns_no_flood_envelope() {
    let app = app(MockGate::rejecting(), MockExtractor::returning(vec![candidate("Dandoti")]));

    let (status, body) = post(app, &kalaburagi()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn malformed_extraction_is_bad_gateway() {
    let app = app(MockGate::confirming(), MockExtractor::malformed());

    let (status, body) = post(app, &kalaburagi()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn missing_fields_are_rejected_before_the_pipeline() {
    let gate = MockGate::confirming();
    let app = app(gate, MockExtractor::returning(vec![]));

    let (status, body) = post(app, r#"{"state": "Karnataka", "district": "  "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field(s): district, date");
}

#[tokio::test]
async fn invalid_json_gets_json_error_envelope() {
    let app = app(MockGate::confirming(), MockExtractor::returning(vec![]));

    let (status, body) = post(app, "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn empty_extraction_is_empty_success() {
    let app = app(MockGate::confirming(), MockExtractor::returning(vec![]));

    let (status, body) = post(app, &kalaburagi()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": []}));
}

#[tokio::test]
async fn health_check_is_ok() {
    let app = app(MockGate::confirming(), MockExtractor::returning(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}
