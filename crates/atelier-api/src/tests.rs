//! Router tests over an in-memory SQLite store.

use std::sync::Arc;

use atelier_core::{clock::FixedClock, dataset::Dataset, engine::Engine};
use atelier_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let dataset = Dataset::from_json(
    include_str!("../../../data/request.json"),
    include_str!("../../../data/artists.json"),
    include_str!("../../../data/presets.json"),
    include_str!("../../../data/rules.json"),
  )
  .unwrap();
  let store = SqliteStore::open_in_memory().await.unwrap();
  let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap());
  let engine = Engine::new(Arc::new(dataset), store).with_clock(Arc::new(clock));
  api_router(Arc::new(engine))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

// ── Stage operations ────────────────────────────────────────────────────────

#[tokio::test]
async fn validate_preset_reports_missing_channel() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/tools/validate_preset", Some(json!({ "requestId": "req-002" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "ok": false, "errors": ["Missing required texture channel: 'a'"] }));
}

#[tokio::test]
async fn plan_steps_returns_ordered_steps_and_trace() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/tools/plan_steps", Some(json!({ "requestId": "req-001" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["steps"], json!(["style_tweak_review", "export_unreal_glb"]));
  assert_eq!(body["matchedRules"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn assign_artist_names_the_artist() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/tools/assign_artist", Some(json!({ "requestId": "req-001" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["artistId"], "a-3");
  assert_eq!(body["artistName"], "Cleo");
  assert!(body["reason"].as_str().unwrap().contains("capacity (1/3)"));
}

#[tokio::test]
async fn unknown_request_is_404() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/tools/plan_steps", Some(json!({ "requestId": "req-999" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("req-999"));
}

#[tokio::test]
async fn empty_request_id_is_400() {
  let app = app().await;
  let (status, _) =
    send(&app, "POST", "/tools/validate_preset", Some(json!({ "requestId": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_400_with_json_error() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/tools/record_decision", Some(json!({ "requestId": "req-001" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("validation"));
}

#[tokio::test]
async fn record_decision_then_duplicate() {
  let app = app().await;
  let input = json!({
    "requestId": "req-002",
    "validation": { "ok": false, "errors": ["Missing required texture channel: 'a'"] }
  });

  let (status, first) = send(&app, "POST", "/tools/record_decision", Some(input.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["decisionId"], "dec-req-002-20260501120000");
  assert_eq!(first["success"], true);
  assert_eq!(first["duplicate"], false);

  let (status, second) = send(&app, "POST", "/tools/record_decision", Some(input)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["duplicate"], true);
  assert_eq!(second["recordedAt"], first["recordedAt"]);
}

// ── Pipeline and read-back ──────────────────────────────────────────────────

#[tokio::test]
async fn process_records_one_decision() {
  let app = app().await;
  let (status, outcome) = send(&app, "POST", "/requests/req-001/process", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["assignment"]["artistId"], "a-3");

  let id = outcome["receipt"]["decisionId"].as_str().unwrap().to_owned();
  let (status, decision) = send(&app, "GET", &format!("/decisions/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decision["steps"], json!(["style_tweak_review", "export_unreal_glb"]));
  assert_eq!(decision["digest"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn failed_pipeline_records_null_assignment() {
  let app = app().await;
  let (_, outcome) = send(&app, "POST", "/requests/req-004/process", None).await;
  assert_eq!(outcome["validation"]["ok"], false);
  assert_eq!(outcome["plan"], Value::Null);

  let (_, list) = send(&app, "GET", "/decisions?requestId=req-004", None).await;
  let list = list.as_array().unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0]["assignment"], Value::Null);
  assert_eq!(list[0]["steps"], json!([]));
}

#[tokio::test]
async fn missing_decision_is_404() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/decisions/dec-nope", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

// ── Resources ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn resources_expose_the_dataset() {
  let app = app().await;

  let (_, requests) = send(&app, "GET", "/resources/requests", None).await;
  assert_eq!(requests.as_array().unwrap().len(), 5);
  assert_eq!(requests[0]["id"], "req-001");

  let (_, artists) = send(&app, "GET", "/resources/artists", None).await;
  assert_eq!(artists.as_array().unwrap().len(), 5);

  let (_, presets) = send(&app, "GET", "/resources/presets", None).await;
  assert!(presets.get("TitanMfg").is_some());

  let (_, rules) = send(&app, "GET", "/resources/rules", None).await;
  assert_eq!(rules[1]["then"]["queue"], "expedite");
}
