//! Integration tests for florai-alerts HTTP endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - POST /predict request/response shape and error mapping
//! - POST /predict/batch summaries

mod helpers;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use florai_alerts::classifier::Classifier;
use florai_alerts::notify::PipelineSettings;
use florai_alerts::{build_router, AppState};
use florai_common::db::{DocumentStore, NOTIFICATIONS_COLLECTION, PREFERENCES_COLLECTION};
use florai_common::ClassOutcome;
use helpers::*;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over the given store and classifier
fn setup_app(
    store: Arc<dyn DocumentStore>,
    classifier: Arc<dyn Classifier>,
    settings: PipelineSettings,
) -> axum::Router {
    let pipeline = pipeline(store, classifier, settings);
    build_router(AppState::new(Arc::new(pipeline)))
}

/// Test helper: JSON POST request
fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn manila_body() -> Value {
    json!({
        "latitude": 14.5547,
        "longitude": 121.0244,
        "temperatureMax": 32.0,
        "temperatureMin": 24.0,
        "precipitation": 15.0,
        "windSpeed": 12.0,
        "sunshineDuration": 36000.0,
        "rainHours": 8.0,
        "userId": "u1",
        "savePrediction": true,
        "createNotification": true
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let store = Arc::new(memory_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(false, true));

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "florai-alerts");
    assert!(body["version"].is_string());
    assert_eq!(body["notifications_enabled"], false);
    assert_eq!(body["model_id"], MODEL_ID);
    assert!(body.get("last_error").is_none());
}

// =============================================================================
// POST /predict
// =============================================================================

#[tokio::test]
async fn test_predict_creates_notification() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store.clone(), Arc::new(StubClassifier::high()), settings(true, true));

    let response = app.oneshot(post_json("/predict", &manila_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["likelihood"], "High");
    assert_eq!(body["confidence"], 0.89);
    assert_eq!(body["probabilities"]["Low"], 0.05);
    assert_eq!(body["location"]["latitude"], 14.5547);
    assert_eq!(body["notificationCreated"], true);
    assert!(body["predictionID"].is_string());
    assert!(body["notificationID"].is_string());
    assert!(body.get("notificationSkipped").is_none());

    let stored = store
        .get(NOTIFICATIONS_COLLECTION, body["notificationID"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["predictionID"], body["predictionID"]);
}

#[tokio::test]
async fn test_predict_anonymous_reports_skip() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let mut body = manila_body();
    body["userId"] = Value::Null;
    let response = app.oneshot(post_json("/predict", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["notificationCreated"], false);
    assert_eq!(body["notificationSkipped"], "anonymous_user");
    assert!(body["predictionID"].is_string());
    assert!(body.get("notificationID").is_none());
}

#[tokio::test]
async fn test_predict_defaults_flags_and_rain_hours() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let body = json!({
        "latitude": 1.3521,
        "longitude": 103.8198,
        "temperatureMax": 31,
        "temperatureMin": 25,
        "precipitation": 8,
        "windSpeed": 10,
        "sunshineDuration": 28000
    });
    let response = app.oneshot(post_json("/predict", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["notificationCreated"], false);
    assert_eq!(body["notificationSkipped"], "not_requested");
    assert!(body.get("predictionID").is_none());
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_input() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let mut body = manila_body();
    body["latitude"] = json!(95.0);
    let response = app.oneshot(post_json("/predict", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_predict_rejects_notify_without_save() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let mut body = manila_body();
    body["savePrediction"] = json!(false);
    let response = app.oneshot(post_json("/predict", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_predict_malformed_json() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"latitude\": \"north\"}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_predict_missing_coordinates_is_validation_error() {
    let store = Arc::new(seeded_store().await);
    let classifier = Arc::new(StubClassifier::high());
    let app = setup_app(store.clone(), classifier.clone(), settings(true, true));

    let mut body = manila_body();
    body.as_object_mut().unwrap().remove("latitude");
    let response = app.oneshot(post_json("/predict", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(classifier.calls(), 0);

    let written = store
        .query(NOTIFICATIONS_COLLECTION, "userID", &json!("u1"))
        .await
        .unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn test_batch_point_missing_longitude_is_validation_error() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let mut point = manila_body();
    point.as_object_mut().unwrap().remove("longitude");
    let body = json!({"userId": "u1", "points": [point]});
    let response = app.oneshot(post_json("/predict/batch", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_predict_classifier_down_is_bad_gateway() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::unavailable()), settings(true, true));

    let response = app
        .clone()
        .oneshot(post_json("/predict", &manila_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CLASSIFIER_UNAVAILABLE");

    // The failure shows up in health diagnostics
    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health = extract_json(health.into_body()).await;
    assert!(health["last_error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_predict_notification_write_failure_is_partial_success() {
    let inner = seeded_store().await;
    let store = Arc::new(FaultyStore::new(inner).fail_writes_to(NOTIFICATIONS_COLLECTION));
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let response = app.oneshot(post_json("/predict", &manila_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["likelihood"], "High");
    assert_eq!(body["notificationCreated"], false);
    assert!(body["predictionID"].is_string());
    assert!(body["notificationError"].as_str().unwrap().contains("notify"));
}

#[tokio::test]
async fn test_predict_preference_store_down_fail_open_is_unavailable() {
    let inner = seeded_store().await;
    let store = Arc::new(FaultyStore::new(inner).fail_reads_from(PREFERENCES_COLLECTION));
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, false));

    let response = app.oneshot(post_json("/predict", &manila_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
}

// =============================================================================
// POST /predict/batch
// =============================================================================

fn grid_body(n: usize) -> Value {
    let points: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "latitude": 14.0 + i as f64 * 0.1,
                "longitude": 121.0,
                "temperatureMax": 32.0,
                "temperatureMin": 24.0,
                "precipitation": 15.0,
                "windSpeed": 12.0,
                "sunshineDuration": 36000.0,
                "rainHours": 8.0
            })
        })
        .collect();
    json!({
        "points": points,
        "userId": "u1",
        "savePrediction": true,
        "createNotification": true
    })
}

#[tokio::test]
async fn test_batch_creates_single_summary() {
    let store = Arc::new(seeded_store().await);
    let outcomes: Vec<ClassOutcome> = [0.89, 0.55, 0.36]
        .into_iter()
        .map(|c| {
            let rest = (1.0 - c) / 2.0;
            ClassOutcome::from_probabilities(rest, rest, c)
        })
        .collect();
    let app = setup_app(
        store.clone(),
        Arc::new(StubClassifier::returning(outcomes)),
        settings(true, true),
    );

    let response = app.oneshot(post_json("/predict/batch", &grid_body(6))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 6);
    assert_eq!(body["predictions"].as_array().unwrap().len(), 6);
    assert!(body["predictions"][0]["predictionID"].is_string());
    assert_eq!(body["notificationCreated"], true);

    let stored = store
        .get(NOTIFICATIONS_COLLECTION, body["notificationID"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["type"], "batch_summary");
    assert_eq!(stored["highRiskCount"], 2);
    assert_eq!(stored["mediumRiskCount"], 2);
    assert_eq!(stored["lowRiskCount"], 2);
    assert_eq!(stored["totalPoints"], 6);
}

#[tokio::test]
async fn test_batch_empty_points() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store, Arc::new(StubClassifier::high()), settings(true, true));

    let response = app.oneshot(post_json("/predict/batch", &grid_body(0))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["notificationCreated"], false);
    assert_eq!(body["notificationSkipped"], "empty_batch");
}

#[tokio::test]
async fn test_batch_explicit_center() {
    let store = Arc::new(seeded_store().await);
    let app = setup_app(store.clone(), Arc::new(StubClassifier::high()), settings(true, true));

    let mut body = grid_body(2);
    body["center"] = json!({"latitude": 10.5, "longitude": 120.5});
    let response = app.oneshot(post_json("/predict/batch", &body)).await.unwrap();

    let body = extract_json(response.into_body()).await;
    let stored = store
        .get(NOTIFICATIONS_COLLECTION, body["notificationID"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["centerLat"], 10.5);
    assert_eq!(stored["centerLon"], 120.5);
}
