//! Prediction endpoints
//!
//! `POST /predict` classifies one map location; `POST /predict/batch`
//! classifies a grid and produces at most one summary alert. Field names
//! are camelCase to match the map UI.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use florai_common::{GeoPoint, RiskClass, WeatherFeatures};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ApiResult, PipelineError};
use crate::notify::{BatchRequest, NotificationStatus, Prediction, PredictionRequest};
use crate::AppState;

/// POST /predict request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub weather: WeatherFeatures,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub save_prediction: bool,
    #[serde(default)]
    pub create_notification: bool,
}

/// One grid point of a batch request
#[derive(Debug, Deserialize)]
pub struct BatchPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub weather: WeatherFeatures,
}

/// POST /predict/batch request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPredictRequest {
    pub points: Vec<BatchPoint>,
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub save_prediction: bool,
    #[serde(default)]
    pub create_notification: bool,
}

/// Notification fields shared by both responses
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    pub notification_created: bool,
    #[serde(rename = "notificationID", skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    /// Set when the alert write failed after the prediction succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
    /// Why no alert was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_skipped: Option<String>,
}

impl From<&NotificationStatus> for NotificationReport {
    fn from(status: &NotificationStatus) -> Self {
        match status {
            NotificationStatus::Created(id) => Self {
                notification_created: true,
                notification_id: Some(id.clone()),
                ..Default::default()
            },
            NotificationStatus::Skipped(reason) => Self {
                notification_skipped: Some(reason.as_str().to_string()),
                ..Default::default()
            },
            NotificationStatus::Failed { step, message } => Self {
                notification_error: Some(format!("{} step failed: {}", step, message)),
                ..Default::default()
            },
        }
    }
}

/// Classifier output for one location
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointResult {
    pub likelihood: RiskClass,
    pub confidence: f64,
    pub probabilities: BTreeMap<RiskClass, f64>,
    pub location: GeoPoint,
    #[serde(rename = "predictionID", skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<String>,
}

impl PointResult {
    fn new(prediction: Prediction, prediction_id: Option<String>) -> Self {
        Self {
            likelihood: prediction.outcome.predicted_class,
            confidence: prediction.outcome.confidence,
            probabilities: prediction.outcome.probabilities,
            location: prediction.location,
            prediction_id,
        }
    }
}

/// POST /predict response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: PointResult,
    #[serde(flatten)]
    pub notification: NotificationReport,
}

/// POST /predict/batch response
#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub count: usize,
    pub predictions: Vec<PointResult>,
    #[serde(flatten)]
    pub notification: NotificationReport,
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Json(request) = body.map_err(|e| PipelineError::Validation(e.body_text()))?;

    let outcome = state
        .pipeline
        .submit_prediction(PredictionRequest {
            location: GeoPoint::new(request.latitude, request.longitude),
            features: request.weather,
            user_id: request.user_id,
            want_record: request.save_prediction,
            want_notify: request.create_notification,
        })
        .await;
    let outcome = remember_failure(&state, outcome).await?;

    Ok(Json(PredictResponse {
        notification: NotificationReport::from(&outcome.notification),
        result: PointResult::new(outcome.prediction, outcome.record_id),
    }))
}

/// POST /predict/batch
pub async fn predict_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> ApiResult<Json<BatchPredictResponse>> {
    let Json(request) = body.map_err(|e| PipelineError::Validation(e.body_text()))?;

    let points = request
        .points
        .into_iter()
        .map(|p| (GeoPoint::new(p.latitude, p.longitude), p.weather))
        .collect();

    let outcome = state
        .pipeline
        .submit_batch(BatchRequest {
            points,
            center: request.center,
            user_id: request.user_id,
            want_record: request.save_prediction,
            want_notify: request.create_notification,
        })
        .await;
    let outcome = remember_failure(&state, outcome).await?;

    let mut record_ids = outcome.record_ids.into_iter();
    let predictions: Vec<PointResult> = outcome
        .predictions
        .into_iter()
        .map(|p| PointResult::new(p, record_ids.next()))
        .collect();

    Ok(Json(BatchPredictResponse {
        count: predictions.len(),
        predictions,
        notification: NotificationReport::from(&outcome.notification),
    }))
}

/// Keep the last failed request for `/health` before returning it
async fn remember_failure<T>(state: &AppState, result: Result<T, PipelineError>) -> ApiResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if !matches!(e, PipelineError::Validation(_)) {
                *state.last_error.write().await = Some(e.to_string());
            }
            Err(e.into())
        }
    }
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
}
