//! Prediction history writes

use std::sync::Arc;

use florai_common::db::{DocumentStore, PredictionRecord, PREDICTIONS_COLLECTION};
use florai_common::{time, uuid_utils, ClassOutcome, GeoPoint, WeatherFeatures};
use tracing::debug;

use crate::error::{PipelineError, PipelineStep};

/// Request path that produced a prediction record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    /// Single map click
    Click,
    /// One point of a grid analysis
    Grid,
}

impl PredictionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionSource::Click => "ai_model_click",
            PredictionSource::Grid => "ai_grid_prediction",
        }
    }
}

/// Appends immutable [`PredictionRecord`]s to the `ai_predictions` collection
#[derive(Clone)]
pub struct PredictionRecorder {
    store: Arc<dyn DocumentStore>,
}

impl PredictionRecorder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist one prediction and return its id.
    ///
    /// Anonymous predictions (`user_id = None`) are recorded too.
    pub async fn record(
        &self,
        user_id: Option<&str>,
        location: GeoPoint,
        outcome: &ClassOutcome,
        features: &WeatherFeatures,
        model_id: &str,
        source: PredictionSource,
    ) -> Result<String, PipelineError> {
        let record = PredictionRecord {
            prediction_id: uuid_utils::generate_document_id(),
            user_id: user_id.map(str::to_string),
            latitude: location.latitude,
            longitude: location.longitude,
            predicted_class: outcome.predicted_class,
            confidence: outcome.confidence,
            probabilities: outcome.probabilities.clone(),
            features: features.snapshot(),
            model_id: model_id.to_string(),
            source: source.as_str().to_string(),
            created_at: time::now(),
        };

        let body = serde_json::to_value(&record)
            .map_err(|e| PipelineError::persistence(PipelineStep::Record, e.into()))?;

        self.store
            .insert(PREDICTIONS_COLLECTION, &record.prediction_id, body)
            .await
            .map_err(|e| PipelineError::persistence(PipelineStep::Record, e))?;

        debug!(
            prediction_id = %record.prediction_id,
            class = %record.predicted_class,
            source = %record.source,
            "Recorded prediction"
        );
        Ok(record.prediction_id)
    }
}
