//! Occurrence classifier client
//!
//! The model itself runs in a separate model server. This module defines
//! the seam the pipeline calls through ([`Classifier`]) and the HTTP client
//! that talks to the server in production ([`HttpClassifier`]).

use async_trait::async_trait;
use florai_common::config::ClassifierConfig;
use florai_common::{time, ClassOutcome, GeoPoint, RiskClass, WeatherFeatures};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ClassifierError;

const USER_AGENT: &str = concat!("florai-alerts/", env!("CARGO_PKG_VERSION"));

/// Source of per-location risk predictions
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Identifier stored with every record and alert derived from this model
    fn model_id(&self) -> &str;

    /// Classify one location
    async fn predict(
        &self,
        location: GeoPoint,
        features: &WeatherFeatures,
    ) -> Result<ClassOutcome, ClassifierError>;
}

/// Request body sent to the model server
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelRequest<'a> {
    latitude: f64,
    longitude: f64,
    #[serde(flatten)]
    features: &'a WeatherFeatures,
    temperature_mean: f64,
}

/// Model server response
///
/// Older servers name the class field `likelihood`, newer ones
/// `predictedClass`; both are accepted.
#[derive(Debug, Deserialize)]
struct ModelResponse {
    #[serde(alias = "predictedClass")]
    likelihood: RiskClass,
    confidence: f64,
    probabilities: BTreeMap<RiskClass, f64>,
}

impl From<ModelResponse> for ClassOutcome {
    fn from(r: ModelResponse) -> Self {
        ClassOutcome {
            predicted_class: r.likelihood,
            confidence: r.confidence,
            probabilities: r.probabilities,
        }
    }
}

/// Classifier backed by the model server's HTTP prediction endpoint
pub struct HttpClassifier {
    http_client: reqwest::Client,
    url: String,
    model_id: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(time::millis_to_duration(config.timeout_ms))
            .build()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            model_id: config.model_id.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn predict(
        &self,
        location: GeoPoint,
        features: &WeatherFeatures,
    ) -> Result<ClassOutcome, ClassifierError> {
        let body = ModelRequest {
            latitude: location.latitude,
            longitude: location.longitude,
            features,
            temperature_mean: features.temperature_mean(),
        };

        tracing::debug!(
            url = %self.url,
            lat = location.latitude,
            lon = location.longitude,
            "Querying model server"
        );

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status(status.as_u16(), error_text));
        }

        let parsed: ModelResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        tracing::debug!(
            class = %parsed.likelihood,
            confidence = parsed.confidence,
            "Model server responded"
        );

        Ok(parsed.into())
    }
}
