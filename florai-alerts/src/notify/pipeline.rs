//! Notification pipeline orchestration
//!
//! Each request moves through:
//!
//! ```text
//! Received → Recorded? → PreferenceChecked? → Composed? → Written → Done
//! ```
//!
//! Three independent gates decide whether an alert is written: the global
//! switch (configuration), the caller's `want_notify` flag, and the user's
//! stored preference. The prediction record and the notification are two
//! separate writes; a failed notification write leaves the record in place
//! and is reported as [`NotificationStatus::Failed`], not as an error.

use std::fmt;
use std::sync::Arc;

use florai_common::config::{NotificationsConfig, TomlConfig};
use florai_common::db::{DocumentStore, NotificationPreference};
use florai_common::{GeoPoint, Severity, WeatherFeatures};
use tracing::{debug, error, info, warn};

use super::compose::{AlertComposer, AlertDraft, AlertTemplates};
use super::preferences::PreferenceAccessor;
use super::recorder::{PredictionRecorder, PredictionSource};
use super::severity::SeverityThresholds;
use super::writer::NotificationWriter;
use super::Prediction;
use crate::classifier::Classifier;
use crate::error::{ClassifierError, PipelineError, PipelineStep};

/// Process-wide switches, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Global kill switch; when false no notification is ever written
    pub notifications_enabled: bool,
    /// Treat a failed preference read as "opted out" instead of an error
    pub fail_closed_on_store_error: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&NotificationsConfig::default())
    }
}

impl From<&NotificationsConfig> for PipelineSettings {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            notifications_enabled: config.enabled,
            fail_closed_on_store_error: config.fail_closed_on_store_error,
        }
    }
}

/// Why a request finished without writing a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Notifications are disabled process-wide
    GlobalSwitchOff,
    /// Caller did not ask for a notification
    NotRequested,
    /// No user to notify
    AnonymousUser,
    /// No preference document, or AI alerts not explicitly enabled
    OptedOut,
    /// Preference read failed and the pipeline is configured fail-closed
    PreferenceUnavailable,
    /// User switched off in-app delivery
    ChannelDisabled,
    /// Alert severity below the user's minimum
    BelowMinimumSeverity,
    /// Batch had no points
    EmptyBatch,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::GlobalSwitchOff => "global_switch_off",
            SkipReason::NotRequested => "not_requested",
            SkipReason::AnonymousUser => "anonymous_user",
            SkipReason::OptedOut => "opted_out",
            SkipReason::PreferenceUnavailable => "preference_unavailable",
            SkipReason::ChannelDisabled => "channel_disabled",
            SkipReason::BelowMinimumSeverity => "below_minimum_severity",
            SkipReason::EmptyBatch => "empty_batch",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the notification part of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    /// Notification written with this id
    Created(String),
    /// Deliberately not written
    Skipped(SkipReason),
    /// Write attempted and failed; earlier writes in the request stand
    Failed { step: PipelineStep, message: String },
}

impl NotificationStatus {
    pub fn created(&self) -> bool {
        matches!(self, NotificationStatus::Created(_))
    }

    pub fn notification_id(&self) -> Option<&str> {
        match self {
            NotificationStatus::Created(id) => Some(id),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            NotificationStatus::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            NotificationStatus::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// One single-location request
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub location: GeoPoint,
    pub features: WeatherFeatures,
    pub user_id: Option<String>,
    pub want_record: bool,
    pub want_notify: bool,
}

/// One grid request
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub points: Vec<(GeoPoint, WeatherFeatures)>,
    /// Centre reported in the summary; defaults to the mean of the points
    pub center: Option<GeoPoint>,
    pub user_id: Option<String>,
    pub want_record: bool,
    pub want_notify: bool,
}

/// Result of a single-location request
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub prediction: Prediction,
    /// Present when the prediction was recorded
    pub record_id: Option<String>,
    pub notification: NotificationStatus,
}

/// Result of a grid request
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// In request order
    pub predictions: Vec<Prediction>,
    /// One per point when recording was requested, otherwise empty
    pub record_ids: Vec<String>,
    pub notification: NotificationStatus,
}

/// Outcome of the recipient gates
enum Recipient<'a> {
    Deliver {
        user_id: &'a str,
        preference: NotificationPreference,
    },
    Skip(SkipReason),
}

/// The notification decision pipeline
///
/// Holds only immutable settings and shared handles, so one instance is
/// shared by every request.
pub struct NotificationPipeline {
    classifier: Arc<dyn Classifier>,
    recorder: PredictionRecorder,
    preferences: PreferenceAccessor,
    composer: AlertComposer,
    writer: NotificationWriter,
    settings: PipelineSettings,
}

impl NotificationPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        classifier: Arc<dyn Classifier>,
        composer: AlertComposer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            recorder: PredictionRecorder::new(store.clone()),
            preferences: PreferenceAccessor::new(store.clone()),
            composer,
            writer: NotificationWriter::new(store),
            settings,
        }
    }

    /// Build a pipeline from the loaded configuration
    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        classifier: Arc<dyn Classifier>,
        config: &TomlConfig,
    ) -> florai_common::Result<Self> {
        let thresholds =
            SeverityThresholds::try_from(config.severity).map_err(florai_common::Error::Config)?;
        let composer = AlertComposer::new(thresholds, AlertTemplates::new(config.templates.clone()));

        Ok(Self::new(
            store,
            classifier,
            composer,
            PipelineSettings::from(&config.notifications),
        ))
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    pub fn model_id(&self) -> &str {
        self.classifier.model_id()
    }

    /// Classify one location, optionally record it, and alert the user if
    /// every gate allows it.
    pub async fn submit_prediction(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionOutcome, PipelineError> {
        request.location.validate().map_err(PipelineError::Validation)?;
        request.features.validate().map_err(PipelineError::Validation)?;

        let user_id = normalize_user(request.user_id.as_deref());
        let want_notify = request.want_notify && self.settings.notifications_enabled;

        // A single alert must reference its prediction record
        if want_notify && user_id.is_some() && !request.want_record {
            return Err(PipelineError::Validation(
                "createNotification requires savePrediction for single-location requests"
                    .to_string(),
            ));
        }

        let prediction = self.classify(request.location, &request.features).await?;

        let record_id = if request.want_record {
            let id = self
                .recorder
                .record(
                    user_id,
                    prediction.location,
                    &prediction.outcome,
                    &request.features,
                    self.classifier.model_id(),
                    PredictionSource::Click,
                )
                .await
                .map_err(|e| {
                    error!(error = %e, "Prediction record failed, aborting request");
                    e
                })?;
            Some(id)
        } else {
            None
        };

        let notification = match self.recipient(user_id, request.want_notify).await? {
            Recipient::Skip(reason) => skipped(reason, user_id),
            Recipient::Deliver {
                user_id,
                preference,
            } => {
                let severity = self.composer.thresholds().classify(prediction.outcome.confidence);
                if severity < preference.min_severity() {
                    skipped(SkipReason::BelowMinimumSeverity, Some(user_id))
                } else {
                    // Unreachable without a record: rejected above
                    let record_id = record_id.as_deref().unwrap_or_default();
                    let draft = self.composer.compose(
                        &prediction,
                        self.classifier.model_id(),
                        severity,
                        record_id,
                    );
                    self.deliver(user_id, draft).await
                }
            }
        };

        Ok(PredictionOutcome {
            prediction,
            record_id,
            notification,
        })
    }

    /// Classify every point of a grid, optionally record each one, and
    /// write at most one summary alert.
    pub async fn submit_batch(&self, request: BatchRequest) -> Result<BatchOutcome, PipelineError> {
        for (index, (location, features)) in request.points.iter().enumerate() {
            location
                .validate()
                .and_then(|_| features.validate())
                .map_err(|e| PipelineError::Validation(format!("points[{}]: {}", index, e)))?;
        }
        if let Some(center) = &request.center {
            center
                .validate()
                .map_err(|e| PipelineError::Validation(format!("center: {}", e)))?;
        }

        let user_id = normalize_user(request.user_id.as_deref());

        let mut predictions = Vec::with_capacity(request.points.len());
        for (location, features) in &request.points {
            predictions.push(self.classify(*location, features).await?);
        }

        let mut record_ids = Vec::new();
        if request.want_record {
            for (prediction, (_, features)) in predictions.iter().zip(&request.points) {
                let id = self
                    .recorder
                    .record(
                        user_id,
                        prediction.location,
                        &prediction.outcome,
                        features,
                        self.classifier.model_id(),
                        PredictionSource::Grid,
                    )
                    .await
                    .map_err(|e| {
                        error!(
                            error = %e,
                            recorded = record_ids.len(),
                            "Grid record failed, aborting request"
                        );
                        e
                    })?;
                record_ids.push(id);
            }
        }

        let notification = match self.recipient(user_id, request.want_notify).await? {
            Recipient::Skip(reason) => skipped(reason, user_id),
            Recipient::Deliver { user_id, .. } => {
                let locations: Vec<GeoPoint> = predictions.iter().map(|p| p.location).collect();
                let center = request.center.or_else(|| GeoPoint::centroid(&locations));

                match center.and_then(|c| self.composer.summarize(&predictions, c)) {
                    Some(draft) => self.deliver(user_id, draft).await,
                    None => skipped(SkipReason::EmptyBatch, Some(user_id)),
                }
            }
        };

        Ok(BatchOutcome {
            predictions,
            record_ids,
            notification,
        })
    }

    async fn classify(
        &self,
        location: GeoPoint,
        features: &WeatherFeatures,
    ) -> Result<Prediction, PipelineError> {
        let outcome = self.classifier.predict(location, features).await.map_err(|e| {
            error!(error = %e, "Classifier failed, aborting request");
            PipelineError::from(e)
        })?;

        outcome.validate().map_err(|reason| {
            error!(reason = %reason, "Classifier returned inconsistent output");
            PipelineError::Classifier(ClassifierError::InvalidOutput(reason))
        })?;

        Ok(Prediction { location, outcome })
    }

    /// Apply the global switch, request flag, and user preference gates
    async fn recipient<'a>(
        &self,
        user_id: Option<&'a str>,
        want_notify: bool,
    ) -> Result<Recipient<'a>, PipelineError> {
        if !want_notify {
            return Ok(Recipient::Skip(SkipReason::NotRequested));
        }
        if !self.settings.notifications_enabled {
            return Ok(Recipient::Skip(SkipReason::GlobalSwitchOff));
        }
        let Some(user_id) = user_id else {
            return Ok(Recipient::Skip(SkipReason::AnonymousUser));
        };

        let preference = match self.preferences.lookup(Some(user_id)).await {
            Ok(Some(preference)) => preference,
            Ok(None) => return Ok(Recipient::Skip(SkipReason::OptedOut)),
            Err(e) if self.settings.fail_closed_on_store_error => {
                warn!(
                    user_id,
                    error = %e,
                    "Preference store unavailable, skipping notification"
                );
                return Ok(Recipient::Skip(SkipReason::PreferenceUnavailable));
            }
            Err(e) => {
                error!(user_id, error = %e, "Preference store unavailable, failing request");
                return Err(e);
            }
        };

        if !preference.alerts_enabled() {
            return Ok(Recipient::Skip(SkipReason::OptedOut));
        }
        if !preference.in_app_enabled() {
            return Ok(Recipient::Skip(SkipReason::ChannelDisabled));
        }

        Ok(Recipient::Deliver {
            user_id,
            preference,
        })
    }

    async fn deliver(&self, user_id: &str, draft: AlertDraft) -> NotificationStatus {
        let kind = draft.payload.type_tag();
        let severity: Severity = draft.severity;

        match self.writer.write(user_id, draft).await {
            Ok(id) => {
                info!(
                    notification_id = %id,
                    user_id,
                    kind,
                    severity = %severity,
                    "Notification created"
                );
                NotificationStatus::Created(id)
            }
            Err(e) => {
                warn!(
                    user_id,
                    kind,
                    error = %e,
                    "Notification write failed; prediction result still returned"
                );
                NotificationStatus::Failed {
                    step: PipelineStep::Notify,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn normalize_user(user_id: Option<&str>) -> Option<&str> {
    user_id.map(str::trim).filter(|id| !id.is_empty())
}

fn skipped(reason: SkipReason, user_id: Option<&str>) -> NotificationStatus {
    debug!(reason = %reason, user_id = user_id.unwrap_or("-"), "No notification");
    NotificationStatus::Skipped(reason)
}
