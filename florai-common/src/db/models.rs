//! Persisted document models
//!
//! Field names here are a wire contract shared with the web UI, which reads
//! the same collections directly. Do not rename them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{RiskClass, Severity};

/// Prediction history collection
pub const PREDICTIONS_COLLECTION: &str = "ai_predictions";

/// User-facing alerts collection
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// Per-user notification settings collection (keyed by user id)
pub const PREFERENCES_COLLECTION: &str = "notificationPreferences";

/// `type` tag of a single-location alert
pub const TYPE_SINGLE_ALERT: &str = "single_alert";

/// `type` tag of a grid summary alert
pub const TYPE_BATCH_SUMMARY: &str = "batch_summary";

// ---------------------------------------------------------------------------
// Prediction history
// ---------------------------------------------------------------------------

/// One evaluated location, written once and never modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "predictionID")]
    pub prediction_id: String,
    /// `None` for anonymous predictions; those never produce alerts
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "predictedClass")]
    pub predicted_class: RiskClass,
    pub confidence: f64,
    pub probabilities: BTreeMap<RiskClass, f64>,
    /// Weather inputs exactly as submitted
    pub features: Value,
    #[serde(rename = "modelID")]
    pub model_id: String,
    /// Which request path produced the record ("ai_model_click", "ai_grid_prediction")
    pub source: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A user-facing alert
///
/// Base fields are shared by both variants; the `type` tag and the
/// variant-specific fields come from the flattened [`NotificationPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "notificationID")]
    pub notification_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub source: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Starts false; only the UI flips it
    pub read: bool,
    #[serde(flatten)]
    pub payload: NotificationPayload,
}

/// Variant-specific notification fields, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Alert for one recorded prediction
    SingleAlert {
        confidence: f64,
        #[serde(rename = "modelID")]
        model_id: String,
        /// Id of the PredictionRecord this alert was derived from
        #[serde(rename = "predictionID")]
        prediction_id: String,
        latitude: f64,
        longitude: f64,
        #[serde(rename = "predictedClass")]
        predicted_class: RiskClass,
    },
    /// Aggregate of a grid of predictions; references no individual records
    BatchSummary {
        #[serde(rename = "highRiskCount")]
        high_count: u32,
        #[serde(rename = "mediumRiskCount")]
        medium_count: u32,
        #[serde(rename = "lowRiskCount")]
        low_count: u32,
        #[serde(rename = "totalPoints")]
        total_count: u32,
        #[serde(rename = "centerLat")]
        center_lat: f64,
        #[serde(rename = "centerLon")]
        center_lon: f64,
    },
}

impl NotificationPayload {
    /// The `type` tag written for this variant
    pub fn type_tag(&self) -> &'static str {
        match self {
            NotificationPayload::SingleAlert { .. } => TYPE_SINGLE_ALERT,
            NotificationPayload::BatchSummary { .. } => TYPE_BATCH_SUMMARY,
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Notification settings owned by the user-facing settings surface.
///
/// Read-only from the alerting side. Parsing is lenient: a field holding a
/// value of the wrong type is treated as absent rather than failing the
/// whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreference {
    #[serde(rename = "enableAiAlerts", default, skip_serializing_if = "Option::is_none")]
    pub enable_ai_alerts: Option<bool>,
    #[serde(rename = "channelInApp", default, skip_serializing_if = "Option::is_none")]
    pub channel_in_app: Option<bool>,
    #[serde(rename = "minSeverity", default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<Severity>,
}

impl NotificationPreference {
    /// Lenient parse of a stored preference document
    pub fn from_document(doc: &Value) -> Self {
        Self {
            enable_ai_alerts: doc.get("enableAiAlerts").and_then(Value::as_bool),
            channel_in_app: doc.get("channelInApp").and_then(Value::as_bool),
            min_severity: doc
                .get("minSeverity")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
        }
    }

    /// True only when alerts were explicitly switched on
    pub fn alerts_enabled(&self) -> bool {
        self.enable_ai_alerts == Some(true)
    }

    /// In-app delivery is on unless explicitly switched off
    pub fn in_app_enabled(&self) -> bool {
        self.channel_in_app != Some(false)
    }

    /// Lowest severity the user wants to hear about (default: everything)
    pub fn min_severity(&self) -> Severity {
        self.min_severity.unwrap_or(Severity::Low)
    }
}
