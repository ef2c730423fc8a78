//! Single-location alert composition
//!
//! Pure: turns a classified prediction into the user-facing title and
//! description. Nothing here touches the store.

use florai_common::config::TemplateConfig;
use florai_common::db::NotificationPayload;
use florai_common::Severity;

use super::severity::SeverityThresholds;
use super::Prediction;

/// `source` written on single-location alerts
pub const SINGLE_ALERT_SOURCE: &str = "ai_model_prediction";

/// `source` written on grid summary alerts
pub const BATCH_SUMMARY_SOURCE: &str = "ai_grid_prediction";

/// A notification before it has an id, owner, or timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub source: String,
    pub payload: NotificationPayload,
}

/// Title/description templates for every tier
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTemplates {
    config: TemplateConfig,
}

impl AlertTemplates {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    pub fn title(&self, severity: Severity) -> &str {
        match severity {
            Severity::High => &self.config.high_title,
            Severity::Medium => &self.config.medium_title,
            Severity::Low => &self.config.low_title,
        }
    }

    pub fn description(&self, severity: Severity) -> &str {
        match severity {
            Severity::High => &self.config.high_description,
            Severity::Medium => &self.config.medium_description,
            Severity::Low => &self.config.low_description,
        }
    }

    pub fn batch_title(&self) -> &str {
        &self.config.batch_title
    }

    pub fn batch_description(&self) -> &str {
        &self.config.batch_description
    }
}

impl Default for AlertTemplates {
    fn default() -> Self {
        Self::new(TemplateConfig::default())
    }
}

/// Substitute `{key}` placeholders. Unknown placeholders are left as is.
pub(crate) fn render(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{}}}", key), value)
    })
}

/// Builds alert drafts for single predictions and grid summaries
#[derive(Debug, Clone)]
pub struct AlertComposer {
    pub(crate) thresholds: SeverityThresholds,
    pub(crate) templates: AlertTemplates,
}

impl AlertComposer {
    pub fn new(thresholds: SeverityThresholds, templates: AlertTemplates) -> Self {
        Self {
            thresholds,
            templates,
        }
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    /// Draft the alert for one recorded prediction.
    ///
    /// `severity` is passed in rather than recomputed so the caller's
    /// minimum-severity check and the stored alert always agree.
    pub fn compose(
        &self,
        prediction: &Prediction,
        model_id: &str,
        severity: Severity,
        record_id: &str,
    ) -> AlertDraft {
        let confidence = prediction.outcome.confidence;
        let percent = (confidence * 100.0).round() as i64;

        let description = render(
            self.templates.description(severity),
            &[
                ("confidence", percent.to_string()),
                ("model", model_id.to_string()),
            ],
        );

        AlertDraft {
            title: self.templates.title(severity).to_string(),
            description,
            severity,
            source: SINGLE_ALERT_SOURCE.to_string(),
            payload: NotificationPayload::SingleAlert {
                confidence,
                model_id: model_id.to_string(),
                prediction_id: record_id.to_string(),
                latitude: prediction.location.latitude,
                longitude: prediction.location.longitude,
                predicted_class: prediction.outcome.predicted_class,
            },
        }
    }
}
