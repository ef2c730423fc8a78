//! Grid summary composition
//!
//! A batch of predictions collapses into one alert carrying per-tier counts
//! and the centre of the analysed area. No per-point notification is ever
//! written.

use florai_common::db::NotificationPayload;
use florai_common::{GeoPoint, Severity};

use super::compose::{render, AlertComposer, AlertDraft, BATCH_SUMMARY_SOURCE};
use super::severity::SeverityThresholds;
use super::Prediction;

/// Share of High points above which the whole area is rated High
const HIGH_SHARE_FOR_HIGH: f64 = 0.4;

/// Share of High + Medium points above which the area is rated Medium
const ELEVATED_SHARE_FOR_MEDIUM: f64 = 0.5;

/// Per-tier counts over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub total: u32,
}

impl TierCounts {
    /// Classify every prediction's confidence and count the tiers
    pub fn tally(predictions: &[Prediction], thresholds: &SeverityThresholds) -> Self {
        predictions.iter().fold(Self::default(), |mut counts, p| {
            match thresholds.classify(p.outcome.confidence) {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
            counts.total += 1;
            counts
        })
    }

    /// Severity of the area as a whole
    ///
    /// High when more than 40% of points are High, Medium when more than
    /// half are High or Medium, otherwise Low.
    pub fn overall_severity(&self) -> Severity {
        if self.total == 0 {
            return Severity::Low;
        }
        let total = f64::from(self.total);
        if f64::from(self.high) / total > HIGH_SHARE_FOR_HIGH {
            Severity::High
        } else if f64::from(self.high + self.medium) / total > ELEVATED_SHARE_FOR_MEDIUM {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl AlertComposer {
    /// Draft the summary alert for a grid analysis.
    ///
    /// `None` for an empty batch: there is nothing to report.
    pub fn summarize(&self, predictions: &[Prediction], center: GeoPoint) -> Option<AlertDraft> {
        if predictions.is_empty() {
            return None;
        }

        let counts = TierCounts::tally(predictions, &self.thresholds);
        let description = render(
            self.templates.batch_description(),
            &[
                ("high", counts.high.to_string()),
                ("medium", counts.medium.to_string()),
                ("low", counts.low.to_string()),
                ("total", counts.total.to_string()),
            ],
        );

        Some(AlertDraft {
            title: self.templates.batch_title().to_string(),
            description,
            severity: counts.overall_severity(),
            source: BATCH_SUMMARY_SOURCE.to_string(),
            payload: NotificationPayload::BatchSummary {
                high_count: counts.high,
                medium_count: counts.medium,
                low_count: counts.low,
                total_count: counts.total,
                center_lat: center.latitude,
                center_lon: center.longitude,
            },
        })
    }
}
