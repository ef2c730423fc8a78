//! Severity classification
//!
//! Maps a confidence score onto a severity tier. Thresholds come from
//! configuration so operators can retune them without a code change.

use florai_common::config::SeverityConfig;
use florai_common::Severity;

/// Confidence cut-offs between severity tiers
///
/// Invariant: `0 <= medium_above < high_above <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    high_above: f64,
    medium_above: f64,
}

impl SeverityThresholds {
    pub fn new(high_above: f64, medium_above: f64) -> Result<Self, String> {
        if !high_above.is_finite() || !medium_above.is_finite() {
            return Err("severity thresholds must be finite".to_string());
        }
        if !(0.0..=1.0).contains(&high_above) || !(0.0..=1.0).contains(&medium_above) {
            return Err(format!(
                "severity thresholds must be within [0, 1], got high={} medium={}",
                high_above, medium_above
            ));
        }
        if medium_above >= high_above {
            return Err(format!(
                "medium threshold {} must be below high threshold {}",
                medium_above, high_above
            ));
        }
        Ok(Self {
            high_above,
            medium_above,
        })
    }

    pub fn high_above(&self) -> f64 {
        self.high_above
    }

    pub fn medium_above(&self) -> f64 {
        self.medium_above
    }

    /// `> high_above` → High, `> medium_above` → Medium, otherwise Low.
    ///
    /// Total over every input: values below 0 (and NaN) fall through to Low.
    pub fn classify(&self, confidence: f64) -> Severity {
        if confidence > self.high_above {
            Severity::High
        } else if confidence > self.medium_above {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high_above: 0.70,
            medium_above: 0.40,
        }
    }
}

impl TryFrom<SeverityConfig> for SeverityThresholds {
    type Error = String;

    fn try_from(config: SeverityConfig) -> Result<Self, Self::Error> {
        Self::new(config.high_above, config.medium_above)
    }
}
