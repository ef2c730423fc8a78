//! Domain value types shared by the FlorAI services
//!
//! These are the inputs and outputs of the occurrence classifier: the
//! location being evaluated, the weather snapshot fed to the model, and the
//! class outcome it returns. Persisted document shapes live in
//! [`crate::db::models`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Allowed deviation when checking that class probabilities sum to 1.
///
/// Model servers commonly emit single-precision probabilities, so an exact
/// comparison would reject legitimate outputs.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Risk classes
// ---------------------------------------------------------------------------

/// Occurrence likelihood class predicted by the model.
///
/// Variants are declared in ascending order so the derived `Ord` matches the
/// risk ranking (Low < Medium < High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    /// All classes in ascending rank order
    pub const ALL: [RiskClass; 3] = [RiskClass::Low, RiskClass::Medium, RiskClass::High];

    /// Numeric rank (0 = Low, 2 = High)
    pub fn rank(self) -> u8 {
        match self {
            RiskClass::Low => 0,
            RiskClass::Medium => 1,
            RiskClass::High => 2,
        }
    }

    /// Wire label ("Low", "Medium", "High")
    pub fn as_str(self) -> &'static str {
        match self {
            RiskClass::Low => "Low",
            RiskClass::Medium => "Medium",
            RiskClass::High => "High",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskClass {
    type Err = String;

    /// Case-insensitive parse, so both "High" and "high" are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskClass::Low),
            "medium" => Ok(RiskClass::Medium),
            "high" => Ok(RiskClass::High),
            other => Err(format!("Unknown risk class: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Alert severity
// ---------------------------------------------------------------------------

/// Severity tier attached to a notification.
///
/// Derived from confidence (single alerts) or from the tier mix of a grid
/// (batch summaries), never from the predicted class directly. Serialized
/// lowercase, as stored in notification documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric rank (0 = Low, 2 = High)
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// WGS84 coordinate of an evaluated location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject non-finite or out-of-range coordinates
    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} outside [-180, 180]", self.longitude));
        }
        Ok(())
    }

    /// Arithmetic mean of a set of points; `None` for an empty slice
    pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (lat, lon) = points
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
        Some(GeoPoint::new(lat / n, lon / n))
    }
}

// ---------------------------------------------------------------------------
// Weather features
// ---------------------------------------------------------------------------

/// Weather snapshot for a location, as supplied by the map UI.
///
/// Units: temperatures in °C, precipitation in mm, wind in km/h, sunshine in
/// seconds, rain hours in hours of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherFeatures {
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub sunshine_duration: f64,
    #[serde(default)]
    pub rain_hours: f64,
}

impl WeatherFeatures {
    /// Range checks matching what the model was trained on
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("temperatureMax", self.temperature_max),
            ("temperatureMin", self.temperature_min),
            ("precipitation", self.precipitation),
            ("windSpeed", self.wind_speed),
            ("sunshineDuration", self.sunshine_duration),
            ("rainHours", self.rain_hours),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} must be a finite number", name));
        }
        if self.precipitation < 0.0 {
            return Err("precipitation must be >= 0".to_string());
        }
        if self.wind_speed < 0.0 {
            return Err("windSpeed must be >= 0".to_string());
        }
        if self.sunshine_duration < 0.0 {
            return Err("sunshineDuration must be >= 0".to_string());
        }
        if !(0.0..=24.0).contains(&self.rain_hours) {
            return Err(format!("rainHours {} outside [0, 24]", self.rain_hours));
        }
        Ok(())
    }

    /// Mean of the daily max and min temperature
    pub fn temperature_mean(&self) -> f64 {
        (self.temperature_max + self.temperature_min) / 2.0
    }

    /// Opaque JSON snapshot stored alongside a prediction record
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "temperatureMax": self.temperature_max,
            "temperatureMin": self.temperature_min,
            "temperatureMean": self.temperature_mean(),
            "precipitation": self.precipitation,
            "windSpeed": self.wind_speed,
            "sunshineDuration": self.sunshine_duration,
            "rainHours": self.rain_hours,
        })
    }
}

// ---------------------------------------------------------------------------
// Classifier outcome
// ---------------------------------------------------------------------------

/// Output of the occurrence classifier for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOutcome {
    pub predicted_class: RiskClass,
    pub confidence: f64,
    pub probabilities: BTreeMap<RiskClass, f64>,
}

impl ClassOutcome {
    /// Build an outcome from per-class probabilities, picking the most
    /// probable class. Ties resolve toward the higher-risk class.
    pub fn from_probabilities(low: f64, medium: f64, high: f64) -> Self {
        let probabilities: BTreeMap<RiskClass, f64> = [
            (RiskClass::Low, low),
            (RiskClass::Medium, medium),
            (RiskClass::High, high),
        ]
        .into_iter()
        .collect();

        let (predicted_class, confidence) = probabilities
            .iter()
            .fold((RiskClass::Low, f64::NEG_INFINITY), |best, (class, p)| {
                if *p >= best.1 {
                    (*class, *p)
                } else {
                    best
                }
            });

        Self {
            predicted_class,
            confidence,
            probabilities,
        }
    }

    /// Probability assigned to a class (0.0 when absent)
    pub fn probability(&self, class: RiskClass) -> f64 {
        self.probabilities.get(&class).copied().unwrap_or(0.0)
    }

    /// Check the outcome invariants: confidence in [0, 1], probabilities
    /// non-negative and summing to 1, and confidence equal to the
    /// probability of the predicted class.
    pub fn validate(&self) -> Result<(), String> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if self.probabilities.is_empty() {
            return Err("probability mapping is empty".to_string());
        }
        if let Some((class, p)) = self
            .probabilities
            .iter()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(format!("probability for {} is invalid: {}", class, p));
        }

        let sum: f64 = self.probabilities.values().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(format!("probabilities sum to {}, expected 1", sum));
        }

        let predicted = self
            .probabilities
            .get(&self.predicted_class)
            .copied()
            .ok_or_else(|| format!("no probability for predicted class {}", self.predicted_class))?;
        if (predicted - self.confidence).abs() > PROBABILITY_TOLERANCE {
            return Err(format!(
                "confidence {} does not match probability {} of predicted class {}",
                self.confidence, predicted, self.predicted_class
            ));
        }
        Ok(())
    }
}
