//! # FlorAI Common Library
//!
//! Shared code for the FlorAI services including:
//! - Prediction and notification document models
//! - Document store access (SQLite-backed)
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{ClassOutcome, GeoPoint, RiskClass, Severity, WeatherFeatures};
