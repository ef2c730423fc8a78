//! HTTP API handlers for florai-alerts
//!
//! `GET /health`, `POST /predict`, `POST /predict/batch`

pub mod health;
pub mod predict;

pub use health::health_routes;
pub use predict::predict_routes;
