//! Notification decision pipeline
//!
//! Leaves first:
//! - [`severity`]: confidence → severity tier (pure)
//! - [`preferences`]: per-user opt-in lookup (fail-closed)
//! - [`recorder`]: prediction history writes
//! - [`compose`]: single-location alert text
//! - [`summary`]: grid aggregation into one alert
//! - [`writer`]: notification document writes
//! - [`pipeline`]: per-request orchestration of all of the above

pub mod compose;
pub mod pipeline;
pub mod preferences;
pub mod recorder;
pub mod severity;
pub mod summary;
pub mod writer;

use florai_common::{ClassOutcome, GeoPoint};

pub use compose::{AlertComposer, AlertDraft, AlertTemplates};
pub use pipeline::{
    BatchOutcome, BatchRequest, NotificationPipeline, NotificationStatus, PipelineSettings,
    PredictionOutcome, PredictionRequest, SkipReason,
};
pub use preferences::PreferenceAccessor;
pub use recorder::{PredictionRecorder, PredictionSource};
pub use severity::SeverityThresholds;
pub use summary::TierCounts;
pub use writer::NotificationWriter;

/// A classified location: what the model said about one point
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub location: GeoPoint,
    pub outcome: ClassOutcome,
}
