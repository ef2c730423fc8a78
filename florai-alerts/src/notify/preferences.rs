//! Per-user notification preferences
//!
//! Fail-closed: a user with no preference document, or whose document
//! lacks an explicit `enableAiAlerts = true`, is treated as opted out.
//! Not-found is never an error. Only infrastructure failures are.

use std::sync::Arc;

use florai_common::db::{DocumentStore, NotificationPreference, PREFERENCES_COLLECTION};
use tracing::trace;

use crate::error::{PipelineError, PipelineStep};

/// Read-only view of the `notificationPreferences` collection
#[derive(Clone)]
pub struct PreferenceAccessor {
    store: Arc<dyn DocumentStore>,
}

impl PreferenceAccessor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load the user's preference document.
    ///
    /// `Ok(None)` for an empty/absent user id or a missing document.
    pub async fn lookup(
        &self,
        user_id: Option<&str>,
    ) -> Result<Option<NotificationPreference>, PipelineError> {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };

        let doc = self
            .store
            .get(PREFERENCES_COLLECTION, user_id)
            .await
            .map_err(|source| PipelineError::StoreUnavailable {
                step: PipelineStep::Preference,
                source,
            })?;

        trace!(user_id, found = doc.is_some(), "Preference lookup");
        Ok(doc.as_ref().map(NotificationPreference::from_document))
    }

    /// True only when the user explicitly switched AI alerts on
    pub async fn is_alert_enabled(&self, user_id: Option<&str>) -> Result<bool, PipelineError> {
        Ok(self
            .lookup(user_id)
            .await?
            .map(|pref| pref.alerts_enabled())
            .unwrap_or(false))
    }
}
