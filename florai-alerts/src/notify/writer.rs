//! Notification document writes

use std::sync::Arc;

use florai_common::db::{DocumentStore, Notification, NOTIFICATIONS_COLLECTION};
use florai_common::{time, uuid_utils};
use tracing::debug;

use super::compose::AlertDraft;
use crate::error::{PipelineError, PipelineStep};

/// Persists composed alerts into the `notifications` collection
#[derive(Clone)]
pub struct NotificationWriter {
    store: Arc<dyn DocumentStore>,
}

impl NotificationWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Write one unread notification for `user_id` and return its id.
    ///
    /// A failure here never touches records written earlier in the request.
    pub async fn write(&self, user_id: &str, draft: AlertDraft) -> Result<String, PipelineError> {
        let notification = Notification {
            notification_id: uuid_utils::generate_document_id(),
            user_id: user_id.to_string(),
            title: draft.title,
            description: draft.description,
            severity: draft.severity,
            source: draft.source,
            created_at: time::now(),
            read: false,
            payload: draft.payload,
        };

        let body = serde_json::to_value(&notification)
            .map_err(|e| PipelineError::persistence(PipelineStep::Notify, e.into()))?;

        self.store
            .insert(NOTIFICATIONS_COLLECTION, &notification.notification_id, body)
            .await
            .map_err(|e| PipelineError::persistence(PipelineStep::Notify, e))?;

        debug!(
            notification_id = %notification.notification_id,
            kind = notification.payload.type_tag(),
            "Wrote notification"
        );
        Ok(notification.notification_id)
    }
}
