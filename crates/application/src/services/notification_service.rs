//! Notification service
//!
//! Pushes a message to the owner's phone and records it in the
//! `notifications` table so the dashboard can list unread items.

use std::sync::Arc;

use chrono::NaiveDateTime;
use domain::entities::{Notification, NotificationKind, NotificationStatus};
use tracing::{info, instrument, warn};

use super::db_manager::{DbManager, WriteOutcome};
use crate::error::ApplicationError;
use crate::ports::PushPort;

pub struct NotificationService {
    push: Arc<dyn PushPort>,
    db: Arc<DbManager>,
    node: String,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    pub fn new(push: Arc<dyn PushPort>, db: Arc<DbManager>, node: impl Into<String>) -> Self {
        Self {
            push,
            db,
            node: node.into(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Push `msg` and store it as unread
    ///
    /// A failed push is recorded with `pushed = false` rather than failing.
    #[instrument(skip(self, msg), fields(node = %self.node))]
    pub async fn notify(
        &self,
        msg: &str,
        kind: NotificationKind,
        app: &str,
        now: NaiveDateTime,
    ) -> Result<Notification, ApplicationError> {
        let pushed = match self.push.push(&self.node, app, msg).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Push notification failed");
                false
            },
        };

        let notification = Notification {
            msg: msg.to_string(),
            node: self.node.clone(),
            datetime: now,
            kind,
            app: app.to_string(),
            status: NotificationStatus::Unread,
            pushed,
        };
        let outcome = self
            .db
            .insert_data(Notification::TABLE, vec![notification.to_record()])
            .await?;
        if let WriteOutcome::Deferred(id) = &outcome {
            info!(id = %id, "Notification stored for later replay");
        }
        Ok(notification)
    }
}
