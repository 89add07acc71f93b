//! Notification fan-out
//!
//! Notifications are derived from approval events. Delivery is someone
//! else's job; this side only stores them and lets recipients read them.
//! Publishing is best-effort: a failing sink never fails the approval.

use crate::access_control::{Actor, Role};
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::store::documents::new_id;
use crate::store::{Notification, NotificationKind, NotificationStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Recipient of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(String),
    Role(Role),
}

pub struct Notifier {
    store: Arc<dyn NotificationStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Store a notification, logging instead of failing
    pub async fn publish(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
        title: &str,
        message: &str,
        source_id: Option<&str>,
    ) -> Option<Notification> {
        let (user_id, role) = match recipient {
            Recipient::User(id) => (Some(id), None),
            Recipient::Role(role) => (None, Some(role)),
        };
        let notification = Notification {
            id: new_id(),
            title: title.to_string(),
            message: message.to_string(),
            user_id,
            role,
            kind,
            source_id: source_id.map(String::from),
            read: false,
            created_at: Utc::now(),
        };

        match self.store.insert_notification(notification).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(error = %e, ?kind, "Failed to store notification");
                None
            }
        }
    }

    /// Notifications addressed to the actor's id or role, newest first
    pub async fn list_for(&self, actor: &Actor) -> StoreResult<Vec<Notification>> {
        self.store.notifications_for(&actor.id, actor.role).await
    }

    pub async fn mark_read(&self, actor: &Actor, id: &str) -> GovernanceResult<Notification> {
        let existing = self
            .store
            .find_notification(id)
            .await?
            .filter(|n| n.is_addressed_to(actor))
            .ok_or_else(|| GovernanceError::not_found("Notification", id))?;

        self.store
            .mark_notification_read(&existing.id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Notification", id))
    }
}
