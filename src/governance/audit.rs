//! Audit log
//!
//! Two ways in: [`AuditLog::record`] is part of the calling mutation and its
//! failure propagates; [`AuditLog::try_record`] is for freeform client
//! logging and swallows failures.

use crate::access_control::Actor;
use crate::error::StoreResult;
use crate::store::documents::new_id;
use crate::store::{AuditLogEntry, AuditStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CATEGORY_GENERAL: &str = "general";
pub const CATEGORY_PERMISSIONS: &str = "permissions";
pub const CATEGORY_APPROVALS: &str = "approvals";
pub const CATEGORY_EMERGENCY: &str = "emergency";

pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    default_limit: usize,
    max_limit: usize,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>, default_limit: usize, max_limit: usize) -> Self {
        Self {
            store,
            default_limit,
            max_limit: max_limit.max(1),
        }
    }

    fn entry(message: &str, actor: &Actor, category: &str) -> AuditLogEntry {
        let category = category.trim();
        AuditLogEntry {
            id: new_id(),
            message: message.to_string(),
            actor_id: actor.id.clone(),
            actor_email: actor.email.clone(),
            actor_role: actor.role,
            category: if category.is_empty() {
                CATEGORY_GENERAL.to_string()
            } else {
                category.to_string()
            },
            created_at: Utc::now(),
        }
    }

    /// Append an entry as part of a mutation's unit of work
    pub async fn record(
        &self,
        message: &str,
        actor: &Actor,
        category: &str,
    ) -> StoreResult<AuditLogEntry> {
        let entry = self
            .store
            .append_audit(Self::entry(message, actor, category))
            .await?;
        debug!(actor = %actor.id, category = %entry.category, message, "Audit entry recorded");
        Ok(entry)
    }

    /// Best-effort append; failures are logged and dropped
    pub async fn try_record(
        &self,
        message: &str,
        actor: &Actor,
        category: &str,
    ) -> Option<AuditLogEntry> {
        match self.record(message, actor, category).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, actor = %actor.id, "Dropping freeform audit entry");
                None
            }
        }
    }

    /// Clamp a caller-supplied limit to `1..=max_limit`
    pub fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }

    /// Newest entries first
    pub async fn recent(&self, limit: Option<usize>) -> StoreResult<Vec<AuditLogEntry>> {
        self.store.recent_audit(self.clamp_limit(limit)).await
    }
}
