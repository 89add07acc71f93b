//! Emergency access lock
//!
//! A singleton with two states, `enforced` and `override_requested`.
//! Requesting an override opens (or renews) a fixed window; cancelling
//! returns to `enforced` from either state. The window end is advisory:
//! nothing flips the state back when it passes, readers just see `expired`.

use crate::access_control::Actor;
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::governance::audit::{AuditLog, CATEGORY_EMERGENCY};
use crate::store::{EmergencyAccess, EmergencyStore};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Emergency state plus the computed expiry flag
#[derive(Debug, Clone, Serialize)]
pub struct EmergencyView {
    pub emergency: EmergencyAccess,
    pub expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyAction {
    Request,
    Cancel,
}

impl EmergencyAction {
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim() {
            "request" => Some(Self::Request),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Body of `POST /permissions/emergency`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmergencyActionInput {
    pub action: Option<String>,
}

impl EmergencyActionInput {
    pub fn parse(&self) -> GovernanceResult<EmergencyAction> {
        let raw = self
            .action
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| GovernanceError::missing_field("action"))?;
        EmergencyAction::try_parse(raw).ok_or_else(|| {
            GovernanceError::validation(format!(
                "action must be 'request' or 'cancel', got '{}'",
                raw
            ))
        })
    }
}

pub struct EmergencyService {
    store: Arc<dyn EmergencyStore>,
    audit: Arc<AuditLog>,
    window: Duration,
}

impl EmergencyService {
    pub fn new(store: Arc<dyn EmergencyStore>, audit: Arc<AuditLog>, window: Duration) -> Self {
        Self {
            store,
            audit,
            window,
        }
    }

    pub async fn get(&self) -> StoreResult<EmergencyView> {
        let emergency = self.store.load_emergency_or_init().await?;
        let expired = emergency.is_expired(Utc::now());
        Ok(EmergencyView { emergency, expired })
    }

    /// Open the override window, renewing it if already open
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn request_override(&self, actor: &Actor) -> GovernanceResult<EmergencyView> {
        let mut state = self.store.load_emergency_or_init().await?;
        let now = Utc::now();
        state.request_override(&actor.id, now, self.window);
        let state = self.store.save_emergency(state).await?;

        self.audit
            .record("Requested emergency override.", actor, CATEGORY_EMERGENCY)
            .await?;

        info!(expires_at = ?state.expires_at, "Emergency override requested");
        Ok(EmergencyView {
            expired: state.is_expired(now),
            emergency: state,
        })
    }

    /// Return to `enforced`; valid from either state
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_override(&self, actor: &Actor) -> GovernanceResult<EmergencyView> {
        let mut state = self.store.load_emergency_or_init().await?;
        state.enforce(Utc::now());
        let state = self.store.save_emergency(state).await?;

        self.audit
            .record("Cancelled emergency override.", actor, CATEGORY_EMERGENCY)
            .await?;

        info!("Emergency override cancelled");
        Ok(EmergencyView {
            emergency: state,
            expired: false,
        })
    }

    pub async fn apply(
        &self,
        actor: &Actor,
        action: EmergencyAction,
    ) -> GovernanceResult<EmergencyView> {
        match action {
            EmergencyAction::Request => self.request_override(actor).await,
            EmergencyAction::Cancel => self.cancel_override(actor).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::Role;
    use crate::store::{AuditStore, EmergencyStatus, MemoryStore};

    fn service(store: Arc<MemoryStore>) -> EmergencyService {
        let audit = Arc::new(AuditLog::new(store.clone(), 50, 200));
        EmergencyService::new(store, audit, Duration::minutes(60))
    }

    #[test]
    fn test_parse_action() {
        let input = EmergencyActionInput {
            action: Some("request".into()),
        };
        assert_eq!(input.parse().unwrap(), EmergencyAction::Request);

        let bogus = EmergencyActionInput {
            action: Some("unlock".into()),
        };
        assert!(matches!(bogus.parse(), Err(GovernanceError::Validation(_))));
        assert!(EmergencyActionInput::default().parse().is_err());
    }

    #[tokio::test]
    async fn test_default_is_enforced() {
        let svc = service(Arc::new(MemoryStore::new()));
        let view = svc.get().await.unwrap();
        assert_eq!(view.emergency.status, EmergencyStatus::Enforced);
        assert!(!view.expired);
    }

    #[tokio::test]
    async fn test_failed_save_writes_no_audit() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let root = Actor::new("root", "root@example.com", Role::SuperAdmin);

        store.set_available(false);
        assert!(matches!(
            svc.request_override(&root).await,
            Err(GovernanceError::Store(_))
        ));
        store.set_available(true);
        assert!(store.recent_audit(10).await.unwrap().is_empty());
    }
}
