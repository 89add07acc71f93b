//! Governance services
//!
//! Policy, overrides, approvals, emergency access, audit and notifications,
//! wired over the store ports. Every mutation writes its primary document
//! first and its audit entry last; if the primary write fails nothing is
//! audited.

pub mod approvals;
pub mod audit;
pub mod emergency;
pub mod grants;
pub mod notifications;
pub mod overrides;
pub mod policy;

pub use approvals::{ApprovalService, ApprovalUpdate, DerivedGrant, NewApprovalRequest};
pub use audit::{
    AuditLog, CATEGORY_APPROVALS, CATEGORY_EMERGENCY, CATEGORY_GENERAL, CATEGORY_PERMISSIONS,
};
pub use emergency::{EmergencyAction, EmergencyActionInput, EmergencyService, EmergencyView};
pub use grants::{GrantRule, GrantRules};
pub use notifications::{Notifier, Recipient};
pub use overrides::{OverrideService, parse_permission_map};
pub use policy::{MatrixRowInput, PolicyService, PolicyUpdate, PolicyUpdateOutcome, validate_matrix};

use crate::access_control::{AccessResolver, Role};
use crate::config::{GovernanceConfig, UserSeed};
use crate::error::{ConfigError, GovernanceResult};
use crate::store::{Stores, User};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;

/// Result of the startup bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    pub users_created: usize,
    pub users_reseeded: usize,
}

/// Convert a configured seed into a user document
pub fn user_from_seed(seed: &UserSeed) -> GovernanceResult<User> {
    Ok(User {
        id: seed.id.trim().to_string(),
        email: seed.email.trim().to_string(),
        name: seed.name.clone(),
        role: Role::decode(&seed.role),
        permissions: parse_permission_map(&seed.permissions)?,
    })
}

/// Every governance service, sharing one set of stores
#[derive(Clone)]
pub struct Governance {
    pub access: Arc<AccessResolver>,
    pub audit: Arc<AuditLog>,
    pub notifier: Arc<Notifier>,
    pub overrides: Arc<OverrideService>,
    pub policy: Arc<PolicyService>,
    pub approvals: Arc<ApprovalService>,
    pub emergency: Arc<EmergencyService>,
}

impl Governance {
    pub fn new(stores: &Stores, config: &GovernanceConfig) -> Result<Self, ConfigError> {
        let grants = GrantRules::from_config(&config.grant_rules)?;

        let access = Arc::new(AccessResolver::new(stores.policies.clone()));
        let audit = Arc::new(AuditLog::new(
            stores.audit.clone(),
            config.audit_default_limit,
            config.audit_max_limit,
        ));
        let notifier = Arc::new(Notifier::new(stores.notifications.clone()));
        let overrides = Arc::new(OverrideService::new(stores.users.clone(), audit.clone()));
        let policy = Arc::new(PolicyService::new(
            stores.policies.clone(),
            overrides.clone(),
            audit.clone(),
        ));
        let approvals = Arc::new(ApprovalService::new(
            stores.approvals.clone(),
            access.clone(),
            overrides.clone(),
            notifier.clone(),
            audit.clone(),
            grants,
        ));
        let emergency = Arc::new(EmergencyService::new(
            stores.emergency.clone(),
            audit.clone(),
            Duration::minutes(config.emergency_window_minutes),
        ));

        Ok(Self {
            access,
            audit,
            notifier,
            overrides,
            policy,
            approvals,
            emergency,
        })
    }

    /// Run once at startup: create the policy singleton, insert missing
    /// seed users, then fill every empty override map from the matrix.
    pub async fn bootstrap(&self, seeds: &[UserSeed]) -> GovernanceResult<BootstrapReport> {
        let policy = self.policy.get_policy().await?;

        let users = seeds
            .iter()
            .map(user_from_seed)
            .collect::<GovernanceResult<Vec<_>>>()?;
        let users_created = self.overrides.ensure_users(users).await?;
        let users_reseeded = self.overrides.reseed_empty(&policy).await?;

        info!(
            areas = policy.matrix.len(),
            users_created, users_reseeded, "Governance bootstrap complete"
        );
        Ok(BootstrapReport {
            users_created,
            users_reseeded,
        })
    }
}
