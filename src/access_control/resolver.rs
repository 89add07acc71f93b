//! Access control resolver
//!
//! Resolves an actor's effective permission level for an area with the
//! following precedence (highest to lowest):
//! 1. Role `SUPER_ADMIN` (always `full`, stored overrides are ignored)
//! 2. Per-user override for the area
//! 3. Role default from the current policy matrix
//! 4. Built-in role default for well-known areas (`none` otherwise)
//!
//! No actor at all resolves to `none`.

use crate::access_control::defaults::{default_policy, fallback_level};
use crate::access_control::types::{Actor, Area, PermissionLevel, Role};
use crate::error::{AccessDeniedError, GovernanceResult, StoreResult};
use crate::store::PolicyStore;
use crate::store::documents::PolicyDocument;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access is allowed
    Allowed,
    /// Access is denied with a reason
    Denied(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied(_))
    }
}

/// Effective level of `actor` on `area` under `policy`
pub fn resolve_level(actor: Option<&Actor>, area: &Area, policy: &PolicyDocument) -> PermissionLevel {
    let Some(actor) = actor else {
        trace!(area = %area, "No actor, resolving to none");
        return PermissionLevel::None;
    };

    if actor.role == Role::SuperAdmin {
        return PermissionLevel::Full;
    }

    if let Some(level) = actor.permissions.get(area) {
        trace!(area = %area, level = %level, "Matched user override");
        return *level;
    }

    if let Some(level) = policy.default_level(actor.role, area) {
        trace!(area = %area, level = %level, "Using matrix role default");
        return level;
    }

    let level = fallback_level(actor.role, area);
    trace!(area = %area, level = %level, "Area not in matrix, using built-in default");
    level
}

/// Whether `actor` holds at least `required` on `area`
pub fn is_allowed(
    actor: Option<&Actor>,
    area: &Area,
    required: PermissionLevel,
    policy: &PolicyDocument,
) -> bool {
    resolve_level(actor, area, policy).satisfies(required)
}

/// Access control resolver
///
/// Evaluates requests against the policy currently held by the store. The
/// policy is read fresh for every check so matrix edits apply immediately.
pub struct AccessResolver {
    policies: Arc<dyn PolicyStore>,
}

impl AccessResolver {
    pub fn new(policies: Arc<dyn PolicyStore>) -> Self {
        Self { policies }
    }

    async fn current_policy(&self) -> StoreResult<PolicyDocument> {
        self.policies.load_policy_or_init(default_policy()).await
    }

    /// Effective level of `actor` on `area`
    pub async fn level_for(&self, actor: &Actor, area: &Area) -> StoreResult<PermissionLevel> {
        let policy = self.current_policy().await?;
        Ok(resolve_level(Some(actor), area, &policy))
    }

    /// Check whether `actor` may act on `area` at `required` level
    pub async fn check(
        &self,
        actor: &Actor,
        area: &Area,
        required: PermissionLevel,
    ) -> StoreResult<AccessDecision> {
        let level = self.level_for(actor, area).await?;
        debug!(
            actor = %actor.id,
            role = %actor.role,
            area = %area,
            required = %required,
            level = %level,
            "Checking access"
        );

        if level.satisfies(required) {
            Ok(AccessDecision::Allowed)
        } else {
            Ok(AccessDecision::Denied(
                AccessDeniedError::insufficient(area, required, level).reason,
            ))
        }
    }

    /// Check access, returning an error if denied
    pub async fn require(
        &self,
        actor: &Actor,
        area: &Area,
        required: PermissionLevel,
    ) -> GovernanceResult<()> {
        match self.check(actor, area, required).await? {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(reason) => {
                debug!(actor = %actor.id, area = %area, %reason, "Access denied");
                Err(AccessDeniedError::new(area.as_str(), reason).into())
            }
        }
    }

    /// Effective level for every area of the current matrix
    pub async fn effective_levels(
        &self,
        actor: &Actor,
    ) -> StoreResult<BTreeMap<Area, PermissionLevel>> {
        let policy = self.current_policy().await?;
        Ok(policy
            .areas()
            .map(|area| (area.clone(), resolve_level(Some(actor), area, &policy)))
            .collect())
    }
}
