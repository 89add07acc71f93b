//! Approval workflow
//!
//! ```text
//! waiting ──► approved | rejected
//!    │
//!    └──► needsSuper ──► approved | rejected
//! ```
//!
//! Requests are created by any authenticated actor, resolved in bulk by an
//! administrator and may be deleted in any state. Approving a request can
//! grant the requester an override (see [`ApprovalService::grant_derived_access`]).

use crate::access_control::{AccessResolver, Actor, Area, PermissionLevel, Role};
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::governance::audit::{AuditLog, CATEGORY_APPROVALS};
use crate::governance::grants::GrantRules;
use crate::governance::notifications::{Notifier, Recipient};
use crate::governance::overrides::OverrideService;
use crate::store::documents::new_id;
use crate::store::{ApprovalRequest, ApprovalStatus, ApprovalStore, NotificationKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewApprovalRequest {
    pub title: Option<String>,
    pub area: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalUpdate {
    #[serde(default)]
    pub ids: Vec<String>,
    pub status: Option<String>,
}

/// An override written as a side effect of an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedGrant {
    pub user_id: String,
    pub area: Area,
    pub level: PermissionLevel,
}

fn parse_status(raw: &str) -> GovernanceResult<ApprovalStatus> {
    ApprovalStatus::try_parse(raw)
        .ok_or_else(|| GovernanceError::validation(format!("unknown approval status '{}'", raw)))
}

pub struct ApprovalService {
    store: Arc<dyn ApprovalStore>,
    access: Arc<AccessResolver>,
    overrides: Arc<OverrideService>,
    notifier: Arc<Notifier>,
    audit: Arc<AuditLog>,
    grants: GrantRules,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        access: Arc<AccessResolver>,
        overrides: Arc<OverrideService>,
        notifier: Arc<Notifier>,
        audit: Arc<AuditLog>,
        grants: GrantRules,
    ) -> Self {
        Self {
            store,
            access,
            overrides,
            notifier,
            audit,
            grants,
        }
    }

    /// File a new request on behalf of `actor`
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: NewApprovalRequest,
    ) -> GovernanceResult<ApprovalRequest> {
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GovernanceError::missing_field("title"))?
            .to_string();
        let status = match input.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_status(raw)?,
            _ => ApprovalStatus::Waiting,
        };
        let area = input
            .area
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(Area::new);

        let now = Utc::now();
        let approval = self
            .store
            .insert_approval(ApprovalRequest {
                id: new_id(),
                title,
                requester: actor.display_name().to_string(),
                requester_id: Some(actor.id.clone()),
                requester_email: Some(actor.email.clone()).filter(|e| !e.is_empty()),
                area,
                status,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.notifier
            .publish(
                Recipient::Role(Role::SuperAdmin),
                NotificationKind::ApprovalRequest,
                "New approval request",
                &format!("{} requested: {}", approval.requester, approval.title),
                Some(&approval.id),
            )
            .await;

        self.audit
            .record(
                &format!("Created approval request: {}.", approval.title),
                actor,
                CATEGORY_APPROVALS,
            )
            .await?;

        info!(approval = %approval.id, status = %approval.status, "Approval request created");
        Ok(approval)
    }

    /// Every request, newest first
    pub async fn list_all(&self) -> StoreResult<Vec<ApprovalRequest>> {
        self.store.list_approvals().await
    }

    /// Requests filed by `actor`, newest first
    pub async fn list_for(&self, actor: &Actor) -> StoreResult<Vec<ApprovalRequest>> {
        Ok(self
            .store
            .list_approvals()
            .await?
            .into_iter()
            .filter(|a| a.is_requested_by(actor))
            .collect())
    }

    /// Set `status` on every listed request.
    ///
    /// Approved requests run the derived-grant step every time (it is
    /// idempotent). Requesters are only notified when their request actually
    /// changed state. One audit entry covers the whole batch.
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        actor: &Actor,
        input: ApprovalUpdate,
    ) -> GovernanceResult<Vec<ApprovalRequest>> {
        let ids: Vec<String> = input
            .ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        if ids.is_empty() {
            return Err(GovernanceError::missing_field("ids"));
        }
        let status = match input.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_status(raw)?,
            _ => return Err(GovernanceError::missing_field("status")),
        };

        let updated = self
            .store
            .set_approval_status(&ids, status, Utc::now())
            .await?;

        for (previous, approval) in &updated {
            if approval.status == ApprovalStatus::Approved {
                self.grant_derived_access(approval).await;
            }
            if *previous != approval.status {
                self.notify_requester(approval).await;
            } else {
                debug!(approval = %approval.id, "Status unchanged, not notifying");
            }
        }

        self.audit
            .record(
                &format!(
                    "Updated {} approval request(s) to {}.",
                    updated.len(),
                    status
                ),
                actor,
                CATEGORY_APPROVALS,
            )
            .await?;

        info!(count = updated.len(), status = %status, "Approval requests updated");
        Ok(updated.into_iter().map(|(_, approval)| approval).collect())
    }

    /// Delete a request regardless of its state
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &Actor, id: &str) -> GovernanceResult<ApprovalRequest> {
        let removed = self
            .store
            .delete_approval(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Approval request", id))?;

        self.audit
            .record(
                &format!("Deleted approval request: {}.", removed.title),
                actor,
                CATEGORY_APPROVALS,
            )
            .await?;

        info!(approval = %removed.id, "Approval request deleted");
        Ok(removed)
    }

    /// Grant the overrides an approved request entitles its requester to.
    ///
    /// Never fails the approval: lookup or write errors are logged and the
    /// grant is skipped. A grant never lowers an existing effective level.
    pub async fn grant_derived_access(&self, approval: &ApprovalRequest) -> Vec<DerivedGrant> {
        let mut granted = Vec::new();
        for rule in self.grants.matching(approval) {
            let email = approval
                .requester_email
                .as_deref()
                .or(Some(approval.requester.as_str()));
            let user = match self
                .overrides
                .find_requester(approval.requester_id.as_deref(), email)
                .await
            {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(approval = %approval.id, "Requester not found, skipping grant");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, approval = %approval.id, "Requester lookup failed, skipping grant");
                    continue;
                }
            };

            match self.access.level_for(&user.to_actor(), &rule.area).await {
                Ok(current) if current.satisfies(rule.level) => {
                    debug!(user = %user.id, area = %rule.area, %current, "Requester already has access");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, user = %user.id, "Level lookup failed, skipping grant");
                    continue;
                }
            }

            match self
                .overrides
                .grant(&user.id, rule.area.clone(), rule.level)
                .await
            {
                Ok(Some(_)) => {
                    info!(user = %user.id, area = %rule.area, level = %rule.level, "Granted derived access");
                    granted.push(DerivedGrant {
                        user_id: user.id.clone(),
                        area: rule.area.clone(),
                        level: rule.level,
                    });
                }
                Ok(None) => warn!(user = %user.id, "Requester vanished before grant"),
                Err(e) => warn!(error = %e, user = %user.id, "Derived grant failed"),
            }
        }
        granted
    }

    async fn notify_requester(&self, approval: &ApprovalRequest) {
        let user_id = match approval.requester_id.clone() {
            Some(id) => Some(id),
            None => self
                .overrides
                .find_requester(None, approval.requester_email.as_deref())
                .await
                .ok()
                .flatten()
                .map(|user| user.id),
        };
        let Some(user_id) = user_id else {
            debug!(approval = %approval.id, "No requester to notify");
            return;
        };

        self.notifier
            .publish(
                Recipient::User(user_id),
                NotificationKind::ApprovalUpdate,
                &format!("Approval request {}", approval.status),
                &format!(
                    "Your request \"{}\" is now {}.",
                    approval.title, approval.status
                ),
                Some(&approval.id),
            )
            .await;
    }
}
