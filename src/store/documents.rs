//! Persisted document types
//!
//! One policy document and one emergency document (singletons), plus
//! collections of users, approval requests, audit entries and notifications.
//! Documents reference each other by string id or email only.

use crate::access_control::{Actor, Area, PermissionLevel, PermissionMap, Role};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Well-known key of the policy singleton
pub const POLICY_DOCUMENT_ID: &str = "permission-policy";

/// Well-known key of the emergency singleton
pub const EMERGENCY_DOCUMENT_ID: &str = "emergency-access";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Presentation card describing a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCard {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub badge: String,
    #[serde(default)]
    pub perks: Vec<String>,
}

/// Presentation guardrail shown next to the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrail {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One area row of the permission matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub area: Area,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub super_admin: PermissionLevel,
    #[serde(default)]
    pub admin: PermissionLevel,
    #[serde(default)]
    pub guest: PermissionLevel,
}

impl MatrixRow {
    pub fn level_for(&self, role: Role) -> PermissionLevel {
        match role {
            Role::SuperAdmin => self.super_admin,
            Role::Admin => self.admin,
            Role::Guest => self.guest,
        }
    }
}

/// The permission policy singleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub id: String,
    #[serde(default)]
    pub role_cards: Vec<RoleCard>,
    #[serde(default)]
    pub guardrails: Vec<Guardrail>,
    #[serde(default)]
    pub matrix: Vec<MatrixRow>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl PolicyDocument {
    pub fn row(&self, area: &Area) -> Option<&MatrixRow> {
        self.matrix.iter().find(|row| &row.area == area)
    }

    /// Matrix default for `role` on `area`, if the matrix has that row
    pub fn default_level(&self, role: Role, area: &Area) -> Option<PermissionLevel> {
        self.row(area).map(|row| row.level_for(role))
    }

    /// Full override map a fresh user of `role` is seeded with
    pub fn role_defaults(&self, role: Role) -> PermissionMap {
        self.matrix
            .iter()
            .map(|row| (row.area.clone(), row.level_for(role)))
            .collect()
    }

    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.matrix.iter().map(|row| &row.area)
    }
}

/// Externally owned account; only `permissions` is written by governance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub permissions: PermissionMap,
}

impl User {
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
        }
    }

    pub fn email_matches(&self, email: &str) -> bool {
        !email.trim().is_empty() && self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Approval request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApprovalStatus {
    #[default]
    Waiting,
    /// Escalated to a super admin. No operation sets this yet.
    NeedsSuper,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Waiting => "waiting",
            ApprovalStatus::NeedsSuper => "needsSuper",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim() {
            "waiting" => Some(ApprovalStatus::Waiting),
            "needsSuper" => Some(ApprovalStatus::NeedsSuper),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub title: String,
    /// Display string of the requester (email or name)
    pub requester: String,
    #[serde(default)]
    pub requester_id: Option<String>,
    #[serde(default)]
    pub requester_email: Option<String>,
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default)]
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// Whether this request was filed by `actor` (id, else case-insensitive email)
    pub fn is_requested_by(&self, actor: &Actor) -> bool {
        if self.requester_id.as_deref() == Some(actor.id.as_str()) {
            return true;
        }
        if actor.email.trim().is_empty() {
            return false;
        }
        let email = actor.email.trim();
        self.requester_email
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case(email))
            || self.requester.trim().eq_ignore_ascii_case(email)
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub message: String,
    pub actor_id: String,
    #[serde(default)]
    pub actor_email: String,
    pub actor_role: Role,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    #[default]
    Enforced,
    OverrideRequested,
}

/// Emergency access singleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAccess {
    pub id: String,
    #[serde(default)]
    pub status: EmergencyStatus,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for EmergencyAccess {
    fn default() -> Self {
        Self {
            id: EMERGENCY_DOCUMENT_ID.to_string(),
            status: EmergencyStatus::Enforced,
            requested_by: None,
            requested_at: None,
            expires_at: None,
            updated_at: None,
        }
    }
}

impl EmergencyAccess {
    /// Enter (or renew) the override window
    pub fn request_override(&mut self, actor_id: &str, now: DateTime<Utc>, window: Duration) {
        self.status = EmergencyStatus::OverrideRequested;
        self.requested_by = Some(actor_id.to_string());
        self.requested_at = Some(now);
        self.expires_at = Some(now + window);
        self.updated_at = Some(now);
    }

    /// Return to `enforced`, clearing the request stamp
    pub fn enforce(&mut self, now: DateTime<Utc>) {
        self.status = EmergencyStatus::Enforced;
        self.requested_by = None;
        self.requested_at = None;
        self.expires_at = None;
        self.updated_at = Some(now);
    }

    /// Advisory only; the stored status is not changed by expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == EmergencyStatus::OverrideRequested
            && self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApprovalRequest,
    ApprovalUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_addressed_to(&self, actor: &Actor) -> bool {
        self.user_id.as_deref() == Some(actor.id.as_str()) || self.role == Some(actor.role)
    }
}
