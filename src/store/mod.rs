//! Document store
//!
//! Repository ports for every persisted collection, and an in-process
//! implementation with optional JSON snapshot persistence.
//!
//! Every write touches a single document; there are no multi-document
//! transactions. Concurrent writers to a singleton are last-write-wins.

pub mod documents;
pub mod memory;
pub mod snapshot;

pub use documents::{
    ApprovalRequest, ApprovalStatus, AuditLogEntry, EmergencyAccess, EmergencyStatus, Guardrail,
    MatrixRow, Notification, NotificationKind, PolicyDocument, RoleCard, User,
};
pub use memory::MemoryStore;
pub use snapshot::SnapshotWriter;

use crate::access_control::{Area, PermissionLevel, PermissionMap};
use crate::error::StoreResult;
use chrono::{DateTime, Utc};
// async_trait required for dyn-compatibility with Arc<dyn ...Store>
use async_trait::async_trait;
use std::sync::Arc;

/// Policy singleton
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load the policy, atomically inserting `default` if none exists
    async fn load_policy_or_init(&self, default: PolicyDocument) -> StoreResult<PolicyDocument>;

    /// Replace the stored policy
    async fn save_policy(&self, policy: PolicyDocument) -> StoreResult<PolicyDocument>;
}

/// Emergency access singleton
#[async_trait]
pub trait EmergencyStore: Send + Sync {
    /// Load the emergency state, inserting the `enforced` default if absent
    async fn load_emergency_or_init(&self) -> StoreResult<EmergencyAccess>;

    async fn save_emergency(&self, state: EmergencyAccess) -> StoreResult<EmergencyAccess>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert_approval(&self, approval: ApprovalRequest) -> StoreResult<ApprovalRequest>;

    /// All requests, newest first
    async fn list_approvals(&self) -> StoreResult<Vec<ApprovalRequest>>;

    /// Set `status` on every request whose id is in `ids`.
    ///
    /// Returns each updated request paired with its previous status. Unknown
    /// ids are ignored.
    async fn set_approval_status(
        &self,
        ids: &[String],
        status: ApprovalStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(ApprovalStatus, ApprovalRequest)>>;

    async fn delete_approval(&self, id: &str) -> StoreResult<Option<ApprovalRequest>>;
}

/// Append-only audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: AuditLogEntry) -> StoreResult<AuditLogEntry>;

    /// Up to `limit` entries, newest first
    async fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>>;
}

/// Externally owned users; governance only reads them and edits permissions
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Insert or replace a whole user document
    async fn save_user(&self, user: User) -> StoreResult<User>;

    /// Replace the permissions of `id` only if its map is currently empty.
    /// Returns whether the write happened.
    async fn seed_permissions_if_empty(&self, id: &str, defaults: PermissionMap)
    -> StoreResult<bool>;

    /// Upsert a single override. Returns the updated user, if it exists.
    async fn set_permission(
        &self,
        id: &str,
        area: Area,
        level: PermissionLevel,
    ) -> StoreResult<Option<User>>;

    /// Replace the whole override map. Returns the updated user, if it exists.
    async fn replace_permissions(
        &self,
        id: &str,
        permissions: PermissionMap,
    ) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> StoreResult<Notification>;

    /// Notifications addressed to the user id or the role, newest first
    async fn notifications_for(
        &self,
        user_id: &str,
        role: crate::access_control::Role,
    ) -> StoreResult<Vec<Notification>>;

    async fn find_notification(&self, id: &str) -> StoreResult<Option<Notification>>;

    async fn mark_notification_read(&self, id: &str) -> StoreResult<Option<Notification>>;
}

/// Handles to every store port
#[derive(Clone)]
pub struct Stores {
    pub policies: Arc<dyn PolicyStore>,
    pub emergency: Arc<dyn EmergencyStore>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub audit: Arc<dyn AuditStore>,
    pub users: Arc<dyn UserStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Use one backend for every port
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PolicyStore
            + EmergencyStore
            + ApprovalStore
            + AuditStore
            + UserStore
            + NotificationStore
            + 'static,
    {
        Self {
            policies: store.clone(),
            emergency: store.clone(),
            approvals: store.clone(),
            audit: store.clone(),
            users: store.clone(),
            notifications: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()))
    }
}
