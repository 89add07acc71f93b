//! In-process document store
//!
//! All collections live behind a single `RwLock`. The lock is never held
//! across an `.await`. With a snapshot configured, writers queue on a
//! separate gate, mutate a staged copy and publish it only once it is on
//! disk, so a failed write leaves the live state untouched.

use crate::access_control::{Area, PermissionLevel, PermissionMap, Role};
use crate::error::{StoreError, StoreResult};
use crate::store::documents::{
    ApprovalRequest, ApprovalStatus, AuditLogEntry, EmergencyAccess, Notification, PolicyDocument,
    User,
};
use crate::store::snapshot::SnapshotWriter;
use crate::store::{
    ApprovalStore, AuditStore, EmergencyStore, NotificationStore, PolicyStore, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Every collection, as persisted in a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Collections {
    /// Bumped on every mutation
    pub generation: u64,
    pub policy: Option<PolicyDocument>,
    pub emergency: Option<EmergencyAccess>,
    pub users: BTreeMap<String, User>,
    /// Insertion order
    pub approvals: Vec<ApprovalRequest>,
    /// Append order
    pub audit: Vec<AuditLogEntry>,
    pub notifications: Vec<Notification>,
}

pub struct MemoryStore {
    data: RwLock<Collections>,
    snapshot: Option<SnapshotWriter>,
    /// Serialises snapshot-backed writers
    writers: Mutex<()>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_collections(Collections::default(), None)
    }

    /// Store backed by a JSON snapshot at `path`, loading it if present
    pub fn with_snapshot(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let writer = SnapshotWriter::new(path);
        let data = writer.load()?.unwrap_or_default();
        info!(
            path = %writer.path().display(),
            generation = data.generation,
            users = data.users.len(),
            approvals = data.approvals.len(),
            audit = data.audit.len(),
            "Opened snapshot store"
        );
        Ok(Self::from_collections(data, Some(writer)))
    }

    fn from_collections(data: Collections, snapshot: Option<SnapshotWriter>) -> Self {
        Self {
            data: RwLock::new(data),
            snapshot,
            writers: Mutex::new(()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability. While unavailable every operation fails with
    /// `StoreError::Unavailable`; used to exercise outage handling.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("document store is offline".into()))
        }
    }

    // Poisoned locks are recovered rather than propagated.

    fn read_data(&self) -> RwLockReadGuard<'_, Collections> {
        self.data.read().unwrap_or_else(|poisoned| {
            tracing::warn!("store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, Collections> {
        self.data.write().unwrap_or_else(|poisoned| {
            tracing::warn!("store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> StoreResult<T> {
        self.ensure_available()?;
        Ok(f(&self.read_data()))
    }

    /// Apply a mutation. The closure reports whether it changed anything;
    /// only changes bump the generation and reach the snapshot.
    async fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Collections) -> (T, bool) + Send,
        T: Send,
    {
        self.ensure_available()?;
        let Some(writer) = &self.snapshot else {
            let mut data = self.write_data();
            let (out, changed) = f(&mut data);
            if changed {
                data.generation += 1;
            }
            return Ok(out);
        };

        let _gate = self.writers.lock().await;
        let mut staged = self.read_data().clone();
        let (out, changed) = f(&mut staged);
        if changed {
            staged.generation += 1;
            writer.persist(&staged).await?;
            *self.write_data() = staged;
        }
        Ok(out)
    }

    /// Copy of every collection
    pub fn collections(&self) -> Collections {
        self.read_data().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn load_policy_or_init(&self, default: PolicyDocument) -> StoreResult<PolicyDocument> {
        if let Some(policy) = self.read(|data| data.policy.clone())? {
            return Ok(policy);
        }
        self.write(move |data| match &data.policy {
            Some(existing) => (existing.clone(), false),
            None => {
                debug!("Creating default permission policy");
                data.policy = Some(default.clone());
                (default, true)
            }
        })
        .await
    }

    async fn save_policy(&self, policy: PolicyDocument) -> StoreResult<PolicyDocument> {
        self.write(move |data| {
            data.policy = Some(policy.clone());
            (policy, true)
        })
        .await
    }
}

#[async_trait]
impl EmergencyStore for MemoryStore {
    async fn load_emergency_or_init(&self) -> StoreResult<EmergencyAccess> {
        if let Some(state) = self.read(|data| data.emergency.clone())? {
            return Ok(state);
        }
        self.write(|data| match &data.emergency {
            Some(existing) => (existing.clone(), false),
            None => {
                let state = EmergencyAccess::default();
                data.emergency = Some(state.clone());
                (state, true)
            }
        })
        .await
    }

    async fn save_emergency(&self, state: EmergencyAccess) -> StoreResult<EmergencyAccess> {
        self.write(move |data| {
            data.emergency = Some(state.clone());
            (state, true)
        })
        .await
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert_approval(&self, approval: ApprovalRequest) -> StoreResult<ApprovalRequest> {
        self.write(move |data| {
            data.approvals.push(approval.clone());
            (approval, true)
        })
        .await
    }

    async fn list_approvals(&self) -> StoreResult<Vec<ApprovalRequest>> {
        self.read(|data| data.approvals.iter().rev().cloned().collect())
    }

    async fn set_approval_status(
        &self,
        ids: &[String],
        status: ApprovalStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(ApprovalStatus, ApprovalRequest)>> {
        self.write(move |data| {
            let updated: Vec<_> = data
                .approvals
                .iter_mut()
                .filter(|a| ids.contains(&a.id))
                .map(|a| {
                    let previous = a.status;
                    a.status = status;
                    a.updated_at = now;
                    (previous, a.clone())
                })
                .collect();
            let changed = !updated.is_empty();
            (updated, changed)
        })
        .await
    }

    async fn delete_approval(&self, id: &str) -> StoreResult<Option<ApprovalRequest>> {
        self.write(move |data| {
            match data.approvals.iter().position(|a| a.id == id) {
                Some(index) => (Some(data.approvals.remove(index)), true),
                None => (None, false),
            }
        })
        .await
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: AuditLogEntry) -> StoreResult<AuditLogEntry> {
        self.write(move |data| {
            data.audit.push(entry.clone());
            (entry, true)
        })
        .await
    }

    async fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        self.read(|data| data.audit.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.read(|data| data.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|data| data.users.values().find(|u| u.email_matches(email)).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.read(|data| data.users.values().cloned().collect())
    }

    async fn save_user(&self, user: User) -> StoreResult<User> {
        self.write(move |data| {
            data.users.insert(user.id.clone(), user.clone());
            (user, true)
        })
        .await
    }

    async fn seed_permissions_if_empty(
        &self,
        id: &str,
        defaults: PermissionMap,
    ) -> StoreResult<bool> {
        self.write(move |data| match data.users.get_mut(id) {
            Some(user) if user.permissions.is_empty() && !defaults.is_empty() => {
                user.permissions = defaults;
                (true, true)
            }
            _ => (false, false),
        })
        .await
    }

    async fn set_permission(
        &self,
        id: &str,
        area: Area,
        level: PermissionLevel,
    ) -> StoreResult<Option<User>> {
        self.write(move |data| match data.users.get_mut(id) {
            Some(user) => {
                let changed = user.permissions.insert(area, level) != Some(level);
                (Some(user.clone()), changed)
            }
            None => (None, false),
        })
        .await
    }

    async fn replace_permissions(
        &self,
        id: &str,
        permissions: PermissionMap,
    ) -> StoreResult<Option<User>> {
        self.write(move |data| match data.users.get_mut(id) {
            Some(user) => {
                user.permissions = permissions;
                (Some(user.clone()), true)
            }
            None => (None, false),
        })
        .await
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> StoreResult<Notification> {
        self.write(move |data| {
            data.notifications.push(notification.clone());
            (notification, true)
        })
        .await
    }

    async fn notifications_for(&self, user_id: &str, role: Role) -> StoreResult<Vec<Notification>> {
        self.read(|data| {
            data.notifications
                .iter()
                .rev()
                .filter(|n| n.user_id.as_deref() == Some(user_id) || n.role == Some(role))
                .cloned()
                .collect()
        })
    }

    async fn find_notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        self.read(|data| data.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn mark_notification_read(&self, id: &str) -> StoreResult<Option<Notification>> {
        self.write(move |data| {
            match data.notifications.iter_mut().find(|n| n.id == id) {
                Some(n) => {
                    let changed = !n.read;
                    n.read = true;
                    (Some(n.clone()), changed)
                }
                None => (None, false),
            }
        })
        .await
    }
}
