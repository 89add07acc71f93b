//! Per-user permission overrides
//!
//! Overrides are a sparse map from area to level. A user whose map is
//! entirely empty gets seeded with their role's matrix defaults whenever the
//! policy changes (and once at startup); anyone with at least one entry is
//! left alone.

use crate::access_control::{Actor, Area, PermissionLevel, PermissionMap};
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::governance::audit::{AuditLog, CATEGORY_PERMISSIONS};
use crate::store::{PolicyDocument, User, UserStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Parse an override map from the wire. Levels are strict here; the lenient
/// decode only applies to data already in the store.
pub fn parse_permission_map(input: &BTreeMap<String, String>) -> GovernanceResult<PermissionMap> {
    input
        .iter()
        .map(|(area, level)| {
            let label = area.trim();
            if label.is_empty() {
                return Err(GovernanceError::validation("area names must not be empty"));
            }
            let level = PermissionLevel::try_parse(level.trim()).ok_or_else(|| {
                GovernanceError::validation(format!(
                    "unknown permission level '{}' for area '{}'",
                    level, label
                ))
            })?;
            Ok((Area::new(label), level))
        })
        .collect()
}

pub struct OverrideService {
    users: Arc<dyn UserStore>,
    audit: Arc<AuditLog>,
}

impl OverrideService {
    pub fn new(users: Arc<dyn UserStore>, audit: Arc<AuditLog>) -> Self {
        Self { users, audit }
    }

    /// Seed every user whose override map is empty with their role defaults
    /// from `policy`. Safe to repeat.
    #[instrument(skip_all)]
    pub async fn reseed_empty(&self, policy: &PolicyDocument) -> StoreResult<usize> {
        let mut seeded = 0;
        for user in self.users.list_users().await? {
            if !user.permissions.is_empty() {
                continue;
            }
            let defaults = policy.role_defaults(user.role);
            if self
                .users
                .seed_permissions_if_empty(&user.id, defaults)
                .await?
            {
                debug!(user = %user.id, role = %user.role, "Seeded role defaults");
                seeded += 1;
            }
        }
        if seeded > 0 {
            info!(seeded, "Re-seeded users with empty permissions");
        }
        Ok(seeded)
    }

    /// Insert users that do not exist yet; existing documents are kept
    pub async fn ensure_users(&self, users: Vec<User>) -> StoreResult<usize> {
        let mut created = 0;
        for user in users {
            if self.users.find_user(&user.id).await?.is_none() {
                debug!(user = %user.id, role = %user.role, "Seeding user");
                self.users.save_user(user).await?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Resolve a requester by id, else by email
    pub async fn find_requester(
        &self,
        id: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        if let Some(id) = id.filter(|id| !id.is_empty())
            && let Some(user) = self.users.find_user(id).await?
        {
            return Ok(Some(user));
        }
        match email.filter(|e| !e.trim().is_empty()) {
            Some(email) => self.users.find_user_by_email(email).await,
            None => Ok(None),
        }
    }

    /// Upsert one override without auditing
    pub async fn grant(
        &self,
        user_id: &str,
        area: Area,
        level: PermissionLevel,
    ) -> StoreResult<Option<User>> {
        self.users.set_permission(user_id, area, level).await
    }

    pub async fn get_user(&self, id: &str) -> GovernanceResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", id))
    }

    /// Replace a user's override map wholesale
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn replace_permissions(
        &self,
        actor: &Actor,
        user_id: &str,
        input: &BTreeMap<String, String>,
    ) -> GovernanceResult<User> {
        let permissions = parse_permission_map(input)?;
        let user = self
            .users
            .replace_permissions(user_id, permissions)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", user_id))?;

        let subject = if user.email.is_empty() {
            &user.id
        } else {
            &user.email
        };
        self.audit
            .record(
                &format!("Updated permissions for {}.", subject),
                actor,
                CATEGORY_PERMISSIONS,
            )
            .await?;
        info!(user = %user.id, overrides = user.permissions.len(), "Replaced user permissions");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::{Role, default_policy};
    use crate::store::{AuditStore, MemoryStore};

    fn service(store: Arc<MemoryStore>) -> OverrideService {
        let audit = Arc::new(AuditLog::new(store.clone(), 50, 200));
        OverrideService::new(store, audit)
    }

    fn user(id: &str, email: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: email.into(),
            name: None,
            role,
            permissions: PermissionMap::new(),
        }
    }

    #[test]
    fn test_parse_permission_map() {
        let mut input = BTreeMap::new();
        input.insert("Pricing & billing".to_string(), "read".to_string());
        let map = parse_permission_map(&input).unwrap();
        assert_eq!(map.get(&Area::PRICING), Some(&PermissionLevel::Read));

        input.insert("Certificates".to_string(), "owner".to_string());
        assert!(matches!(
            parse_permission_map(&input),
            Err(GovernanceError::Validation(_))
        ));

        let mut blank = BTreeMap::new();
        blank.insert(" ".to_string(), "read".to_string());
        assert!(parse_permission_map(&blank).is_err());
    }

    #[tokio::test]
    async fn test_find_requester_falls_back_to_email() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store);
        svc.ensure_users(vec![user("g", "G@example.com", Role::Guest)])
            .await
            .unwrap();

        let by_id = svc.find_requester(Some("g"), None).await.unwrap();
        assert_eq!(by_id.map(|u| u.id), Some("g".to_string()));

        let by_email = svc
            .find_requester(Some("stale-id"), Some("g@example.com"))
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some("g".to_string()));

        assert!(svc.find_requester(None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reseed_skips_customised_users() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let mut custom = user("v", "v@example.com", Role::Admin);
        custom.permissions.insert(Area::PRICING, PermissionLevel::Read);
        svc.ensure_users(vec![user("u", "u@example.com", Role::Admin), custom])
            .await
            .unwrap();

        let policy = default_policy();
        assert_eq!(svc.reseed_empty(&policy).await.unwrap(), 1);
        assert_eq!(svc.reseed_empty(&policy).await.unwrap(), 0);

        let u = svc.get_user("u").await.unwrap();
        assert_eq!(u.permissions, policy.role_defaults(Role::Admin));
        let v = svc.get_user("v").await.unwrap();
        assert_eq!(v.permissions.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_permissions_audits() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        svc.ensure_users(vec![user("g", "g@example.com", Role::Guest)])
            .await
            .unwrap();
        let admin = Actor::new("a", "a@example.com", Role::Admin);

        let mut input = BTreeMap::new();
        input.insert("Certificates".to_string(), "manage".to_string());
        let updated = svc.replace_permissions(&admin, "g", &input).await.unwrap();
        assert_eq!(
            updated.permissions.get(&Area::CERTIFICATES),
            Some(&PermissionLevel::Manage)
        );

        let audit = store.recent_audit(10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].message, "Updated permissions for g@example.com.");

        assert!(matches!(
            svc.replace_permissions(&admin, "nobody", &input).await,
            Err(GovernanceError::NotFound { .. })
        ));
        assert_eq!(store.recent_audit(10).await.unwrap().len(), 1);
    }
}
