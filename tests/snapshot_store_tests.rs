//! Snapshot persistence tests
//!
//! State written through the services must survive a restart.

use gemvault::access_control::{Area, PermissionLevel};
use gemvault::config::{GovernanceConfig, UserSeed, load_config_from_str};
use gemvault::governance::{ApprovalUpdate, Governance, NewApprovalRequest};
use gemvault::store::{
    AuditStore, EmergencyStatus, EmergencyStore, MemoryStore, Stores, UserStore,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn seeds() -> Vec<UserSeed> {
    ["root:SUPER_ADMIN", "admin:ADMIN", "guest:GUEST"]
        .iter()
        .map(|entry| {
            let (id, role) = entry.split_once(':').unwrap();
            UserSeed {
                id: id.to_string(),
                email: format!("{}@example.com", id),
                name: None,
                role: role.to_string(),
                permissions: BTreeMap::new(),
            }
        })
        .collect()
}

async fn open(path: &Path) -> (Arc<MemoryStore>, Governance) {
    let store = Arc::new(MemoryStore::with_snapshot(path).unwrap());
    let governance =
        Governance::new(&Stores::shared(store.clone()), &GovernanceConfig::default()).unwrap();
    governance.bootstrap(&seeds()).await.unwrap();
    (store, governance)
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("gemvault.json");

    let approval_id = {
        let (store, governance) = open(&path).await;
        let guest = store.find_user("guest").await.unwrap().unwrap().to_actor();
        let admin = store.find_user("admin").await.unwrap().unwrap().to_actor();
        let root = store.find_user("root").await.unwrap().unwrap().to_actor();

        let approval = governance
            .approvals
            .create(
                &guest,
                NewApprovalRequest {
                    title: Some("Request to view buying price".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        governance
            .approvals
            .update(
                &admin,
                ApprovalUpdate {
                    ids: vec![approval.id.clone()],
                    status: Some("approved".into()),
                },
            )
            .await
            .unwrap();
        governance.emergency.request_override(&root).await.unwrap();
        approval.id
    };
    assert!(path.exists());

    let (store, governance) = open(&path).await;

    let approvals = governance.approvals.list_all().await.unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].id, approval_id);

    let guest = store.find_user("guest").await.unwrap().unwrap();
    assert_eq!(guest.permissions[&Area::PRICING], PermissionLevel::Read);

    let emergency = store.load_emergency_or_init().await.unwrap();
    assert_eq!(emergency.status, EmergencyStatus::OverrideRequested);

    let audit = store.recent_audit(200).await.unwrap();
    assert_eq!(audit.len(), 3);
    assert_eq!(audit[0].message, "Requested emergency override.");
}

#[tokio::test]
async fn test_bootstrap_does_not_clobber_saved_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gemvault.json");

    {
        let (store, _) = open(&path).await;
        store
            .set_permission("guest", Area::CERTIFICATES, PermissionLevel::Manage)
            .await
            .unwrap();
    }

    let (store, _) = open(&path).await;
    let guest = store.find_user("guest").await.unwrap().unwrap();
    assert_eq!(guest.permissions[&Area::CERTIFICATES], PermissionLevel::Manage);
}

#[tokio::test]
async fn test_build_state_opens_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("built.json");
    let config = load_config_from_str(&format!(
        r#"
[storage]
snapshot_path = "{}"

[[users]]
id = "root"
email = "root@example.com"
role = "SUPER_ADMIN"

[[auth.tokens]]
token = "root-token"
user_id = "root"
"#,
        path.display()
    ))
    .unwrap();

    let state = gemvault::build_state(&config).await.unwrap();
    let actor = state.auth.authenticate("root-token").await.unwrap();
    assert_eq!(actor.id, "root");
    assert!(path.exists());
}

#[test]
fn test_corrupt_snapshot_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(MemoryStore::with_snapshot(&path).is_err());
}

#[tokio::test]
async fn test_failed_snapshot_write_leaves_state_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let (store, governance) = open(&path).await;
    let guest = store.find_user("guest").await.unwrap().unwrap().to_actor();
    let generation = store.collections().generation;

    // A directory where the temp file should go makes the write fail
    let blocker = dir.path().join("store.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    let result = governance
        .approvals
        .create(
            &guest,
            NewApprovalRequest {
                title: Some("Request to view buying price".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());
    assert!(governance.approvals.list_all().await.unwrap().is_empty());
    assert!(store.recent_audit(200).await.unwrap().is_empty());
    assert_eq!(store.collections().generation, generation);

    // Once the disk recovers, only the retried request lands
    std::fs::remove_dir(&blocker).unwrap();
    governance
        .approvals
        .create(
            &guest,
            NewApprovalRequest {
                title: Some("Request to view buying price".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (_, reopened) = open(&path).await;
    assert_eq!(reopened.approvals.list_all().await.unwrap().len(), 1);
}
