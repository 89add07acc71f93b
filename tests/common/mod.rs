//! Shared fixtures for integration tests

#![allow(dead_code)]

use gemvault::access_control::Actor;
use gemvault::config::{GovernanceConfig, UserSeed};
use gemvault::governance::Governance;
use gemvault::store::{MemoryStore, Stores, UserStore};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub governance: Governance,
}

impl Fixture {
    /// Current state of a seeded user as an actor
    pub async fn actor(&self, id: &str) -> Actor {
        self.store
            .find_user(id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("user {} not seeded", id))
            .to_actor()
    }
}

pub fn seed(id: &str, role: &str) -> UserSeed {
    UserSeed {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: None,
        role: role.to_string(),
        permissions: BTreeMap::new(),
    }
}

/// root (SUPER_ADMIN), admin (ADMIN), guest (GUEST)
pub fn default_seeds() -> Vec<UserSeed> {
    vec![
        seed("root", "SUPER_ADMIN"),
        seed("admin", "ADMIN"),
        seed("guest", "GUEST"),
    ]
}

pub async fn fixture_with(seeds: &[UserSeed]) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let stores = Stores::shared(store.clone());
    let governance = Governance::new(&stores, &GovernanceConfig::default()).unwrap();
    governance.bootstrap(seeds).await.unwrap();
    Fixture {
        store,
        stores,
        governance,
    }
}

pub async fn fixture() -> Fixture {
    fixture_with(&default_seeds()).await
}
