//! Gemvault
//!
//! Permission and approval governance for a jewelry inventory dashboard.
//!
//! ## Features
//!
//! - **Permission lattice** `none < limited < read < manage < full`, resolved
//!   per actor and business area
//! - **Policy matrix** (area × role) with per-user overrides
//! - **Approval workflow** whose approvals can grant derived access
//! - **Emergency access lock** with a time-bounded override window
//! - **Append-only audit log** attributed to every mutating actor
//!
//! ## Resolution Order
//!
//! ```text
//! no actor → none
//! SUPER_ADMIN → full
//! user override → matrix role default → built-in role default
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! port = 8640
//!
//! [storage]
//! snapshot_path = "/var/lib/gemvault/snapshot.json"
//!
//! [[users]]
//! id = "root"
//! email = "owner@example.com"
//! role = "SUPER_ADMIN"
//!
//! [[auth.tokens]]
//! token = "change-me"
//! user_id = "root"
//! ```

pub mod access_control;
pub mod auth;
pub mod config;
pub mod error;
pub mod governance;
pub mod server;
pub mod store;
pub mod util;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use governance::Governance;
pub use server::{AppState, router};

use std::sync::Arc;
use store::{MemoryStore, Stores};
use tracing::info;

/// Open the store, wire the services and run the startup bootstrap
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let store = match config.storage.snapshot_path.as_deref() {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            Arc::new(MemoryStore::with_snapshot(expanded.as_ref())?)
        }
        None => {
            info!("No snapshot path configured, state is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let stores = Stores::shared(store);

    let governance = Governance::new(&stores, &config.governance)?;
    governance.bootstrap(&config.users).await?;

    let auth = auth::create_auth_provider(&config.auth, stores.users.clone());
    Ok(AppState::new(governance, auth, &config.server.name))
}
