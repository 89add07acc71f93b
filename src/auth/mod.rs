//! Authentication module
//!
//! Resolves the `Authorization: Bearer` credential of a request to an
//! [`Actor`](crate::access_control::Actor).

pub mod provider;
pub mod token;

pub use provider::{AuthProvider, SharedAuthProvider, parse_bearer};
pub use token::StaticTokenProvider;

use crate::config::AuthConfig;
use crate::store::UserStore;
use std::sync::Arc;
use tracing::warn;

/// Create an auth provider from configuration
pub fn create_auth_provider(config: &AuthConfig, users: Arc<dyn UserStore>) -> SharedAuthProvider {
    let provider = StaticTokenProvider::new(&config.tokens, users);
    if provider.is_empty() {
        warn!("No auth tokens configured; every API request will be rejected");
    }
    Arc::new(provider)
}
