//! Authentication provider trait
//!
//! Turns a presented credential into the [`Actor`] every governance
//! operation runs as. The only implementation today is a static token
//! table; an external identity service would slot in behind the same trait.

use crate::access_control::Actor;
use crate::error::AuthError;
// async_trait required for dyn-compatibility with Arc<dyn AuthProvider>
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a bearer token to the acting user
    async fn authenticate(&self, token: &str) -> Result<Actor, AuthError>;

    /// Description of the auth method (for logging)
    fn auth_type(&self) -> &'static str;
}

pub type SharedAuthProvider = Arc<dyn AuthProvider>;

/// Extract the token from an `Authorization` header value
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}
