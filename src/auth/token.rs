//! Static bearer-token authentication
//!
//! Tokens come from `[[auth.tokens]]`. The user behind a token is loaded
//! from the user store on every request, so role and override changes take
//! effect immediately.

use crate::access_control::Actor;
use crate::auth::provider::AuthProvider;
use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::store::UserStore;
use crate::util::SecretString;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct StaticTokenProvider {
    tokens: Vec<(SecretString, String)>,
    users: Arc<dyn UserStore>,
}

impl StaticTokenProvider {
    pub fn new(tokens: &[TokenConfig], users: Arc<dyn UserStore>) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| (t.token.clone(), t.user_id.clone()))
                .collect(),
            users,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn user_for(&self, token: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(secret, _)| secret.matches(token))
            .map(|(_, user_id)| user_id.as_str())
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn authenticate(&self, token: &str) -> Result<Actor, AuthError> {
        let user_id = self.user_for(token).ok_or(AuthError::UnknownToken)?;
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_string()))?;
        debug!(user = %user.id, role = %user.role, "Authenticated bearer token");
        Ok(user.to_actor())
    }

    fn auth_type(&self) -> &'static str {
        "static-token"
    }
}
