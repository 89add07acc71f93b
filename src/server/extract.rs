//! Request extractors
//!
//! Both extractors reject with [`GovernanceError`] so every failure leaves
//! the API in the same JSON error shape.

use crate::access_control::Actor;
use crate::auth::parse_bearer;
use crate::error::{AuthError, GovernanceError};
use crate::server::AppState;
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = GovernanceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;
        let token = parse_bearer(header)?;

        match state.auth.authenticate(token).await {
            Ok(actor) => Ok(CurrentActor(actor)),
            // A store outage is a server failure, not a bad credential
            Err(AuthError::Store(e)) => Err(GovernanceError::Store(e)),
            Err(e) => {
                debug!(error = %e, auth = state.auth.auth_type(), "Rejected credential");
                Err(e.into())
            }
        }
    }
}

/// `Json` whose rejection is a validation error
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GovernanceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| GovernanceError::validation(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
