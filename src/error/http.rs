//! HTTP error mapping.
//!
//! Maps governance errors to HTTP status codes and structured JSON payloads.
//!
//! # Strategy
//! - Caller mistakes (validation, unknown ids) → 4xx with the full message
//! - Identity and authorization failures → 401 / 403 without policy details
//! - Store failures → 500 with a generic message, details go to the log

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::error;

use super::GovernanceError;

/// Maps a `GovernanceError` to its HTTP status code.
pub fn status_for(error: &GovernanceError) -> StatusCode {
    match error {
        GovernanceError::Validation(_) => StatusCode::BAD_REQUEST,
        GovernanceError::NotFound { .. } => StatusCode::NOT_FOUND,
        GovernanceError::AccessDenied(_) => StatusCode::FORBIDDEN,
        GovernanceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        GovernanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Builds the JSON error payload for a `GovernanceError`.
pub fn error_body(error: &GovernanceError) -> Value {
    match error {
        GovernanceError::Validation(message) => json!({
            "error": { "type": "ValidationError", "message": message }
        }),

        GovernanceError::NotFound { resource, id } => json!({
            "error": {
                "type": "NotFoundError",
                "message": format!("{} not found", resource),
                "id": id
            }
        }),

        GovernanceError::AccessDenied(denied) => json!({
            "error": {
                "type": "AuthorizationError",
                "message": "Insufficient permissions",
                "area": denied.area
            }
        }),

        GovernanceError::Unauthenticated(_) => json!({
            "error": { "type": "UnauthenticatedError", "message": "Authentication required" }
        }),

        GovernanceError::Store(_) => json!({
            "error": { "type": "ServerError", "message": "Internal server error" }
        }),
    }
}

impl IntoResponse for GovernanceError {
    fn into_response(self) -> Response {
        if let GovernanceError::Store(ref e) = self {
            error!(error = %e, "Store failure while handling request");
        }
        (status_for(&self), Json(error_body(&self))).into_response()
    }
}
