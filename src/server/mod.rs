//! HTTP API
//!
//! Router, shared state and the listener loop. Every governance endpoint
//! lives under `/permissions`; notifications under `/notifications`.

pub mod extract;
pub mod http;
pub mod routes;

pub use http::{HttpConfig, run_http};

use crate::access_control::{Actor, Area, PermissionLevel};
use crate::auth::SharedAuthProvider;
use crate::error::GovernanceResult;
use crate::governance::Governance;
use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub governance: Governance,
    pub auth: SharedAuthProvider,
    pub name: Arc<str>,
}

impl AppState {
    pub fn new(governance: Governance, auth: SharedAuthProvider, name: &str) -> Self {
        Self {
            governance,
            auth,
            name: name.into(),
        }
    }

    /// Fail with 403 unless `actor` holds `required` on `area`
    pub async fn require(
        &self,
        actor: &Actor,
        area: &Area,
        required: PermissionLevel,
    ) -> GovernanceResult<()> {
        self.governance.access.require(actor, area, required).await
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let permissions = Router::new()
        .route("/me", get(routes::me))
        .route(
            "/policy",
            get(routes::get_policy).put(routes::update_policy),
        )
        .route(
            "/approvals",
            get(routes::list_approvals).patch(routes::update_approvals),
        )
        .route("/approvals/request", post(routes::create_approval))
        .route("/approvals/me", get(routes::my_approvals))
        .route("/approvals/{id}", delete(routes::delete_approval))
        .route(
            "/audit",
            get(routes::list_audit).post(routes::record_audit),
        )
        .route(
            "/emergency",
            get(routes::get_emergency).post(routes::apply_emergency),
        )
        .route("/users/{id}", get(routes::get_user))
        .route(
            "/users/{id}/permissions",
            put(routes::replace_user_permissions),
        );

    Router::new()
        .route("/healthz", get(routes::healthz))
        .nest("/permissions", permissions)
        .route("/notifications", get(routes::list_notifications))
        .route(
            "/notifications/{id}/read",
            patch(routes::mark_notification_read),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
