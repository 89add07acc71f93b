//! HTTP handlers
//!
//! Each handler authenticates, checks the area level it needs, then calls
//! one governance operation.

use crate::access_control::{Area, PermissionLevel};
use crate::error::{GovernanceError, GovernanceResult};
use crate::governance::{
    ApprovalUpdate, CATEGORY_GENERAL, EmergencyActionInput, NewApprovalRequest, PolicyUpdate,
};
use crate::server::AppState;
use crate::server::extract::{CurrentActor, JsonBody};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

type ApiResult = GovernanceResult<Json<Value>>;

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": state.name.as_ref() }))
}

pub async fn me(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> ApiResult {
    let levels = state.governance.access.effective_levels(&actor).await?;
    Ok(Json(json!({
        "id": actor.id,
        "email": actor.email,
        "role": actor.role,
        "levels": levels,
    })))
}

// Policy

pub async fn get_policy(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Read)
        .await?;
    let policy = state.governance.policy.get_policy().await?;
    Ok(Json(json!({ "policy": policy })))
}

pub async fn update_policy(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(update): JsonBody<PolicyUpdate>,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let outcome = state.governance.policy.update_policy(&actor, update).await?;
    Ok(Json(json!({
        "policy": outcome.policy,
        "reseeded": outcome.reseeded,
    })))
}

// Approvals

pub async fn create_approval(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(input): JsonBody<NewApprovalRequest>,
) -> GovernanceResult<impl IntoResponse> {
    let approval = state.governance.approvals.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "approval": approval }))))
}

pub async fn my_approvals(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult {
    let approvals = state.governance.approvals.list_for(&actor).await?;
    Ok(Json(json!({ "approvals": approvals })))
}

pub async fn list_approvals(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let approvals = state.governance.approvals.list_all().await?;
    Ok(Json(json!({ "approvals": approvals })))
}

pub async fn update_approvals(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(input): JsonBody<ApprovalUpdate>,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let approvals = state.governance.approvals.update(&actor, input).await?;
    Ok(Json(json!({ "approvals": approvals })))
}

pub async fn delete_approval(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let approval = state.governance.approvals.delete(&actor, &id).await?;
    Ok(Json(json!({ "approval": approval })))
}

// Audit

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<String>,
}

impl AuditQuery {
    /// Anything below one clamps to one; non-numbers are rejected
    fn limit(&self) -> GovernanceResult<Option<usize>> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(|n| Some(usize::try_from(n.max(1)).unwrap_or(usize::MAX)))
                .map_err(|_| GovernanceError::validation(format!("invalid limit '{}'", raw))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditInput {
    pub message: Option<String>,
    pub category: Option<String>,
}

pub async fn list_audit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<AuditQuery>,
) -> ApiResult {
    state
        .require(&actor, &Area::AUDIT_LOGS, PermissionLevel::Read)
        .await?;
    let entries = state.governance.audit.recent(query.limit()?).await?;
    Ok(Json(json!({ "auditLog": entries })))
}

pub async fn record_audit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(input): JsonBody<AuditInput>,
) -> ApiResult {
    state
        .require(&actor, &Area::AUDIT_LOGS, PermissionLevel::Manage)
        .await?;
    let message = input
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| GovernanceError::missing_field("message"))?;
    let category = input.category.as_deref().unwrap_or(CATEGORY_GENERAL);

    let entry = state
        .governance
        .audit
        .try_record(message, &actor, category)
        .await;
    Ok(Json(json!({ "recorded": entry.is_some() })))
}

// Emergency

pub async fn get_emergency(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let view = state.governance.emergency.get().await?;
    Ok(Json(json!(view)))
}

pub async fn apply_emergency(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(input): JsonBody<EmergencyActionInput>,
) -> ApiResult {
    state
        .require(&actor, &Area::SECURITY_SETTINGS, PermissionLevel::Manage)
        .await?;
    let action = input.parse()?;
    let view = state.governance.emergency.apply(&actor, action).await?;
    Ok(Json(json!(view)))
}

// Users

#[derive(Debug, Default, Deserialize)]
pub struct PermissionsInput {
    #[serde(default)]
    pub permissions: Option<BTreeMap<String, String>>,
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult {
    state
        .require(&actor, &Area::USER_MANAGEMENT, PermissionLevel::Read)
        .await?;
    let user = state.governance.overrides.get_user(&id).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn replace_user_permissions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PermissionsInput>,
) -> ApiResult {
    state
        .require(&actor, &Area::USER_MANAGEMENT, PermissionLevel::Manage)
        .await?;
    let permissions = input
        .permissions
        .ok_or_else(|| GovernanceError::missing_field("permissions"))?;
    let user = state
        .governance
        .overrides
        .replace_permissions(&actor, &id, &permissions)
        .await?;
    Ok(Json(json!({ "user": user })))
}

// Notifications

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult {
    let notifications = state.governance.notifier.list_for(&actor).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult {
    let notification = state.governance.notifier.mark_read(&actor, &id).await?;
    Ok(Json(json!({ "notification": notification })))
}
