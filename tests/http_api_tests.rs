//! HTTP API tests
//!
//! Drive the router with `oneshot` requests: authentication, area checks,
//! status codes and payload shapes.

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use common::{Fixture, fixture};
use gemvault::auth::create_auth_provider;
use gemvault::config::{AuthConfig, TokenConfig};
use gemvault::server::{AppState, router};
use gemvault::store::AuditStore;
use gemvault::util::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

const ROOT: &str = "root-token";
const ADMIN: &str = "admin-token";
const GUEST: &str = "guest-token";

fn token(token: &str, user_id: &str) -> TokenConfig {
    TokenConfig {
        token: SecretString::new(token),
        user_id: user_id.to_string(),
    }
}

async fn app() -> (Fixture, Router) {
    let f = fixture().await;
    let auth = create_auth_provider(
        &AuthConfig {
            tokens: vec![
                token(ROOT, "root"),
                token(ADMIN, "admin"),
                token(GUEST, "guest"),
                token("orphan-token", "nobody"),
            ],
        },
        f.stores.users.clone(),
    );
    let app = router(AppState::new(f.governance.clone(), auth, "gemvault-test"));
    (f, app)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_healthz_is_public() {
    let (_, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "gemvault-test");
}

#[tokio::test]
async fn test_authentication_failures_are_401() {
    let (_, app) = app().await;

    for bearer in [None, Some("wrong-token"), Some("orphan-token")] {
        let (status, body) = send(&app, Method::GET, "/permissions/me", bearer, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "UnauthenticatedError");
    }
}

#[tokio::test]
async fn test_me_reports_effective_levels() {
    let (_, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/permissions/me", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "GUEST");
    assert_eq!(body["levels"]["Inventory & products"], "read");
    assert_eq!(body["levels"]["Pricing & billing"], "none");
}

#[tokio::test]
async fn test_policy_read_and_write_require_security_levels() {
    let (_, app) = app().await;

    let (status, body) = send(&app, Method::GET, "/permissions/policy", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "AuthorizationError");
    assert_eq!(body["error"]["area"], "Security settings");

    let (status, body) = send(&app, Method::GET, "/permissions/policy", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policy"]["matrix"].as_array().unwrap().len(), 6);

    let update = json!({
        "matrix": [
            { "area": "Inventory & products", "superAdmin": "full", "admin": "manage", "guest": "read" }
        ]
    });
    let (status, _) = send(
        &app,
        Method::PUT,
        "/permissions/policy",
        Some(GUEST),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/permissions/policy",
        Some(ROOT),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policy"]["matrix"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_policy_is_400() {
    let (_, app) = app().await;
    let update = json!({ "matrix": [ { "area": "Certificates", "superAdmin": "full", "admin": "manage" } ] });
    let (status, body) = send(
        &app,
        Method::PUT,
        "/permissions/policy",
        Some(ROOT),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "ValidationError");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (_, app) = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/permissions/approvals/request")
        .header(header::AUTHORIZATION, format!("Bearer {}", GUEST))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approval_flow_over_http() {
    let (f, app) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/permissions/approvals/request",
        Some(GUEST),
        Some(json!({ "title": "Request to view buying price", "area": "Pricing & billing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["approval"]["status"], "waiting");
    let id = body["approval"]["id"].as_str().unwrap().to_string();

    // Guests may see their own requests but not the queue
    let (status, body) = send(&app, Method::GET, "/permissions/approvals/me", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approvals"].as_array().unwrap().len(), 1);
    let (status, _) = send(&app, Method::GET, "/permissions/approvals", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A forbidden resolve has no side effects
    let audit_before = f.store.recent_audit(200).await.unwrap().len();
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/permissions/approvals",
        Some(GUEST),
        Some(json!({ "ids": [id], "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(f.store.recent_audit(200).await.unwrap().len(), audit_before);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/permissions/approvals",
        Some(ADMIN),
        Some(json!({ "ids": [id], "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approvals"][0]["status"], "approved");

    let (_, body) = send(&app, Method::GET, "/permissions/me", Some(GUEST), None).await;
    assert_eq!(body["levels"]["Pricing & billing"], "read");

    let (status, body) = send(&app, Method::GET, "/notifications", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::OK);
    let notes = body["notifications"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["type"], "approval_update");
    let note_id = notes[0]["id"].as_str().unwrap().to_string();

    // Someone else's notification looks absent
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/notifications/{}/read", note_id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/notifications/{}/read", note_id),
        Some(GUEST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["read"], true);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/permissions/approvals/{}", id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approval"]["id"], id.as_str());

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/permissions/approvals/{}", id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "NotFoundError");
}

#[tokio::test]
async fn test_missing_title_is_400() {
    let (_, app) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/permissions/approvals/request",
        Some(GUEST),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "title is required");
}

#[tokio::test]
async fn test_audit_endpoints() {
    let (_, app) = app().await;

    // Guests have limited audit access: not enough to read
    let (status, _) = send(&app, Method::GET, "/permissions/audit", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins read audit logs but cannot write freeform entries
    let (status, _) = send(
        &app,
        Method::POST,
        "/permissions/audit",
        Some(ADMIN),
        Some(json!({ "message": "Exported price list" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for i in 0..3 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/permissions/audit",
            Some(ROOT),
            Some(json!({ "message": format!("Exported price list {}", i), "category": "exports" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recorded"], true);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/permissions/audit?limit=2",
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["auditLog"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["message"], "Exported price list 2");
    assert_eq!(entries[0]["category"], "exports");
    assert_eq!(entries[0]["actorRole"], "SUPER_ADMIN");

    let (status, _) = send(
        &app,
        Method::POST,
        "/permissions/audit",
        Some(ROOT),
        Some(json!({ "category": "exports" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::GET,
        "/permissions/audit?limit=many",
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_500_with_generic_body() {
    let (f, app) = app().await;
    f.store.set_available(false);
    let (status, body) = send(&app, Method::GET, "/permissions/me", Some(ROOT), None).await;
    f.store.set_available(true);

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "ServerError");
}

#[tokio::test]
async fn test_freeform_audit_is_best_effort() {
    let f = fixture().await;
    let root = f.actor("root").await;
    f.store.set_available(false);
    let recorded = f
        .governance
        .audit
        .try_record("hello", &root, "general")
        .await;
    f.store.set_available(true);
    assert!(recorded.is_none());
}

#[tokio::test]
async fn test_emergency_endpoints() {
    let (_, app) = app().await;

    let (status, _) = send(&app, Method::GET, "/permissions/emergency", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/permissions/emergency", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emergency"]["status"], "enforced");
    assert_eq!(body["expired"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/permissions/emergency",
        Some(ROOT),
        Some(json!({ "action": "request" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emergency"]["status"], "override_requested");
    assert_eq!(body["emergency"]["requestedBy"], "root");
    assert!(body["emergency"]["expiresAt"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/permissions/emergency",
        Some(ROOT),
        Some(json!({ "action": "unlock-everything" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "ValidationError");

    let (status, body) = send(
        &app,
        Method::POST,
        "/permissions/emergency",
        Some(ROOT),
        Some(json!({ "action": "cancel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emergency"]["status"], "enforced");
    assert!(body["emergency"]["expiresAt"].is_null());
}

#[tokio::test]
async fn test_user_override_endpoints() {
    let (_, app) = app().await;

    let (status, _) = send(&app, Method::GET, "/permissions/users/admin", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/permissions/users/guest", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["permissions"]["Pricing & billing"], "none");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/permissions/users/guest/permissions",
        Some(ADMIN),
        Some(json!({ "permissions": { "Certificates": "manage" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["permissions"], json!({ "Certificates": "manage" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/permissions/users/guest/permissions",
        Some(ADMIN),
        Some(json!({ "permissions": { "Certificates": "godmode" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/permissions/users/nobody/permissions",
        Some(ADMIN),
        Some(json!({ "permissions": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/permissions/users/nobody", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
