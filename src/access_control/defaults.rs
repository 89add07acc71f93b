//! Built-in policy defaults
//!
//! The six-area matrix a fresh deployment starts with, and the fallback
//! table used when an area is missing from the stored matrix.

use crate::access_control::types::{Area, PermissionLevel, Role};
use crate::store::documents::{Guardrail, MatrixRow, POLICY_DOCUMENT_ID, PolicyDocument, RoleCard};

use PermissionLevel as L;

/// (area, description, admin, guest). Super admins always get `full`.
const DEFAULT_ROWS: [(Area, &str, PermissionLevel, PermissionLevel); 6] = [
    (
        Area::INVENTORY,
        "Create, edit and archive gemstone products",
        L::Manage,
        L::Read,
    ),
    (
        Area::CERTIFICATES,
        "Upload and verify gemstone certificates",
        L::Manage,
        L::Read,
    ),
    (
        Area::USER_MANAGEMENT,
        "Invite staff and adjust per-user access",
        L::Manage,
        L::None,
    ),
    (
        Area::PRICING,
        "Buying prices, margins and billing details",
        L::Manage,
        L::None,
    ),
    (
        Area::SECURITY_SETTINGS,
        "Permission policy, approvals and emergency access",
        L::Manage,
        L::None,
    ),
    (
        Area::AUDIT_LOGS,
        "Review the governance audit trail",
        L::Read,
        L::Limited,
    ),
];

/// Role default for a well-known area when the matrix has no row for it.
/// Unknown areas resolve to `none`.
pub fn fallback_level(role: Role, area: &Area) -> PermissionLevel {
    if role == Role::SuperAdmin {
        return L::Full;
    }
    DEFAULT_ROWS
        .iter()
        .find(|(known, ..)| known == area)
        .map(|(_, _, admin, guest)| match role {
            Role::Admin => *admin,
            _ => *guest,
        })
        .unwrap_or(L::None)
}

pub fn default_matrix() -> Vec<MatrixRow> {
    DEFAULT_ROWS
        .iter()
        .map(|(area, description, admin, guest)| MatrixRow {
            area: area.clone(),
            description: description.to_string(),
            super_admin: L::Full,
            admin: *admin,
            guest: *guest,
        })
        .collect()
}

fn default_role_cards() -> Vec<RoleCard> {
    vec![
        RoleCard {
            title: "Super Admin".into(),
            subtitle: "Owns the policy".into(),
            badge: "SUPER_ADMIN".into(),
            perks: vec![
                "Full access to every area".into(),
                "Resolves escalated approvals".into(),
                "Can request emergency override".into(),
            ],
        },
        RoleCard {
            title: "Admin".into(),
            subtitle: "Runs the inventory day to day".into(),
            badge: "ADMIN".into(),
            perks: vec![
                "Manages products and certificates".into(),
                "Resolves access approvals".into(),
                "Reads the audit trail".into(),
            ],
        },
        RoleCard {
            title: "Guest".into(),
            subtitle: "Read-only showroom access".into(),
            badge: "GUEST".into(),
            perks: vec!["Browses inventory and certificates".into()],
        },
    ]
}

fn default_guardrails() -> Vec<Guardrail> {
    vec![
        Guardrail {
            title: "Pricing is opt-in".into(),
            description: "Guests see buying prices only after an approved request.".into(),
        },
        Guardrail {
            title: "Every change is audited".into(),
            description: "Policy, approval and emergency changes land in the audit log.".into(),
        },
        Guardrail {
            title: "Emergency access expires".into(),
            description: "An override request is valid for one hour.".into(),
        },
    ]
}

/// Policy document created on first access
pub fn default_policy() -> PolicyDocument {
    PolicyDocument {
        id: POLICY_DOCUMENT_ID.to_string(),
        role_cards: default_role_cards(),
        guardrails: default_guardrails(),
        matrix: default_matrix(),
        updated_at: None,
        updated_by: None,
    }
}
