//! Permission policy
//!
//! The policy singleton holds role cards, guardrails and the area × role
//! matrix. Updates replace whichever top-level arrays are supplied.

use crate::access_control::{Actor, Area, PermissionLevel, default_policy};
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::governance::audit::{AuditLog, CATEGORY_PERMISSIONS};
use crate::governance::overrides::OverrideService;
use crate::store::{Guardrail, MatrixRow, PolicyDocument, PolicyStore, RoleCard};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Matrix row as received from a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRowInput {
    pub area: Option<String>,
    pub description: Option<String>,
    pub super_admin: Option<String>,
    pub admin: Option<String>,
    pub guest: Option<String>,
}

/// Partial policy update; omitted arrays are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    pub matrix: Option<Vec<MatrixRowInput>>,
    pub guardrails: Option<Vec<Guardrail>>,
    pub role_cards: Option<Vec<RoleCard>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdateOutcome {
    pub policy: PolicyDocument,
    /// Users seeded with role defaults by this update
    pub reseeded: usize,
}

fn parse_level(row: usize, role: &str, value: Option<&str>) -> GovernanceResult<PermissionLevel> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            GovernanceError::validation(format!("matrix row {} is missing a {} level", row, role))
        })?;
    PermissionLevel::try_parse(raw).ok_or_else(|| {
        GovernanceError::validation(format!(
            "matrix row {} has unknown {} level '{}'",
            row, role, raw
        ))
    })
}

/// Validate client rows: every row names an area and all three role levels,
/// and area names are unique (case-insensitive).
pub fn validate_matrix(rows: &[MatrixRowInput]) -> GovernanceResult<Vec<MatrixRow>> {
    if rows.is_empty() {
        return Err(GovernanceError::validation(
            "matrix must contain at least one row",
        ));
    }

    let mut seen = HashSet::new();
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let label = row
                .area
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    GovernanceError::validation(format!("matrix row {} is missing an area", index))
                })?;
            if !seen.insert(label.to_lowercase()) {
                return Err(GovernanceError::validation(format!(
                    "duplicate matrix area '{}'",
                    label
                )));
            }

            Ok(MatrixRow {
                area: Area::new(label),
                description: row.description.clone().unwrap_or_default(),
                super_admin: parse_level(index, "superAdmin", row.super_admin.as_deref())?,
                admin: parse_level(index, "admin", row.admin.as_deref())?,
                guest: parse_level(index, "guest", row.guest.as_deref())?,
            })
        })
        .collect()
}

pub struct PolicyService {
    store: Arc<dyn PolicyStore>,
    overrides: Arc<OverrideService>,
    audit: Arc<AuditLog>,
}

impl PolicyService {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        overrides: Arc<OverrideService>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            store,
            overrides,
            audit,
        }
    }

    /// Current policy, created with built-in defaults on first access
    pub async fn get_policy(&self) -> StoreResult<PolicyDocument> {
        self.store.load_policy_or_init(default_policy()).await
    }

    /// Replace the supplied arrays, re-seed users with empty overrides from
    /// the new matrix, then audit.
    ///
    /// A failed re-seed does not undo the saved policy: it is logged and
    /// picked up again by the next update or the startup bootstrap, both of
    /// which only touch users that are still empty.
    #[instrument(skip(self, actor, update), fields(actor = %actor.id))]
    pub async fn update_policy(
        &self,
        actor: &Actor,
        update: PolicyUpdate,
    ) -> GovernanceResult<PolicyUpdateOutcome> {
        let matrix = update.matrix.as_deref().map(validate_matrix).transpose()?;

        let mut policy = self.get_policy().await?;
        if let Some(matrix) = matrix {
            policy.matrix = matrix;
        }
        if let Some(guardrails) = update.guardrails {
            policy.guardrails = guardrails;
        }
        if let Some(role_cards) = update.role_cards {
            policy.role_cards = role_cards;
        }
        policy.updated_at = Some(Utc::now());
        policy.updated_by = Some(actor.id.clone());

        let policy = self.store.save_policy(policy).await?;

        let reseeded = match self.overrides.reseed_empty(&policy).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Re-seeding users after policy update failed");
                0
            }
        };

        self.audit
            .record("Updated permission policy.", actor, CATEGORY_PERMISSIONS)
            .await?;

        info!(
            areas = policy.matrix.len(),
            reseeded, "Permission policy updated"
        );
        Ok(PolicyUpdateOutcome { policy, reseeded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(area: &str, levels: [&str; 3]) -> MatrixRowInput {
        MatrixRowInput {
            area: Some(area.to_string()),
            description: None,
            super_admin: Some(levels[0].to_string()),
            admin: Some(levels[1].to_string()),
            guest: Some(levels[2].to_string()),
        }
    }

    #[test]
    fn test_validate_matrix_accepts_complete_rows() {
        let rows = validate_matrix(&[
            row("Inventory & products", ["full", "manage", "read"]),
            row("Pricing & billing", ["full", "manage", "none"]),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].area, Area::PRICING);
        assert_eq!(rows[1].guest, PermissionLevel::None);
    }

    #[test]
    fn test_validate_matrix_rejects_missing_role_level() {
        let mut incomplete = row("Certificates", ["full", "manage", "read"]);
        incomplete.guest = None;
        let err = validate_matrix(&[incomplete]).unwrap_err();
        assert!(err.to_string().contains("guest"));
    }

    #[test]
    fn test_validate_matrix_rejects_unknown_level() {
        let err = validate_matrix(&[row("Certificates", ["full", "owner", "read"])]).unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_validate_matrix_rejects_duplicates() {
        let err = validate_matrix(&[
            row("Certificates", ["full", "manage", "read"]),
            row("certificates ", ["full", "read", "none"]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_matrix_rejects_empty_and_unnamed() {
        assert!(validate_matrix(&[]).is_err());
        let mut unnamed = row("x", ["full", "full", "full"]);
        unnamed.area = Some("   ".into());
        assert!(validate_matrix(&[unnamed]).is_err());
    }
}
