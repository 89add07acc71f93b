//! Derived access grants
//!
//! Approving certain requests grants the requester an override as a side
//! effect. Each rule names an area, the title patterns that identify a
//! request for it, and the level granted.

use crate::access_control::{Area, PatternMatcher, PermissionLevel};
use crate::config::GrantRuleConfig;
use crate::error::ConfigError;
use crate::store::ApprovalRequest;

/// Applied only when the requester's effective level falls short of
/// `level`, so a grant never downgrades someone who already has more.
#[derive(Debug)]
pub struct GrantRule {
    pub area: Area,
    pub titles: PatternMatcher,
    pub level: PermissionLevel,
}

impl GrantRule {
    pub fn from_config(config: &GrantRuleConfig) -> Result<Self, ConfigError> {
        let area = config.area.trim();
        if area.is_empty() {
            return Err(ConfigError::Missing {
                field: "governance.grant_rules.area".to_string(),
            });
        }
        let level = PermissionLevel::try_parse(config.level.trim()).ok_or_else(|| {
            ConfigError::Invalid {
                message: format!(
                    "governance.grant_rules level '{}' is not a permission level",
                    config.level
                ),
            }
        })?;

        Ok(Self {
            area: Area::new(area),
            titles: PatternMatcher::new(&config.title_patterns)?,
            level,
        })
    }

    /// Area equality (case-insensitive) or a title pattern hit
    pub fn applies_to(&self, approval: &ApprovalRequest) -> bool {
        approval
            .area
            .as_ref()
            .is_some_and(|area| self.area.matches_label(area.as_str()))
            || self.titles.matches(&approval.title)
    }
}

#[derive(Debug, Default)]
pub struct GrantRules {
    rules: Vec<GrantRule>,
}

impl GrantRules {
    pub fn from_config(configs: &[GrantRuleConfig]) -> Result<Self, ConfigError> {
        let rules = configs
            .iter()
            .map(GrantRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn matching<'a>(
        &'a self,
        approval: &'a ApprovalRequest,
    ) -> impl Iterator<Item = &'a GrantRule> + 'a {
        self.rules.iter().filter(move |rule| rule.applies_to(approval))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
