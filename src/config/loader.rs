//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (GEMVAULT_*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::access_control::{PermissionLevel, Role};
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "gemvault.toml",
    ".gemvault.toml",
    "~/.config/gemvault/config.toml",
    "/etc/gemvault/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // First existing default path wins
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. GEMVAULT_SERVER__PORT, GEMVAULT_STORAGE__SNAPSHOT_PATH
    builder = builder.add_source(
        Environment::with_prefix("GEMVAULT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    let governance = &config.governance;
    if governance.emergency_window_minutes <= 0 {
        return Err(ConfigError::Invalid {
            message: "governance.emergency_window_minutes must be greater than 0".to_string(),
        });
    }
    if governance.audit_max_limit == 0 {
        return Err(ConfigError::Invalid {
            message: "governance.audit_max_limit must be greater than 0".to_string(),
        });
    }
    if governance.audit_default_limit == 0
        || governance.audit_default_limit > governance.audit_max_limit
    {
        return Err(ConfigError::Invalid {
            message: format!(
                "governance.audit_default_limit must be between 1 and {}",
                governance.audit_max_limit
            ),
        });
    }

    for (index, rule) in governance.grant_rules.iter().enumerate() {
        let field = format!("governance.grant_rules[{}]", index);
        if rule.area.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: format!("{}.area", field),
            });
        }
        if PermissionLevel::try_parse(rule.level.trim()).is_none() {
            return Err(ConfigError::Invalid {
                message: format!("{}.level '{}' is not a permission level", field, rule.level),
            });
        }
        validate_patterns(&rule.title_patterns, &format!("{}.title_patterns", field))?;
    }

    validate_users(config)?;

    let mut tokens = HashSet::new();
    for token in &config.auth.tokens {
        if token.token.expose_secret().is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("auth token for '{}' is empty", token.user_id),
            });
        }
        if !tokens.insert(token.token.expose_secret()) {
            return Err(ConfigError::Invalid {
                message: "auth.tokens contains a duplicate token".to_string(),
            });
        }
        if token.user_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "auth.tokens.user_id".to_string(),
            });
        }
        if !config.users.iter().any(|u| u.id == token.user_id) {
            // The user may already exist in a persisted snapshot
            warn!(user = %token.user_id, "Auth token refers to a user that is not seeded");
        }
    }

    Ok(())
}

fn validate_users(config: &AppConfig) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    for user in &config.users {
        if user.id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "users.id".to_string(),
            });
        }
        if !ids.insert(user.id.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate user id '{}'", user.id),
            });
        }
        if Role::try_parse(&user.role).is_none() {
            return Err(ConfigError::Invalid {
                message: format!("user '{}' has unknown role '{}'", user.id, user.role),
            });
        }
        for (area, level) in &user.permissions {
            if PermissionLevel::try_parse(level.trim()).is_none() {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "user '{}' has unknown level '{}' for '{}'",
                        user.id, level, area
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Validate that all patterns are valid regex
fn validate_patterns(patterns: &[String], field_path: &str) -> Result<(), ConfigError> {
    for pattern in patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: format!("in {}: {}", field_path, e),
            });
        }
    }
    Ok(())
}
