//! Configuration types for gemvault
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::util::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Document store settings
    pub storage: StorageConfig,

    /// Approval, emergency and audit tuning
    pub governance: GovernanceConfig,

    /// Bearer tokens accepted by the API
    pub auth: AuthConfig,

    /// Users created at startup if missing
    pub users: Vec<UserSeed>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Service name reported by `/healthz`
    pub name: String,

    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8640,
            name: "gemvault".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file; the store is purely in-memory when unset
    pub snapshot_path: Option<String>,
}

/// Governance configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Lifetime of an emergency override request
    pub emergency_window_minutes: i64,

    /// Audit entries returned when the caller gives no limit
    pub audit_default_limit: usize,

    /// Upper bound on any audit listing
    pub audit_max_limit: usize,

    /// Overrides granted when matching requests are approved
    pub grant_rules: Vec<GrantRuleConfig>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            emergency_window_minutes: 60,
            audit_default_limit: 50,
            audit_max_limit: 200,
            grant_rules: vec![GrantRuleConfig {
                area: "Pricing & billing".to_string(),
                title_patterns: vec!["buying price".to_string()],
                level: default_grant_level(),
            }],
        }
    }
}

/// A single derived-grant rule
///
/// ```toml
/// [[governance.grant_rules]]
/// area = "Pricing & billing"
/// title_patterns = ["buying price"]
/// level = "read"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GrantRuleConfig {
    pub area: String,

    /// Case-insensitive regexes matched against the request title
    #[serde(default)]
    pub title_patterns: Vec<String>,

    #[serde(default = "default_grant_level")]
    pub level: String,
}

fn default_grant_level() -> String {
    "read".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenConfig>,
}

/// Maps a bearer token to the user it authenticates
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub token: SecretString,
    pub user_id: String,
}

/// User document seeded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// SUPER_ADMIN, ADMIN or GUEST
    pub role: String,
    /// Initial overrides, area to level
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
