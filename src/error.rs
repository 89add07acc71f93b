//! Error types for gemvault
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API,
//! and convert to HTTP responses at the boundary (see [`http`]).

pub mod http;

use crate::access_control::{Area, PermissionLevel};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Access control errors
#[derive(Error, Debug, Clone)]
#[error("Access denied on '{area}': {reason}")]
pub struct AccessDeniedError {
    pub area: String,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(area: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient(area: &Area, required: PermissionLevel, actual: PermissionLevel) -> Self {
        Self {
            area: area.to_string(),
            reason: format!("requires '{}' but actor has '{}'", required, actual),
        }
    }
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Unknown token")]
    UnknownToken,

    #[error("Token refers to unknown user '{0}'")]
    UnknownUser(String),

    #[error("User lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by governance operations
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    AccessDenied(#[from] AccessDeniedError),

    #[error("Authentication required: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl GovernanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        GovernanceError::Validation(message.into())
    }

    pub fn missing_field(field: &str) -> Self {
        GovernanceError::Validation(format!("{} is required", field))
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        GovernanceError::NotFound {
            resource,
            id: id.into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for governance operations
pub type GovernanceResult<T> = std::result::Result<T, GovernanceError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
