//! Access control types
//!
//! Core types used by the access control system: the permission level
//! lattice, roles, policy areas and the authenticated actor.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Permission level, totally ordered `none < limited < read < manage < full`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    None,
    Limited,
    Read,
    Manage,
    Full,
}

impl PermissionLevel {
    /// Get the level name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Limited => "limited",
            PermissionLevel::Read => "read",
            PermissionLevel::Manage => "manage",
            PermissionLevel::Full => "full",
        }
    }

    /// Position in the lattice
    pub const fn rank(&self) -> u8 {
        *self as u8
    }

    /// Strict parse, used at write boundaries
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(PermissionLevel::None),
            "limited" => Some(PermissionLevel::Limited),
            "read" => Some(PermissionLevel::Read),
            "manage" => Some(PermissionLevel::Manage),
            "full" => Some(PermissionLevel::Full),
            _ => None,
        }
    }

    /// Lenient decode for persisted data: anything unrecognised is `none`
    pub fn decode(s: &str) -> Self {
        Self::try_parse(s.trim()).unwrap_or(PermissionLevel::None)
    }

    /// Whether this level satisfies `required`
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        self.rank() >= required.rank()
    }

    /// Get all levels in ascending order
    pub fn all() -> &'static [PermissionLevel] {
        &[
            PermissionLevel::None,
            PermissionLevel::Limited,
            PermissionLevel::Read,
            PermissionLevel::Manage,
            PermissionLevel::Full,
        ]
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for PermissionLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::decode).unwrap_or_default())
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Guest,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Guest => "GUEST",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "ADMIN" => Some(Role::Admin),
            "GUEST" => Some(Role::Guest),
            _ => None,
        }
    }

    /// Unknown persisted roles fall back to the least privileged role
    pub fn decode(s: &str) -> Self {
        Self::try_parse(&s.trim().to_ascii_uppercase()).unwrap_or(Role::Guest)
    }

    pub fn all() -> &'static [Role] {
        &[Role::SuperAdmin, Role::Admin, Role::Guest]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::decode(&raw))
    }
}

/// Policy area, identified by its exact label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Area(Cow<'static, str>);

impl Area {
    pub const INVENTORY: Area = Area(Cow::Borrowed("Inventory & products"));
    pub const CERTIFICATES: Area = Area(Cow::Borrowed("Certificates"));
    pub const USER_MANAGEMENT: Area = Area(Cow::Borrowed("User management"));
    pub const PRICING: Area = Area(Cow::Borrowed("Pricing & billing"));
    pub const SECURITY_SETTINGS: Area = Area(Cow::Borrowed("Security settings"));
    pub const AUDIT_LOGS: Area = Area(Cow::Borrowed("Audit logs"));

    pub fn new(label: impl Into<String>) -> Self {
        Area(Cow::Owned(label.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive label comparison
    pub fn matches_label(&self, label: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(label.trim())
    }

    /// The six areas every deployment starts with
    pub fn well_known() -> [Area; 6] {
        [
            Area::INVENTORY,
            Area::CERTIFICATES,
            Area::USER_MANAGEMENT,
            Area::PRICING,
            Area::SECURITY_SETTINGS,
            Area::AUDIT_LOGS,
        ]
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Area {
    fn from(label: &str) -> Self {
        Area::new(label)
    }
}

/// Sparse per-user overrides. A missing area means "use the role default".
pub type PermissionMap = BTreeMap<Area, PermissionLevel>;

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: PermissionMap,
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            role,
            permissions: PermissionMap::new(),
        }
    }

    pub fn with_override(mut self, area: Area, level: PermissionLevel) -> Self {
        self.permissions.insert(area, level);
        self
    }

    /// Display string used for attribution (email, else name, else id)
    pub fn display_name(&self) -> &str {
        if !self.email.is_empty() {
            &self.email
        } else {
            self.name.as_deref().unwrap_or(&self.id)
        }
    }
}
