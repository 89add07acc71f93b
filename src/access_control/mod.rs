//! Access control module
//!
//! Role-based permission resolution for policy areas.
//!
//! ## Access Control Model
//!
//! Permission levels form a total order:
//!
//! ```text
//! none < limited < read < manage < full
//! ```
//!
//! An actor's effective level on an area is resolved with the following
//! precedence (highest to lowest):
//!
//! 1. **Super admin** - role `SUPER_ADMIN` is always `full`
//! 2. **User override** - the actor's own entry for the area
//! 3. **Matrix default** - the policy matrix cell for the actor's role
//! 4. **Built-in default** - for well-known areas missing from the matrix
//!
//! An operation is allowed when the effective level ranks at or above the
//! level it requires.

pub mod defaults;
pub mod patterns;
pub mod resolver;
pub mod types;

pub use defaults::{default_matrix, default_policy, fallback_level};
pub use patterns::PatternMatcher;
pub use resolver::{AccessDecision, AccessResolver, is_allowed, resolve_level};
pub use types::{Actor, Area, PermissionLevel, PermissionMap, Role};
