//! Rolegate shared types
//!
//! Identifiers that every other crate speaks in:
//! - [`RoleIdentifier`] - a closed, string-encodable role domain
//! - [`PrincipalId`] / [`Principal`] - who holds roles
//! - [`logging`] - tracing subscriber setup for binaries

pub mod logging;
pub mod principal;
pub mod role;

pub use principal::{Principal, PrincipalId};
pub use role::{all_roles, InvalidRole, RoleIdentifier};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}
