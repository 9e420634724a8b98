use std::time::Duration;

use rg_common::{InvalidRole, PrincipalId, RoleIdentifier};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate role: principal {owner_id} already holds role {role}")]
    DuplicateRole { owner_id: PrincipalId, role: String },

    #[error("Role not found: principal {owner_id} does not hold role {role}")]
    RoleNotFound { owner_id: PrincipalId, role: String },

    #[error("Principal has no persisted identifier")]
    MissingPrincipalId,

    #[error(transparent)]
    InvalidRole(#[from] InvalidRole),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn duplicate_role<R: RoleIdentifier>(owner_id: &PrincipalId, role: &R) -> Self {
        Self::DuplicateRole {
            owner_id: owner_id.clone(),
            role: role.encode(),
        }
    }

    pub fn role_not_found<R: RoleIdentifier>(owner_id: &PrincipalId, role: &R) -> Self {
        Self::RoleNotFound {
            owner_id: owner_id.clone(),
            role: role.encode(),
        }
    }

    /// True for failures of the persistence collaborator itself, as opposed to
    /// business-rule violations the caller asked for.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
