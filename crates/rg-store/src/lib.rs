//! Rolegate Association Store
//!
//! A role association is the persisted fact "principal P holds role R".
//! [`AssociationStore`] is the narrow contract the authorization core needs from
//! persistence; backends decide how to keep it consistent.
//!
//! Backends:
//! - [`memory::InMemoryAssociationStore`] - process-local, for tests and dev
//! - `sqlite::SqliteAssociationStore` - durable, behind the `sqlite` feature

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rg_common::{PrincipalId, RoleIdentifier};
use serde::Serialize;

pub mod error;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Binds one role to one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssociation<R> {
    /// Assigned by the store when the association is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub role: R,

    pub owner_id: PrincipalId,

    pub created_at: DateTime<Utc>,
}

impl<R: RoleIdentifier> RoleAssociation<R> {
    /// An association not yet saved by any store
    pub fn new(role: R, owner_id: PrincipalId) -> Self {
        Self {
            id: None,
            role,
            owner_id,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn persisted(role: R, owner_id: PrincipalId) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            ..Self::new(role, owner_id)
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Persistence contract for role associations.
///
/// `add` and `remove` are check-then-act: the implementation must serialize
/// them per (owner, role) key so that of two concurrent `add` calls for the
/// same key exactly one succeeds and the other sees `DuplicateRole`, and of two
/// concurrent `remove` calls exactly one succeeds and the other sees
/// `RoleNotFound`.
#[async_trait]
pub trait AssociationStore<R: RoleIdentifier>: Send + Sync {
    /// Whether `owner` holds `role`
    async fn has(&self, owner: &PrincipalId, role: &R) -> Result<bool>;

    /// Whether `owner` holds at least one of `roles`, as a single existence
    /// query. An empty set is never held.
    async fn has_any(&self, owner: &PrincipalId, roles: &HashSet<R>) -> Result<bool>;

    /// Create the association. Fails with `DuplicateRole` if it already exists.
    async fn add(&self, owner: &PrincipalId, role: &R) -> Result<RoleAssociation<R>>;

    /// Destroy the association. Fails with `RoleNotFound` if it does not exist.
    async fn remove(&self, owner: &PrincipalId, role: &R) -> Result<()>;

    /// All live associations of `owner`, oldest first
    async fn list(&self, owner: &PrincipalId) -> Result<Vec<RoleAssociation<R>>>;
}

#[async_trait]
impl<R, S> AssociationStore<R> for std::sync::Arc<S>
where
    R: RoleIdentifier,
    S: AssociationStore<R> + ?Sized,
{
    async fn has(&self, owner: &PrincipalId, role: &R) -> Result<bool> {
        (**self).has(owner, role).await
    }

    async fn has_any(&self, owner: &PrincipalId, roles: &HashSet<R>) -> Result<bool> {
        (**self).has_any(owner, roles).await
    }

    async fn add(&self, owner: &PrincipalId, role: &R) -> Result<RoleAssociation<R>> {
        (**self).add(owner, role).await
    }

    async fn remove(&self, owner: &PrincipalId, role: &R) -> Result<()> {
        (**self).remove(owner, role).await
    }

    async fn list(&self, owner: &PrincipalId) -> Result<Vec<RoleAssociation<R>>> {
        (**self).list(owner).await
    }
}
