//! Roles Evaluation
//!
//! [`RolesEvaluator`] is the seam the gate depends on. [`RolesManager`] is the
//! store-backed implementation, and also the entry point for granting and
//! revoking roles.

use std::marker::PhantomData;

use async_trait::async_trait;
use rg_common::{Principal, PrincipalId, RoleIdentifier};
use rg_store::{AssociationStore, Result, RoleAssociation, StoreError};
use tracing::{debug, info};

use crate::RolesGroup;

/// Answers role questions about a principal
#[async_trait]
pub trait RolesEvaluator<R: RoleIdentifier>: Send + Sync {
    /// Whether the principal holds `role`
    async fn satisfies_role(&self, principal: &dyn Principal, role: &R) -> Result<bool>;

    /// Whether the principal holds at least one included role of `group` and
    /// none of its excluded roles
    async fn satisfies(&self, principal: &dyn Principal, group: &RolesGroup<R>) -> Result<bool>;
}

#[async_trait]
impl<R, E> RolesEvaluator<R> for std::sync::Arc<E>
where
    R: RoleIdentifier,
    E: RolesEvaluator<R> + ?Sized,
{
    async fn satisfies_role(&self, principal: &dyn Principal, role: &R) -> Result<bool> {
        (**self).satisfies_role(principal, role).await
    }

    async fn satisfies(&self, principal: &dyn Principal, group: &RolesGroup<R>) -> Result<bool> {
        (**self).satisfies(principal, group).await
    }
}

fn owner_id(principal: &dyn Principal) -> Result<&PrincipalId> {
    principal.principal_id().ok_or(StoreError::MissingPrincipalId)
}

/// Role management and evaluation over an [`AssociationStore`]
pub struct RolesManager<R, S> {
    store: S,
    _role: PhantomData<fn() -> R>,
}

impl<R, S> RolesManager<R, S>
where
    R: RoleIdentifier,
    S: AssociationStore<R>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _role: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Grant `role`; fails with `DuplicateRole` if the principal already holds it
    pub async fn add_role(&self, principal: &dyn Principal, role: R) -> Result<RoleAssociation<R>> {
        let owner = owner_id(principal)?;
        let association = self.store.add(owner, &role).await?;
        info!(principal_id = %owner, role = role.as_str(), "Role granted");
        Ok(association)
    }

    /// Revoke `role`; fails with `RoleNotFound` if the principal does not hold it
    pub async fn remove_role(&self, principal: &dyn Principal, role: R) -> Result<()> {
        let owner = owner_id(principal)?;
        self.store.remove(owner, &role).await?;
        info!(principal_id = %owner, role = role.as_str(), "Role revoked");
        Ok(())
    }

    pub async fn roles_of(&self, principal: &dyn Principal) -> Result<Vec<RoleAssociation<R>>> {
        self.store.list(owner_id(principal)?).await
    }
}

#[async_trait]
impl<R, S> RolesEvaluator<R> for RolesManager<R, S>
where
    R: RoleIdentifier,
    S: AssociationStore<R>,
{
    async fn satisfies_role(&self, principal: &dyn Principal, role: &R) -> Result<bool> {
        self.store.has(owner_id(principal)?, role).await
    }

    async fn satisfies(&self, principal: &dyn Principal, group: &RolesGroup<R>) -> Result<bool> {
        // A group that requires nothing matches nobody
        if group.included_roles().is_empty() {
            debug!("Roles group has no included roles");
            return Ok(false);
        }

        let owner = owner_id(principal)?;

        if !self.store.has_any(owner, group.included_roles()).await? {
            debug!(principal_id = %owner, "Principal holds no included role");
            return Ok(false);
        }

        if group.excluded_roles().is_empty() {
            return Ok(true);
        }

        let excluded = self.store.has_any(owner, group.excluded_roles()).await?;
        if excluded {
            debug!(principal_id = %owner, "Principal holds an excluded role");
        }
        Ok(!excluded)
    }
}
