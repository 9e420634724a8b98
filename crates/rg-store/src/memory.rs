//! In-memory association store
//!
//! Not durable: all associations are lost on restart. Associations are sharded
//! per principal in a `DashMap`; each add/remove runs its existence check and its
//! mutation under the same shard lock, which is what makes concurrent duplicate
//! adds and double removes resolve to a single winner.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use rg_common::{PrincipalId, RoleIdentifier};
use tracing::debug;

use crate::{AssociationStore, Result, RoleAssociation, StoreError};

pub struct InMemoryAssociationStore<R: RoleIdentifier> {
    associations: DashMap<PrincipalId, HashMap<R, RoleAssociation<R>>>,
}

impl<R: RoleIdentifier> InMemoryAssociationStore<R> {
    pub fn new() -> Self {
        Self {
            associations: DashMap::new(),
        }
    }

    /// Number of principals holding at least one role
    pub fn principal_count(&self) -> usize {
        self.associations.len()
    }

    fn insert(&self, owner: &PrincipalId, role: &R) -> Result<RoleAssociation<R>> {
        let mut held = self.associations.entry(owner.clone()).or_default();
        if held.contains_key(role) {
            return Err(StoreError::duplicate_role(owner, role));
        }

        let association = RoleAssociation::persisted(*role, owner.clone());
        held.insert(*role, association.clone());
        Ok(association)
    }

    fn delete(&self, owner: &PrincipalId, role: &R) -> Result<()> {
        let removed = match self.associations.get_mut(owner) {
            Some(mut held) => held.remove(role).is_some(),
            None => false,
        };

        if !removed {
            return Err(StoreError::role_not_found(owner, role));
        }

        // Drop the shard entry once the principal holds nothing
        self.associations.remove_if(owner, |_, held| held.is_empty());
        Ok(())
    }
}

impl<R: RoleIdentifier> Default for InMemoryAssociationStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: RoleIdentifier> AssociationStore<R> for InMemoryAssociationStore<R> {
    async fn has(&self, owner: &PrincipalId, role: &R) -> Result<bool> {
        Ok(self
            .associations
            .get(owner)
            .is_some_and(|held| held.contains_key(role)))
    }

    async fn has_any(&self, owner: &PrincipalId, roles: &HashSet<R>) -> Result<bool> {
        Ok(self
            .associations
            .get(owner)
            .is_some_and(|held| roles.iter().any(|role| held.contains_key(role))))
    }

    async fn add(&self, owner: &PrincipalId, role: &R) -> Result<RoleAssociation<R>> {
        let association = self.insert(owner, role)?;
        debug!(principal_id = %owner, role = role.as_str(), "Role association added");
        Ok(association)
    }

    async fn remove(&self, owner: &PrincipalId, role: &R) -> Result<()> {
        self.delete(owner, role)?;
        debug!(principal_id = %owner, role = role.as_str(), "Role association removed");
        Ok(())
    }

    async fn list(&self, owner: &PrincipalId) -> Result<Vec<RoleAssociation<R>>> {
        let mut associations: Vec<RoleAssociation<R>> = self
            .associations
            .get(owner)
            .map(|held| held.values().cloned().collect())
            .unwrap_or_default();

        associations.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.role.as_str().cmp(b.role.as_str()))
        });
        Ok(associations)
    }
}
