//! Shared fixtures for authorization tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rg_common::{Principal, PrincipalId};
use rg_store::memory::InMemoryAssociationStore;
use rg_store::{AssociationStore, Result, RoleAssociation, StoreError};

rg_common::define_roles! {
    pub enum TestRole {
        Unconfirmed => "unconfirmed",
        Confirmed => "confirmed",
        Admin => "admin",
    }
}

/// A principal that has not been saved yet and so has no id
#[derive(Debug, Clone)]
pub struct UnsavedUser;

impl Principal for UnsavedUser {
    fn principal_id(&self) -> Option<&PrincipalId> {
        None
    }
}

/// Wraps the in-memory store and records every query issued against it
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryAssociationStore<TestRole>,
    has_calls: AtomicUsize,
    has_any_queries: Mutex<Vec<HashSet<TestRole>>>,
    pub fail_queries: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_queries: true,
            ..Self::default()
        }
    }

    pub async fn grant(&self, owner: &str, roles: &[TestRole]) {
        for role in roles {
            self.inner.add(&PrincipalId::new(owner), role).await.unwrap();
        }
    }

    pub fn has_any_queries(&self) -> Vec<HashSet<TestRole>> {
        self.has_any_queries.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.has_calls.load(Ordering::SeqCst) + self.has_any_queries.lock().len()
    }
}

#[async_trait]
impl AssociationStore<TestRole> for CountingStore {
    async fn has(&self, owner: &PrincipalId, role: &TestRole) -> Result<bool> {
        self.has_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(StoreError::Database("connection refused".to_string()));
        }
        self.inner.has(owner, role).await
    }

    async fn has_any(&self, owner: &PrincipalId, roles: &HashSet<TestRole>) -> Result<bool> {
        self.has_any_queries.lock().push(roles.clone());
        if self.fail_queries {
            return Err(StoreError::Database("connection refused".to_string()));
        }
        self.inner.has_any(owner, roles).await
    }

    async fn add(&self, owner: &PrincipalId, role: &TestRole) -> Result<RoleAssociation<TestRole>> {
        self.inner.add(owner, role).await
    }

    async fn remove(&self, owner: &PrincipalId, role: &TestRole) -> Result<()> {
        self.inner.remove(owner, role).await
    }

    async fn list(&self, owner: &PrincipalId) -> Result<Vec<RoleAssociation<TestRole>>> {
        self.inner.list(owner).await
    }
}
