//! Principals
//!
//! A principal is anything that can hold roles. Rolegate never owns principals;
//! it only needs the persisted identifier to key role associations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Persisted identifier of a principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An authenticated entity capable of holding roles.
///
/// `principal_id` is `None` until the principal has been persisted; role
/// operations on such a principal fail instead of guessing an owner.
pub trait Principal: Send + Sync {
    fn principal_id(&self) -> Option<&PrincipalId>;
}

impl Principal for PrincipalId {
    fn principal_id(&self) -> Option<&PrincipalId> {
        Some(self)
    }
}

impl<P: Principal + ?Sized> Principal for Arc<P> {
    fn principal_id(&self) -> Option<&PrincipalId> {
        (**self).principal_id()
    }
}

impl<P: Principal + ?Sized> Principal for &P {
    fn principal_id(&self) -> Option<&PrincipalId> {
        (**self).principal_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_id_is_its_own_principal() {
        let id = PrincipalId::new("user-1");
        assert_eq!(id.principal_id(), Some(&id));
        assert_eq!(id.to_string(), "user-1");
    }

    #[test]
    fn test_principal_id_serializes_transparently() {
        let id = PrincipalId::from("svc-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""svc-42""#);
    }

    #[test]
    fn test_shared_principal_delegates() {
        let shared: Arc<PrincipalId> = Arc::new("user-2".into());
        assert_eq!(shared.principal_id().map(PrincipalId::as_str), Some("user-2"));
    }
}
