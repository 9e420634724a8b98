//! Roles Groups
//!
//! A group matches principals holding at least one included role and none of
//! the excluded roles.

use std::collections::HashSet;

use rg_common::{InvalidRole, RoleIdentifier};

/// Immutable inclusion/exclusion rule over roles.
///
/// Groups built with [`RolesGroupBuilder`](crate::RolesGroupBuilder) always have
/// disjoint sets. [`RolesGroup::new`] accepts overlapping sets; a role present
/// in both is required and forbidden at once, which makes the group unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolesGroup<R: RoleIdentifier> {
    included_roles: HashSet<R>,
    excluded_roles: HashSet<R>,
}

impl<R: RoleIdentifier> RolesGroup<R> {
    pub fn new(included_roles: HashSet<R>, excluded_roles: HashSet<R>) -> Self {
        Self {
            included_roles,
            excluded_roles,
        }
    }

    /// Group with one included role and no excluded roles
    pub fn single(role: R) -> Self {
        Self::new(HashSet::from([role]), HashSet::new())
    }

    /// Build a group from stored or configured role names
    pub fn from_names<I, E>(include: I, exclude: E) -> Result<Self, InvalidRole>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let included_roles = include
            .into_iter()
            .map(|name| R::decode(name.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;
        let excluded_roles = exclude
            .into_iter()
            .map(|name| R::decode(name.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(crate::RolesGroupBuilder::empty()
            .include_all(included_roles)
            .exclude_all(excluded_roles)
            .build())
    }

    /// Roles a principal must hold at least one of
    pub fn included_roles(&self) -> &HashSet<R> {
        &self.included_roles
    }

    /// Roles a principal must hold none of
    pub fn excluded_roles(&self) -> &HashSet<R> {
        &self.excluded_roles
    }

    /// No principal can ever match: either nothing is included, or every
    /// included role is also excluded.
    pub fn is_unsatisfiable(&self) -> bool {
        self.included_roles.is_subset(&self.excluded_roles)
    }
}
