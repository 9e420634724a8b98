//! Roles Group Builder
//!
//! Every operation returns a new builder and leaves the receiver untouched, so
//! a partially built group can be shared and extended in different directions
//! without aliasing.
//!
//! ```rust,ignore
//! let members = RolesGroupBuilder::empty()
//!     .include(AppRole::Confirmed)
//!     .exclude(AppRole::Unconfirmed)
//!     .build();
//! ```

use std::collections::HashSet;

use rg_common::{all_roles, RoleIdentifier};

use crate::RolesGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolesGroupBuilder<R: RoleIdentifier> {
    group: RolesGroup<R>,
}

impl<R: RoleIdentifier> RolesGroupBuilder<R> {
    pub fn empty() -> Self {
        Self::from_sets(HashSet::new(), HashSet::new())
    }

    fn from_sets(included: HashSet<R>, excluded: HashSet<R>) -> Self {
        Self {
            group: RolesGroup::new(included, excluded),
        }
    }

    /// Current snapshot of the group being built
    pub fn roles_group(&self) -> &RolesGroup<R> {
        &self.group
    }

    pub fn build(&self) -> RolesGroup<R> {
        self.group.clone()
    }

    /// Require `role`; it stops being excluded if it was
    pub fn include(&self, role: R) -> Self {
        self.include_all([role])
    }

    pub fn include_all(&self, roles: impl IntoIterator<Item = R>) -> Self {
        let mut included = self.group.included_roles().clone();
        let mut excluded = self.group.excluded_roles().clone();
        for role in roles {
            excluded.remove(&role);
            included.insert(role);
        }
        Self::from_sets(included, excluded)
    }

    /// Forbid `role`; it stops being included if it was
    pub fn exclude(&self, role: R) -> Self {
        self.exclude_all([role])
    }

    pub fn exclude_all(&self, roles: impl IntoIterator<Item = R>) -> Self {
        let mut included = self.group.included_roles().clone();
        let mut excluded = self.group.excluded_roles().clone();
        for role in roles {
            included.remove(&role);
            excluded.insert(role);
        }
        Self::from_sets(included, excluded)
    }

    /// Match principals holding exactly `role` and no other role of the domain.
    /// Discards everything built so far.
    pub fn include_exactly(&self, role: R) -> Self {
        let mut others = all_roles::<R>();
        others.remove(&role);
        Self::from_sets(HashSet::from([role]), others)
    }

    /// Match principals holding any role except `role`.
    /// Discards everything built so far.
    pub fn exclude_exactly(&self, role: R) -> Self {
        let mut others = all_roles::<R>();
        others.remove(&role);
        Self::from_sets(others, HashSet::from([role]))
    }
}

impl<R: RoleIdentifier> Default for RolesGroupBuilder<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: RoleIdentifier> From<RolesGroupBuilder<R>> for RolesGroup<R> {
    fn from(builder: RolesGroupBuilder<R>) -> Self {
        builder.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    rg_common::define_roles! {
        enum TestRole {
            Unconfirmed => "unconfirmed",
            Confirmed => "confirmed",
            Admin => "admin",
        }
    }

    use TestRole::{Admin, Confirmed, Unconfirmed};

    fn set<const N: usize>(roles: [TestRole; N]) -> HashSet<TestRole> {
        HashSet::from(roles)
    }

    fn builder() -> RolesGroupBuilder<TestRole> {
        RolesGroupBuilder::empty()
    }

    #[test]
    fn test_empty() {
        let group = builder().build();
        assert!(group.included_roles().is_empty());
        assert!(group.excluded_roles().is_empty());
    }

    #[test]
    fn test_include_once_and_twice() {
        let once = builder().include(Admin).build();
        assert_eq!(once.included_roles(), &set([Admin]));
        assert!(once.excluded_roles().is_empty());

        let twice = builder().include(Admin).include(Admin).build();
        assert_eq!(twice, once);

        let different = builder().include(Admin).include(Confirmed).build();
        assert_eq!(different.included_roles(), &set([Admin, Confirmed]));
    }

    #[test]
    fn test_exclude_once_and_twice() {
        let once = builder().exclude(Admin).build();
        assert!(once.included_roles().is_empty());
        assert_eq!(once.excluded_roles(), &set([Admin]));

        let different = builder().exclude(Admin).exclude(Confirmed).build();
        assert_eq!(different.excluded_roles(), &set([Admin, Confirmed]));
    }

    #[test]
    fn test_last_write_wins_per_role() {
        let excluded_last = builder().include(Admin).exclude(Admin).build();
        assert!(excluded_last.included_roles().is_empty());
        assert_eq!(excluded_last.excluded_roles(), &set([Admin]));

        let included_last = builder().exclude(Admin).include(Admin).build();
        assert_eq!(included_last.included_roles(), &set([Admin]));
        assert!(included_last.excluded_roles().is_empty());
    }

    #[test]
    fn test_include_and_exclude_sets() {
        let overlap = builder()
            .include_all([Admin, Confirmed])
            .include_all([Confirmed, Unconfirmed])
            .build();
        assert_eq!(overlap.included_roles(), &set([Admin, Confirmed, Unconfirmed]));

        let include_then_exclude = builder()
            .include_all([Admin, Confirmed])
            .exclude_all([Confirmed, Unconfirmed])
            .build();
        assert_eq!(include_then_exclude.included_roles(), &set([Admin]));
        assert_eq!(include_then_exclude.excluded_roles(), &set([Confirmed, Unconfirmed]));

        let exclude_then_include = builder()
            .exclude_all([Admin, Confirmed])
            .include_all([Confirmed, Unconfirmed])
            .build();
        assert_eq!(exclude_then_include.included_roles(), &set([Confirmed, Unconfirmed]));
        assert_eq!(exclude_then_include.excluded_roles(), &set([Admin]));
    }

    #[test]
    fn test_include_exactly_overwrites_state() {
        let fresh = builder().include_exactly(Admin).build();
        let overwritten = builder()
            .include(Confirmed)
            .exclude(Admin)
            .include_exactly(Admin)
            .build();

        for group in [fresh, overwritten] {
            assert_eq!(group.included_roles(), &set([Admin]));
            assert_eq!(group.excluded_roles(), &set([Confirmed, Unconfirmed]));
        }
    }

    #[test]
    fn test_exclude_exactly_overwrites_state() {
        let fresh = builder().exclude_exactly(Admin).build();
        let overwritten = builder()
            .exclude(Confirmed)
            .include(Admin)
            .exclude_exactly(Admin)
            .build();

        for group in [fresh, overwritten] {
            assert_eq!(group.included_roles(), &set([Confirmed, Unconfirmed]));
            assert_eq!(group.excluded_roles(), &set([Admin]));
        }
    }

    #[test]
    fn test_builder_is_persistent() {
        let base = builder().include(Confirmed);
        let strict = base.exclude(Unconfirmed);
        let loose = base.include(Unconfirmed);

        assert_eq!(base.roles_group().included_roles(), &set([Confirmed]));
        assert!(base.roles_group().excluded_roles().is_empty());
        assert_eq!(strict.roles_group().excluded_roles(), &set([Unconfirmed]));
        assert_eq!(loose.roles_group().included_roles(), &set([Confirmed, Unconfirmed]));
    }

    #[test]
    fn test_built_groups_are_disjoint() {
        let group = builder()
            .include_all([Admin, Confirmed, Unconfirmed])
            .exclude(Confirmed)
            .include(Confirmed)
            .exclude_all([Unconfirmed])
            .build();
        assert!(group.included_roles().is_disjoint(group.excluded_roles()));
    }
}
