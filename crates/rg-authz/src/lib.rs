//! Rolegate Authorization Core
//!
//! Decides whether a principal may proceed, based on the roles it holds:
//! - `group` - [`RolesGroup`], an inclusion/exclusion matching rule
//! - `builder` - [`RolesGroupBuilder`], persistent construction of groups
//! - `manager` - [`RolesEvaluator`] and the store-backed [`RolesManager`]
//! - `gate` - [`AuthorizationGate`] and its tower/axum middleware
//!
//! Persistence is delegated to an [`rg_store::AssociationStore`]; authentication
//! is delegated to a [`PrincipalSource`].

pub mod builder;
pub mod gate;
pub mod group;
pub mod manager;

pub use builder::RolesGroupBuilder;
pub use gate::{
    AuthorizationGate, Decision, Denial, ExtensionPrincipalSource, PrincipalSource, Rejection,
    RolesLayer, RolesService,
};
pub use group::RolesGroup;
pub use manager::{RolesEvaluator, RolesManager};

pub use rg_store::{Result, StoreError};
