//! Roles known to the development server

rg_common::define_roles! {
    /// Account roles, from least to most privileged
    pub enum AppRole {
        Unconfirmed => "unconfirmed",
        Confirmed => "confirmed",
        Admin => "admin",
    }
}
