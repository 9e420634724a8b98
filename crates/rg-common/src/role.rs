//! Role Identifiers
//!
//! Roles are persisted as strings but handled everywhere else as a closed Rust type.
//! A deployment declares its role domain once with [`define_roles!`](crate::define_roles)
//! and gets encoding, decoding and enumeration for free.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// A string did not name any member of the role domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid role: {value}")]
pub struct InvalidRole {
    pub value: String,
}

impl InvalidRole {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

/// A typed, enumerable name for a permission role.
///
/// Implementors supply [`as_str`](Self::as_str) and [`all_roles`](Self::all_roles).
/// `decode` is derived from those two, so every decodable value is a member of
/// `all_roles()` and `decode(r.as_str()) == Ok(r)` holds as long as the string
/// forms are unique.
pub trait RoleIdentifier: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable string form, as stored by association stores.
    fn as_str(&self) -> &'static str;

    /// Every member of the domain.
    fn all_roles() -> &'static [Self];

    fn encode(&self) -> String {
        self.as_str().to_string()
    }

    fn decode(value: &str) -> Result<Self, InvalidRole> {
        Self::all_roles()
            .iter()
            .copied()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| InvalidRole::new(value))
    }
}

/// The whole role domain as a set.
pub fn all_roles<R: RoleIdentifier>() -> HashSet<R> {
    R::all_roles().iter().copied().collect()
}

/// Declare a closed role domain.
///
/// ```rust,ignore
/// rg_common::define_roles! {
///     pub enum AppRole {
///         Unconfirmed => "unconfirmed",
///         Confirmed => "confirmed",
///         Admin => "admin",
///     }
/// }
/// ```
///
/// The generated enum implements [`RoleIdentifier`], `Display`, `FromStr`
/// and serde (as its string form).
#[macro_export]
macro_rules! define_roles {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::RoleIdentifier for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }

            fn all_roles() -> &'static [Self] {
                &[ $( Self::$variant ),+ ]
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::RoleIdentifier::as_str(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::InvalidRole;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as $crate::RoleIdentifier>::decode(s)
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                serializer.serialize_str($crate::RoleIdentifier::as_str(self))
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let raw = <::std::string::String as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::RoleIdentifier>::decode(&raw)
                    .map_err(<D::Error as $crate::__private::serde::de::Error>::custom)
            }
        }
    };
}
