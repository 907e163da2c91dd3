use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "catalog.manage"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");
pub const CATALOG_READ: Permission = Permission::from_static("catalog.read");
pub const CATALOG_MANAGE: Permission = Permission::from_static("catalog.manage");
pub const CART_READ: Permission = Permission::from_static("cart.read");
pub const CART_WRITE: Permission = Permission::from_static("cart.write");
pub const CHECKOUT: Permission = Permission::from_static("checkout");
pub const PROFILE_READ: Permission = Permission::from_static("profile.read");
pub const USERS_MANAGE: Permission = Permission::from_static("admin.users.manage");
pub const STATS_READ: Permission = Permission::from_static("admin.stats.read");

/// Static role → permission policy.
pub fn role_permissions(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![WILDCARD],
        Role::Customer => vec![CATALOG_READ, CART_READ, CART_WRITE, CHECKOUT, PROFILE_READ],
    }
}
