use std::collections::HashSet;

use thiserror::Error;

use storefront_core::UserId;

use crate::{role_permissions, Permission, Role};

/// A resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Build a principal whose permissions come from the static role policy.
    pub fn from_role(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            permissions: role_permissions(role),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{CART_WRITE, CATALOG_MANAGE, USERS_MANAGE};

    #[test]
    fn admin_wildcard_grants_everything() {
        let p = Principal::from_role(UserId::new(), Role::Admin);
        assert!(authorize(&p, &CATALOG_MANAGE).is_ok());
        assert!(authorize(&p, &USERS_MANAGE).is_ok());
        assert!(authorize(&p, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn customer_gets_only_shopping_permissions() {
        let p = Principal::from_role(UserId::new(), Role::Customer);
        assert!(authorize(&p, &CART_WRITE).is_ok());
        assert_eq!(
            authorize(&p, &CATALOG_MANAGE),
            Err(AuthzError::Forbidden("catalog.manage".into()))
        );
    }

    #[test]
    fn empty_permission_set_denies() {
        let p = Principal {
            user_id: UserId::new(),
            role: Role::Customer,
            permissions: vec![],
        };
        assert!(authorize(&p, &CART_WRITE).is_err());
    }
}
