//! Permission guard used by handlers before touching a store.

use storefront_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the request principal holds `permission` under its role's policy.
pub fn authorize_permission(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(&principal.principal(), permission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::Role;
    use storefront_auth::permissions::{CART_WRITE, CATALOG_MANAGE};
    use storefront_core::UserId;

    #[test]
    fn customer_cannot_manage_catalog() {
        let principal = PrincipalContext::new(UserId::new(), "c@shop.io", Role::Customer);
        assert!(authorize_permission(&principal, &CART_WRITE).is_ok());
        assert!(matches!(
            authorize_permission(&principal, &CATALOG_MANAGE),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_holds_everything() {
        let principal = PrincipalContext::new(UserId::new(), "a@shop.io", Role::Admin);
        assert!(authorize_permission(&principal, &CATALOG_MANAGE).is_ok());
        assert!(authorize_permission(&principal, &Permission::new("anything.at.all")).is_ok());
    }
}
