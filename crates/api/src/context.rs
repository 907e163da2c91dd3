use storefront_auth::{JwtClaims, Principal, Role};
use storefront_core::UserId;

/// Authenticated identity for a request, inserted by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
    role: Role,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn principal(&self) -> Principal {
        Principal::from_role(self.user_id, self.role)
    }
}

impl From<JwtClaims> for PrincipalContext {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.email, claims.role)
    }
}
