//! `storefront-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: the API crate feeds tokens and principals
//! in, stores feed users in.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256Jwt, JwtIssuer, JwtValidator, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{role_permissions, Permission};
pub use roles::Role;
pub use user::{normalize_email, NewUser, User, UserProfile};
