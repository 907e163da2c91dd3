use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::UserId;

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// `iat` / `exp` are unix seconds, as registered in RFC 7519.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    pub email: String,

    pub role: Role,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

impl JwtClaims {
    /// Returns `None` when `issued_at + ttl` is not a representable instant.
    pub fn new(
        sub: UserId,
        email: impl Into<String>,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(ttl)?;
        Some(Self {
            sub,
            email: email.into(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of a set of claims.
///
/// Signature verification happens before this, in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims::new(UserId::new(), "a@example.com", Role::Customer, now, Duration::minutes(10)).unwrap()
    }

    #[test]
    fn unrepresentable_expiry_is_none() {
        let ttl = Duration::days(365 * 300_000);
        assert!(JwtClaims::new(UserId::new(), "a@example.com", Role::Customer, Utc::now(), ttl).is_none());
    }

    #[test]
    fn accepts_inside_window() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now), now), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future() {
        let now = Utc::now();
        let c = claims_at(now);
        assert_eq!(
            validate_claims(&c, now + Duration::minutes(10)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, now - Duration::seconds(5)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let mut c = claims_at(now);
        c.exp = c.iat;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
