//! HS256 token issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{validate_claims, JwtClaims, TokenValidationError, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or unverifiable token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Mints a bearer token for a user.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError>;
}

pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        // The time window is checked by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims::new(user.id, user.email.clone(), user.role, now, self.ttl)
            .ok_or_else(|| TokenError::Signing(format!("expiry {now} + {} is out of range", self.ttl)))?;
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use storefront_core::UserId;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: "shopper@example.com".into(),
            name: "Shopper".into(),
            role: Role::Admin,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_validates() {
        let jwt = Hs256Jwt::new(b"secret", Duration::minutes(5));
        let u = user();
        let now = Utc::now();
        let token = jwt.issue(&u, now).unwrap();
        let claims = jwt.validate(&token, now).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email, u.email);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256Jwt::new(b"one", Duration::minutes(5)).issue(&user(), now).unwrap();
        let err = Hs256Jwt::new(b"two", Duration::minutes(5)).validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expiry_is_checked_against_supplied_clock() {
        let jwt = Hs256Jwt::new(b"secret", Duration::minutes(5));
        let now = Utc::now();
        let token = jwt.issue(&user(), now).unwrap();
        let err = jwt.validate(&token, now + Duration::minutes(6)).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn overflowing_ttl_fails_to_sign() {
        let jwt = Hs256Jwt::new(b"secret", Duration::days(365 * 300_000));
        let err = jwt.issue(&user(), Utc::now()).unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = Hs256Jwt::new(b"secret", Duration::minutes(5));
        assert!(jwt.validate("not.a.jwt", Utc::now()).is_err());
    }
}
