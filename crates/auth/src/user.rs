//! User account entity and registration validation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_core::{DomainError, UserId};

use crate::Role;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Normalized (trimmed, lowercased); unique.
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Validated registration input (password still in plain text, hash it next).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(email: &str, password: &str, name: &str) -> Result<Self, DomainError> {
        let email = normalize_email(email)?;

        let len = password.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at most {MAX_PASSWORD_LEN} characters"
            )));
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        Ok(Self {
            email,
            name: name.to_string(),
            password: password.to_string(),
        })
    }

    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            email: self.email,
            name: self.name,
            role: Role::Customer,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim + lowercase, then a structural check (one `@`, dotted domain).
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    let invalid = || DomainError::validation("email address is invalid");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "jane", "@example.com", "jane@", "jane@example", "a@b@c.com", "jane@.com", "ja ne@x.io"] {
            assert!(normalize_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn password_and_name_rules() {
        assert!(NewUser::validate("a@b.io", "short", "Ann").is_err());
        assert!(NewUser::validate("a@b.io", &"x".repeat(129), "Ann").is_err());
        assert!(NewUser::validate("a@b.io", "longenough", "   ").is_err());

        let nu = NewUser::validate("A@B.io", "longenough", "  Ann ").unwrap();
        assert_eq!(nu.email, "a@b.io");
        assert_eq!(nu.name, "Ann");
    }

    #[test]
    fn new_accounts_are_customers_and_profiles_hide_hash() {
        let user = NewUser::validate("a@b.io", "longenough", "Ann")
            .unwrap()
            .into_user("$argon2id$fake".into(), Utc::now());
        assert_eq!(user.role, Role::Customer);

        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "customer");
    }
}
