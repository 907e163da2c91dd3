//! Environment configuration.
//!
//! Every setting has a default except `DATABASE_URL`, which is required only
//! when persistent stores are enabled. A value that is present but does not
//! parse fails startup.

use std::{collections::HashMap, env, fmt::Display, net::SocketAddr, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const MAX_JWT_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required when {1} is set")]
    Missing(&'static str, &'static str),
}

/// Credentials for an admin account created at startup if absent.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub admin: Option<AdminSeed>,
    pub low_stock_threshold: i32,
    pub body_limit_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_minutes: 60,
            use_persistent_stores: false,
            database_url: None,
            database_max_connections: 5,
            admin: None,
            low_stock_threshold: 5,
            body_limit_bytes: 64 * 1024,
        }
    }
}

impl Config {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        let jwt_ttl_minutes: i64 = parse(&var, "JWT_TTL_MINUTES", defaults.jwt_ttl_minutes)?;
        if jwt_ttl_minutes <= 0 {
            return Err(invalid("JWT_TTL_MINUTES", jwt_ttl_minutes, "must be positive"));
        }
        if jwt_ttl_minutes > MAX_JWT_TTL_MINUTES {
            return Err(invalid(
                "JWT_TTL_MINUTES",
                jwt_ttl_minutes,
                format!("must be at most {MAX_JWT_TTL_MINUTES} (one year)"),
            ));
        }

        let use_persistent_stores = match var("USE_PERSISTENT_STORES") {
            None => defaults.use_persistent_stores,
            Some(raw) => parse_bool(&raw).ok_or_else(|| invalid("USE_PERSISTENT_STORES", &raw, "expected true/false/1/0"))?,
        };

        let database_url = var("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL", "USE_PERSISTENT_STORES"));
        }

        let database_max_connections: u32 = parse(&var, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?;
        if database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", 0, "must be at least 1"));
        }

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD", "ADMIN_EMAIL")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL", "ADMIN_PASSWORD")),
        };

        let low_stock_threshold: i32 = parse(&var, "LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?;
        if low_stock_threshold < 0 {
            return Err(invalid("LOW_STOCK_THRESHOLD", low_stock_threshold, "cannot be negative"));
        }

        let body_limit_bytes: usize = parse(&var, "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?;
        if body_limit_bytes == 0 {
            return Err(invalid("BODY_LIMIT_BYTES", 0, "must be positive"));
        }

        Ok(Self {
            bind_addr: parse(&var, "BIND_ADDR", defaults.bind_addr)?,
            jwt_secret,
            jwt_ttl_minutes,
            use_persistent_stores,
            database_url,
            database_max_connections,
            admin,
            low_stock_threshold,
            body_limit_bytes,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, &raw, e)),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: impl Display, reason: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        Config::from_map(&pairs.iter().copied().collect())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn values_are_parsed() {
        let config = load(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_MINUTES", "15"),
            ("USE_PERSISTENT_STORES", "TRUE"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DATABASE_MAX_CONNECTIONS", "10"),
            ("ADMIN_EMAIL", "root@shop.io"),
            ("ADMIN_PASSWORD", "changeme123"),
            ("LOW_STOCK_THRESHOLD", "2"),
            ("BODY_LIMIT_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_ttl_minutes, 15);
        assert!(config.use_persistent_stores);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.admin.as_ref().map(|a| a.email.as_str()), Some("root@shop.io"));
        assert_eq!(config.low_stock_threshold, 2);
        assert_eq!(config.body_limit_bytes, 1024);
    }

    #[test]
    fn unparseable_values_fail() {
        assert!(matches!(
            load(&[("JWT_TTL_MINUTES", "soon")]),
            Err(ConfigError::Invalid { key: "JWT_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            load(&[("JWT_TTL_MINUTES", "0")]),
            Err(ConfigError::Invalid { key: "JWT_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            load(&[("JWT_TTL_MINUTES", "200000000000")]),
            Err(ConfigError::Invalid { key: "JWT_TTL_MINUTES", .. })
        ));
        assert_eq!(load(&[("JWT_TTL_MINUTES", "525600")]).unwrap().jwt_ttl_minutes, MAX_JWT_TTL_MINUTES);
        assert!(matches!(
            load(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[("USE_PERSISTENT_STORES", "maybe")]),
            Err(ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. })
        ));
    }

    #[test]
    fn persistent_mode_needs_database_url() {
        assert_eq!(
            load(&[("USE_PERSISTENT_STORES", "1")]),
            Err(ConfigError::Missing("DATABASE_URL", "USE_PERSISTENT_STORES"))
        );
    }

    #[test]
    fn admin_seed_needs_both_halves() {
        assert_eq!(
            load(&[("ADMIN_EMAIL", "root@shop.io")]),
            Err(ConfigError::Missing("ADMIN_PASSWORD", "ADMIN_EMAIL"))
        );
    }

    #[test]
    fn admin_password_is_redacted_in_debug() {
        let seed = AdminSeed {
            email: "root@shop.io".into(),
            password: "hunter22".into(),
        };
        assert!(!format!("{seed:?}").contains("hunter22"));
    }
}
