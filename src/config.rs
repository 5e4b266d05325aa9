// Environment-driven server configuration
use std::env;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 9999;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No JWT Key defined in environment")]
    MissingSigningKey,
}

/// Process configuration, assembled once at startup.
///
/// The signing key is mandatory: the server refuses to start without one so
/// that session tokens can never be issued unsigned. The admin seed values
/// are only consulted when the store has no administrator account yet.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub signing_key: String,
    pub port: u16,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `JWT_KEY` must be present and non-empty. The listen port comes from
    /// `TRACKSYNC_PORT`, falling back to `PORT`, falling back to 9999.
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_key = env::var("JWT_KEY").unwrap_or_default();
        if signing_key.is_empty() {
            return Err(ConfigError::MissingSigningKey);
        }

        let port = env::var("TRACKSYNC_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            signing_key,
            port,
            admin_email: non_empty(env::var("ADMIN_EMAIL").ok()),
            admin_password: non_empty(env::var("ADMIN_PASSWORD").ok()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so every case lives in one
    // test function to keep them from racing each other.
    #[test]
    fn from_env_reads_key_port_and_seed() {
        env::remove_var("JWT_KEY");
        env::remove_var("TRACKSYNC_PORT");
        env::remove_var("PORT");
        env::remove_var("ADMIN_EMAIL");
        env::remove_var("ADMIN_PASSWORD");

        assert!(AppConfig::from_env().is_err());

        env::set_var("JWT_KEY", "");
        assert!(AppConfig::from_env().is_err());

        env::set_var("JWT_KEY", "unit-test-key");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.admin_email, None);

        env::set_var("PORT", "8080");
        assert_eq!(AppConfig::from_env().unwrap().port, 8080);

        env::set_var("TRACKSYNC_PORT", "7777");
        assert_eq!(AppConfig::from_env().unwrap().port, 7777);

        env::set_var("TRACKSYNC_PORT", "not-a-port");
        env::remove_var("PORT");
        assert_eq!(AppConfig::from_env().unwrap().port, DEFAULT_PORT);

        env::set_var("ADMIN_EMAIL", "root@example.com");
        env::set_var("ADMIN_PASSWORD", "");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.admin_email.as_deref(), Some("root@example.com"));
        assert_eq!(config.admin_password, None);

        env::remove_var("JWT_KEY");
        env::remove_var("TRACKSYNC_PORT");
        env::remove_var("ADMIN_EMAIL");
        env::remove_var("ADMIN_PASSWORD");
    }
}
