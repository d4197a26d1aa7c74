//! API server configuration.
//!
//! Built-in defaults, overridden by `MIZAN_*` environment variables
//! (a `.env` file is loaded first by `main`).
//!
//! | Variable                       | Default                      |
//! |--------------------------------|------------------------------|
//! | `MIZAN_HTTP_PORT`              | `8080`                       |
//! | `MIZAN_DB_PATH`                | `./mizan.db`                 |
//! | `MIZAN_DB_MAX_CONNECTIONS`     | `5`                          |
//! | `MIZAN_JWT_SECRET`             | development secret           |
//! | `MIZAN_JWT_LIFETIME_SECS`      | `28800` (8 hours)            |
//! | `MIZAN_UTC_OFFSET_MINUTES`     | `0`                          |
//! | `MIZAN_REPORT_TOP_N`           | `10`                         |

use chrono::{FixedOffset, Offset, Utc};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};

const DEV_JWT_SECRET: &str = "mizan-dev-secret-change-in-production";

/// Largest real-world UTC offset, in minutes (UTC+14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub db_path: String,

    pub db_max_connections: u32,

    /// HS256 secret shared with whoever issues tokens
    pub jwt_secret: String,

    /// Lifetime of tokens issued by [`crate::auth::JwtManager::issue_token`]
    pub jwt_lifetime_secs: i64,

    /// Offset of the store's local calendar, used for report days
    pub utc_offset_minutes: i32,

    /// Default number of best sellers in reports
    pub report_top_n: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            db_path: "./mizan.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 8 * 3600,
            utc_offset_minutes: 0,
            report_top_n: mizan_core::report::DEFAULT_TOP_N,
        }
    }
}

impl ApiConfig {
    /// Load configuration from `MIZAN_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("MIZAN"))
    }

    /// Load configuration from the given environment source.
    pub fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config: ApiConfig = Config::builder()
            .set_default("http_port", i64::from(defaults.http_port))?
            .set_default("db_path", defaults.db_path)?
            .set_default("db_max_connections", i64::from(defaults.db_max_connections))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_lifetime_secs", defaults.jwt_lifetime_secs)?
            .set_default("utc_offset_minutes", i64::from(defaults.utc_offset_minutes))?
            .set_default("report_top_n", defaults.report_top_n as i64)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("MIZAN_JWT_SECRET".to_string()));
        }
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("MIZAN_DB_PATH".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("MIZAN_DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("MIZAN_JWT_LIFETIME_SECS".to_string()));
        }
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue("MIZAN_UTC_OFFSET_MINUTES".to_string()));
        }
        if self.report_top_n == 0 {
            return Err(ConfigError::InvalidValue("MIZAN_REPORT_TOP_N".to_string()));
        }
        Ok(())
    }

    /// Whether the development JWT secret is still in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// The store's local offset. Range is checked by [`validate`](Self::validate).
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("MIZAN").source(Some(map))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = ApiConfig::load_from(env(&[])).unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.db_path, "./mizan.db");
        assert_eq!(config.report_top_n, 10);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ApiConfig::load_from(env(&[
            ("MIZAN_HTTP_PORT", "9090"),
            ("MIZAN_JWT_SECRET", "s3cret"),
            ("MIZAN_UTC_OFFSET_MINUTES", "180"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9090);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.utc_offset().local_minus_utc(), 180 * 60);
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let config = ApiConfig {
            utc_offset_minutes: 15 * 60,
            ..ApiConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn rejects_blank_secret() {
        let config = ApiConfig {
            jwt_secret: "  ".to_string(),
            ..ApiConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }
}
