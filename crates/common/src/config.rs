//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Institutional SSO configuration.
    pub sso: SsoConfig,
    /// Content-creation admission quotas.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Data retention settings.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Frontend URL for OAuth redirects.
    pub client_url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Institutional SSO configuration.
///
/// The enrollment number in `superadmin_enrollment` is the single identity
/// whose account is always elevated to superadmin on login.
#[derive(Debug, Clone, Deserialize)]
pub struct SsoConfig {
    /// OAuth authorization endpoint.
    pub authorization_url: String,
    /// OAuth token-exchange endpoint.
    pub token_url: String,
    /// User-data endpoint.
    pub user_data_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Registered redirect URI.
    pub redirect_uri: String,
    /// Base URL prepended to relative avatar paths.
    #[serde(default)]
    pub asset_base_url: Option<String>,
    /// Enrollment number that is always a superadmin.
    pub superadmin_enrollment: String,
}

/// Per-action admission quotas (requests per window).
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// Question submissions per window for regular users.
    #[serde(default = "default_questions_user")]
    pub questions_user: u32,
    /// Question submissions per window for admins.
    #[serde(default = "default_questions_admin")]
    pub questions_admin: u32,
    /// Company creations per window for regular users.
    #[serde(default = "default_companies_user")]
    pub companies_user: u32,
    /// Company creations per window for admins.
    #[serde(default = "default_companies_admin")]
    pub companies_admin: u32,
    /// Tip posts per window for regular users.
    #[serde(default = "default_tips_user")]
    pub tips_user: u32,
    /// Tip posts per window for admins.
    #[serde(default = "default_tips_admin")]
    pub tips_admin: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            questions_user: default_questions_user(),
            questions_admin: default_questions_admin(),
            companies_user: default_companies_user(),
            companies_admin: default_companies_admin(),
            tips_user: default_tips_user(),
            tips_admin: default_tips_admin(),
        }
    }
}

/// Data retention settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Days after which activity-log entries are purged.
    #[serde(default = "default_activity_log_days")]
    pub activity_log_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            activity_log_days: default_activity_log_days(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "prepvault".to_string()
}

const fn default_window_secs() -> i64 {
    24 * 60 * 60
}

const fn default_questions_user() -> u32 {
    10
}

const fn default_questions_admin() -> u32 {
    50
}

const fn default_companies_user() -> u32 {
    5
}

const fn default_companies_admin() -> u32 {
    25
}

const fn default_tips_user() -> u32 {
    20
}

const fn default_tips_admin() -> u32 {
    100
}

const fn default_activity_log_days() -> i64 {
    30
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PREPVAULT_ENV`)
    /// 3. Environment variables with `PREPVAULT` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PREPVAULT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PREPVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PREPVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_defaults() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.window_secs, 86_400);
        assert_eq!(limits.questions_user, 10);
        assert_eq!(limits.questions_admin, 50);
        assert!(limits.companies_user < limits.companies_admin);
    }

    #[test]
    fn test_retention_defaults() {
        let retention = RetentionConfig::default();
        assert_eq!(retention.activity_log_days, 30);
    }
}
