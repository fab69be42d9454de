//! # Configuration Management System
//!
//! This module provides a hierarchical configuration system for the case
//! management service. It supports loading configuration from multiple
//! sources in order of precedence:
//!
//! 1. **Environment Variables** (highest precedence)
//! 2. **Environment-specific TOML files** (e.g., `config/production.toml`)
//! 3. **Default TOML file** (`config/default.toml`) (lowest precedence)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hinschg_core::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! let db_url = &config.database.url;
//! ```
//!
//! ## Environment Selection
//!
//! The configuration system automatically selects the appropriate environment
//! based on the `ENVIRONMENT` environment variable:
//!
//! - `development` (default): Uses `config/development.toml`
//! - `testing`: Uses `config/testing.toml`
//! - `production`: Uses `config/production.toml`
//!
//! ## Configuration Categories
//!
//! - **Database**: PostgreSQL connection and pool settings (row-level tenant isolation)
//! - **Redis**: rate limiting and sliding-window counters
//! - **Security**: envelope encryption master key and audit HMAC key
//! - **Server**: HTTP server and worker configuration
//! - **Email**: notification transport settings
//! - **CORS**: Cross-Origin Resource Sharing policies
//! - **Metrics**: Prometheus monitoring configuration
//! - **Rate Limiting**: anonymous channel throttling
//! - **HinschgDeadline**: statutory deadline overrides and sweep interval

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main configuration structure containing all application settings.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Database connection and pool configuration
    pub database: DatabaseConfig,
    /// Redis configuration for rate limiting and caching
    pub redis: RedisConfig,
    /// Cryptographic and security parameters
    pub security: SecurityConfig,
    /// HTTP server and worker configuration
    pub server: ServerConfig,
    /// Rate limiting for the anonymous whistleblower channel
    pub rate_limit: RateLimitConfig,
    /// Email service provider configuration (notification dispatch)
    pub email: EmailConfig,
    /// Application-level settings
    pub app: AppConfig,
    /// Prometheus metrics and monitoring configuration
    pub metrics: MetricsConfig,
    /// Cross-Origin Resource Sharing (CORS) policies
    pub cors: CorsConfig,
    /// HinSchG statutory deadline configuration and sweep interval
    pub hinschg_deadline: HinschgDeadlineConfig,
}

/// PostgreSQL database configuration and connection pool settings.
///
/// Tenant isolation is row-level: every query carries a `tenant_id`
/// predicate against a single shared pool, not a pool-per-schema.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL including credentials and database name.
    /// Must be provided via `DATABASE_URL` in production.
    pub url: String,

    /// Maximum number of database connections in the pool.
    pub max_connections: u32,

    /// Minimum number of database connections to maintain in the pool.
    pub min_connections: u32,
}

/// Redis configuration for rate limiting and ephemeral caching.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL with optional authentication.
    pub url: String,

    /// Maximum number of Redis connections in the pool.
    pub max_connections: u32,
}

/// Security and cryptographic configuration.
///
/// `encryption_master_key` feeds the field-level envelope encryption
/// (SHA-256 of the secret, then per-record HKDF subkeys). `audit_hmac_key`
/// is the shared secret for the hash-chained audit log. `jwt_secret` is
/// retained only to describe the boundary with an upstream identity
/// provider whose claims this service consumes; this service does not
/// issue or verify tokens itself.
#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Master secret for field-level envelope encryption.
    ///
    /// **Critical Security Requirement**:
    /// - Must be at least 32 characters long
    /// - Must be provided via `ENCRYPTION_MASTER_KEY` environment variable in production
    pub encryption_master_key: String,

    /// Shared secret for HMAC-SHA256 audit log chaining.
    ///
    /// Must be provided via `AUDIT_HMAC_KEY` environment variable in production.
    pub audit_hmac_key: String,

    /// Secret used by an upstream identity provider to sign JWTs this
    /// service consumes at the edge. Verification happens outside this
    /// service; this field exists only to document the boundary.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

/// Sliding-window rate limiting for the anonymous whistleblower channel.
///
/// Keyed by Tor circuit id (`X-Tor-Circuit-Id`) when present, otherwise a
/// shared bucket. Client IP is never used as a key.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub provider: String, // "mock", "smtp", "sendgrid", "aws_ses"
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from_email: String,
    pub smtp_from_name: String,
    pub use_tls: bool,
    pub use_starttls: bool,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub sendgrid_api_key: Option<String>,
    pub aws_region: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            smtp_host: None,
            smtp_port: Some(587),
            smtp_username: None,
            smtp_password: None,
            smtp_from_email: "noreply@example.com".to_string(),
            smtp_from_name: "Hinweisgebersystem".to_string(),
            use_tls: true,
            use_starttls: false,
            timeout_seconds: 30,
            max_retries: 3,
            sendgrid_api_key: None,
            aws_region: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub company_name: String,
    pub base_url: String,
    pub environment: String,
    pub log_level: String,
    pub default_tenant_slug: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<u64>,
    pub allow_credentials: bool,
}

/// Statutory HinSchG deadline configuration. Defaults match the statute;
/// tenants may override within the bounds enforced by `validate()`.
#[derive(Debug, Deserialize, Clone)]
pub struct HinschgDeadlineConfig {
    /// Acknowledgement deadline in days (statutory default 7, §17 HinSchG). Bound: 1-7.
    pub eingangsbestaetigung_tage: i64,
    /// Feedback deadline in days (statutory default 90, i.e. 3 months). Bound: 30-90.
    pub rueckmeldung_tage: i64,
    /// Retention period in years before a closed case becomes eligible for
    /// deletion (statutory default 3). Bound: 3-10.
    pub aufbewahrung_jahre: i64,
    /// Yellow traffic-light threshold in days before a deadline (default 14).
    pub warnschwelle_tage: i64,
    /// Interval in seconds between background sweeps of the scheduler (default 3600).
    pub sweep_interval_seconds: u64,
}

impl Config {
    /// Loads configuration from multiple sources in hierarchical order.
    ///
    /// 1. `config/default.toml` - base values
    /// 2. `config/{environment}.toml` - environment overrides
    /// 3. Environment variables - highest precedence
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("").separator("_"));

        let config = builder.build()?;
        let mut loaded_config: Config = config.try_deserialize()?;

        loaded_config.validate(&environment)?;

        Ok(loaded_config)
    }

    /// Validates the loaded configuration and ensures critical security
    /// requirements and statutory deadline bounds are met.
    fn validate(&mut self, environment: &str) -> Result<(), ConfigError> {
        use config::ConfigError;

        if self.security.encryption_master_key.len() < 32 {
            return Err(ConfigError::Message(format!(
                "encryption master key must be at least 32 characters long (current: {})",
                self.security.encryption_master_key.len()
            )));
        }

        if self.security.audit_hmac_key.len() < 32 {
            return Err(ConfigError::Message(format!(
                "audit HMAC key must be at least 32 characters long (current: {})",
                self.security.audit_hmac_key.len()
            )));
        }

        if environment == "production" {
            self.validate_production_security()?;
        }

        if !self.database.url.starts_with("postgresql://") {
            return Err(ConfigError::Message(
                "Database URL must be a PostgreSQL connection string starting with 'postgresql://'".to_string()
            ));
        }

        if !self.redis.url.starts_with("redis://") {
            return Err(ConfigError::Message(
                "Redis URL must be a Redis connection string starting with 'redis://'".to_string()
            ));
        }

        if !(1..=7).contains(&self.hinschg_deadline.eingangsbestaetigung_tage) {
            return Err(ConfigError::Message(
                "eingangsbestaetigung_tage must be between 1 and 7 days".to_string(),
            ));
        }

        if !(30..=90).contains(&self.hinschg_deadline.rueckmeldung_tage) {
            return Err(ConfigError::Message(
                "rueckmeldung_tage must be between 30 and 90 days".to_string(),
            ));
        }

        if !(3..=10).contains(&(self.hinschg_deadline.aufbewahrung_jahre)) {
            return Err(ConfigError::Message(
                "aufbewahrung_jahre must be between 3 and 10 years".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates production-specific security requirements.
    fn validate_production_security(&self) -> Result<(), ConfigError> {
        use config::ConfigError;

        let error_indicators = [
            "ERROR_", "INSECURE_DEFAULT", "CHANGE_THIS", "NOT_SET",
            "CHECK_ENVIRONMENT", "PLACEHOLDER"
        ];

        for indicator in &error_indicators {
            if self.security.encryption_master_key.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "Production deployment detected insecure encryption master key. Set ENCRYPTION_MASTER_KEY environment variable. Current value contains: {}",
                    indicator
                )));
            }
            if self.security.audit_hmac_key.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "Production deployment detected insecure audit HMAC key. Set AUDIT_HMAC_KEY environment variable. Current value contains: {}",
                    indicator
                )));
            }
            if self.database.url.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "Production deployment detected missing database configuration. Set DATABASE_URL environment variable. Current value contains: {}",
                    indicator
                )));
            }
            if self.redis.url.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "Production deployment detected missing Redis configuration. Set REDIS_URL environment variable. Current value contains: {}",
                    indicator
                )));
            }
            if self.app.base_url.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "Production deployment detected missing base URL. Set BASE_URL environment variable. Current value contains: {}",
                    indicator
                )));
            }
        }

        if self.email.provider == "smtp" {
            if let Some(ref smtp_host) = self.email.smtp_host {
                for indicator in &error_indicators {
                    if smtp_host.contains(indicator) {
                        return Err(ConfigError::Message(format!(
                            "Production deployment detected missing SMTP host. Set SMTP_HOST environment variable. Current value contains: {}",
                            indicator
                        )));
                    }
                }
            }
        }

        for origin in &self.cors.allowed_origins {
            for indicator in &error_indicators {
                if origin.contains(indicator) {
                    return Err(ConfigError::Message(format!(
                        "Production deployment detected missing CORS origin. Set FRONTEND_URL environment variable. Current value contains: {}",
                        indicator
                    )));
                }
            }

            if origin == "*" {
                return Err(ConfigError::Message(
                    "Production deployment must not use wildcard (*) CORS origins. Set specific frontend URL via FRONTEND_URL environment variable".to_string()
                ));
            }
        }

        Ok(())
    }
}
