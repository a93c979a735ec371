//! Environment-sourced configuration, loaded once at startup.
//!
//! Sensitive fields are wrapped in `SecretBox` so they cannot be printed via `Debug`
//! without an explicit `.expose_secret()`. `from_vars` takes a `HashMap` so the loading
//! logic is testable without touching real process environment variables.

use common::secret::{ExposeSecret, SecretBox};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_IDLE_CONNS: usize = 32;
pub const DEFAULT_MAX_CONNS_PER_HOST: usize = 32;
pub const DEFAULT_IDLE_CONN_TIMEOUT_SECONDS: u64 = 90;
pub const DEFAULT_JWT_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_SHARE_CACHE_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_DEFAULT_PAGE_SIZE: i64 = 50;

pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub supabase_url: String,
    pub supabase_service_role_key: SecretBox<Vec<u8>>,
    pub supabase_jwt_secret: SecretBox<Vec<u8>>,
    pub http_timeout: Duration,
    pub http_max_idle_conns: usize,
    pub http_max_conns_per_host: usize,
    pub http_idle_conn_timeout: Duration,
    pub cache_jwt_ttl: Duration,
    pub cache_share_token_ttl: Duration,
    pub cache_cleanup_interval: Duration,
    pub max_page_size: i64,
    pub default_page_size: i64,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            port: self.port,
            log_level: self.log_level.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_service_role_key: SecretBox::new(Box::new(
                self.supabase_service_role_key.expose_secret().clone(),
            )),
            supabase_jwt_secret: SecretBox::new(Box::new(self.supabase_jwt_secret.expose_secret().clone())),
            http_timeout: self.http_timeout,
            http_max_idle_conns: self.http_max_idle_conns,
            http_max_conns_per_host: self.http_max_conns_per_host,
            http_idle_conn_timeout: self.http_idle_conn_timeout,
            cache_jwt_ttl: self.cache_jwt_ttl,
            cache_share_token_ttl: self.cache_share_token_ttl,
            cache_cleanup_interval: self.cache_cleanup_interval,
            max_page_size: self.max_page_size,
            default_page_size: self.default_page_size,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_role_key", &"[REDACTED]")
            .field("supabase_jwt_secret", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .field("http_max_idle_conns", &self.http_max_idle_conns)
            .field("http_max_conns_per_host", &self.http_max_conns_per_host)
            .field("http_idle_conn_timeout", &self.http_idle_conn_timeout)
            .field("cache_jwt_ttl", &self.cache_jwt_ttl)
            .field("cache_share_token_ttl", &self.cache_share_token_ttl)
            .field("cache_cleanup_interval", &self.cache_cleanup_interval)
            .field("max_page_size", &self.max_page_size)
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| -> Result<String, ConfigError> {
            vars.get(name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_service_role_key = required("SUPABASE_SERVICE_ROLE_KEY")?;
        let supabase_jwt_secret = required("SUPABASE_JWT_SECRET")?;

        let port = match vars.get("PORT") {
            None => DEFAULT_PORT,
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                reason: format!("'{value}' is not a valid port number"),
            })?,
        };
        let log_level = vars.get("LOG_LEVEL").cloned().unwrap_or_else(|| "info".to_string());

        let http_timeout = duration_seconds(vars, "HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECONDS)?;
        let http_max_idle_conns = positive_usize(vars, "HTTP_MAX_IDLE_CONNS", DEFAULT_MAX_IDLE_CONNS)?;
        let http_max_conns_per_host = positive_usize(vars, "HTTP_MAX_CONNS_PER_HOST", DEFAULT_MAX_CONNS_PER_HOST)?;
        let http_idle_conn_timeout = duration_seconds(
            vars,
            "HTTP_IDLE_CONN_TIMEOUT_SECONDS",
            DEFAULT_IDLE_CONN_TIMEOUT_SECONDS,
        )?;
        let cache_jwt_ttl = duration_seconds(vars, "CACHE_JWT_TTL_SECONDS", DEFAULT_JWT_CACHE_TTL_SECONDS)?;
        let cache_share_token_ttl = duration_seconds(
            vars,
            "CACHE_SHARE_TOKEN_TTL_SECONDS",
            DEFAULT_SHARE_CACHE_TTL_SECONDS,
        )?;
        let cache_cleanup_interval = duration_seconds(
            vars,
            "CACHE_CLEANUP_INTERVAL_SECONDS",
            DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS,
        )?;
        let max_page_size = positive_i64(vars, "MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;
        let default_page_size = positive_i64(vars, "DEFAULT_PAGE_SIZE", DEFAULT_DEFAULT_PAGE_SIZE)?;

        Ok(Self {
            port,
            log_level,
            supabase_url,
            supabase_service_role_key: SecretBox::new(Box::new(supabase_service_role_key.into_bytes())),
            supabase_jwt_secret: SecretBox::new(Box::new(supabase_jwt_secret.into_bytes())),
            http_timeout,
            http_max_idle_conns,
            http_max_conns_per_host,
            http_idle_conn_timeout,
            cache_jwt_ttl,
            cache_share_token_ttl,
            cache_cleanup_interval,
            max_page_size,
            default_page_size,
        })
    }
}

fn duration_seconds(vars: &HashMap<String, String>, name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    match vars.get(name) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(value) => {
            let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{value}' is not a non-negative integer"),
            })?;
            Ok(Duration::from_secs(secs))
        }
    }
}

fn positive_usize(vars: &HashMap<String, String>, name: &str, default: usize) -> Result<usize, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => {
            let parsed: usize = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{value}' is not a positive integer"),
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(parsed)
        }
    }
}

fn positive_i64(vars: &HashMap<String, String>, name: &str, default: i64) -> Result<i64, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => {
            let parsed: i64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{value}' is not a positive integer"),
            })?;
            if parsed <= 0 {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(parsed)
        }
    }
}
