//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// JSON fixture file seeding the mock store (empty store when unset)
    pub fixtures_path: Option<PathBuf>,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(s) => s.parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("'{}' is not a valid port", s),
            })?,
            Err(_) => 3001,
        };

        let fixtures_path = env::var("FIXTURES_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        if let Some(path) = &fixtures_path {
            if !path.is_file() {
                return Err(ConfigError {
                    field: "FIXTURES_PATH",
                    message: format!("{} is not a readable file", path.display()),
                });
            }
        }

        let cors_origin_str = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into());
        let cors_allow_origin = parse_cors_origin(&cors_origin_str)?;

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        Ok(Self {
            port,
            fixtures_path,
            cors_allow_origin,
            log_format,
        })
    }

    /// Log warnings about configuration that is probably a mistake.
    pub fn warn_if_empty(&self) {
        if self.fixtures_path.is_none() {
            tracing::warn!(
                "FIXTURES_PATH not set: the mock store starts empty and every lookup returns 404."
            );
        }
    }
}

fn parse_cors_origin(s: &str) -> Result<HeaderValue, ConfigError> {
    if s == "*" {
        return Ok(HeaderValue::from_static("*"));
    }
    HeaderValue::from_str(s).map_err(|e| ConfigError {
        field: "CORS_ALLOW_ORIGIN",
        message: format!("Invalid header value '{}': {}", s, e),
    })
}
