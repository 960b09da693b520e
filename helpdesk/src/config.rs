//! Server configuration.
//!
//! Read from environment variables with defaults. The binary loads a `.env`
//! file first (via `dotenvy`), so the same keys work there.
//!
//! | Key | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `RUST_LOG` | `info` |
//! | `HELPDESK_DEFAULT_PAGE_SIZE` | `10` |
//! | `HELPDESK_MAX_PAGE_SIZE` | `100` |
//! | `HELPDESK_SESSION_TTL` | `86400` (seconds, at most one year) |
//! | `HELPDESK_ADMIN_USERNAME` / `_PASSWORD` / `_EMAIL` | unset |

use crate::error::HelpdeskError;
use crate::identity::Password;
use crate::query::PageRequest;
use chrono::Duration;
use std::str::FromStr;

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("Invalid value for {key}: `{value}`")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Rejected text
        value: String,
    },
    /// Values parse but do not fit together
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Listen address and log filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Fallback filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

/// Page size limits for listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Size used when a request names none
    pub default_size: usize,
    /// Larger requested sizes are clamped to this
    pub max_size: usize,
}

impl PagingConfig {
    /// Page request from optional query parameters.
    ///
    /// # Errors
    ///
    /// `Validation` on field `size` when the size is 0.
    pub fn request(&self, page: Option<usize>, size: Option<usize>) -> Result<PageRequest, HelpdeskError> {
        PageRequest::bounded(
            page.unwrap_or(0),
            size.unwrap_or(self.default_size),
            self.max_size,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_size == 0 {
            return Err(ConfigError::ValidationError(
                "default page size must be positive".to_string(),
            ));
        }
        if self.max_size < self.default_size {
            return Err(ConfigError::ValidationError(format!(
                "max page size {} is below default page size {}",
                self.max_size, self.default_size
            )));
        }
        Ok(())
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: PageRequest::DEFAULT_SIZE,
            max_size: 100,
        }
    }
}

/// Account created at startup when it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Initial password
    pub password: Password,
}

/// Session lifetime and the optional bootstrap admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// How long a session stays valid
    pub session_ttl: Duration,
    /// Admin to create at startup
    pub admin: Option<AdminBootstrap>,
}

impl AuthConfig {
    /// Longest accepted session lifetime: one year
    pub const MAX_SESSION_TTL_SECS: i64 = 365 * 86_400;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl <= Duration::zero() {
            return Err(ConfigError::ValidationError(
                "session TTL must be positive".to_string(),
            ));
        }
        if self.session_ttl > Duration::seconds(Self::MAX_SESSION_TTL_SECS) {
            return Err(ConfigError::ValidationError(format!(
                "session TTL must be at most {} seconds",
                Self::MAX_SESSION_TTL_SECS
            )));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            admin: None,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Listen address and logging
    pub server: ServerConfig,
    /// Listing limits
    pub paging: PagingConfig,
    /// Sessions and bootstrap admin
    pub auth: AuthConfig,
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a variable does not parse or the values are inconsistent
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a value does not parse or the values are inconsistent
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server = ServerConfig {
            host: lookup("HOST").unwrap_or(defaults.server.host),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.server.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.server.log_level),
        };

        let paging = PagingConfig {
            default_size: parse(&lookup, "HELPDESK_DEFAULT_PAGE_SIZE")?
                .unwrap_or(defaults.paging.default_size),
            max_size: parse(&lookup, "HELPDESK_MAX_PAGE_SIZE")?.unwrap_or(defaults.paging.max_size),
        };

        let session_ttl = match parse::<i64>(&lookup, "HELPDESK_SESSION_TTL")? {
            Some(secs) => Duration::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
                key: "HELPDESK_SESSION_TTL",
                value: secs.to_string(),
            })?,
            None => defaults.auth.session_ttl,
        };

        let admin = match (
            lookup("HELPDESK_ADMIN_USERNAME"),
            lookup("HELPDESK_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(AdminBootstrap {
                email: lookup("HELPDESK_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{username}@helpdesk.local")),
                username,
                password: Password::new(password),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::ValidationError(
                    "HELPDESK_ADMIN_USERNAME and HELPDESK_ADMIN_PASSWORD must be set together"
                        .to_string(),
                ));
            },
        };

        let config = Self {
            server,
            paging,
            auth: AuthConfig { session_ttl, admin },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns error if page sizes or the session lifetime are out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.paging.validate()?;
        self.auth.validate()
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}
