//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or the `LBNCTL_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `LBNCTL_` override
//!    YAML values
//!
//! For nested config values, use double underscores in environment
//! variables. For example, `LBNCTL_DATABASE__TYPE=memory` sets the
//! `database.type` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use lbnctl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! LBNCTL_PORT=8080
//!
//! # Point at a different database file
//! LBNCTL_DATABASE__TYPE=file
//! LBNCTL_DATABASE__PATH=/var/lib/lbnctl/lbnctl.db
//!
//! # Override nested values
//! LBNCTL_AUTH__SESSION__COOKIE_SECURE=false
//! ```

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use std::{path::PathBuf, time::Duration};

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LBNCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults defined in the `Default`
/// implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Database configuration - a file-backed or in-memory sqlite database
    pub database: DatabaseConfig,
    /// Username for the initial admin user (created on first startup)
    pub admin_username: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for JWT session signing (required)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// CORS settings for the admin dashboard
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database: DatabaseConfig::default(),
            admin_username: "admin".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Database configuration.
///
/// Supports either a file-backed sqlite database (persistent, the normal
/// deployment) or an in-memory database (ephemeral, useful for local
/// experiments).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// In-memory sqlite database; all data is lost on shutdown
    Memory,
    /// File-backed sqlite database, created on first startup
    File {
        /// Path of the database file
        path: PathBuf,
    },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::File {
            path: PathBuf::from("lbnctl.db"),
        }
    }
}

impl DatabaseConfig {
    /// Check if using the in-memory database
    pub fn is_memory(&self) -> bool {
        matches!(self, DatabaseConfig::Memory)
    }

    /// Connection options for the configured database.
    ///
    /// Foreign keys are enforced explicitly: the join-table cascades depend
    /// on them, and sqlite leaves the pragma off for old databases.
    pub fn connect_options(&self) -> SqliteConnectOptions {
        let options = match self {
            DatabaseConfig::Memory => SqliteConnectOptions::new().in_memory(true),
            DatabaseConfig::File { path } => SqliteConnectOptions::new().filename(path).create_if_missing(true),
        };
        options.foreign_keys(true)
    }

    /// Maximum pool size for this database.
    ///
    /// Every pooled connection to an in-memory database opens a separate
    /// empty database, so the pool must be capped at a single connection.
    pub fn max_connections(&self) -> u32 {
        match self {
            DatabaseConfig::Memory => 1,
            DatabaseConfig::File { .. } => 10,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie and token configuration
    pub session: SessionConfig,
}

/// Session token and cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session token lifetime
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
    /// Session token lifetime when the client asks to be remembered
    #[serde(with = "humantime_serde")]
    pub remember_expiry: Duration,
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(2 * 60 * 60),
            remember_expiry: Duration::from_secs(24 * 60 * 60),
            cookie_name: "lbnctl_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
        }
    }
}

/// CORS settings for browser clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; "*" permits any origin
    pub allowed_origins: Vec<String>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_credentials: false,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("LBNCTL_").split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                 Please set LBNCTL_SECRET_KEY or add secret_key to the config file."
                    .to_string(),
            });
        }

        if self.auth.session.expiry.as_secs() < 60 {
            return Err(Error::Internal {
                operation: "Config validation: session expiry is too short (minimum 1 minute)".to_string(),
            });
        }

        if self.auth.session.remember_expiry < self.auth.session.expiry {
            return Err(Error::Internal {
                operation: "Config validation: remember_expiry must not be shorter than the regular session expiry".to_string(),
            });
        }

        match self.auth.session.cookie_same_site.to_lowercase().as_str() {
            "strict" | "lax" | "none" => {}
            other => {
                return Err(Error::Internal {
                    operation: format!("Config validation: invalid cookie_same_site value '{other}'"),
                });
            }
        }

        // The CORS spec forbids credentials together with a wildcard origin,
        // and tower-http enforces it with a panic
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(Error::Internal {
                operation: "Config validation: cors.allow_credentials cannot be combined with a wildcard origin".to_string(),
            });
        }

        Ok(())
    }

    /// Get the server bind address as host:port
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
