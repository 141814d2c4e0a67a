//! Configuration loading
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CONFMAN_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 arrive together as [`ConfigOverrides`] (the binary's CLI
//! parser reads both); this module merges them over the TOML file and the
//! compiled defaults into one [`AppConfig`] built once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:5780";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_CODE_TTL_SECS: i64 = 600;
pub const DEFAULT_MAX_VERIFY_ATTEMPTS: i64 = 5;
/// One year
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
/// One day
pub const MAX_CODE_TTL_SECS: i64 = 86_400;
pub const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 2;
pub const DEFAULT_LOG_FILTER: &str = "confman_server=info,tower_http=info";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database_path: PathBuf,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub verification: VerificationConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive; `RUST_LOG` still wins at runtime
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signed tokens; generated and persisted when absent
    pub token_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            argon2_memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            argon2_iterations: DEFAULT_ARGON2_ITERATIONS,
        }
    }
}

/// `[verification]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Lifetime of an issued verification code
    pub code_ttl_secs: i64,
    /// Failed attempts after which a code is discarded
    pub max_attempts: i64,
    /// Mail relay webhook; email codes are only logged when unset
    pub notifier_url: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: DEFAULT_CODE_TTL_SECS,
            max_attempts: DEFAULT_MAX_VERIFY_ATTEMPTS,
            notifier_url: None,
        }
    }
}

/// On-disk TOML configuration; every key optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub logging: Option<LoggingConfig>,
    pub auth: Option<AuthConfig>,
    pub verification: Option<VerificationConfig>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub token_secret: Option<String>,
    pub notifier_url: Option<String>,
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from overrides, the TOML file, and defaults
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match overrides.config_file.as_deref() {
            Some(path) => Some(read_toml_config(path)?),
            None => match default_config_file() {
                Some(path) if path.exists() => Some(read_toml_config(&path)?),
                _ => None,
            },
        };

        Self::resolve(overrides, toml_config.unwrap_or_default())
    }

    /// Merge overrides over a parsed TOML file and validate the result
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let bind_str = overrides
            .bind
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_str, e)))?;

        let database_path = overrides
            .database_path
            .or(file.database_path)
            .unwrap_or_else(default_database_path);

        let mut logging = file.logging.unwrap_or_default();
        if let Some(filter) = overrides.log_filter {
            logging.filter = filter;
        }

        let mut auth = file.auth.unwrap_or_default();
        if overrides.token_secret.is_some() {
            auth.token_secret = overrides.token_secret;
        }

        let mut verification = file.verification.unwrap_or_default();
        if overrides.notifier_url.is_some() {
            verification.notifier_url = overrides.notifier_url;
        }

        let config = Self {
            bind,
            database_path,
            logging,
            auth,
            verification,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    ///
    /// TTLs are bounded so expiry arithmetic stays in range.
    pub fn validate(&self) -> Result<()> {
        if let Some(secret) = &self.auth.token_secret {
            if secret.trim().is_empty() {
                return Err(Error::Config("token_secret must not be empty".to_string()));
            }
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(Error::Config(format!(
                "token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.auth.argon2_iterations == 0 {
            return Err(Error::Config("argon2_iterations must be positive".to_string()));
        }
        if !(1..=MAX_CODE_TTL_SECS).contains(&self.verification.code_ttl_secs) {
            return Err(Error::Config(format!(
                "code_ttl_secs must be between 1 and {}",
                MAX_CODE_TTL_SECS
            )));
        }
        if self.verification.max_attempts <= 0 {
            return Err(Error::Config("max_attempts must be positive".to_string()));
        }
        if let Some(url) = &self.verification.notifier_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!("notifier_url '{}' is not an http(s) URL", url)));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5780)),
            database_path: default_database_path(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            verification: VerificationConfig::default(),
        }
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// `<config_dir>/confman/config.toml`, if the platform has a config dir
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("confman").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("confman"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("confman.db")
}
