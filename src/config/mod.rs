//! Probe configuration.
//!
//! Supports configuration from:
//! - TOML file (default: `mqlite-probe.toml`)
//! - Environment variables with `MQLITE_PROBE__` prefix (double underscore for nesting)
//! - In-file variable substitution: `${VAR}` or `${VAR:-default}`
//!
//! Environment variable examples:
//! - `MQLITE_PROBE__SERVER__BIND=0.0.0.0:1884`
//! - `MQLITE_PROBE__FILTER__CLIENT_IDS=sensor1,sensor2`
//! - `MQLITE_PROBE__AUDIT__TIMESTAMPS=true`
//!
//! In-file substitution examples:
//! ```toml
//! [tls]
//! cert = "${CERT_DIR:-/etc/mqlite}/server.pem"
//! ```

mod audit;
mod auth;
mod filter;
mod log;
mod server;
mod tls;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Deserializer};

pub use audit::{AuditConfig, DEFAULT_TIME_FORMAT};
pub use auth::AuthConfig;
pub use filter::{FilterConfig, ListSetting};
pub use log::LogConfig;
pub use server::{ServerConfig, DEFAULT_BIND};
pub use tls::TlsConfig;

const ENV_PREFIX: &str = "MQLITE_PROBE";

fn env_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env reference pattern is valid")
    })
}

/// Expand `${VAR}` and `${VAR:-default}` references in config file text.
///
/// Unset variables without a default expand to an empty string, which the
/// path and list settings treat as "not configured".
fn expand_env_refs(content: &str) -> Cow<'_, str> {
    env_reference().replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1])
            .unwrap_or_else(|_| caps.get(2).map_or("", |m| m.as_str()).to_string())
    })
}

/// Deserialize an optional path, treating an empty string as unset.
pub(crate) fn optional_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from))
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: LogConfig,
    /// Listener configuration.
    pub server: ServerConfig,
    /// Message allow-lists.
    pub filter: FilterConfig,
    /// Audit sink configuration.
    pub audit: AuditConfig,
    /// TLS identity inputs.
    pub tls: TlsConfig,
    /// Authentication strategy.
    pub auth: AuthConfig,
}

/// Why the probe configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Merging file, environment and defaults failed.
    Config(config::ConfigError),
    /// TOML text passed to [`Config::parse`] is malformed.
    Parse(toml::de::Error),
    /// A setting is present but unusable.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read probe config {}: {}", path.display(), source)
            }
            ConfigError::Config(e) => write!(f, "cannot load probe config: {}", e),
            ConfigError::Parse(e) => write!(f, "malformed probe config: {}", e),
            ConfigError::Validation(msg) => write!(f, "invalid probe config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Config(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// The `MQLITE_PROBE__SECTION__KEY` environment source.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error: defaults plus environment overrides are used.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with(path.as_ref(), environment())
    }

    fn load_with(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("log.monochrome", false)?
            .set_default("server.bind", DEFAULT_BIND)?
            .set_default("audit.timestamps", false)?
            .set_default("audit.time_format", DEFAULT_TIME_FORMAT)?;

        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let expanded = expand_env_refs(&content);
            builder = builder.add_source(File::from_str(&expanded, FileFormat::Toml));
        }

        let config: Config = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(&expand_env_refs(content)).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tls.validate().map_err(ConfigError::Validation)?;
        self.audit.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}
