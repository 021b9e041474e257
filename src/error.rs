//! Error types for mqlite-probe.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;

/// Failures while assembling the listener's TLS identity.
///
/// All of these abort startup.
#[derive(Error, Debug)]
pub enum TlsError {
    #[error("failed to read {what} {path:?}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{missing} must not be empty when {present} is set")]
    Incomplete {
        missing: &'static str,
        present: &'static str,
    },

    #[error("CA certificate {0:?} requires a server certificate and key")]
    CaWithoutIdentity(PathBuf),

    #[error("no certificates found in {0}")]
    NoCertificates(&'static str),

    #[error("invalid CA certificate: {0}")]
    CaCertificate(String),

    #[error("failed to parse private key: {0}")]
    KeyParse(String),

    #[error("server certificate and key do not form a valid identity: {0}")]
    Identity(String),
}

/// Fatal startup error. Each variant names the input that failed.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS: {0}")]
    Tls(#[from] TlsError),

    #[error("authentication: {0}")]
    Auth(#[from] AuthError),

    #[error("failed to open {sink} log {path:?}: {source}")]
    Sink {
        sink: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("broker adapter: {0}")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StartupError>;
