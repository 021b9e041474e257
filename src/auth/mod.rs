//! Authentication strategies handed to the broker adapter.
//!
//! The core never calls these itself; it builds one strategy at startup and
//! passes it to the adapter as an `Arc<dyn Authenticator>`. The adapter
//! consults it on CONNECT and before each publish or subscribe.

mod user_file;

pub use user_file::{UserEntry, UserFile};

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::AuthConfig;

/// Failures while loading the user file. All of these abort startup.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("failed to read user file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid user file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("user file {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Result of an authentication or authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// Access granted.
    Allow,
    /// Unknown user or wrong password.
    DenyBadCredentials,
    /// Authenticated, but not allowed this action.
    DenyNotAuthorized,
}

impl AuthResult {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthResult::Allow)
    }
}

/// Access type for topic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Publish,
    Subscribe,
}

/// Credentials presented in CONNECT.
#[derive(Debug)]
pub struct AuthContext<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    pub remote_addr: Option<SocketAddr>,
}

/// Authentication and topic authorization.
///
/// Implementations are called concurrently from every session thread.
pub trait Authenticator: Send + Sync + 'static {
    /// Check CONNECT credentials.
    fn authenticate(&self, ctx: &AuthContext) -> AuthResult;

    /// Check whether `username` may perform `access` on `topic`.
    #[allow(unused_variables)]
    fn check(&self, username: Option<&str>, access: Access, topic: &str) -> AuthResult {
        AuthResult::Allow
    }

    /// Short description for startup notices.
    fn describe(&self) -> String;
}

/// Allows every client and every topic.
#[derive(Debug, Clone, Default)]
pub struct AllowAll;

impl Authenticator for AllowAll {
    #[inline]
    fn authenticate(&self, _ctx: &AuthContext) -> AuthResult {
        AuthResult::Allow
    }

    fn describe(&self) -> String {
        "allow all".to_string()
    }
}

/// Build the configured strategy: the user file if one is set, otherwise
/// [`AllowAll`].
pub fn from_config(config: &AuthConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match &config.user_file {
        Some(path) => Ok(Arc::new(UserFile::load(path)?)),
        None => Ok(Arc::new(AllowAll)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let auth = AllowAll;
        let ctx = AuthContext {
            client_id: "c",
            username: None,
            password: None,
            remote_addr: None,
        };
        assert!(auth.authenticate(&ctx).is_allowed());
        assert!(auth.check(None, Access::Publish, "any/topic").is_allowed());
    }

    #[test]
    fn test_from_config_without_file() {
        let auth = from_config(&AuthConfig::default()).unwrap();
        assert_eq!(auth.describe(), "allow all");
    }

    #[test]
    fn test_from_config_missing_file() {
        let config = AuthConfig {
            user_file: Some(PathBuf::from("/nonexistent/users.json")),
        };
        match from_config(&config) {
            Err(AuthError::Read { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/users.json"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an error"),
        }
    }
}
