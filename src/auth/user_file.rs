//! JSON user file authentication.
//!
//! ```json
//! {
//!   "users": [
//!     { "username": "sensor", "password": "secret", "publish": ["plant/a"] },
//!     { "username": "ops", "password_hash": "$argon2id$v=19$...", "subscribe": ["#"] }
//!   ]
//! }
//! ```
//!
//! Topic lists match exactly. An empty list, or one containing `#`, leaves
//! that access unrestricted.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use log::warn;
use serde::Deserialize;

use super::{Access, AuthContext, AuthError, AuthResult, Authenticator};

/// One user as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Argon2 hash in PHC string format. Takes priority over `password`.
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub publish: Vec<String>,
    #[serde(default)]
    pub subscribe: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    users: Vec<UserEntry>,
}

/// Topic permissions for one access type. `None` means unrestricted.
#[derive(Debug)]
struct Topics(Option<AHashSet<String>>);

impl Topics {
    fn new(list: Vec<String>) -> Self {
        if list.is_empty() || list.iter().any(|t| t == "#") {
            Topics(None)
        } else {
            Topics(Some(list.into_iter().collect()))
        }
    }

    fn permits(&self, topic: &str) -> bool {
        self.0.as_ref().map_or(true, |set| set.contains(topic))
    }
}

#[derive(Debug)]
struct User {
    password: Option<String>,
    password_hash: Option<String>,
    publish: Topics,
    subscribe: Topics,
}

/// Authenticator backed by a JSON user file.
#[derive(Debug)]
pub struct UserFile {
    path: Option<PathBuf>,
    users: AHashMap<String, User>,
}

impl UserFile {
    /// Read and parse the user file at `path`.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = fs::read_to_string(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::parse(&content).map_err(|e| match e {
            AuthError::Parse { source, .. } => AuthError::Parse {
                path: path.to_path_buf(),
                source,
            },
            AuthError::Invalid { reason, .. } => AuthError::Invalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Parse user file content.
    pub fn parse(content: &str) -> Result<Self, AuthError> {
        let document: Document =
            serde_json::from_str(content).map_err(|source| AuthError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        Self::from_entries(document.users)
    }

    pub fn from_entries(entries: Vec<UserEntry>) -> Result<Self, AuthError> {
        let mut users = AHashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.username.is_empty() {
                return Err(AuthError::Invalid {
                    path: PathBuf::new(),
                    reason: "username must not be empty".to_string(),
                });
            }
            if entry.password.is_none() && entry.password_hash.is_none() {
                return Err(AuthError::Invalid {
                    path: PathBuf::new(),
                    reason: format!("user {:?} has no password", entry.username),
                });
            }
            let user = User {
                password: entry.password,
                password_hash: entry.password_hash,
                publish: Topics::new(entry.publish),
                subscribe: Topics::new(entry.subscribe),
            };
            if users.insert(entry.username.clone(), user).is_some() {
                return Err(AuthError::Invalid {
                    path: PathBuf::new(),
                    reason: format!("duplicate user {:?}", entry.username),
                });
            }
        }
        Ok(Self { path: None, users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn verify_password(user: &User, password: &[u8]) -> bool {
        if let Some(hash) = &user.password_hash {
            let Ok(parsed) = PasswordHash::new(hash) else {
                warn!("Invalid argon2 hash format in user file");
                return false;
            };
            return Argon2::default().verify_password(password, &parsed).is_ok();
        }
        match &user.password {
            Some(stored) => password == stored.as_bytes(),
            None => false,
        }
    }
}

impl Authenticator for UserFile {
    fn authenticate(&self, ctx: &AuthContext) -> AuthResult {
        let (Some(username), Some(password)) = (ctx.username, ctx.password) else {
            return AuthResult::DenyBadCredentials;
        };
        match self.users.get(username) {
            Some(user) if Self::verify_password(user, password) => AuthResult::Allow,
            _ => AuthResult::DenyBadCredentials,
        }
    }

    fn check(&self, username: Option<&str>, access: Access, topic: &str) -> AuthResult {
        let Some(user) = username.and_then(|u| self.users.get(u)) else {
            return AuthResult::DenyNotAuthorized;
        };
        let topics = match access {
            Access::Publish => &user.publish,
            Access::Subscribe => &user.subscribe,
        };
        if topics.permits(topic) {
            AuthResult::Allow
        } else {
            AuthResult::DenyNotAuthorized
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("user file {} ({} users)", path.display(), self.len()),
            None => format!("user file ({} users)", self.len()),
        }
    }
}
