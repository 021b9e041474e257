//! Authentication configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON user file. When unset every client is allowed.
    #[serde(deserialize_with = "super::optional_path")]
    pub user_file: Option<PathBuf>,
}
