//! Audit sink configuration.

use std::fmt::Write;
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

/// Default timestamp format for file records.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Audit sink configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// CSV file receiving admitted messages.
    #[serde(deserialize_with = "super::optional_path")]
    pub data_log: Option<PathBuf>,
    /// CSV file receiving connection status changes.
    #[serde(deserialize_with = "super::optional_path")]
    pub status_log: Option<PathBuf>,
    /// Text file mirroring every console line.
    #[serde(deserialize_with = "super::optional_path")]
    pub console_log: Option<PathBuf>,
    /// Prefix file records with a timestamp column.
    pub timestamps: bool,
    /// chrono format string for timestamps.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            data_log: None,
            status_log: None,
            console_log: None,
            timestamps: false,
            time_format: default_time_format(),
        }
    }
}

impl AuditConfig {
    /// Validate the audit configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.time_format.is_empty() {
            return Err("audit.time_format must not be empty".into());
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(format!(
                "audit.time_format {:?} is not a valid format string",
                self.time_format
            ));
        }
        // Formatting can still fail for specifiers that need a time zone name etc.
        let mut probe = String::new();
        let now = chrono::Local::now();
        if write!(probe, "{}", now.format(&self.time_format)).is_err() {
            return Err(format!(
                "audit.time_format {:?} cannot format local time",
                self.time_format
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AuditConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_format_rejected() {
        let config = AuditConfig {
            time_format: "%Y-%".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_format_rejected() {
        let config = AuditConfig {
            time_format: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
