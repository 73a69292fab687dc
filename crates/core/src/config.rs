//! Sync configuration
//!
//! All timings are in milliseconds. Every field has a default, so an empty
//! TOML document is a valid config.

use crate::error::ConfigError;
use crate::handle::HandleRules;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Autosave timing and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiescence window for the text fields stream
    pub fields_debounce_ms: u64,
    /// Quiescence window for the tag selection stream
    pub tags_debounce_ms: u64,
    /// Quiescence window before a handle is checked remotely
    pub handle_check_debounce_ms: u64,
    /// How long `saved` stays visible before reverting to `idle`
    pub saved_reset_ms: u64,
    /// How long `error` stays visible before reverting to `idle`
    pub error_reset_ms: u64,
    pub handle_min_len: usize,
    pub handle_max_len: usize,
    /// Maximum number of selected affinity tags
    pub max_tags: usize,
    /// Number of save attempts kept in the session history
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fields_debounce_ms: 1000,
            tags_debounce_ms: 1000,
            handle_check_debounce_ms: 500,
            saved_reset_ms: 2000,
            error_reset_ms: 3000,
            handle_min_len: 3,
            handle_max_len: 30,
            max_tags: 3,
            history_limit: 50,
        }
    }
}

fn check_range(key: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value against its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("fields_debounce_ms", self.fields_debounce_ms, 50, 10_000)?;
        check_range("tags_debounce_ms", self.tags_debounce_ms, 50, 10_000)?;
        check_range("handle_check_debounce_ms", self.handle_check_debounce_ms, 50, 10_000)?;
        check_range("saved_reset_ms", self.saved_reset_ms, 100, 60_000)?;
        check_range("error_reset_ms", self.error_reset_ms, 100, 60_000)?;
        check_range("handle_min_len", self.handle_min_len as u64, 1, 64)?;
        check_range("handle_max_len", self.handle_max_len as u64, 1, 64)?;
        check_range("max_tags", self.max_tags as u64, 1, 32)?;
        check_range("history_limit", self.history_limit as u64, 1, 10_000)?;

        if self.handle_min_len > self.handle_max_len {
            return Err(ConfigError::Inconsistent(format!(
                "handle_min_len ({}) exceeds handle_max_len ({})",
                self.handle_min_len, self.handle_max_len
            )));
        }
        Ok(())
    }

    pub fn fields_debounce(&self) -> Duration {
        Duration::from_millis(self.fields_debounce_ms)
    }

    pub fn tags_debounce(&self) -> Duration {
        Duration::from_millis(self.tags_debounce_ms)
    }

    pub fn handle_check_debounce(&self) -> Duration {
        Duration::from_millis(self.handle_check_debounce_ms)
    }

    pub fn saved_reset(&self) -> Duration {
        Duration::from_millis(self.saved_reset_ms)
    }

    pub fn error_reset(&self) -> Duration {
        Duration::from_millis(self.error_reset_ms)
    }

    pub fn handle_rules(&self) -> HandleRules {
        HandleRules {
            min_len: self.handle_min_len,
            max_len: self.handle_max_len,
        }
    }
}

/// Annotated example config file
pub fn example_config() -> &'static str {
    r#"# Profile autosave configuration
# All durations are in milliseconds.

# Quiet period before text field edits are considered settled (50-10000)
fields_debounce_ms = 1000

# Quiet period before tag selection changes are considered settled (50-10000)
tags_debounce_ms = 1000

# Quiet period before a new handle is checked for availability (50-10000)
handle_check_debounce_ms = 500

# How long the "saved" / "error" status pill stays up (100-60000)
saved_reset_ms = 2000
error_reset_ms = 3000

# Handle length bounds (1-64)
handle_min_len = 3
handle_max_len = 30

# Maximum selected affinity tags (1-32)
max_tags = 3

# Save attempts kept in the session history (1-10000)
history_limit = 50
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SyncConfig::default().validate().unwrap();
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(SyncConfig::from_toml_str("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn test_example_matches_defaults() {
        assert_eq!(
            SyncConfig::from_toml_str(example_config()).unwrap(),
            SyncConfig::default()
        );
    }

    #[test]
    fn test_partial_override() {
        let config = SyncConfig::from_toml_str("fields_debounce_ms = 250\nmax_tags = 5").unwrap();
        assert_eq!(config.fields_debounce(), Duration::from_millis(250));
        assert_eq!(config.max_tags, 5);
        assert_eq!(config.saved_reset_ms, 2000);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = SyncConfig::from_toml_str("saved_reset_ms = 5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { key: "saved_reset_ms", .. }
        ));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = SyncConfig::from_toml_str("handle_min_len = 10\nhandle_max_len = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SyncConfig {
            error_reset_ms: 4500,
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SyncConfig::from_toml_str(&text).unwrap(), config);
    }
}
