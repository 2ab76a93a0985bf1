//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe the knobs the UI shell passes to core at start-up.
//! - Parse them from JSON and reject invalid combinations early.
//!
//! # Invariants
//! - Every field has a build-mode default; an empty JSON object is valid.
//! - A validated config never carries a relative `log_dir`.

use crate::logging::{default_log_level, normalize_level};
use crate::state::store::{StoreConfig, DEFAULT_MAX_FOLLOW_UP_ACTIONS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Start-up configuration of the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Snapshot database file; `None` keeps the snapshot in memory.
    pub db_path: Option<PathBuf>,
    pub max_follow_up_actions: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            max_follow_up_actions: DEFAULT_MAX_FOLLOW_UP_ACTIONS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
    ZeroFollowUpLimit,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::ZeroFollowUpLimit => write!(f, "max_follow_up_actions must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        if self.max_follow_up_actions == 0 {
            return Err(ConfigError::ZeroFollowUpLimit);
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_follow_up_actions: self.max_follow_up_actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::logging::default_log_level;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config is valid");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.store_config().max_follow_up_actions, 64);
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = CoreConfig::from_json_str(r#"{"log_dir": "logs"}"#)
            .expect_err("relative dir must fail");
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }

    #[test]
    fn rejects_unknown_level_and_fields() {
        let err = CoreConfig::from_json_str(r#"{"log_level": "loud"}"#)
            .expect_err("unknown level must fail");
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));

        let err = CoreConfig::from_json_str(r#"{"colour": "blue"}"#)
            .expect_err("unknown field must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_follow_up_limit() {
        let err = CoreConfig::from_json_str(r#"{"max_follow_up_actions": 0}"#)
            .expect_err("zero limit must fail");
        assert!(matches!(err, ConfigError::ZeroFollowUpLimit));
    }
}
