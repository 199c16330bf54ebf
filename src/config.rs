use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::logger::LogLevel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Interpreter settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Echo each executed line as `[DEBUG] Line N: text`.
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    #[serde(default = "default_max_import_depth")]
    pub max_import_depth: usize,
    /// Deepest nesting of block and function bodies, counted across calls.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Largest position an indexed `set` may assign.
    #[serde(default = "default_max_array_index")]
    pub max_array_index: usize,
    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub level: LogLevel,
    /// Number of recent entries kept for inspection.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_max_call_depth() -> usize {
    24
}
fn default_max_import_depth() -> usize {
    16
}
fn default_max_nesting_depth() -> usize {
    48
}
fn default_max_array_index() -> usize {
    65_535
}
fn default_true() -> bool {
    true
}
fn default_history_capacity() -> usize {
    256
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            max_call_depth: default_max_call_depth(),
            max_import_depth: default_max_import_depth(),
            max_nesting_depth: default_max_nesting_depth(),
            max_array_index: default_max_array_index(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: LogLevel::default(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl InterpreterConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_interpreter_config_serde() {
        let config = InterpreterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: InterpreterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config =
            InterpreterConfig::from_json_str(r#"{"debug_mode": true, "logger": {"level": "warn"}}"#)
                .unwrap();
        assert!(config.debug_mode);
        assert_eq!(config.max_call_depth, 24);
        assert_eq!(config.max_import_depth, 16);
        assert_eq!(config.max_nesting_depth, 48);
        assert_eq!(config.max_array_index, 65_535);
        assert!(config.logger.enabled);
        assert_eq!(config.logger.level, LogLevel::Warn);
        assert_eq!(config.logger.history_capacity, 256);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_call_depth": 8}}"#).unwrap();
        let config = InterpreterConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_call_depth, 8);
        assert!(!config.debug_mode);
    }

    #[test]
    fn test_from_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let error = InterpreterConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
