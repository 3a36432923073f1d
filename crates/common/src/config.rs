//! Logging configuration for the CLI and host applications.

use serde::{Deserialize, Serialize};

/// Output shape of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines with targets.
    #[default]
    Text,

    /// Structured JSON, one object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (e.g., "info", "conform=debug,warn"). Overridden
    /// by `RUST_LOG` when that is set.
    pub filter: String,

    pub format: LogFormat,
}

impl LoggingConfig {
    /// Debug-level configuration, as selected by the CLI's verbose flag.
    pub fn verbose() -> Self {
        Self {
            filter: "debug".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}
