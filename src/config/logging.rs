//! Logging configuration types.

use super::defaults::{
    default_enable_file_logging, default_log_dir, default_log_filename, default_log_format,
    default_rotation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logging configuration.
#[derive(Debug, Serialize, Clone)]
pub struct LoggingConfig {
    /// Directory path for log files
    pub dir: String,
    /// Log file base name
    pub filename: String,
    /// Rotation policy: "daily" (default), "hourly", or "never"
    pub rotation: String,
    /// Optional tracing level. Overrides `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    /// Enable rolling file logging in addition to stdout
    pub enable_file_logging: bool,
    /// Format for rendered logs
    pub format: LogFormat,
}

// Lenient on `level`: an unknown string or non-string value falls back to the
// default instead of rejecting the whole config. Env overrides like
// `SIGNAL_RELAY__LOGGING__LEVEL=debug,info` arrive as arrays; the first entry wins.
impl<'de> Deserialize<'de> for LoggingConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default = "default_log_dir")]
            dir: String,
            #[serde(default = "default_log_filename")]
            filename: String,
            #[serde(default = "default_rotation")]
            rotation: String,
            #[serde(default)]
            level: Option<serde_json::Value>,
            #[serde(default = "default_enable_file_logging")]
            enable_file_logging: bool,
            #[serde(default = "default_log_format")]
            format: LogFormat,
        }

        let raw = Raw::deserialize(deserializer)?;

        let level = match raw.level {
            Some(serde_json::Value::String(text)) => {
                let parsed = LogLevel::parse(&text);
                if parsed.is_none() {
                    eprintln!("Invalid log level '{text}', using default");
                }
                parsed
            }
            Some(serde_json::Value::Array(items)) => items
                .first()
                .and_then(serde_json::Value::as_str)
                .and_then(LogLevel::parse),
            _ => None,
        };

        Ok(Self {
            dir: raw.dir,
            filename: raw.filename,
            rotation: raw.rotation,
            level,
            enable_file_logging: raw.enable_file_logging,
            format: raw.format,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            filename: default_log_filename(),
            rotation: default_rotation(),
            level: None,
            enable_file_logging: default_enable_file_logging(),
            format: default_log_format(),
        }
    }
}

/// Log level enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Case-insensitive parse accepting the common aliases `warning` and `err`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid log level '{raw}', expected one of: trace, debug, info, warn, error"
            ))
        })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log format enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_aliases_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" err "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn lenient_level_in_config() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level":"loud"}"#).unwrap();
        assert!(config.level.is_none());

        let config: LoggingConfig = serde_json::from_str(r#"{"level":["debug","info"]}"#).unwrap();
        assert_eq!(config.level, Some(LogLevel::Debug));

        let config: LoggingConfig = serde_json::from_str(r#"{"format":"text"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.rotation, "daily");
    }
}
