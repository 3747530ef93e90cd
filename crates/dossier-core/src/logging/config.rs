//! Logging configuration.
//!
//! Resolved from, in increasing precedence:
//! - the `[logging]` table of the config file
//! - environment variables (`DOSSIER_LOG`, `DOSSIER_LOG_FORMAT`)
//! - CLI flags (`--log-level`, `--log-format`)

use dossier_config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

pub const ENV_LOG: &str = "DOSSIER_LOG";
pub const ENV_LOG_FORMAT: &str = "DOSSIER_LOG_FORMAT";

/// How events are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{other}' (expected human or jsonl)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum severity that reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = match s.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "quiet" | "none" | "silent" => "off".to_string(),
            other => other.to_string(),
        };
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| format!("unknown log level '{s}'"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Effective logging settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human lines with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the config file table, the process environment and CLI
    /// overrides.
    pub fn resolve(
        file: &LoggingConfig,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        Self::resolve_with(file, cli_level, cli_format, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with an injectable environment lookup.
    pub fn resolve_with<F>(
        file: &LoggingConfig,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LogConfig::default();

        // Unparseable values fall through to the next source.
        if let Ok(level) = file.level.parse() {
            config.level = level;
        }
        if let Ok(format) = file.format.parse() {
            config.format = format;
        }

        if let Some(level) = lookup(ENV_LOG).and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()) {
            config.format = format;
        }

        if let Some(level) = cli_level {
            config.level = level;
        }
        if let Some(format) = cli_format {
            config.format = format;
        }
        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert_eq!(LogFormat::Jsonl.to_string(), "jsonl");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_level_names_round_trip() {
        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        }
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("quiet".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
    }

    #[test]
    fn test_resolve_precedence() {
        let file = LoggingConfig {
            level: "debug".to_string(),
            format: "jsonl".to_string(),
        };

        let from_file = LogConfig::resolve_with(&file, None, None, env(&[]));
        assert_eq!(from_file.level, LogLevel::Debug);
        assert_eq!(from_file.format, LogFormat::Jsonl);

        let from_env = LogConfig::resolve_with(
            &file,
            None,
            None,
            env(&[(ENV_LOG, "warn"), (ENV_LOG_FORMAT, "human")]),
        );
        assert_eq!(from_env.level, LogLevel::Warn);
        assert_eq!(from_env.format, LogFormat::Human);

        let from_cli = LogConfig::resolve_with(
            &file,
            Some(LogLevel::Error),
            None,
            env(&[(ENV_LOG, "warn")]),
        );
        assert_eq!(from_cli.level, LogLevel::Error);
        assert_eq!(from_cli.format, LogFormat::Jsonl);
    }

    #[test]
    fn test_bad_values_fall_through() {
        let file = LoggingConfig {
            level: "loud".to_string(),
            format: "xml".to_string(),
        };
        let config = LogConfig::resolve_with(&file, None, None, env(&[(ENV_LOG, "???")]));
        assert_eq!(config, LogConfig::default());
    }
}
