//! Structured logging configuration.

use crate::config::{LoggingSettings, process_env};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Filter used when neither the config nor the environment names one.
const DEFAULT_FILTER: &str = "rollcall=info";

/// Filter used with `--verbose`.
const VERBOSE_FILTER: &str = "rollcall=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional log file; stderr otherwise.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from settings and the process
    /// environment.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::from_settings_with(settings, verbose, &process_env)
    }

    /// Builds logging configuration with an injectable environment.
    ///
    /// The filter comes from `--verbose`, then `ROLLCALL_LOG`, then
    /// `RUST_LOG`, then the config file. An unparsable directive falls back
    /// to the default filter.
    #[must_use]
    pub fn from_settings_with(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Self {
        let format = settings
            .and_then(|s| s.format.as_deref())
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        let directive = if verbose {
            VERBOSE_FILTER.to_string()
        } else {
            lookup("ROLLCALL_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .or_else(|| settings.and_then(|s| s.filter.clone()))
                .unwrap_or_else(|| DEFAULT_FILTER.to_string())
        };
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        Self {
            format,
            filter,
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_defaults_without_settings() {
        let config = LoggingConfig::from_settings_with(None, false, &|_| None);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.to_string(), DEFAULT_FILTER);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_filter_precedence() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            filter: Some("rollcall=warn".to_string()),
            file: Some(PathBuf::from("/tmp/rollcall.log")),
        };

        let from_file = LoggingConfig::from_settings_with(Some(&settings), false, &|_| None);
        assert_eq!(from_file.format, LogFormat::Json);
        assert_eq!(from_file.filter.to_string(), "rollcall=warn");

        let lookup = |k: &str| (k == "RUST_LOG").then(|| "rollcall=trace".to_string());
        let from_env = LoggingConfig::from_settings_with(Some(&settings), false, &lookup);
        assert_eq!(from_env.filter.to_string(), "rollcall=trace");

        let verbose = LoggingConfig::from_settings_with(Some(&settings), true, &lookup);
        assert_eq!(verbose.filter.to_string(), VERBOSE_FILTER);
    }
}
