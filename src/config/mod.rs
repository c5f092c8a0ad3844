//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `ROLLCALL_*` environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Type | Description |
//! |----------|------|-------------|
//! | `ROLLCALL_CONFIG_PATH` | path | Config file used when `--config` is not given |
//! | `ROLLCALL_DATA_DIR` | path | Data directory (ledger lives here by default) |
//! | `ROLLCALL_COOLDOWN_SECS` | u64 | Debounce cooldown |
//! | `ROLLCALL_DEBOUNCE_CAPACITY` | usize | Identities remembered per run |
//! | `ROLLCALL_ACCEPTANCE_THRESHOLD` | f32 | Minimum matcher confidence |
//! | `ROLLCALL_LOG_FORMAT` | `json`/`pretty` | Log output format |
//! | `ROLLCALL_METRICS_ENABLED` | bool | Enable the Prometheus exporter |
//! | `ROLLCALL_METRICS_PORT` | u16 | Prometheus listener port |
//! | `ROLLCALL_LOG` / `RUST_LOG` | filter | Log filter directive |
//!
//! # Example
//!
//! ```toml
//! data_dir = "/var/lib/rollcall"
//! default_teacher = "Ms. Rivera"
//! placeholder_subjects = ["select subject"]
//!
//! [debounce]
//! cooldown_secs = 45
//!
//! [matcher]
//! acceptance_threshold = 0.7
//!
//! [logging]
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! port = 9184
//! ```

mod env;

use crate::models::{DEFAULT_PLACEHOLDER_SUBJECTS, DEFAULT_TEACHER, SessionContext};
use crate::services::{
    DEFAULT_ACCEPTANCE_THRESHOLD, DEFAULT_CAPACITY, DEFAULT_COOLDOWN_SECS, ReconcilerConfig,
};
use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use env::process_env;

/// File name of the ledger inside the data directory.
pub const LEDGER_FILE_NAME: &str = "attendance.db";

/// Main configuration for rollcall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollcallConfig {
    /// Directory holding the ledger and logs.
    pub data_dir: PathBuf,
    /// Explicit ledger path; defaults to `data_dir/attendance.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
    /// Teacher recorded when none is given.
    pub default_teacher: String,
    /// Subject names that mean "nothing selected".
    pub placeholder_subjects: Vec<String>,
    /// Debounce tracker settings.
    pub debounce: DebounceSettings,
    /// Matcher settings.
    pub matcher: MatcherSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Debounce tracker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DebounceSettings {
    /// Cooldown in seconds.
    pub cooldown_secs: u64,
    /// Maximum identities remembered per run.
    pub capacity: usize,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS.unsigned_abs(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatcherSettings {
    /// Minimum confidence for a candidate to be considered.
    pub acceptance_threshold: f32,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }
}

/// Logging settings as written in the config file.
///
/// Resolved against the environment by
/// [`crate::observability::LoggingConfig::from_settings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `rollcall=debug`.
    pub filter: Option<String>,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

/// Metrics settings as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is enabled.
    pub enabled: Option<bool>,
    /// HTTP listener port.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Ledger path.
    pub ledger_path: Option<String>,
    /// Default teacher.
    pub default_teacher: Option<String>,
    /// Placeholder subjects.
    pub placeholder_subjects: Option<Vec<String>>,
    /// Debounce section.
    pub debounce: Option<ConfigFileDebounce>,
    /// Matcher section.
    pub matcher: Option<ConfigFileMatcher>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Debounce section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDebounce {
    /// Cooldown in seconds.
    pub cooldown_secs: Option<u64>,
    /// Capacity.
    pub capacity: Option<usize>,
}

/// Matcher section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMatcher {
    /// Acceptance threshold.
    pub acceptance_threshold: Option<f32>,
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_path: None,
            default_teacher: DEFAULT_TEACHER.to_string(),
            placeholder_subjects: DEFAULT_PLACEHOLDER_SUBJECTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            debounce: DebounceSettings::default(),
            matcher: MatcherSettings::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

/// Returns the platform data directory for rollcall, or `.rollcall`.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".rollcall"),
        |b| b.data_local_dir().join("rollcall"),
    )
}

/// Returns the threshold if it lies within `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for NaN or an out-of-range value.
pub fn check_acceptance_threshold(threshold: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidInput(format!(
            "matcher.acceptance_threshold must be within [0, 1], got {threshold}"
        )))
    }
}

impl RollcallConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the effective configuration.
    ///
    /// Uses `explicit` if given, otherwise `ROLLCALL_CONFIG_PATH`, otherwise
    /// the default location. Environment overrides are applied last and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed,
    /// or if the resulting configuration is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, &process_env)
    }

    /// Like [`Self::load`] with an injectable environment.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_with(
        explicit: Option<&Path>,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let from_env = env::parse_string(lookup, "ROLLCALL_CONFIG_PATH").map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/rollcall/`. Returns
    /// defaults if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("rollcall").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("rollcall")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable config"),
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.ledger_path = file.ledger_path.map(PathBuf::from);
        if let Some(teacher) = file.default_teacher {
            config.default_teacher = teacher;
        }
        if let Some(placeholders) = file.placeholder_subjects {
            config.placeholder_subjects = placeholders;
        }
        if let Some(debounce) = file.debounce {
            if let Some(v) = debounce.cooldown_secs {
                config.debounce.cooldown_secs = v;
            }
            if let Some(v) = debounce.capacity {
                config.debounce.capacity = v;
            }
        }
        if let Some(v) = file.matcher.and_then(|m| m.acceptance_threshold) {
            config.matcher.acceptance_threshold = v;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Applies `ROLLCALL_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(&process_env);
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(dir) = env::parse_string(lookup, "ROLLCALL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = env::parse_value(lookup, "ROLLCALL_COOLDOWN_SECS") {
            self.debounce.cooldown_secs = secs;
        }
        if let Some(capacity) = env::parse_value(lookup, "ROLLCALL_DEBOUNCE_CAPACITY") {
            self.debounce.capacity = capacity;
        }
        if let Some(threshold) = env::parse_value(lookup, "ROLLCALL_ACCEPTANCE_THRESHOLD") {
            self.matcher.acceptance_threshold = threshold;
        }
        if let Some(format) = env::parse_string(lookup, "ROLLCALL_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(enabled) = env::parse_bool(lookup, "ROLLCALL_METRICS_ENABLED") {
            self.metrics.enabled = Some(enabled);
        }
        if let Some(port) = env::parse_value(lookup, "ROLLCALL_METRICS_PORT") {
            self.metrics.port = Some(port);
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a threshold outside `[0, 1]`, a
    /// zero capacity, an out-of-range cooldown or an unknown log format.
    pub fn validate(&self) -> Result<()> {
        check_acceptance_threshold(self.matcher.acceptance_threshold)?;
        if self.debounce.capacity == 0 {
            return Err(Error::InvalidInput(
                "debounce.capacity must be at least 1".to_string(),
            ));
        }
        if self.cooldown().is_none() {
            return Err(Error::InvalidInput(format!(
                "debounce.cooldown_secs is out of range: {}",
                self.debounce.cooldown_secs
            )));
        }
        if let Some(format) = &self.logging.format {
            if !matches!(format.to_lowercase().as_str(), "json" | "pretty") {
                return Err(Error::InvalidInput(format!(
                    "logging.format must be 'json' or 'pretty', got '{format}'"
                )));
            }
        }
        Ok(())
    }

    /// Returns the ledger path.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LEDGER_FILE_NAME))
    }

    fn cooldown(&self) -> Option<Duration> {
        i64::try_from(self.debounce.cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }

    /// Builds the reconciler configuration.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        let config = ReconcilerConfig::default()
            .with_capacity(self.debounce.capacity)
            .with_acceptance_threshold(self.matcher.acceptance_threshold);
        match self.cooldown() {
            Some(cooldown) => config.with_cooldown(cooldown),
            None => config,
        }
    }

    /// Builds a validated session context with this configuration's
    /// placeholders and default teacher.
    ///
    /// `date` defaults to today's local date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] for an empty or placeholder subject.
    pub fn session(
        &self,
        subject: &str,
        teacher: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<SessionContext> {
        let teacher = teacher.unwrap_or(&self.default_teacher);
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        SessionContext::with_placeholders(subject, teacher, date, &self.placeholder_subjects)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "render_config".to_string(),
            cause: e.to_string(),
        })
    }
}
