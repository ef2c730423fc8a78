//! Configuration loading and config file resolution
//!
//! All settings come from a single TOML file. Every field has a built-in
//! default, so a missing file only produces a warning and the service
//! starts with defaults. A file that exists but cannot be parsed, or that
//! holds inconsistent values, is a hard error.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `FLORAI_CONFIG` environment variable
//! 3. User config directory (`~/.config/florai/config.toml` on Linux)
//! 4. System config (`/etc/florai/config.toml`, Linux only)

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FLORAI_CONFIG";

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to the SQLite document database
    pub database_path: PathBuf,

    /// HTTP bind address
    pub host: String,

    /// HTTP server port
    pub port: u16,

    pub notifications: NotificationsConfig,
    pub severity: SeverityConfig,
    pub templates: TemplateConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: "127.0.0.1".to_string(),
            port: 8001,
            notifications: NotificationsConfig::default(),
            severity: SeverityConfig::default(),
            templates: TemplateConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Global alerting switches
///
/// Read once at startup; a restart is required to apply changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Process-wide kill switch for notification creation
    pub enabled: bool,

    /// When a preference lookup fails: `true` skips the alert,
    /// `false` fails the request
    pub fail_closed_on_store_error: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_closed_on_store_error: true,
        }
    }
}

/// Confidence thresholds separating severity tiers
///
/// `confidence > high_above` is High, `confidence > medium_above` is
/// Medium, anything else is Low.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub high_above: f64,
    pub medium_above: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            high_above: 0.70,
            medium_above: 0.40,
        }
    }
}

/// Alert text templates
///
/// Single-alert descriptions may use `{confidence}` (whole percent) and
/// `{model}`. The batch description may use `{high}`, `{medium}`, `{low}`
/// and `{total}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub high_title: String,
    pub medium_title: String,
    pub low_title: String,
    pub high_description: String,
    pub medium_description: String,
    pub low_description: String,
    pub batch_title: String,
    pub batch_description: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            high_title: "High Risk Area Detected".to_string(),
            medium_title: "Moderate Risk Area Detected".to_string(),
            low_title: "Low Risk Area Detected".to_string(),
            high_description: "High risk ({confidence}% confidence) of invasive species occurrence \
                               detected at your selected location. Model: {model}."
                .to_string(),
            medium_description: "Medium risk ({confidence}% confidence) of invasive species \
                                 occurrence detected at your selected location. Model: {model}."
                .to_string(),
            low_description: "Low risk ({confidence}% confidence) of invasive species occurrence \
                              at your selected location. Model: {model}."
                .to_string(),
            batch_title: "Grid Analysis Complete".to_string(),
            batch_description: "Area analysis complete: {high} high, {medium} medium, {low} low \
                                risk points out of {total}."
                .to_string(),
        }
    }
}

/// Occurrence model server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Prediction endpoint of the model server
    pub url: String,

    /// Identifier stored with every prediction and alert
    pub model_id: String,

    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8002/predict".to_string(),
            model_id: "XGBoost_ML-1.0.0".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject values the alerting pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let s = &self.severity;
        for (name, value) in [("high_above", s.high_above), ("medium_above", s.medium_above)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "severity.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if s.medium_above >= s.high_above {
            return Err(Error::Config(format!(
                "severity.medium_above ({}) must be below severity.high_above ({})",
                s.medium_above, s.high_above
            )));
        }
        if self.classifier.model_id.trim().is_empty() {
            return Err(Error::Config("classifier.model_id must not be empty".to_string()));
        }
        if self.classifier.timeout_ms == 0 {
            return Err(Error::Config("classifier.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Locate the configuration file following the priority order above.
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("florai").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/florai/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// This file was named but does not exist; defaults in use
    MissingFile(PathBuf),
    /// No file found anywhere; defaults in use
    Defaults,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::MissingFile(path) => {
                write!(f, "built-in defaults ({} not found)", path.display())
            }
            ConfigOrigin::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Resolve and load configuration, falling back to defaults when no file
/// is found. An explicitly named file that is missing is also tolerated.
///
/// Does not log: it runs before the tracing subscriber exists, so the
/// caller reports the returned origin once logging is up.
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigOrigin)> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = TomlConfig::from_file(&path)?;
            Ok((config, ConfigOrigin::File(path)))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigOrigin::MissingFile(path))),
        None => Ok((TomlConfig::default(), ConfigOrigin::Defaults)),
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("florai").join("florai.db"))
        .unwrap_or_else(|| PathBuf::from("./florai_data/florai.db"))
}
