//! Analyzer configuration loading, path resolution and validation.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::task::{AnalysisSettings, ProtocolLog};

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse TOML: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A protocol entry in the configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProtocolEntry {
    pub name: String,
    /// Explicit log file. Relative paths are resolved against `log_dir`.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

/// Root structure of the analyzer configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Directory holding the protocol logs.
    pub log_dir: PathBuf,
    /// Appended to a protocol name to form its log file name when no
    /// `log_path` is given, e.g. `_60_4_web_log.out`.
    pub log_suffix: String,
    #[serde(flatten)]
    pub settings: AnalysisSettings,
    pub protocols: Vec<ProtocolEntry>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
            log_suffix: String::new(),
            settings: AnalysisSettings::default(),
            protocols: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Load and validate a configuration file.
    ///
    /// A relative `log_dir` is taken relative to the file's own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let base_dir = path.parent().unwrap_or(Path::new("."));
        let config = Self::from_toml_str(&data, base_dir)?;
        config.validate().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    /// Parse configuration text without validating it.
    pub fn from_toml_str(data: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: AnalyzerConfig = toml::from_str(data)
            .context("Invalid TOML format")
            .map_err(|e| ConfigError::ParseError(format!("{:#}", e)))?;

        if config.log_dir.is_relative() {
            config.log_dir = base_dir.join(&config.log_dir);
        }
        Ok(config)
    }

    /// Add a protocol, replacing any existing entry with the same name.
    pub fn set_protocol(&mut self, name: &str, log_path: PathBuf) {
        let entry = ProtocolEntry {
            name: name.to_string(),
            log_path: Some(log_path),
        };
        match self.protocols.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = entry,
            None => self.protocols.push(entry),
        }
    }

    /// Resolve the log file for a protocol entry.
    pub fn log_path_for(&self, entry: &ProtocolEntry) -> PathBuf {
        match &entry.log_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.log_dir.join(path),
            None => self.log_dir.join(format!("{}{}", entry.name, self.log_suffix)),
        }
    }

    /// All configured protocols with resolved log paths, in file order.
    pub fn protocol_logs(&self) -> Vec<ProtocolLog> {
        self.protocols
            .iter()
            .map(|entry| ProtocolLog {
                name: entry.name.clone(),
                path: self.log_path_for(entry),
            })
            .collect()
    }

    /// Check that the configuration describes a runnable analysis.
    ///
    /// # Returns
    ///
    /// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.protocols.is_empty() {
            return Err("Configuration must list at least one protocol".to_string());
        }

        let mut names = HashSet::new();
        for entry in &self.protocols {
            if entry.name.trim().is_empty() {
                return Err("Protocol name must not be empty".to_string());
            }
            if !names.insert(entry.name.as_str()) {
                return Err(format!("Duplicate protocol name found: {}", entry.name));
            }
        }

        let window = &self.settings.window;
        if window.start >= window.end {
            return Err(format!(
                "Invalid window: start {} must be less than end {}",
                window.start, window.end
            ));
        }

        let thresholds = &self.settings.thresholds;
        if thresholds.small_max == 0 {
            return Err("Invalid thresholds: small_max must be positive".to_string());
        }
        if thresholds.small_max >= thresholds.medium_max {
            return Err(format!(
                "Invalid thresholds: small_max {} must be less than medium_max {}",
                thresholds.small_max, thresholds.medium_max
            ));
        }

        for quantile in &self.settings.percentiles {
            if !(0.0..1.0).contains(quantile) {
                return Err(format!("Invalid percentile {}, must be in [0, 1)", quantile));
            }
        }

        Ok(())
    }
}
