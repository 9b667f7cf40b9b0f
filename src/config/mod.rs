//! Configuration system for shape-fusion
//!
//! Provides:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./shape-fusion.toml` - Project-local configuration
//! 2. `~/.config/shape-fusion/config.toml` - User configuration (XDG)
//! 3. `~/.shape-fusion/config.toml` - User configuration (legacy)
//! 4. `/etc/shape-fusion/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `SHAPE_FUSION_MODE` - fuse, project-subtractive, project-additive
//! - `SHAPE_FUSION_MAX_ROUNDS` - Outer fixpoint round budget
//! - `SHAPE_FUSION_LOG_LEVEL` - quiet, normal, verbose, debug, trace
//! - `SHAPE_FUSION_FORMAT` - turtle, ntriples
//! - `SHAPE_FUSION_RERUN_CLASS_EQUIVALENCE` - true/false
//! - `SHAPE_FUSION_FINAL_AUDIT` - true/false
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! format = "turtle"
//! log_level = "normal"
//!
//! [fusion]
//! mode = "project-subtractive"
//! max_rounds = 64
//!
//! [prefixes]
//! ex = "http://example.org/"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::fusion::{FusionMode, FusionOptions};

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FusionConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Fusion engine settings
    pub fusion: EngineConfig,
    /// Output prefix definitions
    pub prefixes: IndexMap<String, String>,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base URI for relative references in input files
    pub base_uri: Option<String>,
    /// Output format
    pub format: OutputFormat,
    /// Logging level
    pub log_level: LogLevel,
}

/// Fusion engine options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operating mode
    pub mode: FusionMode,
    /// Outer fixpoint round budget
    pub max_rounds: usize,
    /// Re-enter class-equivalence propagation on every outer round
    pub rerun_class_equivalence: bool,
    /// Run the full consistency audit before returning
    pub final_audit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = FusionOptions::default();
        Self {
            mode: options.mode,
            max_rounds: options.max_rounds,
            rerun_class_equivalence: options.rerun_class_equivalence,
            final_audit: options.final_audit,
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Output serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Turtle grouped by subject
    #[default]
    Turtle,
    /// N-Triples (N-Quads for named graphs)
    NTriples,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Turtle => "turtle",
            OutputFormat::NTriples => "ntriples",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ttl" | "turtle" => Some(OutputFormat::Turtle),
            "nt" | "ntriples" | "n-triples" | "nq" | "nquads" => Some(OutputFormat::NTriples),
            _ => None,
        }
    }
}

/// Logging verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            "trace" | "t" | "4" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// The `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn",
            LogLevel::Verbose => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Shift the level by `-q` / `-v` counts
    pub fn adjusted(self, verbose: u8, quiet: bool) -> Self {
        if quiet {
            return LogLevel::Quiet;
        }
        const LADDER: [LogLevel; 5] = [
            LogLevel::Quiet,
            LogLevel::Normal,
            LogLevel::Verbose,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = LADDER.iter().position(|l| *l == self).unwrap_or(1);
        LADDER[(current + verbose as usize).min(LADDER.len() - 1)]
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl FusionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the first file found, then apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, then apply env overrides
    pub fn load_with_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from a string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))
    }

    /// Get the list of config file paths to search
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./shape-fusion.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shape-fusion").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".shape-fusion").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/shape-fusion/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SHAPE_FUSION_MODE") {
            match FusionMode::from_str(&val) {
                Some(mode) => self.fusion.mode = mode,
                None => tracing::warn!(value = %val, "ignoring SHAPE_FUSION_MODE"),
            }
        }

        if let Some(val) = lookup("SHAPE_FUSION_MAX_ROUNDS") {
            match val.parse::<usize>() {
                Ok(rounds) => self.fusion.max_rounds = rounds,
                Err(_) => tracing::warn!(value = %val, "ignoring SHAPE_FUSION_MAX_ROUNDS"),
            }
        }

        if let Some(val) = lookup("SHAPE_FUSION_LOG_LEVEL") {
            match LogLevel::from_str(&val) {
                Some(level) => self.general.log_level = level,
                None => tracing::warn!(value = %val, "ignoring SHAPE_FUSION_LOG_LEVEL"),
            }
        }

        if let Some(val) = lookup("SHAPE_FUSION_FORMAT") {
            match OutputFormat::from_str(&val) {
                Some(format) => self.general.format = format,
                None => tracing::warn!(value = %val, "ignoring SHAPE_FUSION_FORMAT"),
            }
        }

        if let Some(val) = lookup("SHAPE_FUSION_RERUN_CLASS_EQUIVALENCE") {
            if let Some(flag) = parse_flag(&val) {
                self.fusion.rerun_class_equivalence = flag;
            }
        }

        if let Some(val) = lookup("SHAPE_FUSION_FINAL_AUDIT") {
            if let Some(flag) = parse_flag(&val) {
                self.fusion.final_audit = flag;
            }
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fusion.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fusion.max_rounds".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Options for the fusion engine
    pub fn fusion_options(&self) -> FusionOptions {
        FusionOptions {
            mode: self.fusion.mode,
            max_rounds: self.fusion.max_rounds,
            rerun_class_equivalence: self.fusion.rerun_class_equivalence,
            final_audit: self.fusion.final_audit,
        }
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# shape-fusion configuration

[general]
# Output format: turtle, ntriples
format = "turtle"
# Logging level: quiet, normal, verbose, debug, trace
log_level = "normal"
# Base URI for relative IRIs in input files (optional)
# base_uri = "http://example.org/"

[fusion]
# Mode: fuse, project-subtractive, project-additive
mode = "fuse"
# Outer fixpoint round budget
max_rounds = 64
# Re-run equivalentClass propagation on every round
rerun_class_equivalence = true
# Full consistency audit of the fused graph before output
final_audit = true

[prefixes]
# ex = "http://example.org/"
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error reading config file
    IoError(PathBuf, String),
    /// Parse error in config file
    ParseError(PathBuf, String),
    /// Serialization error
    SerializeError(String),
    /// A value outside the accepted range
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "IO error reading {}: {}", path.display(), msg)
            }
            ConfigError::ParseError(path, msg) => {
                write!(f, "Parse error in {}: {}", path.display(), msg)
            }
            ConfigError::SerializeError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Tests
// ============================================================================
