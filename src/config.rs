//! Run configuration.
//!
//! [`ResolverConfig`] holds every tunable of the linkage algorithm and is
//! passed explicitly to [`crate::Resolver::new`]. [`FileConfig`] is the
//! on-disk TOML form, which also carries input/output paths and logging.
//!
//! Precedence when the binary assembles a run: command-line flags (and
//! their `PERSONAE_*` environment fallbacks) over the TOML file over the
//! built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult, ValidationError};
use crate::resolution::MergeStrategy;

/// Tunables of the linkage algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Minimum token-set similarity (0–100) for a fuzzy merge.
    pub merge_threshold: f64,
    /// Minimum similarity (0–100) of the given names for a fuzzy merge.
    pub given_name_threshold: f64,
    /// Keys with fewer chars are never merge candidates.
    pub min_key_length: usize,
    pub merge_strategy: MergeStrategy,
    /// Fold `la X` / `le X` references into the matching full name.
    pub attach_surname_references: bool,
    /// Distinct witness trials needed to count as a super-witness.
    pub super_witness_min_trials: usize,
    pub id_prefix: String,
    /// Zero-padded width of the numeric part of canonical ids.
    pub id_width: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 95.0,
            given_name_threshold: 90.0,
            min_key_length: 5,
            merge_strategy: MergeStrategy::Greedy,
            attach_surname_references: true,
            super_witness_min_trials: 3,
            id_prefix: "E".to_string(),
            id_width: 5,
        }
    }
}

impl ResolverConfig {
    fn check_threshold(field: &'static str, value: f64) -> Result<(), ValidationError> {
        if (0.0..=100.0).contains(&value) {
            Ok(())
        } else {
            Err(ValidationError::ThresholdOutOfRange { field, value })
        }
    }

    fn check_minimum(field: &'static str, minimum: usize, actual: usize) -> Result<(), ValidationError> {
        if actual < minimum {
            return Err(ValidationError::InvalidMinimum {
                field,
                minimum,
                actual,
            });
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a threshold lies outside `[0, 100]` (NaN
    /// included) or `super_witness_min_trials` / `id_width` is zero.
    pub fn validate(self) -> ResolveResult<Self> {
        Self::check_threshold("merge_threshold", self.merge_threshold)?;
        Self::check_threshold("given_name_threshold", self.given_name_threshold)?;
        Self::check_minimum("super_witness_min_trials", 1, self.super_witness_min_trials)?;
        Self::check_minimum("id_width", 1, self.id_width)?;
        Ok(self)
    }
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Raw-entity table (JSON object keyed by raw name).
    pub entities: PathBuf,
    /// Trial metadata table (JSON array or object keyed by trial id).
    pub trials: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            entities: PathBuf::from("data/extracted_entities.json"),
            trials: PathBuf::from("data/trials.json"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive (`trace`, `debug`, `info`, `warn`, `error`, or a full
    /// `EnvFilter` directive). `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// TOML configuration file.
///
/// ```toml
/// [resolver]
/// merge_threshold = 95
/// merge_strategy = "transitive"
///
/// [paths]
/// entities = "data/extracted_entities.json"
/// trials = "data/trials.json"
/// output_dir = "output"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub resolver: ResolverConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Parses a configuration from TOML text. `origin` names the source in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Config`] when the text is not valid TOML or
    /// carries unknown keys.
    pub fn from_toml_str(text: &str, origin: &Path) -> ResolveResult<Self> {
        toml::from_str(text).map_err(|e| ResolveError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Config`] when the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> ResolveResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ResolveError::Config {
            path: path.to_path_buf(),
            message: format!("failed to read config file: {e}"),
        })?;
        Self::from_toml_str(&text, path)
    }
}

/// Values supplied on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub entities: Option<PathBuf>,
    pub trials: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub merge_threshold: Option<f64>,
    pub given_name_threshold: Option<f64>,
    pub min_key_length: Option<usize>,
    pub merge_strategy: Option<MergeStrategy>,
    pub attach_surname_references: Option<bool>,
    pub super_witness_min_trials: Option<usize>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Applies command-line overrides on top of this configuration.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        let paths = &mut self.paths;
        if let Some(v) = overrides.entities {
            paths.entities = v;
        }
        if let Some(v) = overrides.trials {
            paths.trials = v;
        }
        if let Some(v) = overrides.output_dir {
            paths.output_dir = v;
        }

        let resolver = &mut self.resolver;
        if let Some(v) = overrides.merge_threshold {
            resolver.merge_threshold = v;
        }
        if let Some(v) = overrides.given_name_threshold {
            resolver.given_name_threshold = v;
        }
        if let Some(v) = overrides.min_key_length {
            resolver.min_key_length = v;
        }
        if let Some(v) = overrides.merge_strategy {
            resolver.merge_strategy = v;
        }
        if let Some(v) = overrides.attach_surname_references {
            resolver.attach_surname_references = v;
        }
        if let Some(v) = overrides.super_witness_min_trials {
            resolver.super_witness_min_trials = v;
        }

        if let Some(v) = overrides.log_level {
            self.logging.level = v;
        }
        self
    }
}
