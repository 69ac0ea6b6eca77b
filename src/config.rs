//! Configuration file for tracebit.
//!
//! ```yaml
//! max_nesting_depth: 3
//! max_parameters: 6
//! parallel: true
//! disabled_rules: [magic_number]
//! excluded_paths: ["**/migrations/**"]
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::detect::{Category, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_PARAMETERS};
use crate::error::ConfigError;

/// Config file names searched for, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["tracebit.yaml", ".tracebit.yaml"];

/// Engine settings loaded from YAML. Every field is optional in the file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Control flow nested deeper than this is flagged.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Functions with more positional parameters than this are flagged.
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,
    /// Run the detectors of one file on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Category names to skip (e.g. "magic_number").
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    /// Glob patterns for paths to exclude from scanning (e.g. "**/migrations/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

fn default_max_parameters() -> usize {
    DEFAULT_MAX_PARAMETERS
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_parameters: DEFAULT_MAX_PARAMETERS,
            parallel: true,
            disabled_rules: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Parse and validate a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a config from YAML text. An empty document yields
    /// the defaults.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Look for a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check thresholds, rule names and glob patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "max_nesting_depth",
            });
        }
        if self.max_parameters == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "max_parameters",
            });
        }
        if let Some(unknown) = self
            .disabled_rules
            .iter()
            .find(|rule| Category::parse(rule).is_none())
        {
            return Err(ConfigError::UnknownRule(unknown.clone()));
        }
        self.exclusion_set()?;
        Ok(())
    }

    /// Disabled categories. Unknown names are skipped; `validate` rejects them.
    pub fn disabled_categories(&self) -> Vec<Category> {
        self.disabled_rules
            .iter()
            .filter_map(|rule| Category::parse(rule))
            .collect()
    }

    /// Compile `excluded_paths` into one matcher.
    /// Uses globset, which supports `**` for recursive directory matching.
    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Glob {
            pattern: self.excluded_paths.join(", "),
            source,
        })
    }
}
