//! Error types for the analysis engine.

use thiserror::Error;

/// Diagnostic produced when the source cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    /// 1-based line of the first error node.
    pub line: usize,
    /// 1-based column of the first error node.
    pub column: usize,
    pub message: String,
}

/// Errors returned by [`crate::Analyzer`].
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// The source is not valid Python; no detector was run.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The Python grammar could not be loaded into the parser.
    #[error("failed to load Python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// The parser gave up without producing a tree.
    #[error("parser produced no tree")]
    NoTree,
}

impl AnalyzeError {
    /// The syntax diagnostic, when this is a syntax error.
    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            AnalyzeError::Syntax(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown rule {0:?} in disabled_rules")]
    UnknownRule(String),

    #[error("{field} must be at least 1")]
    InvalidThreshold { field: &'static str },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        source: globset::Error,
    },
}
