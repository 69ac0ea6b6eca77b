//! Tracebit - static risk detection for Python source.
//!
//! Tracebit parses Python code and reports patterns that are dangerous or
//! hard to maintain: `eval` calls, `shell=True`, SQL assembled from strings,
//! hardcoded secrets, swallowed exceptions, mutable defaults, deep nesting
//! and more. Every finding carries its category, line and source snippet.
//!
//! # Architecture
//!
//! - `syntax`: tree-sitter based parser lowered into a Python-AST-shaped tree
//! - `detect`: the rule registry, the 23 rules and the analyzer that runs them
//! - `source`: line table used for finding snippets
//! - `config`: YAML configuration (thresholds, disabled rules, exclusions)
//! - `report`: Output formatting (text, JSON)
//!
//! # Example
//!
//! ```
//! use tracebit::{Analyzer, Category};
//!
//! let findings = Analyzer::new().flatten("x = 10 / 0\n").unwrap();
//! assert_eq!(findings[0].category, Category::Division);
//! assert_eq!(findings[0].snippet, "x = 10 / 0");
//! ```

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod report;
pub mod source;
pub mod syntax;

pub use config::Config;
pub use detect::{Analyzer, Category, Finding, RiskReport, ScanResult, Scanner};
pub use error::{AnalyzeError, ConfigError, SyntaxError};
pub use source::SourceIndex;
pub use syntax::{parse, SyntaxNode};
