//! Risk detection over the syntax tree.
//!
//! Every rule is a [`Detector`] registered in a [`Registry`]; the
//! [`Analyzer`] runs the registry over one module and groups the results by
//! [`Category`].

mod builtins;
mod maintainability;
mod names;
mod registry;
mod reliability;
mod runner;
mod security;
mod suppress;
mod types;

pub use builtins::is_builtin;
pub use maintainability::{NestingDetector, ParameterCountDetector};
pub use registry::{
    finding_at, Detector, FnDetector, Registry, RuleFn, DEFAULT_MAX_NESTING_DEPTH,
    DEFAULT_MAX_PARAMETERS,
};
pub use runner::{Analyzer, FileError, FileReport, ScanResult, Scanner, SourceReport};
pub use suppress::{
    filter_suppressed, parse_suppressions, SuppressedFinding, Suppression, SuppressionType,
};
pub use types::{Category, Finding, RiskReport};
