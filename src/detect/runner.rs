//! Detection runner that orchestrates all rules.

use globset::GlobSet;
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{AnalyzeError, ConfigError};
use crate::source::SourceIndex;
use crate::syntax::{parse, SyntaxNode};

use super::registry::{Detector, Registry};
use super::suppress::{filter_suppressed, parse_suppressions, SuppressedFinding};
use super::{Category, Finding, RiskReport};

/// Runs a registry of detectors over Python source.
///
/// An analyzer holds only immutable configuration and can be shared between
/// threads; every call owns its own tree and accumulators.
pub struct Analyzer {
    registry: Registry,
    parallel: bool,
}

impl Analyzer {
    /// All built-in rules with default thresholds.
    pub fn new() -> Self {
        Self::with_registry(Registry::default(), true)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_registry(Registry::from_config(config), config.parallel)
    }

    pub fn with_registry(registry: Registry, parallel: bool) -> Self {
        Self { registry, parallel }
    }

    /// Parse `source` and run every registered detector.
    ///
    /// On a syntax error no detector runs.
    pub fn analyze(&self, source: &str) -> Result<RiskReport, AnalyzeError> {
        let module = parse(source)?;
        let index = SourceIndex::new(source);
        Ok(self.run_all(&module, &index))
    }

    /// Findings of [`Analyzer::analyze`] in one list, category by category.
    pub fn flatten(&self, source: &str) -> Result<Vec<Finding>, AnalyzeError> {
        Ok(self.analyze(source)?.flatten())
    }

    /// Run every detector over an already parsed module.
    pub fn run_all(&self, module: &SyntaxNode, index: &SourceIndex) -> RiskReport {
        let detectors = self.registry.detectors();
        tracing::debug!(
            detectors = detectors.len(),
            lines = index.len(),
            parallel = self.parallel,
            "running detectors"
        );

        let results: Vec<(Category, Vec<Finding>)> = if self.parallel {
            detectors
                .par_iter()
                .map(|d| run_detector(d.as_ref(), module, index))
                .collect()
        } else {
            detectors
                .iter()
                .map(|d| run_detector(d.as_ref(), module, index))
                .collect()
        };

        let mut report = RiskReport::new();
        for (category, findings) in results {
            report.push(category, findings);
        }
        report
    }

    /// Analyze `source` and apply its `# tracebit:` suppression comments.
    pub fn scan_source(&self, source: &str) -> Result<SourceReport, AnalyzeError> {
        let findings = self.flatten(source)?;
        let suppressions = parse_suppressions(source);
        let (findings, suppressed) = filter_suppressed(findings, &suppressions);
        Ok(SourceReport {
            findings,
            suppressed,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// A panicking detector contributes no findings.
fn run_detector(
    detector: &dyn Detector,
    module: &SyntaxNode,
    index: &SourceIndex,
) -> (Category, Vec<Finding>) {
    let category = detector.category();
    let findings = match catch_unwind(AssertUnwindSafe(|| detector.detect(module, index))) {
        Ok(findings) => findings,
        Err(_) => {
            tracing::error!(category = category.as_str(), "detector panicked during detection");
            Vec::new()
        }
    };
    (category, findings)
}

/// Active and suppressed findings of one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub findings: Vec<Finding>,
    pub suppressed: Vec<SuppressedFinding>,
}

/// Results for one scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
    pub suppressed: Vec<SuppressedFinding>,
}

/// A file that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    /// Line of the syntax error, when the file failed to parse.
    pub line: Option<usize>,
    pub message: String,
}

/// Outcome of scanning many files. Both lists are sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileReport>,
    pub errors: Vec<FileError>,
}

impl ScanResult {
    pub fn total_findings(&self) -> usize {
        self.files.iter().map(|f| f.findings.len()).sum()
    }

    pub fn total_suppressed(&self) -> usize {
        self.files.iter().map(|f| f.suppressed.len()).sum()
    }

    /// Number of files that were attempted, including failures.
    pub fn files_scanned(&self) -> usize {
        self.files.len() + self.errors.len()
    }
}

/// Scans files on disk with one shared [`Analyzer`].
pub struct Scanner {
    analyzer: Analyzer,
    exclusions: GlobSet,
}

impl Scanner {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            analyzer: Analyzer::from_config(config),
            exclusions: config.exclusion_set()?,
        })
    }

    /// Analyze every non-excluded file in parallel.
    ///
    /// A file that fails does not affect the others.
    pub fn scan_paths<P: AsRef<Path> + Sync>(&self, files: &[P]) -> ScanResult {
        let outcomes: Vec<Result<FileReport, FileError>> = files
            .par_iter()
            .map(|p| p.as_ref())
            .filter(|path| {
                let excluded = self.exclusions.is_match(path);
                if excluded {
                    tracing::debug!(path = %path.display(), "skipping excluded path");
                }
                !excluded
            })
            .map(|path| self.scan_file(path))
            .collect();

        let mut result = ScanResult::default();
        for outcome in outcomes {
            match outcome {
                Ok(report) => result.files.push(report),
                Err(error) => {
                    tracing::warn!(path = %error.path.display(), "{}", error.message);
                    result.errors.push(error);
                }
            }
        }
        result.files.sort_by(|a, b| a.path.cmp(&b.path));
        result.errors.sort_by(|a, b| a.path.cmp(&b.path));
        result
    }

    fn scan_file(&self, path: &Path) -> Result<FileReport, FileError> {
        let source = std::fs::read_to_string(path).map_err(|e| FileError {
            path: path.to_path_buf(),
            line: None,
            message: format!("failed to read file: {}", e),
        })?;

        let report = self.analyzer.scan_source(&source).map_err(|e| FileError {
            path: path.to_path_buf(),
            line: e.as_syntax().map(|s| s.line),
            message: e.to_string(),
        })?;

        Ok(FileReport {
            path: path.to_path_buf(),
            findings: report.findings,
            suppressed: report.suppressed,
        })
    }
}
