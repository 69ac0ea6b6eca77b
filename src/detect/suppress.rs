//! Inline suppression of findings via comments.
//!
//! Supports suppression comments like:
//! - `# tracebit:ignore <rule> - <reason>`
//! - `# tracebit:ignore-next-line <rule> - <reason>`
//! - `# tracebit:ignore-file <rule> - <reason>`
//!
//! `<rule>` is a category name such as `magic_number`, or `*` for all.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Category, Finding};

/// File-level directives are only honored within the leading comment block
/// or the first few lines of a file.
const FILE_DIRECTIVE_MAX_LINE: usize = 10;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Category name (e.g. "magic_number") or "*" for all
    pub rule: String,
    /// Human-readable reason
    pub reason: String,
    /// Line number of the comment (0 for file-level)
    pub line: usize,
    pub suppression_type: SuppressionType,
}

impl Suppression {
    fn covers_category(&self, category: Category) -> bool {
        self.rule == "*" || self.rule == category.as_str()
    }

    /// Check if a finding is covered by this suppression.
    pub fn matches(&self, finding: &Finding) -> bool {
        if !self.covers_category(finding.category) {
            return false;
        }
        match self.suppression_type {
            SuppressionType::File => true,
            SuppressionType::Line => finding.line == self.line,
            SuppressionType::NextLine => finding.line == self.line + 1,
        }
    }
}

/// A finding that was suppressed, with the directive that suppressed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedFinding {
    pub finding: Finding,
    pub suppression: Suppression,
}

lazy_static::lazy_static! {
    static ref SUPPRESSION_PATTERN: Regex =
        Regex::new(r"#\s*tracebit:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap();
}

/// Parse suppression directives from Python source.
pub fn parse_suppressions(content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1;
        let trimmed = line.trim();

        if in_header && !(trimmed.is_empty() || trimmed.starts_with('#')) {
            in_header = false;
        }

        let Some(caps) = SUPPRESSION_PATTERN.captures(line) else {
            continue;
        };
        let directive = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let rule = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let reason = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        if rule != "*" && Category::parse(rule).is_none() {
            tracing::warn!(line = line_number, rule, "suppression names an unknown rule");
        }

        let suppression_type = match directive {
            "ignore-file" => {
                if !in_header && line_number > FILE_DIRECTIVE_MAX_LINE {
                    continue;
                }
                SuppressionType::File
            }
            "ignore-next-line" => SuppressionType::NextLine,
            "ignore" => {
                // Alone on its line it applies to the line below.
                let before = caps.get(0).map(|m| &line[..m.start()]).unwrap_or("");
                if before.trim().is_empty() {
                    SuppressionType::NextLine
                } else {
                    SuppressionType::Line
                }
            }
            _ => continue,
        };

        suppressions.push(Suppression {
            rule: rule.to_string(),
            reason,
            line: if suppression_type == SuppressionType::File {
                0
            } else {
                line_number
            },
            suppression_type,
        });
    }

    suppressions
}

/// Separate findings into active and suppressed.
pub fn filter_suppressed(
    findings: Vec<Finding>,
    suppressions: &[Suppression],
) -> (Vec<Finding>, Vec<SuppressedFinding>) {
    if suppressions.is_empty() {
        return (findings, Vec::new());
    }

    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for finding in findings {
        match suppressions.iter().find(|s| s.matches(&finding)) {
            Some(suppression) => suppressed.push(SuppressedFinding {
                finding,
                suppression: suppression.clone(),
            }),
            None => active.push(finding),
        }
    }

    (active, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: Category, line: usize) -> Finding {
        Finding {
            category,
            line,
            snippet: String::new(),
        }
    }

    #[test]
    fn test_parse_file_and_line_directives() {
        let content = r#"# tracebit:ignore-file magic_number - Lookup tables
import os

x = eval(data)  # tracebit:ignore dynamic_execution - Trusted input
"#;
        let suppressions = parse_suppressions(content);
        assert_eq!(suppressions.len(), 2);

        assert_eq!(suppressions[0].suppression_type, SuppressionType::File);
        assert_eq!(suppressions[0].rule, "magic_number");
        assert_eq!(suppressions[0].reason, "Lookup tables");
        assert_eq!(suppressions[0].line, 0);

        assert_eq!(suppressions[1].suppression_type, SuppressionType::Line);
        assert_eq!(suppressions[1].line, 4);
    }

    #[test]
    fn test_parse_next_line() {
        let content = "\n# tracebit:ignore-next-line hardcoded_secret - Test fixture\nAPI_KEY = 'x'\n";
        let suppressions = parse_suppressions(content);
        assert_eq!(suppressions.len(), 1);
        assert_eq!(suppressions[0].suppression_type, SuppressionType::NextLine);
        assert_eq!(suppressions[0].line, 2);
        assert!(suppressions[0].matches(&finding(Category::HardcodedSecret, 3)));
    }

    #[test]
    fn test_standalone_ignore_applies_to_next_line() {
        let suppressions = parse_suppressions("# tracebit:ignore magic_number\nx = 42\n");
        assert_eq!(suppressions[0].suppression_type, SuppressionType::NextLine);
    }

    #[test]
    fn test_late_file_directive_is_ignored() {
        let mut content = String::from("import sys\n");
        for _ in 0..12 {
            content.push_str("x = 1\n");
        }
        content.push_str("# tracebit:ignore-file * - too late\n");
        assert!(parse_suppressions(&content).is_empty());
    }

    #[test]
    fn test_filter_suppressed() {
        let suppressions = vec![
            Suppression {
                rule: "magic_number".to_string(),
                reason: String::new(),
                line: 0,
                suppression_type: SuppressionType::File,
            },
            Suppression {
                rule: "*".to_string(),
                reason: "legacy".to_string(),
                line: 7,
                suppression_type: SuppressionType::Line,
            },
        ];
        let findings = vec![
            finding(Category::MagicNumber, 3),
            finding(Category::Division, 3),
            finding(Category::Division, 7),
        ];

        let (active, suppressed) = filter_suppressed(findings, &suppressions);
        assert_eq!(active, vec![finding(Category::Division, 3)]);
        assert_eq!(suppressed.len(), 2);
        assert_eq!(suppressed[1].suppression.reason, "legacy");
    }
}
