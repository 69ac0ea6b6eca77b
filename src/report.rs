//! Output formatting for tracebit results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::detect::{Category, FileError, Finding, ScanResult, SuppressedFinding, SuppressionType};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub files_scanned: usize,
    pub findings: Vec<JsonFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedFinding>,
    pub suppressed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonFileError>,
    /// Finding count per category, categories with no findings omitted.
    pub summary: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonFinding {
    pub category: String,
    pub file: String,
    pub line: usize,
    pub snippet: String,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppressedFinding {
    pub finding: JsonFinding,
    pub suppression: JsonSuppression,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppression {
    pub rule: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

#[derive(Serialize, Deserialize)]
pub struct JsonFileError {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

fn suppression_type_name(t: SuppressionType) -> &'static str {
    match t {
        SuppressionType::Line => "line",
        SuppressionType::NextLine => "next_line",
        SuppressionType::File => "file",
    }
}

fn finding_to_json(file: &Path, f: &Finding) -> JsonFinding {
    JsonFinding {
        category: f.category.as_str().to_string(),
        file: file.display().to_string(),
        line: f.line,
        snippet: f.snippet.clone(),
    }
}

/// Per-category counts of active findings.
fn category_counts(result: &ScanResult) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for finding in result.files.iter().flat_map(|f| &f.findings) {
        *counts.entry(finding.category).or_insert(0) += 1;
    }
    counts
}

/// Build the JSON report.
pub fn build_json(path: &str, config_path: Option<&str>, result: &ScanResult) -> JsonReport {
    let findings = result
        .files
        .iter()
        .flat_map(|file| file.findings.iter().map(|f| finding_to_json(&file.path, f)))
        .collect();

    let suppressed: Vec<JsonSuppressedFinding> = result
        .files
        .iter()
        .flat_map(|file| {
            file.suppressed.iter().map(|sf| JsonSuppressedFinding {
                finding: finding_to_json(&file.path, &sf.finding),
                suppression: JsonSuppression {
                    rule: sf.suppression.rule.clone(),
                    reason: sf.suppression.reason.clone(),
                    line: sf.suppression.line,
                    suppression_type: suppression_type_name(sf.suppression.suppression_type)
                        .to_string(),
                },
            })
        })
        .collect();

    let errors = result
        .errors
        .iter()
        .map(|e| JsonFileError {
            file: e.path.display().to_string(),
            line: e.line,
            message: e.message.clone(),
        })
        .collect();

    let summary = category_counts(result)
        .into_iter()
        .map(|(category, count)| (category.as_str().to_string(), count))
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.map(str::to_string),
        files_scanned: result.files_scanned(),
        findings,
        suppressed_count: suppressed.len(),
        suppressed,
        errors,
        summary,
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: Option<&str>, result: &ScanResult) -> anyhow::Result<()> {
    let report = build_json(path, config_path, result);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(
    path: &str,
    config_path: Option<&str>,
    result: &ScanResult,
    show_suppressed: bool,
) {
    // Header
    println!();
    print!("  ");
    print!("{}", "tracebit".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Config:   ".dimmed());
    println!("{}", config_path.unwrap_or("(defaults)"));
    println!();

    write_result_summary(result);
    println!();

    if result.total_findings() > 0 {
        write_findings(result);
        println!();
    }

    if !result.errors.is_empty() {
        write_errors(&result.errors);
        println!();
    }

    let suppressed: Vec<(&Path, &SuppressedFinding)> = result
        .files
        .iter()
        .flat_map(|file| file.suppressed.iter().map(move |sf| (file.path.as_path(), sf)))
        .collect();
    if !suppressed.is_empty() {
        write_suppressed_summary(&suppressed, show_suppressed);
        println!();
    }

    let counts = category_counts(result);
    if !counts.is_empty() {
        write_breakdown(&counts);
        println!();
    }
}

fn write_result_summary(result: &ScanResult) {
    let total = result.total_findings();
    if total == 0 {
        print!("  {}", "✓ CLEAN".green());
    } else {
        print!("  {}", format!("✗ {} finding{}", total, plural(total)).red());
    }

    print!("  Files: {}", result.files_scanned());

    if !result.errors.is_empty() {
        print!("  {}", format!("({} failed)", result.errors.len()).yellow());
    }

    let suppressed = result.total_suppressed();
    if suppressed > 0 {
        print!("  {}", format!("({} suppressed)", suppressed).dimmed());
    }

    println!();
}

fn plural(n: usize) -> &'static str {
    if n != 1 {
        "s"
    } else {
        ""
    }
}

fn write_findings(result: &ScanResult) {
    println!("  {} ({}):", "Findings".bold(), result.total_findings());
    println!();

    for file in &result.files {
        for f in &file.findings {
            print!("    {:<28}", f.category.as_str().dimmed());
            print!("{}", file.path.display().to_string().blue());
            println!("{}", format!(":{}", f.line).dimmed());

            if !f.snippet.is_empty() {
                println!("            {}", f.snippet);
            }
            println!();
        }
    }
}

fn write_errors(errors: &[FileError]) {
    println!("  {} ({}):", "Errors".yellow().bold(), errors.len());
    println!();
    for e in errors {
        println!("    {}", e.path.display().to_string().blue());
        println!("            {}", e.message);
    }
}

fn write_breakdown(counts: &BTreeMap<Category, usize>) {
    println!("  {}", "Breakdown:".bold());

    // Most frequent first; ties keep category order.
    let mut rows: Vec<(&Category, &usize)> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1));

    for (category, count) in rows {
        println!(
            "    {:<28} {:>4} finding{}",
            category.as_str(),
            count,
            plural(*count)
        );
    }
}

fn write_suppressed_summary(suppressed: &[(&Path, &SuppressedFinding)], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for (path, sf) in suppressed {
        let f = &sf.finding;
        let s = &sf.suppression;

        print!("    {:<28}", f.category.as_str().dimmed());
        print!("{}", path.display().to_string().blue());
        if s.suppression_type == SuppressionType::File {
            print!("{}", ":* (file)".dimmed());
        } else {
            print!("{}", format!(":{}", f.line).dimmed());
        }
        println!();

        if !s.reason.is_empty() {
            println!("            {}", format!("reason: {:?}", s.reason).dimmed());
        }
    }
}

/// Print the rule catalogue for `tracebit rules`.
pub fn write_rules(disabled: &[Category]) {
    println!("{}", "Rules:".bold());
    println!();
    for category in Category::ALL {
        let name = format!("{:<28}", category.as_str());
        if disabled.contains(&category) {
            println!("  {} {}", name.dimmed(), "(disabled)".dimmed());
        } else {
            println!("  {} {}", name, category.description());
        }
    }
}
