//! Integration tests for the full detection pipeline.
//!
//! These tests validate that the analyzer correctly identifies risks when
//! run against the testdata fixtures and small inline programs.

use std::path::PathBuf;

use tracebit::cli::collect_files;
use tracebit::detect::{Registry, SuppressionType};
use tracebit::{Analyzer, Category, Config, Finding, RiskReport, Scanner};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(testdata_path().join(name)).expect("should read fixture")
}

fn analyze_fixture(name: &str) -> RiskReport {
    Analyzer::new()
        .analyze(&read_fixture(name))
        .expect("fixture should parse")
}

fn sorted_lines(report: &RiskReport, category: Category) -> Vec<usize> {
    let mut lines: Vec<usize> = report
        .get(category)
        .expect("category should be registered")
        .iter()
        .map(|f| f.line)
        .collect();
    lines.sort();
    lines
}

fn categories(findings: &[Finding]) -> Vec<Category> {
    findings.iter().map(|f| f.category).collect()
}

// =============================================================================
// Fixture coverage
// =============================================================================

#[test]
fn test_risky_fixture_hits_every_category() {
    let report = analyze_fixture("risky.py");

    for category in Category::ALL {
        assert!(
            report.count(category) > 0,
            "risky.py should trigger {}",
            category
        );
    }
}

#[test]
fn test_risky_fixture_security_lines() {
    let report = analyze_fixture("risky.py");

    assert_eq!(sorted_lines(&report, Category::DangerousImport), vec![1, 2, 3]);
    assert_eq!(sorted_lines(&report, Category::HardcodedSecret), vec![5]);
    assert_eq!(sorted_lines(&report, Category::PromptLeak), vec![6]);
    assert_eq!(sorted_lines(&report, Category::UnsafeDeserialization), vec![11]);
    assert_eq!(sorted_lines(&report, Category::ShellInvocation), vec![15]);
    assert_eq!(sorted_lines(&report, Category::SqlConcatenation), vec![23]);
    assert_eq!(sorted_lines(&report, Category::UnescapedSqlParams), vec![23]);
    assert_eq!(sorted_lines(&report, Category::DynamicExecution), vec![46]);
    assert_eq!(sorted_lines(&report, Category::SensitiveAttributeAccess), vec![47]);
}

#[test]
fn test_risky_fixture_reliability_lines() {
    let report = analyze_fixture("risky.py");

    assert_eq!(sorted_lines(&report, Category::Division), vec![19]);
    assert_eq!(sorted_lines(&report, Category::UnboundedLoop), vec![33]);
    assert_eq!(sorted_lines(&report, Category::BroadExceptionHandling), vec![40]);
    assert_eq!(sorted_lines(&report, Category::EmptyExceptionHandler), vec![40]);
    assert_eq!(sorted_lines(&report, Category::IdentityLiteralComparison), vec![45]);
    assert_eq!(sorted_lines(&report, Category::UnpackingMismatch), vec![56]);
}

#[test]
fn test_risky_fixture_maintainability_lines() {
    let report = analyze_fixture("risky.py");

    assert_eq!(sorted_lines(&report, Category::MutableDefaultArgument), vec![27]);
    assert_eq!(sorted_lines(&report, Category::DuplicateDefinition), vec![50]);
    assert_eq!(sorted_lines(&report, Category::BuiltinShadowing), vec![54]);
    assert_eq!(sorted_lines(&report, Category::MagicNumber), vec![54, 55, 56, 56, 61]);
    assert_eq!(sorted_lines(&report, Category::ExcessiveNesting), vec![61]);
    assert_eq!(sorted_lines(&report, Category::ExcessiveParameters), vec![65]);
    assert_eq!(sorted_lines(&report, Category::YieldOutsideGenerator), vec![70]);
}

#[test]
fn test_risky_fixture_undefined_names() {
    let report = analyze_fixture("risky.py");
    let lines = sorted_lines(&report, Category::UndefinedVariable);

    // `with ... as` and `for` targets do not bind names.
    assert!(lines.contains(&11), "handle should be undefined: {:?}", lines);
    assert!(lines.contains(&57), "missing_name should be undefined: {:?}", lines);
    assert!(lines.contains(&61), "loop target should be undefined: {:?}", lines);
}

#[test]
fn test_snippets_are_trimmed_source_lines() {
    let report = analyze_fixture("risky.py");
    let shell = &report.get(Category::ShellInvocation).unwrap()[0];
    assert_eq!(shell.snippet, "return subprocess.call(command, shell=True)");
}

#[test]
fn test_clean_fixture_has_no_findings() {
    let report = analyze_fixture("clean.py");
    assert!(
        report.is_empty(),
        "clean.py should have no findings, got {:?}",
        report.flatten()
    );
    assert_eq!(report.categories().count(), Category::ALL.len());
}

// =============================================================================
// Reference behaviors
// =============================================================================

#[test]
fn test_division_by_zero_literal() {
    let findings = Analyzer::new().flatten("x = 10 / 0").unwrap();
    assert_eq!(findings[0].category, Category::Division);
    assert_eq!(findings[0].line, 1);
    assert_eq!(findings[0].snippet, "x = 10 / 0");
    assert_eq!(categories(&findings), vec![Category::Division, Category::MagicNumber]);
}

#[test]
fn test_eval_call() {
    let report = Analyzer::new().analyze("eval(user_input)").unwrap();
    assert_eq!(report.count(Category::DynamicExecution), 1);
    assert_eq!(report.get(Category::DynamicExecution).unwrap()[0].line, 1);
}

#[test]
fn test_pickle_import() {
    let report = Analyzer::new().analyze("import pickle").unwrap();
    assert_eq!(report.count(Category::DangerousImport), 1);
    assert_eq!(report.total(), 1);
}

#[test]
fn test_bare_except_pass() {
    let report = Analyzer::new()
        .analyze("try:\n    do()\nexcept:\n    pass")
        .unwrap();
    assert_eq!(sorted_lines(&report, Category::BroadExceptionHandling), vec![3]);
    assert_eq!(sorted_lines(&report, Category::EmptyExceptionHandler), vec![3]);
}

#[test]
fn test_while_true_with_and_without_break() {
    let analyzer = Analyzer::new();
    let unbounded = analyzer.analyze("while True:\n    x = 1").unwrap();
    assert_eq!(sorted_lines(&unbounded, Category::UnboundedLoop), vec![1]);

    let bounded = analyzer
        .analyze("while True:\n    if done():\n        break")
        .unwrap();
    assert_eq!(bounded.count(Category::UnboundedLoop), 0);
}

#[test]
fn test_secret_requires_key_name() {
    let analyzer = Analyzer::new();
    let secret = analyzer.analyze("API_KEY = 'abc123'").unwrap();
    assert_eq!(sorted_lines(&secret, Category::HardcodedSecret), vec![1]);

    let plain = analyzer.analyze("count = 'abc123'").unwrap();
    assert_eq!(plain.count(Category::HardcodedSecret), 0);
}

#[test]
fn test_magic_number_exceptions() {
    let analyzer = Analyzer::new();
    assert_eq!(analyzer.analyze("x = 42").unwrap().count(Category::MagicNumber), 1);
    assert_eq!(analyzer.analyze("x = 1").unwrap().count(Category::MagicNumber), 0);
    assert_eq!(analyzer.analyze("x = 0").unwrap().count(Category::MagicNumber), 0);
}

#[test]
fn test_match_case_literals_are_magic_numbers() {
    let source = "match code:\n    case 42:\n        pass\n    case -5:\n        pass\n    case 0 | 1:\n        pass\n    case Status(code=7):\n        pass\n";
    let report = Analyzer::new().analyze(source).unwrap();
    assert_eq!(sorted_lines(&report, Category::MagicNumber), vec![2, 4, 8]);
}

#[test]
fn test_empty_input_flattens_to_empty_list() {
    assert!(Analyzer::new().flatten("").unwrap().is_empty());
    assert!(Analyzer::new().flatten("x = 1\n").unwrap().is_empty());
}

#[test]
fn test_flatten_follows_registration_order() {
    let source = "API_KEY = 'k'\nx = 10 / 3\nimport os\n";
    let findings = Analyzer::new().flatten(source).unwrap();
    let order = categories(&findings);

    let mut expected = order.clone();
    expected.sort();
    assert_eq!(order, expected);
    assert_eq!(
        order,
        vec![
            Category::Division,
            Category::DangerousImport,
            Category::HardcodedSecret,
            Category::MagicNumber,
            Category::MagicNumber,
        ]
    );
}

#[test]
fn test_analysis_is_idempotent_and_isolated() {
    let analyzer = Analyzer::new();
    let risky = read_fixture("risky.py");

    let first = analyzer.analyze(&risky).unwrap();
    analyzer.analyze(&read_fixture("clean.py")).unwrap();
    let second = analyzer.analyze(&risky).unwrap();
    assert_eq!(first, second);

    let clean = analyzer.analyze(&read_fixture("clean.py")).unwrap();
    assert!(clean.is_empty());
}

#[test]
fn test_syntax_error_is_propagated() {
    let err = Analyzer::new()
        .analyze(&read_fixture("broken.py"))
        .expect_err("broken.py should not parse");
    let syntax = err.as_syntax().expect("should be a syntax error");
    assert_eq!(syntax.line, 1);
}

#[test]
fn test_python2_print_is_rejected() {
    assert!(Analyzer::new().analyze("print 'hello'\n").is_err());
}

#[test]
fn test_custom_thresholds() {
    let source = "def f(a, b, c):\n    pass\n";
    let strict = Analyzer::with_registry(Registry::with_thresholds(3, 2), false);
    assert_eq!(strict.analyze(source).unwrap().count(Category::ExcessiveParameters), 1);
    assert_eq!(Analyzer::new().analyze(source).unwrap().count(Category::ExcessiveParameters), 0);
}

// =============================================================================
// Suppressions and scanning
// =============================================================================

#[test]
fn test_suppressed_fixture() {
    let report = Analyzer::new()
        .scan_source(&read_fixture("suppressed.py"))
        .unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].category, Category::DynamicExecution);
    assert_eq!(report.findings[0].line, 7);

    assert_eq!(report.suppressed.len(), 3);
    let file_level = report
        .suppressed
        .iter()
        .find(|s| s.finding.category == Category::MagicNumber)
        .expect("magic number should be suppressed");
    assert_eq!(file_level.suppression.suppression_type, SuppressionType::File);
    assert_eq!(file_level.suppression.reason, "Lookup table module");
}

#[test]
fn test_directory_scan_with_config() {
    let testdata = testdata_path();
    let config = Config::parse_file(testdata.join("tracebit.yaml")).expect("should parse config");
    let files = collect_files(&testdata).expect("should walk testdata");
    assert!(files.iter().any(|p| p.ends_with("vendor/thirdparty.py")));

    let scanner = Scanner::new(&config).expect("should build scanner");
    let result = scanner.scan_paths(&files);

    let scanned: Vec<_> = result
        .files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(scanned, vec!["clean.py", "risky.py", "suppressed.py"]);

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].path.ends_with("broken.py"));
    assert_eq!(result.errors[0].line, Some(1));
}

#[test]
fn test_disabled_rules_from_config() {
    let config = Config::parse_str("disabled_rules: [magic_number, undefined_variable]\n").unwrap();
    let report = Analyzer::from_config(&config)
        .analyze(&read_fixture("risky.py"))
        .unwrap();
    assert!(report.get(Category::MagicNumber).is_none());
    assert!(report.get(Category::UndefinedVariable).is_none());
    assert!(report.count(Category::Division) > 0);
}
