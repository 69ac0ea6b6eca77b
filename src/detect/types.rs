//! Core types for detection results.

use serde::{Deserialize, Serialize};

/// Risk categories, declared in registration order.
///
/// The derived `Ord` follows declaration order, which is also the order in
/// which categories appear in a flattened report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Division,
    DynamicExecution,
    DangerousImport,
    SensitiveAttributeAccess,
    BuiltinShadowing,
    BroadExceptionHandling,
    UnboundedLoop,
    HardcodedSecret,
    UnpackingMismatch,
    UndefinedVariable,
    ShellInvocation,
    SqlConcatenation,
    DuplicateDefinition,
    ExcessiveNesting,
    EmptyExceptionHandler,
    ExcessiveParameters,
    YieldOutsideGenerator,
    MutableDefaultArgument,
    IdentityLiteralComparison,
    UnsafeDeserialization,
    MagicNumber,
    PromptLeak,
    UnescapedSqlParams,
}

impl Category {
    /// Every category, in registration order.
    pub const ALL: [Category; 23] = [
        Category::Division,
        Category::DynamicExecution,
        Category::DangerousImport,
        Category::SensitiveAttributeAccess,
        Category::BuiltinShadowing,
        Category::BroadExceptionHandling,
        Category::UnboundedLoop,
        Category::HardcodedSecret,
        Category::UnpackingMismatch,
        Category::UndefinedVariable,
        Category::ShellInvocation,
        Category::SqlConcatenation,
        Category::DuplicateDefinition,
        Category::ExcessiveNesting,
        Category::EmptyExceptionHandler,
        Category::ExcessiveParameters,
        Category::YieldOutsideGenerator,
        Category::MutableDefaultArgument,
        Category::IdentityLiteralComparison,
        Category::UnsafeDeserialization,
        Category::MagicNumber,
        Category::PromptLeak,
        Category::UnescapedSqlParams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Division => "division",
            Category::DynamicExecution => "dynamic_execution",
            Category::DangerousImport => "dangerous_import",
            Category::SensitiveAttributeAccess => "sensitive_attribute_access",
            Category::BuiltinShadowing => "builtin_shadowing",
            Category::BroadExceptionHandling => "broad_exception_handling",
            Category::UnboundedLoop => "unbounded_loop",
            Category::HardcodedSecret => "hardcoded_secret",
            Category::UnpackingMismatch => "unpacking_mismatch",
            Category::UndefinedVariable => "undefined_variable",
            Category::ShellInvocation => "shell_invocation",
            Category::SqlConcatenation => "sql_concatenation",
            Category::DuplicateDefinition => "duplicate_definition",
            Category::ExcessiveNesting => "excessive_nesting",
            Category::EmptyExceptionHandler => "empty_exception_handler",
            Category::ExcessiveParameters => "excessive_parameters",
            Category::YieldOutsideGenerator => "yield_outside_generator",
            Category::MutableDefaultArgument => "mutable_default_argument",
            Category::IdentityLiteralComparison => "identity_literal_comparison",
            Category::UnsafeDeserialization => "unsafe_deserialization",
            Category::MagicNumber => "magic_number",
            Category::PromptLeak => "prompt_leak",
            Category::UnescapedSqlParams => "unescaped_sql_params",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// One-line description shown by `tracebit rules`.
    pub fn description(&self) -> &'static str {
        match self {
            Category::Division => "division that may raise ZeroDivisionError",
            Category::DynamicExecution => "call to eval()",
            Category::DangerousImport => "import of pickle, os or subprocess",
            Category::SensitiveAttributeAccess => "access to __dict__, __class__ or __globals__",
            Category::BuiltinShadowing => "assignment shadowing a builtin name",
            Category::BroadExceptionHandling => "bare except or except Exception",
            Category::UnboundedLoop => "while True loop without break",
            Category::HardcodedSecret => "string literal assigned to a *key* variable",
            Category::UnpackingMismatch => "tuple unpacking with mismatched element count",
            Category::UndefinedVariable => "name read but never defined",
            Category::ShellInvocation => "call()/Popen() with shell=True",
            Category::SqlConcatenation => "execute() with a concatenated or f-string query",
            Category::DuplicateDefinition => "function or class defined twice",
            Category::ExcessiveNesting => "control flow nested too deeply",
            Category::EmptyExceptionHandler => "except block containing only pass",
            Category::ExcessiveParameters => "function with too many positional parameters",
            Category::YieldOutsideGenerator => "yield outside any function",
            Category::MutableDefaultArgument => "list, dict or set used as a default argument",
            Category::IdentityLiteralComparison => "`is` comparison against a literal",
            Category::UnsafeDeserialization => "pickle.load() on untrusted data",
            Category::MagicNumber => "numeric literal other than -1, 0 or 1",
            Category::PromptLeak => "string literal assigned to a prompt/instruction/secret variable",
            Category::UnescapedSqlParams => "execute() called without a parameter payload",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("unknown rule: {}", s))
    }
}

/// A single reported risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    /// 1-based line where the risk was identified.
    pub line: usize,
    /// Trimmed source text of `line`.
    pub snippet: String,
}

/// Findings of one analysis run, grouped by category.
///
/// Categories keep their registration order; a category whose detector found
/// nothing is still present with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    groups: Vec<(Category, Vec<Finding>)>,
}

impl RiskReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category's findings. Used by the runner in registration order.
    pub fn push(&mut self, category: Category, findings: Vec<Finding>) {
        match self.groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, existing)) => existing.extend(findings),
            None => self.groups.push((category, findings)),
        }
    }

    /// Findings for one category, or `None` if it was not registered.
    pub fn get(&self, category: Category) -> Option<&[Finding]> {
        self.groups
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, f)| f.as_slice())
    }

    /// Number of findings in `category` (0 when not registered).
    pub fn count(&self, category: Category) -> usize {
        self.get(category).map(<[Finding]>::len).unwrap_or(0)
    }

    /// Iterate `(category, findings)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Finding])> {
        self.groups.iter().map(|(c, f)| (*c, f.as_slice()))
    }

    /// Registered categories, in order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.groups.iter().map(|(c, _)| *c)
    }

    /// All findings, category by category in registration order.
    ///
    /// Empty when nothing was found.
    pub fn flatten(&self) -> Vec<Finding> {
        self.groups
            .iter()
            .filter(|(_, f)| !f.is_empty())
            .flat_map(|(_, f)| f.iter().cloned())
            .collect()
    }

    /// Total number of findings.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, f)| f.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
