//! Detector trait and the ordered registry of rules.

use crate::config::Config;
use crate::source::SourceIndex;
use crate::syntax::SyntaxNode;

use super::maintainability::{NestingDetector, ParameterCountDetector};
use super::{maintainability, names, reliability, security, Category, Finding};

/// Default depth above which nested control flow is flagged.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 3;
/// Default number of positional parameters a function may declare.
pub const DEFAULT_MAX_PARAMETERS: usize = 6;

/// A single rule over the syntax tree.
///
/// Implementations must be pure functions of their inputs: any accumulator a
/// rule needs lives inside one `detect` call, so a detector can be shared
/// between threads and reused across runs.
pub trait Detector: Send + Sync {
    /// The category every finding of this detector belongs to.
    fn category(&self) -> Category;

    /// Run the rule over `module`, returning findings in traversal order.
    fn detect(&self, module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding>;
}

/// Signature of a stateless rule.
pub type RuleFn = fn(&SyntaxNode, &SourceIndex) -> Vec<Finding>;

/// Adapter turning a plain function into a [`Detector`].
pub struct FnDetector {
    category: Category,
    rule: RuleFn,
}

impl FnDetector {
    pub fn new(category: Category, rule: RuleFn) -> Self {
        Self { category, rule }
    }
}

impl Detector for FnDetector {
    fn category(&self) -> Category {
        self.category
    }

    fn detect(&self, module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
        (self.rule)(module, index)
    }
}

/// Build a finding for `node`, or `None` when the node has no location.
pub fn finding_at(category: Category, node: &SyntaxNode, index: &SourceIndex) -> Option<Finding> {
    node.line.map(|line| Finding {
        category,
        line,
        snippet: index.line(line).to_string(),
    })
}

/// Ordered collection of detectors.
pub struct Registry {
    detectors: Vec<Box<dyn Detector>>,
}

impl Registry {
    /// Create a registry with no detectors.
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// All built-in rules with the given thresholds, in category order.
    pub fn with_thresholds(max_nesting_depth: usize, max_parameters: usize) -> Self {
        let mut registry = Self::empty();
        for category in Category::ALL {
            registry.register(builtin_detector(category, max_nesting_depth, max_parameters));
        }
        registry
    }

    /// Built-in rules configured from a config file, minus disabled rules.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::with_thresholds(config.max_nesting_depth, config.max_parameters);
        for category in config.disabled_categories() {
            registry.disable(category);
        }
        registry
    }

    /// Append a detector; it runs after every detector registered before it.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    /// Remove every detector of `category`.
    pub fn disable(&mut self, category: Category) {
        self.detectors.retain(|d| d.category() != category);
    }

    /// Categories in registration order.
    pub fn categories(&self) -> Vec<Category> {
        self.detectors.iter().map(|d| d.category()).collect()
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_thresholds(DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_PARAMETERS)
    }
}

fn builtin_detector(
    category: Category,
    max_nesting_depth: usize,
    max_parameters: usize,
) -> Box<dyn Detector> {
    let rule: RuleFn = match category {
        Category::ExcessiveNesting => return Box::new(NestingDetector::new(max_nesting_depth)),
        Category::ExcessiveParameters => return Box::new(ParameterCountDetector::new(max_parameters)),
        Category::Division => reliability::detect_division,
        Category::DynamicExecution => security::detect_dynamic_execution,
        Category::DangerousImport => security::detect_dangerous_imports,
        Category::SensitiveAttributeAccess => security::detect_sensitive_attributes,
        Category::BuiltinShadowing => maintainability::detect_builtin_shadowing,
        Category::BroadExceptionHandling => reliability::detect_broad_excepts,
        Category::UnboundedLoop => reliability::detect_unbounded_loops,
        Category::HardcodedSecret => security::detect_hardcoded_secrets,
        Category::UnpackingMismatch => reliability::detect_unpacking_mismatches,
        Category::UndefinedVariable => names::detect_undefined_variables,
        Category::ShellInvocation => security::detect_shell_invocation,
        Category::SqlConcatenation => security::detect_sql_concatenation,
        Category::DuplicateDefinition => maintainability::detect_duplicate_definitions,
        Category::EmptyExceptionHandler => reliability::detect_empty_excepts,
        Category::YieldOutsideGenerator => names::detect_yield_outside_function,
        Category::MutableDefaultArgument => maintainability::detect_mutable_defaults,
        Category::IdentityLiteralComparison => reliability::detect_identity_literal_comparisons,
        Category::UnsafeDeserialization => security::detect_unsafe_deserialization,
        Category::MagicNumber => maintainability::detect_magic_numbers,
        Category::PromptLeak => security::detect_prompt_leaks,
        Category::UnescapedSqlParams => security::detect_unescaped_sql_params,
    };
    Box::new(FnDetector::new(category, rule))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopDetector;

    impl Detector for NoopDetector {
        fn category(&self) -> Category {
            Category::MagicNumber
        }

        fn detect(&self, _module: &SyntaxNode, _index: &SourceIndex) -> Vec<Finding> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_registers_every_category_in_order() {
        let registry = Registry::default();
        assert_eq!(registry.categories(), Category::ALL.to_vec());
    }

    #[test]
    fn test_disable_removes_category() {
        let mut registry = Registry::default();
        registry.disable(Category::MagicNumber);
        assert_eq!(registry.len(), Category::ALL.len() - 1);
        assert!(!registry.categories().contains(&Category::MagicNumber));
    }

    #[test]
    fn test_register_custom_detector() {
        let mut registry = Registry::empty();
        registry.register(Box::new(NoopDetector));
        assert_eq!(registry.categories(), vec![Category::MagicNumber]);
    }

    #[test]
    fn test_from_config_applies_disabled_rules() {
        let config = Config {
            disabled_rules: vec!["division".to_string(), "magic_number".to_string()],
            ..Default::default()
        };
        let registry = Registry::from_config(&config);
        let categories = registry.categories();
        assert!(!categories.contains(&Category::Division));
        assert!(!categories.contains(&Category::MagicNumber));
        assert!(categories.contains(&Category::PromptLeak));
    }
}
