//! Maintainability rules: shadowing, duplicates, nesting, signatures and literals.

use std::collections::HashSet;

use crate::source::SourceIndex;
use crate::syntax::{NodeKind, SyntaxNode};

use super::builtins::is_builtin;
use super::registry::{finding_at, Detector};
use super::{Category, Finding};

/// One finding per `Assign` target that rebinds a builtin name.
pub fn detect_builtin_shadowing(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in module.walk() {
        let NodeKind::Assign { targets, .. } = &node.kind else {
            continue;
        };
        for target in targets {
            if target.as_name().is_some_and(is_builtin) {
                findings.extend(finding_at(Category::BuiltinShadowing, node, index));
            }
        }
    }
    findings
}

/// Functions and classes share one namespace: `class A` after `def A` is a
/// duplicate. The first definition in walk order is never flagged.
pub fn detect_duplicate_definitions(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut findings = Vec::new();
    for node in module.walk() {
        let name = match &node.kind {
            NodeKind::FunctionDef(f) => f.name.as_str(),
            NodeKind::ClassDef(c) => c.name.as_str(),
            _ => continue,
        };
        if !seen.insert(name) {
            findings.extend(finding_at(Category::DuplicateDefinition, node, index));
        }
    }
    findings
}

/// One finding per list, dict or set literal used as a positional default,
/// reported on the `def` line.
pub fn detect_mutable_defaults(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in module.walk() {
        let NodeKind::FunctionDef(function) = &node.kind else {
            continue;
        };
        let mutable = function
            .positional_params()
            .filter_map(|p| p.default.as_ref())
            .filter(|d| {
                matches!(
                    d.kind,
                    NodeKind::List { .. } | NodeKind::Dict { .. } | NodeKind::Set { .. }
                )
            });
        for _ in mutable {
            findings.extend(finding_at(Category::MutableDefaultArgument, node, index));
        }
    }
    findings
}

/// Numeric literals other than 0 and 1.
///
/// `-1` never reaches this rule as a literal: it is a negation of `1`.
/// Booleans compare equal to 0/1 and are therefore never flagged.
pub fn detect_magic_numbers(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    module
        .walk()
        .filter(|node| {
            node.as_constant()
                .and_then(|c| c.numeric_value())
                .is_some_and(|v| v != 0.0 && v != 1.0 && v != -1.0)
        })
        .filter_map(|node| finding_at(Category::MagicNumber, node, index))
        .collect()
}

/// Flags `if`/`for`/`while`/`try` statements nested deeper than `max_depth`.
///
/// Depth is counted along chains of control-flow statements starting at the
/// module. Any other statement (a `def`, a `with`, an `except` clause) breaks
/// the chain, so control flow inside a function body is not descended into.
pub struct NestingDetector {
    max_depth: usize,
}

impl NestingDetector {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn visit(&self, node: &SyntaxNode, depth: usize, index: &SourceIndex, out: &mut Vec<Finding>) {
        if depth > self.max_depth {
            out.extend(finding_at(Category::ExcessiveNesting, node, index));
        }
        for child in node.children() {
            if child.is_control_flow() {
                self.visit(child, depth + 1, index, out);
            }
        }
    }
}

impl Default for NestingDetector {
    fn default() -> Self {
        Self::new(super::registry::DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl Detector for NestingDetector {
    fn category(&self) -> Category {
        Category::ExcessiveNesting
    }

    fn detect(&self, module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.visit(module, 0, index, &mut findings);
        findings
    }
}

/// Flags functions declaring more than `limit` positional parameters.
pub struct ParameterCountDetector {
    limit: usize,
}

impl ParameterCountDetector {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for ParameterCountDetector {
    fn default() -> Self {
        Self::new(super::registry::DEFAULT_MAX_PARAMETERS)
    }
}

impl Detector for ParameterCountDetector {
    fn category(&self) -> Category {
        Category::ExcessiveParameters
    }

    fn detect(&self, module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
        module
            .walk()
            .filter(|node| match &node.kind {
                NodeKind::FunctionDef(f) => f.positional_params().count() > self.limit,
                _ => false,
            })
            .filter_map(|node| finding_at(Category::ExcessiveParameters, node, index))
            .collect()
    }
}
