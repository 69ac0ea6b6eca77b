//! Reliability rules: runtime failures and swallowed errors.

use crate::source::SourceIndex;
use crate::syntax::{BinOperator, CmpOperator, Constant, NodeKind, SyntaxNode};

use super::registry::finding_at;
use super::{Category, Finding};

/// Collect a finding for every node matching `pred`, in walk order.
fn flag_nodes(
    module: &SyntaxNode,
    index: &SourceIndex,
    category: Category,
    pred: impl Fn(&SyntaxNode) -> bool,
) -> Vec<Finding> {
    module
        .walk()
        .filter(|node| pred(node))
        .filter_map(|node| finding_at(category, node, index))
        .collect()
}

/// True division. Floor division and `/=` are not matched.
pub fn detect_division(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::Division, |node| {
        matches!(node.kind, NodeKind::BinOp { op: BinOperator::Div, .. })
    })
}

/// Bare `except:` and `except Exception:`.
pub fn detect_broad_excepts(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::BroadExceptionHandling, |node| {
        match &node.kind {
            NodeKind::ExceptHandler { type_: None, .. } => true,
            NodeKind::ExceptHandler { type_: Some(ty), .. } => ty.as_name() == Some("Exception"),
            _ => false,
        }
    })
}

pub fn detect_empty_excepts(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::EmptyExceptionHandler, |node| {
        matches!(
            &node.kind,
            NodeKind::ExceptHandler { body, .. } if matches!(body.as_slice(), [only] if only.kind == NodeKind::Pass)
        )
    })
}

/// `while True:` with no `break` anywhere below it.
///
/// A `break` inside a nested loop still counts; only the literal `True`
/// test is recognized (`while 1:` is not).
pub fn detect_unbounded_loops(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::UnboundedLoop, |node| match &node.kind {
        NodeKind::While { test, .. } => {
            test.as_constant() == Some(&Constant::Bool(true))
                && !node.walk().any(|n| n.kind == NodeKind::Break)
        }
        _ => false,
    })
}

/// `a, b = 1, 2, 3` and friends. Only the first target is inspected.
pub fn detect_unpacking_mismatches(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::UnpackingMismatch, |node| {
        let NodeKind::Assign { targets, value } = &node.kind else {
            return false;
        };
        let Some(NodeKind::Tuple { elts: names, .. }) = targets.first().map(|t| &t.kind) else {
            return false;
        };
        match &value.kind {
            NodeKind::Tuple { elts, .. } | NodeKind::List { elts, .. } => elts.len() != names.len(),
            _ => false,
        }
    })
}

/// `x is 5`, `x is "a"`, `x is None`.
pub fn detect_identity_literal_comparisons(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    flag_nodes(module, index, Category::IdentityLiteralComparison, |node| {
        match &node.kind {
            NodeKind::Compare { ops, comparators, .. } => {
                ops.first() == Some(&CmpOperator::Is)
                    && comparators.iter().any(|c| c.as_constant().is_some())
            }
            _ => false,
        }
    })
}
