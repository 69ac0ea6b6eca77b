//! Rules that need more than one pass over the tree.

use std::collections::HashSet;

use crate::source::SourceIndex;
use crate::syntax::{ExprContext, NodeKind, SyntaxNode};

use super::builtins::is_builtin;
use super::registry::finding_at;
use super::{Category, Finding};

/// Names bound and names read anywhere in one module.
///
/// Scope-insensitive: a parameter of one function defines that name for the
/// whole module. Imports, loop targets and `with` targets do not bind.
#[derive(Default)]
struct NameTable<'a> {
    defined: HashSet<&'a str>,
    used: HashSet<&'a str>,
}

impl<'a> NameTable<'a> {
    fn collect(module: &'a SyntaxNode) -> Self {
        let mut table = Self::default();
        for node in module.walk() {
            match &node.kind {
                NodeKind::FunctionDef(function) => {
                    table.defined.insert(&function.name);
                    table
                        .defined
                        .extend(function.params.iter().map(|p| p.name.as_str()));
                }
                NodeKind::ClassDef(class) => {
                    table.defined.insert(&class.name);
                }
                NodeKind::Assign { targets, .. } => {
                    table.defined.extend(targets.iter().filter_map(|t| t.as_name()));
                }
                NodeKind::Name {
                    id,
                    ctx: ExprContext::Load,
                } => {
                    table.used.insert(id);
                }
                _ => {}
            }
        }
        table
    }

    fn undefined(&self) -> HashSet<&'a str> {
        self.used
            .iter()
            .copied()
            .filter(|name| !self.defined.contains(name) && !is_builtin(name))
            .collect()
    }
}

/// Every read of a name that is never bound in the module and is not a
/// builtin.
pub fn detect_undefined_variables(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let undefined = NameTable::collect(module).undefined();
    if undefined.is_empty() {
        return Vec::new();
    }
    tracing::trace!(count = undefined.len(), "undefined names");

    module
        .walk()
        .filter(|node| match &node.kind {
            NodeKind::Name {
                id,
                ctx: ExprContext::Load,
            } => undefined.contains(id.as_str()),
            _ => false,
        })
        .filter_map(|node| finding_at(Category::UndefinedVariable, node, index))
        .collect()
}

/// `yield` and `yield from` at module or class-body level.
pub fn detect_yield_outside_function(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    visit_outside_functions(module, &mut |node| {
        if matches!(node.kind, NodeKind::Yield { .. }) {
            findings.extend(finding_at(Category::YieldOutsideGenerator, node, index));
        }
    });
    findings
}

/// Breadth-first over `root`, not entering function or lambda bodies.
fn visit_outside_functions<'a>(root: &'a SyntaxNode, visit: &mut impl FnMut(&'a SyntaxNode)) {
    let mut queue = std::collections::VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        visit(node);
        queue.extend(
            node.children()
                .into_iter()
                .filter(|child| !matches!(child.kind, NodeKind::FunctionDef(_) | NodeKind::Lambda { .. })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn findings(rule: fn(&SyntaxNode, &SourceIndex) -> Vec<Finding>, source: &str) -> Vec<Finding> {
        let module = parse(source).expect("should parse");
        rule(&module, &SourceIndex::new(source))
    }

    fn lines(rule: fn(&SyntaxNode, &SourceIndex) -> Vec<Finding>, source: &str) -> Vec<usize> {
        findings(rule, source).into_iter().map(|f| f.line).collect()
    }

    #[test]
    fn test_undefined_reference() {
        let found = findings(detect_undefined_variables, "eval(user_input)\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].snippet, "eval(user_input)");
    }

    #[test]
    fn test_defined_names_are_not_flagged() {
        let src = concat!(
            "total = 0\n",
            "def add(value, *rest, scale=1, **opts):\n",
            "    return total + value * scale + len(rest) + len(opts)\n",
            "class Box:\n",
            "    pass\n",
            "b = Box()\n",
            "add(b)\n",
        );
        assert!(lines(detect_undefined_variables, src).is_empty());
    }

    #[test]
    fn test_every_read_is_reported() {
        let src = "print(missing)\nx = missing + 1\n";
        assert_eq!(lines(detect_undefined_variables, src), vec![1, 2]);
    }

    #[test]
    fn test_import_does_not_bind() {
        assert_eq!(lines(detect_undefined_variables, "import os\nos.getcwd()\n"), vec![2]);
    }

    #[test]
    fn test_binding_after_use_still_counts() {
        assert!(lines(detect_undefined_variables, "print(later)\nlater = 1\n").is_empty());
    }

    #[test]
    fn test_yield_in_function_is_fine() {
        let src = "def gen():\n    yield 1\n    yield from other()\n";
        assert!(lines(detect_yield_outside_function, src).is_empty());
    }

    #[test]
    fn test_yield_at_class_level() {
        let src = "class C:\n    x = yield 1\n    def m(self):\n        yield 2\n";
        assert_eq!(lines(detect_yield_outside_function, src), vec![2]);
    }

    #[test]
    fn test_yield_in_lambda_is_fine() {
        assert!(lines(detect_yield_outside_function, "f = lambda: (yield)\n").is_empty());
    }
}
