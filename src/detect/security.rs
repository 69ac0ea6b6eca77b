//! Security rules: dynamic execution, dangerous modules, secrets, shell and SQL.

use crate::source::SourceIndex;
use crate::syntax::{Call, Constant, NodeKind, SyntaxNode};

use super::builtins::{is_dangerous_module, is_sensitive_attribute, is_shell_call};
use super::registry::finding_at;
use super::{Category, Finding};

/// Substrings that mark a variable as holding model prompt material.
const PROMPT_MARKERS: &[&str] = &["prompt", "instruction", "secret"];

fn calls(module: &SyntaxNode) -> impl Iterator<Item = (&SyntaxNode, &Call)> {
    module.walk().filter_map(|node| match &node.kind {
        NodeKind::Call(call) => Some((node, call)),
        _ => None,
    })
}

/// `eval(...)` through a bare name. Qualified calls like `builtins.eval` are
/// not matched.
pub fn detect_dynamic_execution(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    calls(module)
        .filter(|(_, call)| call.func.as_name() == Some("eval"))
        .filter_map(|(node, _)| finding_at(Category::DynamicExecution, node, index))
        .collect()
}

/// `import pickle` (one finding per listed module) and `from os import x`.
pub fn detect_dangerous_imports(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in module.walk() {
        match &node.kind {
            NodeKind::Import { names } => {
                for alias in names.iter().filter(|a| is_dangerous_module(&a.name)) {
                    tracing::trace!(module = %alias.name, "dangerous import");
                    findings.extend(finding_at(Category::DangerousImport, node, index));
                }
            }
            NodeKind::ImportFrom {
                module: Some(name), ..
            } if is_dangerous_module(name) => {
                findings.extend(finding_at(Category::DangerousImport, node, index));
            }
            _ => {}
        }
    }
    findings
}

pub fn detect_sensitive_attributes(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    module
        .walk()
        .filter(|node| matches!(&node.kind, NodeKind::Attribute { attr, .. } if is_sensitive_attribute(attr)))
        .filter_map(|node| finding_at(Category::SensitiveAttributeAccess, node, index))
        .collect()
}

/// One finding per simple `name = "literal"` target whose name satisfies
/// `matches` (checked against the lowercased name).
fn string_assignments(
    module: &SyntaxNode,
    index: &SourceIndex,
    category: Category,
    matches: impl Fn(&str) -> bool,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in module.walk() {
        let NodeKind::Assign { targets, value } = &node.kind else {
            continue;
        };
        if !value.is_str_constant() {
            continue;
        }
        for target in targets {
            if let Some(name) = target.as_name() {
                if matches(&name.to_lowercase()) {
                    findings.extend(finding_at(category, node, index));
                }
            }
        }
    }
    findings
}

pub fn detect_hardcoded_secrets(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    string_assignments(module, index, Category::HardcodedSecret, |name| {
        name.contains("key")
    })
}

pub fn detect_prompt_leaks(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    string_assignments(module, index, Category::PromptLeak, |name| {
        PROMPT_MARKERS.iter().any(|marker| name.contains(marker))
    })
}

/// `x.call(..., shell=True)` / `x.Popen(..., shell=True)`.
pub fn detect_shell_invocation(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (node, call) in calls(module) {
        if !call.method_name().is_some_and(is_shell_call) {
            continue;
        }
        let shell_true = call.keywords.iter().filter(|kw| {
            kw.arg.as_deref() == Some("shell")
                && kw.value.as_constant() == Some(&Constant::Bool(true))
        });
        for _ in shell_true {
            findings.extend(finding_at(Category::ShellInvocation, node, index));
        }
    }
    findings
}

/// `cursor.execute(...)` where a positional argument is built by `+`/`%`
/// or an f-string. One finding per offending argument.
pub fn detect_sql_concatenation(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (node, call) in calls(module) {
        if call.method_name() != Some("execute") {
            continue;
        }
        for arg in &call.args {
            if matches!(arg.kind, NodeKind::BinOp { .. } | NodeKind::JoinedStr { .. }) {
                findings.extend(finding_at(Category::SqlConcatenation, node, index));
            }
        }
    }
    findings
}

/// `cursor.execute(query)` with no separate parameters.
pub fn detect_unescaped_sql_params(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    calls(module)
        .filter(|(_, call)| call.method_name() == Some("execute") && call.args.len() == 1)
        .filter_map(|(node, _)| finding_at(Category::UnescapedSqlParams, node, index))
        .collect()
}

/// Root name of an attribute chain: `a` for `a.b.c`.
fn chain_root(node: &SyntaxNode) -> Option<&str> {
    match &node.kind {
        NodeKind::Name { id, .. } => Some(id),
        NodeKind::Attribute { value, .. } => chain_root(value),
        _ => None,
    }
}

/// `pickle.load(...)`, including deeper chains rooted at `pickle`.
pub fn detect_unsafe_deserialization(module: &SyntaxNode, index: &SourceIndex) -> Vec<Finding> {
    calls(module)
        .filter(|(_, call)| match &call.func.kind {
            NodeKind::Attribute { value, attr, .. } => {
                attr == "load" && chain_root(value) == Some("pickle")
            }
            _ => false,
        })
        .filter_map(|(node, _)| finding_at(Category::UnsafeDeserialization, node, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn run(rule: fn(&SyntaxNode, &SourceIndex) -> Vec<Finding>, source: &str) -> Vec<Finding> {
        let module = parse(source).expect("should parse");
        rule(&module, &SourceIndex::new(source))
    }

    #[test]
    fn test_eval_bare_name_only() {
        let findings = run(detect_dynamic_execution, "eval(user_input)\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].snippet, "eval(user_input)");

        assert!(run(detect_dynamic_execution, "builtins.eval(x)\n").is_empty());
        assert!(run(detect_dynamic_execution, "evaluate(x)\n").is_empty());
    }

    #[test]
    fn test_dangerous_imports() {
        assert_eq!(run(detect_dangerous_imports, "import pickle\n").len(), 1);
        assert_eq!(run(detect_dangerous_imports, "import os, subprocess\n").len(), 2);
        assert_eq!(run(detect_dangerous_imports, "from subprocess import run\n").len(), 1);
        assert!(run(detect_dangerous_imports, "import os.path\n").is_empty());
        assert!(run(detect_dangerous_imports, "from os.path import join\n").is_empty());
        assert!(run(detect_dangerous_imports, "import json\n").is_empty());
    }

    #[test]
    fn test_sensitive_attributes() {
        let src = "a = obj.__dict__\nb = obj.__class__\nc = f.__globals__\nd = obj.__doc__\n";
        let lines: Vec<_> = run(detect_sensitive_attributes, src).iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_hardcoded_secret() {
        let findings = run(detect_hardcoded_secrets, "API_KEY = 'abc123'\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::HardcodedSecret);

        assert!(run(detect_hardcoded_secrets, "count = 'abc123'\n").is_empty());
        assert!(run(detect_hardcoded_secrets, "api_key = load()\n").is_empty());
        assert!(run(detect_hardcoded_secrets, "api_key = f'{x}'\n").is_empty());
    }

    #[test]
    fn test_prompt_leak() {
        let src = "SYSTEM_PROMPT = 'You are...'\ninstructions = \"do x\"\nmy_secret = 's'\nname = 'n'\n";
        let lines: Vec<_> = run(detect_prompt_leaks, src).iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_shell_true() {
        let src = "subprocess.call(cmd, shell=True)\nsubprocess.Popen(cmd, shell=False)\nsubprocess.run(cmd, shell=True)\n";
        let findings = run(detect_shell_invocation, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn test_sql_concatenation_and_unescaped() {
        let src = concat!(
            "cur.execute(\"SELECT * FROM t WHERE id=\" + uid)\n",
            "cur.execute(f\"SELECT * FROM t WHERE id={uid}\")\n",
            "cur.execute(\"SELECT * FROM t WHERE id=?\", (uid,))\n",
        );
        let concat: Vec<_> = run(detect_sql_concatenation, src).iter().map(|f| f.line).collect();
        assert_eq!(concat, vec![1, 2]);

        let unescaped: Vec<_> = run(detect_unescaped_sql_params, src).iter().map(|f| f.line).collect();
        assert_eq!(unescaped, vec![1, 2]);
    }

    #[test]
    fn test_pickle_load() {
        let src = "data = pickle.load(f)\nother = pickle.loads(b)\njson.load(f)\n";
        let findings = run(detect_unsafe_deserialization, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 1);
    }
}
