//! Integration tests for the tree-sitter based Python parser.
//!
//! These tests validate the shape of the lowered syntax tree, which the
//! detectors rely on, against inline programs and testdata fixtures.

use std::path::PathBuf;

use tracebit::syntax::{
    walk, CmpOperator, Constant, ExprContext, NodeKind, ParamKind, SyntaxNode, UnaryOperator,
};
use tracebit::{parse, SourceIndex};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn module_body(module: &SyntaxNode) -> &[SyntaxNode] {
    match &module.kind {
        NodeKind::Module { body } => body,
        other => panic!("expected module, got {:?}", other),
    }
}

fn first_statement(source: &str) -> SyntaxNode {
    let module = parse(source).expect("should parse");
    module_body(&module)[0].clone()
}

// =============================================================================
// Statements
// =============================================================================

#[test]
fn test_module_has_no_line() {
    let module = parse("x = 1\n").unwrap();
    assert_eq!(module.line, None);
    assert_eq!(module_body(&module)[0].line, Some(1));
}

#[test]
fn test_chained_assignment_is_one_assign() {
    let stmt = first_statement("a = b = compute()\n");
    match stmt.kind {
        NodeKind::Assign { targets, value } => {
            let names: Vec<_> = targets.iter().filter_map(|t| t.as_name()).collect();
            assert_eq!(names, vec!["a", "b"]);
            assert!(matches!(value.kind, NodeKind::Call(_)));
        }
        other => panic!("expected assign, got {:?}", other),
    }
}

#[test]
fn test_annotated_and_augmented_are_not_assign() {
    assert!(matches!(
        first_statement("count: int = 5\n").kind,
        NodeKind::AnnAssign { value: Some(_), .. }
    ));
    assert!(matches!(
        first_statement("count += 5\n").kind,
        NodeKind::AugAssign { .. }
    ));
}

#[test]
fn test_assign_target_context() {
    let stmt = first_statement("x = y\n");
    let NodeKind::Assign { targets, value } = stmt.kind else {
        panic!("expected assign");
    };
    assert!(matches!(
        targets[0].kind,
        NodeKind::Name {
            ctx: ExprContext::Store,
            ..
        }
    ));
    assert!(matches!(
        value.kind,
        NodeKind::Name {
            ctx: ExprContext::Load,
            ..
        }
    ));
}

#[test]
fn test_elif_nests_in_orelse() {
    let stmt = first_statement("if a:\n    pass\nelif b:\n    pass\nelse:\n    x = 1\n");
    let NodeKind::If { orelse, .. } = stmt.kind else {
        panic!("expected if");
    };
    assert_eq!(orelse.len(), 1);
    assert_eq!(orelse[0].line, Some(3));
    let NodeKind::If { orelse: inner, .. } = &orelse[0].kind else {
        panic!("expected nested if");
    };
    assert!(matches!(inner[0].kind, NodeKind::Assign { .. }));
}

#[test]
fn test_try_handlers() {
    let stmt = first_statement(
        "try:\n    run()\nexcept (KeyError, ValueError) as err:\n    log(err)\nexcept:\n    pass\nfinally:\n    close()\n",
    );
    let NodeKind::Try {
        handlers,
        finalbody,
        ..
    } = stmt.kind
    else {
        panic!("expected try");
    };
    assert_eq!(handlers.len(), 2);
    assert_eq!(finalbody.len(), 1);

    match &handlers[0].kind {
        NodeKind::ExceptHandler { type_, name, .. } => {
            assert!(matches!(
                type_.as_deref().map(|t| &t.kind),
                Some(NodeKind::Tuple { .. })
            ));
            assert_eq!(name.as_deref(), Some("err"));
        }
        other => panic!("expected handler, got {:?}", other),
    }
    assert!(matches!(
        &handlers[1].kind,
        NodeKind::ExceptHandler { type_: None, .. }
    ));
    assert_eq!(handlers[1].line, Some(5));
}

#[test]
fn test_imports() {
    let module = parse("import os.path as p, json\nfrom . import sibling\nfrom os import sep\n").unwrap();
    let body = module_body(&module);

    match &body[0].kind {
        NodeKind::Import { names } => {
            assert_eq!(names[0].name, "os.path");
            assert_eq!(names[0].asname.as_deref(), Some("p"));
            assert_eq!(names[1].name, "json");
        }
        other => panic!("expected import, got {:?}", other),
    }
    assert!(matches!(
        &body[1].kind,
        NodeKind::ImportFrom {
            module: None,
            level: 1,
            ..
        }
    ));
    assert!(matches!(
        &body[2].kind,
        NodeKind::ImportFrom { module: Some(m), level: 0, .. } if m == "os"
    ));
}

#[test]
fn test_function_parameters() {
    let stmt = first_statement("async def f(a, /, b=[], *args, c, d=1, **kw) -> int:\n    pass\n");
    let NodeKind::FunctionDef(function) = stmt.kind else {
        panic!("expected function");
    };
    assert!(function.is_async);
    assert!(function.returns.is_some());

    let kinds: Vec<_> = function.params.iter().map(|p| (p.name.as_str(), p.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("a", ParamKind::PositionalOnly),
            ("b", ParamKind::Positional),
            ("args", ParamKind::VarArgs),
            ("c", ParamKind::KeywordOnly),
            ("d", ParamKind::KeywordOnly),
            ("kw", ParamKind::VarKeywords),
        ]
    );
    assert!(matches!(
        function.params[1].default.as_ref().map(|d| &d.kind),
        Some(NodeKind::List { .. })
    ));
    assert_eq!(function.positional_params().count(), 2);
}

#[test]
fn test_decorated_class() {
    let stmt = first_statement("@dataclass\nclass Point(Base, metaclass=Meta):\n    x = 1\n");
    let NodeKind::ClassDef(class) = stmt.kind else {
        panic!("expected class");
    };
    assert_eq!(class.name, "Point");
    assert_eq!(class.decorators.len(), 1);
    assert_eq!(class.bases.len(), 1);
    assert_eq!(class.keywords[0].arg.as_deref(), Some("metaclass"));
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_negative_literal_is_unary_minus() {
    let stmt = first_statement("x = -1\n");
    let NodeKind::Assign { value, .. } = stmt.kind else {
        panic!("expected assign");
    };
    match value.kind {
        NodeKind::UnaryOp { op, operand } => {
            assert_eq!(op, UnaryOperator::USub);
            assert_eq!(operand.as_constant(), Some(&Constant::Int(1)));
        }
        other => panic!("expected unary op, got {:?}", other),
    }
}

#[test]
fn test_literal_constants() {
    let module = parse("a = 0x1F\nb = 1_000\nc = 2.5e3\nd = 3j\ne = True\nf = None\ng = b'x'\nh = ...\n").unwrap();
    let values: Vec<_> = module_body(&module)
        .iter()
        .map(|stmt| match &stmt.kind {
            NodeKind::Assign { value, .. } => value.as_constant().cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![
            Some(Constant::Int(31)),
            Some(Constant::Int(1000)),
            Some(Constant::Float(2500.0)),
            Some(Constant::Complex),
            Some(Constant::Bool(true)),
            Some(Constant::None),
            Some(Constant::Bytes),
            Some(Constant::Ellipsis),
        ]
    );
}

#[test]
fn test_strings() {
    let module = parse("a = 'one' 'two'\nb = f'{x}!'\n").unwrap();
    let body = module_body(&module);

    let NodeKind::Assign { value, .. } = &body[0].kind else {
        panic!("expected assign");
    };
    assert_eq!(value.as_constant(), Some(&Constant::Str("onetwo".to_string())));

    let NodeKind::Assign { value, .. } = &body[1].kind else {
        panic!("expected assign");
    };
    assert!(matches!(value.kind, NodeKind::JoinedStr { .. }));
}

#[test]
fn test_comparison_operators() {
    let stmt = first_statement("ok = a is not None and b not in c\n");
    let ops: Vec<CmpOperator> = walk(&stmt)
        .filter_map(|n| match &n.kind {
            NodeKind::Compare { ops, .. } => Some(ops.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(ops, vec![CmpOperator::IsNot, CmpOperator::NotIn]);
}

#[test]
fn test_call_keywords() {
    let stmt = first_statement("run(cmd, shell=True, **extra)\n");
    let call = walk(&stmt)
        .find_map(|n| match &n.kind {
            NodeKind::Call(call) => Some(call.clone()),
            _ => None,
        })
        .expect("should contain a call");
    assert_eq!(call.args.len(), 1);
    assert_eq!(call.keywords.len(), 2);
    assert_eq!(call.keywords[0].arg.as_deref(), Some("shell"));
    assert_eq!(call.keywords[0].value.as_constant(), Some(&Constant::Bool(true)));
    assert_eq!(call.keywords[1].arg, None);
}

#[test]
fn test_walk_visits_dict_keys_before_values() {
    let module = parse("d = {5: 7, 9: 11, **extra}\n").unwrap();
    let ints: Vec<i128> = module
        .walk()
        .filter_map(|n| match n.as_constant() {
            Some(Constant::Int(v)) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(ints, vec![5, 9, 7, 11]);
}

#[test]
fn test_walk_reaches_nested_lambda_and_comprehension() {
    let module = parse("f = lambda v: [w / v for w in items]\n").unwrap();
    assert!(module.walk().any(|n| matches!(n.kind, NodeKind::Lambda { .. })));
    assert!(module.walk().any(|n| matches!(n.kind, NodeKind::BinOp { .. })));
}

// =============================================================================
// Errors and fixtures
// =============================================================================

#[test]
fn test_syntax_errors() {
    let missing_paren = parse("print('hi'\n").unwrap_err();
    assert!(missing_paren.as_syntax().is_some());

    let doubled = parse("x = = 1\n").unwrap_err();
    assert!(doubled.as_syntax().is_some());

    let broken = std::fs::read_to_string(testdata_path().join("broken.py")).unwrap();
    let err = parse(&broken).unwrap_err();
    let syntax = err.as_syntax().unwrap();
    assert_eq!(syntax.line, 1);
    assert!(err.to_string().starts_with("syntax error at line 1"));
}

#[test]
fn test_empty_source() {
    let module = parse("").unwrap();
    assert!(module_body(&module).is_empty());

    let comments_only = parse("# just a comment\n\n").unwrap();
    assert!(module_body(&comments_only).is_empty());
}

#[test]
fn test_fixtures_parse() {
    for name in ["risky.py", "clean.py", "suppressed.py"] {
        let source = std::fs::read_to_string(testdata_path().join(name)).unwrap();
        let module = parse(&source).unwrap_or_else(|e| panic!("{} should parse: {}", name, e));
        let index = SourceIndex::new(&source);
        for node in module.walk().skip(1) {
            if let Some(line) = node.line {
                assert!(line >= 1 && line <= index.len(), "{}: line {} out of range", name, line);
            }
        }
    }
}
