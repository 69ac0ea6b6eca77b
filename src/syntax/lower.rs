//! Lowering of tree-sitter's Python concrete syntax tree into [`SyntaxNode`]s.
//!
//! The lowering follows CPython's `ast` shapes wherever a detector depends on
//! them: chained assignments share one `Assign`, `elif` nests inside `orelse`,
//! negative literals are unary minus over a positive constant, and f-strings
//! become `JoinedStr`.

use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser};

use super::{
    Alias, BinOperator, Call, ClassDef, CmpOperator, Constant, ExprContext, FunctionDef, Keyword,
    NodeKind, Param, ParamKind, SyntaxNode, UnaryOperator,
};
use crate::error::{AnalyzeError, SyntaxError};

/// Statement kinds the grammar still accepts for Python 2 but CPython rejects.
const LEGACY_STATEMENTS: &[(&str, &str)] = &[
    ("print_statement", "Missing parentheses in call to 'print'"),
    ("exec_statement", "Missing parentheses in call to 'exec'"),
];

/// Deepest concrete-tree nesting accepted. Lowering recurses once or twice per
/// level and must stay within a 2 MiB worker stack.
const MAX_TREE_DEPTH: usize = 200;

static PYTHON: Lazy<Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

/// Parse Python source into a syntax tree.
///
/// Fails with [`AnalyzeError::Syntax`] if the concrete tree contains any
/// error or missing node, or nests deeper than the lowering accepts; no
/// partial tree is returned.
pub fn parse(source: &str) -> Result<SyntaxNode, AnalyzeError> {
    let mut parser = Parser::new();
    parser.set_language(&PYTHON)?;

    let tree = parser.parse(source, None).ok_or(AnalyzeError::NoTree)?;
    let root = tree.root_node();

    if let Some(err) = first_error(root, source.as_bytes()) {
        return Err(err.into());
    }
    if let Some(err) = too_deep(root) {
        return Err(err.into());
    }

    let lowerer = Lowerer {
        source: source.as_bytes(),
    };
    Ok(lowerer.module(root))
}

/// Locate the first syntax problem in document order.
fn first_error(root: Node, source: &[u8]) -> Option<SyntaxError> {
    let mut cursor = root.walk();
    loop {
        if let Some(err) = node_error(cursor.node(), source) {
            return Some(err);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn node_error(node: Node, source: &[u8]) -> Option<SyntaxError> {
    let at = |message: String| error_at(node, message);

    if node.is_missing() {
        return Some(at(format!("expected `{}`", node.kind())));
    }
    if node.is_error() {
        let text = node.utf8_text(source).unwrap_or("");
        let near: String = text.lines().next().unwrap_or("").chars().take(40).collect();
        let message = if near.trim().is_empty() {
            "invalid syntax".to_string()
        } else {
            format!("invalid syntax near `{}`", near.trim())
        };
        return Some(at(message));
    }
    LEGACY_STATEMENTS
        .iter()
        .find(|(k, _)| *k == node.kind())
        .map(|(_, msg)| at(msg.to_string()))
}

/// Reject trees nested deeper than the lowering can recurse into.
fn too_deep(root: Node) -> Option<SyntaxError> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if depth > MAX_TREE_DEPTH {
            return Some(error_at(
                cursor.node(),
                "too many nested expressions".to_string(),
            ));
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

fn error_at(node: Node, message: String) -> SyntaxError {
    let pos = node.start_position();
    SyntaxError {
        line: pos.row + 1,
        column: pos.column + 1,
        message,
    }
}

fn line_of(node: Node) -> Option<usize> {
    Some(node.start_position().row + 1)
}

/// Named children, skipping comments.
fn named(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

fn all_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
}

fn field_all<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

fn has_token(node: Node, token: &str) -> bool {
    all_children(node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

struct Lowerer<'s> {
    source: &'s [u8],
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn module(&self, root: Node) -> SyntaxNode {
        let body = self.statements(root);
        SyntaxNode::new(NodeKind::Module { body }, None)
    }

    fn other(&self, node: Node, label: &str, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::Other {
                label: label.to_string(),
                children,
            },
            line_of(node),
        )
    }

    /// Statements directly under a module or block node.
    fn statements(&self, node: Node) -> Vec<SyntaxNode> {
        named(node)
            .into_iter()
            .map(|stmt| self.statement(stmt))
            .collect()
    }

    fn block(&self, node: Option<Node>) -> Vec<SyntaxNode> {
        node.map(|n| self.statements(n)).unwrap_or_default()
    }

    /// Body of an `else_clause`/`finally_clause`.
    fn clause_body(&self, clause: Node) -> Vec<SyntaxNode> {
        let body = clause
            .child_by_field_name("body")
            .or_else(|| named(clause).into_iter().find(|c| c.kind() == "block"));
        self.block(body)
    }

    fn statement(&self, node: Node) -> SyntaxNode {
        match node.kind() {
            "expression_statement" => self.expression_statement(node),
            "pass_statement" => SyntaxNode::new(NodeKind::Pass, line_of(node)),
            "break_statement" => SyntaxNode::new(NodeKind::Break, line_of(node)),
            "continue_statement" => SyntaxNode::new(NodeKind::Continue, line_of(node)),
            "import_statement" => self.import(node),
            "import_from_statement" | "future_import_statement" => self.import_from(node),
            "if_statement" => self.if_statement(node),
            "for_statement" => self.for_statement(node),
            "while_statement" => self.while_statement(node),
            "try_statement" => self.try_statement(node),
            "with_statement" => self.with_statement(node),
            "function_definition" => self.function_def(node, Vec::new()),
            "class_definition" => self.class_def(node, Vec::new()),
            "decorated_definition" => self.decorated(node),
            "match_statement" => self.match_statement(node),
            "delete_statement" => {
                let targets = named(node)
                    .into_iter()
                    .map(|t| self.target(t, ExprContext::Del))
                    .collect();
                self.other(node, "delete", targets)
            }
            "global_statement" => self.other(node, "global", Vec::new()),
            "nonlocal_statement" => self.other(node, "nonlocal", Vec::new()),
            "return_statement" => self.generic(node, "return"),
            "raise_statement" => self.generic(node, "raise"),
            "assert_statement" => self.generic(node, "assert"),
            kind => self.generic(node, kind),
        }
    }

    /// Lower every named child as an expression under an `Other` node.
    fn generic(&self, node: Node, label: &str) -> SyntaxNode {
        let children = named(node).into_iter().map(|c| self.expr(c)).collect();
        self.other(node, label, children)
    }

    fn expression_statement(&self, node: Node) -> SyntaxNode {
        let parts = named(node);
        if let [only] = parts.as_slice() {
            match only.kind() {
                "assignment" => return self.assignment(*only),
                "augmented_assignment" => return self.aug_assignment(*only),
                _ => {}
            }
        }

        let value = match parts.as_slice() {
            [only] => self.expr(*only),
            _ => SyntaxNode::new(
                NodeKind::Tuple {
                    elts: parts.iter().map(|p| self.expr(*p)).collect(),
                    ctx: ExprContext::Load,
                },
                line_of(node),
            ),
        };
        self.other(node, "expr", vec![value])
    }

    fn missing_value(&self) -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::Other {
                label: "missing".to_string(),
                children: Vec::new(),
            },
            None,
        )
    }

    fn assignment(&self, node: Node) -> SyntaxNode {
        let left = node.child_by_field_name("left");
        let right = node.child_by_field_name("right");

        if let Some(annotation) = node.child_by_field_name("type") {
            let target = left
                .map(|l| self.target(l, ExprContext::Store))
                .unwrap_or_else(|| self.missing_value());
            return SyntaxNode::new(
                NodeKind::AnnAssign {
                    target: Box::new(target),
                    annotation: Box::new(self.expr(annotation)),
                    value: right.map(|r| Box::new(self.expr(r))),
                },
                line_of(node),
            );
        }

        // a = b = value nests as assignment(a, assignment(b, value))
        let mut targets: Vec<SyntaxNode> = left
            .map(|l| self.target(l, ExprContext::Store))
            .into_iter()
            .collect();
        let mut current = right;
        while let Some(inner) = current {
            if inner.kind() != "assignment" || inner.child_by_field_name("type").is_some() {
                break;
            }
            if let Some(l) = inner.child_by_field_name("left") {
                targets.push(self.target(l, ExprContext::Store));
            }
            current = inner.child_by_field_name("right");
        }

        let value = current
            .map(|v| self.expr(v))
            .unwrap_or_else(|| self.missing_value());

        SyntaxNode::new(
            NodeKind::Assign {
                targets,
                value: Box::new(value),
            },
            line_of(node),
        )
    }

    fn aug_assignment(&self, node: Node) -> SyntaxNode {
        let op = node
            .child_by_field_name("operator")
            .and_then(|o| BinOperator::from_token(o.kind()));
        let (Some(left), Some(right), Some(op)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
            op,
        ) else {
            return self.generic(node, "aug_assign");
        };

        SyntaxNode::new(
            NodeKind::AugAssign {
                target: Box::new(self.target(left, ExprContext::Store)),
                op,
                value: Box::new(self.expr(right)),
            },
            line_of(node),
        )
    }

    fn dotted_name(&self, node: Node) -> String {
        if node.kind() == "dotted_name" {
            named(node)
                .iter()
                .map(|part| self.text(*part))
                .collect::<Vec<_>>()
                .join(".")
        } else {
            self.text(node).to_string()
        }
    }

    fn alias(&self, node: Node) -> Alias {
        match node.kind() {
            "aliased_import" => Alias {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.dotted_name(n))
                    .unwrap_or_default(),
                asname: node
                    .child_by_field_name("alias")
                    .map(|a| self.text(a).to_string()),
            },
            "wildcard_import" => Alias {
                name: "*".to_string(),
                asname: None,
            },
            _ => Alias {
                name: self.dotted_name(node),
                asname: None,
            },
        }
    }

    fn import(&self, node: Node) -> SyntaxNode {
        let names = field_all(node, "name")
            .into_iter()
            .map(|n| self.alias(n))
            .collect();
        SyntaxNode::new(NodeKind::Import { names }, line_of(node))
    }

    fn import_from(&self, node: Node) -> SyntaxNode {
        let (module, level) = if node.kind() == "future_import_statement" {
            (Some("__future__".to_string()), 0)
        } else {
            match node.child_by_field_name("module_name") {
                Some(m) if m.kind() == "relative_import" => {
                    let parts = named(m);
                    let level = parts
                        .iter()
                        .find(|p| p.kind() == "import_prefix")
                        .map(|p| self.text(*p).chars().filter(|c| *c == '.').count())
                        .unwrap_or(0);
                    let module = parts
                        .iter()
                        .find(|p| p.kind() == "dotted_name")
                        .map(|p| self.dotted_name(*p));
                    (module, level)
                }
                Some(m) => (Some(self.dotted_name(m)), 0),
                None => (None, 0),
            }
        };

        let mut names: Vec<Alias> = field_all(node, "name")
            .into_iter()
            .map(|n| self.alias(n))
            .collect();
        if names.is_empty() && named(node).iter().any(|c| c.kind() == "wildcard_import") {
            names.push(Alias {
                name: "*".to_string(),
                asname: None,
            });
        }

        SyntaxNode::new(
            NodeKind::ImportFrom {
                module,
                names,
                level,
            },
            line_of(node),
        )
    }

    fn condition(&self, node: Node) -> SyntaxNode {
        node.child_by_field_name("condition")
            .map(|c| self.expr(c))
            .unwrap_or_else(|| self.missing_value())
    }

    fn if_statement(&self, node: Node) -> SyntaxNode {
        let alternatives = field_all(node, "alternative");

        // Build the elif chain from the innermost branch outwards.
        let mut orelse: Vec<SyntaxNode> = Vec::new();
        for alt in alternatives.iter().rev() {
            match alt.kind() {
                "else_clause" => orelse = self.clause_body(*alt),
                "elif_clause" => {
                    let nested = SyntaxNode::new(
                        NodeKind::If {
                            test: Box::new(self.condition(*alt)),
                            body: self.block(alt.child_by_field_name("consequence")),
                            orelse: std::mem::take(&mut orelse),
                        },
                        line_of(*alt),
                    );
                    orelse = vec![nested];
                }
                _ => {}
            }
        }

        SyntaxNode::new(
            NodeKind::If {
                test: Box::new(self.condition(node)),
                body: self.block(node.child_by_field_name("consequence")),
                orelse,
            },
            line_of(node),
        )
    }

    fn else_of(&self, node: Node) -> Vec<SyntaxNode> {
        node.child_by_field_name("alternative")
            .map(|alt| self.clause_body(alt))
            .unwrap_or_default()
    }

    fn for_statement(&self, node: Node) -> SyntaxNode {
        let target = node
            .child_by_field_name("left")
            .map(|l| self.target(l, ExprContext::Store))
            .unwrap_or_else(|| self.missing_value());
        let iter = node
            .child_by_field_name("right")
            .map(|r| self.expr(r))
            .unwrap_or_else(|| self.missing_value());

        SyntaxNode::new(
            NodeKind::For {
                target: Box::new(target),
                iter: Box::new(iter),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.else_of(node),
                is_async: has_token(node, "async"),
            },
            line_of(node),
        )
    }

    fn while_statement(&self, node: Node) -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::While {
                test: Box::new(self.condition(node)),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.else_of(node),
            },
            line_of(node),
        )
    }

    fn try_statement(&self, node: Node) -> SyntaxNode {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for child in named(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => handlers.push(self.except_handler(child)),
                "else_clause" => orelse = self.clause_body(child),
                "finally_clause" => finalbody = self.clause_body(child),
                _ => {}
            }
        }

        SyntaxNode::new(
            NodeKind::Try {
                body: self.block(node.child_by_field_name("body")),
                handlers,
                orelse,
                finalbody,
            },
            line_of(node),
        )
    }

    fn except_handler(&self, node: Node) -> SyntaxNode {
        let parts = named(node);
        let body_node = parts.iter().find(|p| p.kind() == "block").copied();
        let header: Vec<Node> = parts.into_iter().filter(|p| p.kind() != "block").collect();

        let (type_, name) = match header.as_slice() {
            [] => (None, None),
            // except E as name, when the grammar wraps it in an as_pattern
            [single] if single.kind() == "as_pattern" => {
                let inner = named(*single);
                let type_ = inner.first().map(|t| self.expr(*t));
                let name = single
                    .child_by_field_name("alias")
                    .or_else(|| inner.get(1).copied())
                    .map(|a| self.text(a).trim().to_string());
                (type_, name)
            }
            [type_node] => (Some(self.expr(*type_node)), None),
            [type_node, alias, ..] => (
                Some(self.expr(*type_node)),
                Some(self.text(*alias).trim().to_string()),
            ),
        };

        SyntaxNode::new(
            NodeKind::ExceptHandler {
                type_: type_.map(Box::new),
                name,
                body: self.block(body_node),
            },
            line_of(node),
        )
    }

    fn with_statement(&self, node: Node) -> SyntaxNode {
        let mut items = Vec::new();
        for clause in named(node).into_iter().filter(|c| c.kind() == "with_clause") {
            for item in named(clause) {
                let Some(value) = item.child_by_field_name("value").or_else(|| named(item).first().copied())
                else {
                    continue;
                };
                if value.kind() == "as_pattern" {
                    let inner = named(value);
                    if let Some(context) = inner.first() {
                        items.push(self.expr(*context));
                    }
                    if let Some(alias) = value.child_by_field_name("alias").or_else(|| inner.get(1).copied()) {
                        // as_pattern_target wraps the real target expression
                        let target = named(alias).first().copied().unwrap_or(alias);
                        items.push(self.target(target, ExprContext::Store));
                    }
                } else {
                    items.push(self.expr(value));
                }
            }
        }

        SyntaxNode::new(
            NodeKind::With {
                items,
                body: self.block(node.child_by_field_name("body")),
                is_async: has_token(node, "async"),
            },
            line_of(node),
        )
    }

    fn decorated(&self, node: Node) -> SyntaxNode {
        let decorators: Vec<SyntaxNode> = named(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| named(d).first().map(|e| self.expr(*e)))
            .collect();

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => self.function_def(def, decorators),
            Some(def) if def.kind() == "class_definition" => self.class_def(def, decorators),
            _ => self.other(node, "decorated", decorators),
        }
    }

    fn function_def(&self, node: Node, decorators: Vec<SyntaxNode>) -> SyntaxNode {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let returns = node
            .child_by_field_name("return_type")
            .map(|r| Box::new(self.expr(r)));

        SyntaxNode::new(
            NodeKind::FunctionDef(FunctionDef {
                name,
                params,
                body: self.block(node.child_by_field_name("body")),
                decorators,
                returns,
                is_async: has_token(node, "async"),
            }),
            line_of(node),
        )
    }

    fn parameters(&self, node: Node) -> Vec<Param> {
        let mut params: Vec<Param> = Vec::new();
        let mut keyword_only = false;

        for child in named(node) {
            let regular = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::Positional
            };

            match child.kind() {
                "positional_separator" => {
                    for p in params.iter_mut().filter(|p| p.kind == ParamKind::Positional) {
                        p.kind = ParamKind::PositionalOnly;
                    }
                }
                "keyword_separator" => keyword_only = true,
                "identifier" | "tuple_pattern" => {
                    params.push(self.param(child, regular, None, None));
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name_node = child.child_by_field_name("name").unwrap_or(child);
                    let default = child.child_by_field_name("value").map(|v| self.expr(v));
                    let annotation = child.child_by_field_name("type").map(|t| self.expr(t));
                    params.push(self.param(name_node, regular, default, annotation));
                }
                "typed_parameter" => {
                    let annotation = child.child_by_field_name("type").map(|t| self.expr(t));
                    let Some(inner) = named(child).into_iter().find(|c| c.kind() != "type") else {
                        continue;
                    };
                    let kind = match inner.kind() {
                        "list_splat_pattern" => {
                            keyword_only = true;
                            ParamKind::VarArgs
                        }
                        "dictionary_splat_pattern" => ParamKind::VarKeywords,
                        _ => regular,
                    };
                    let name_node = named(inner).first().copied().unwrap_or(inner);
                    params.push(self.param(name_node, kind, None, annotation));
                }
                "list_splat_pattern" => {
                    keyword_only = true;
                    let name_node = named(child).first().copied().unwrap_or(child);
                    params.push(self.param(name_node, ParamKind::VarArgs, None, None));
                }
                "dictionary_splat_pattern" => {
                    let name_node = named(child).first().copied().unwrap_or(child);
                    params.push(self.param(name_node, ParamKind::VarKeywords, None, None));
                }
                _ => {}
            }
        }

        params
    }

    fn param(
        &self,
        name_node: Node,
        kind: ParamKind,
        default: Option<SyntaxNode>,
        annotation: Option<SyntaxNode>,
    ) -> Param {
        Param {
            name: self.text(name_node).to_string(),
            kind,
            default,
            annotation,
            line: line_of(name_node),
        }
    }

    fn class_def(&self, node: Node, decorators: Vec<SyntaxNode>) -> SyntaxNode {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let (bases, keywords) = node
            .child_by_field_name("superclasses")
            .map(|args| self.arguments(args))
            .unwrap_or_default();

        SyntaxNode::new(
            NodeKind::ClassDef(ClassDef {
                name,
                bases,
                keywords,
                body: self.block(node.child_by_field_name("body")),
                decorators,
            }),
            line_of(node),
        )
    }

    fn match_statement(&self, node: Node) -> SyntaxNode {
        let mut children: Vec<SyntaxNode> = field_all(node, "subject")
            .into_iter()
            .map(|s| self.expr(s))
            .collect();

        let cases = node
            .child_by_field_name("body")
            .map(named)
            .unwrap_or_default();
        for case in cases.into_iter().filter(|c| c.kind() == "case_clause") {
            let mut case_children = Vec::new();
            for pattern in named(case).into_iter().filter(|p| p.kind() == "case_pattern") {
                let mut values = Vec::new();
                self.pattern(pattern, &mut values);
                case_children.push(self.other(pattern, "match_pattern", values));
            }
            if let Some(guard) = case.child_by_field_name("guard") {
                case_children.extend(named(guard).into_iter().map(|g| self.expr(g)));
            }
            case_children.extend(self.block(case.child_by_field_name("consequence")));
            children.push(self.other(case, "match_case", case_children));
        }

        self.other(node, "match", children)
    }

    /// Collect the expressions a `case` pattern evaluates: literals, dotted
    /// value references and class names. Capture names bind without being
    /// read and are dropped.
    fn pattern(&self, node: Node, out: &mut Vec<SyntaxNode>) {
        match node.kind() {
            "integer" | "float" | "string" | "concatenated_string" | "true" | "false" | "none" => {
                out.push(self.expr(node))
            }
            "dotted_name" => {
                if named(node).len() > 1 {
                    out.push(self.dotted_value(node));
                }
            }
            "identifier" => {}
            "class_pattern" => {
                let parts = named(node);
                if let Some((class, rest)) = parts.split_first() {
                    out.push(if class.kind() == "dotted_name" {
                        self.dotted_value(*class)
                    } else {
                        self.expr(*class)
                    });
                    for part in rest {
                        self.pattern(*part, out);
                    }
                }
            }
            // keyword name, then its sub-pattern
            "keyword_pattern" => {
                for part in named(node).into_iter().skip(1) {
                    self.pattern(part, out);
                }
            }
            _ => {
                let mut negate = false;
                for child in all_children(node) {
                    if child.kind() == "-" {
                        negate = true;
                        continue;
                    }
                    if !child.is_named() {
                        continue;
                    }
                    if negate && matches!(child.kind(), "integer" | "float") {
                        out.push(SyntaxNode::new(
                            NodeKind::UnaryOp {
                                op: UnaryOperator::USub,
                                operand: Box::new(self.expr(child)),
                            },
                            line_of(child),
                        ));
                    } else {
                        self.pattern(child, out);
                    }
                    negate = false;
                }
            }
        }
    }

    /// `a.b.c` in a pattern, read as an attribute chain.
    fn dotted_value(&self, node: Node) -> SyntaxNode {
        let line = line_of(node);
        let mut parts = named(node).into_iter();
        let Some(first) = parts.next() else {
            return self.missing_value();
        };
        let mut value = SyntaxNode::new(
            NodeKind::Name {
                id: self.text(first).to_string(),
                ctx: ExprContext::Load,
            },
            line,
        );
        for part in parts {
            value = SyntaxNode::new(
                NodeKind::Attribute {
                    value: Box::new(value),
                    attr: self.text(part).to_string(),
                    ctx: ExprContext::Load,
                },
                line,
            );
        }
        value
    }

    /// Split an `argument_list` into positional arguments and keywords.
    fn arguments(&self, node: Node) -> (Vec<SyntaxNode>, Vec<Keyword>) {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        for child in named(node) {
            match child.kind() {
                "keyword_argument" => {
                    let value = child
                        .child_by_field_name("value")
                        .map(|v| self.expr(v))
                        .unwrap_or_else(|| self.missing_value());
                    keywords.push(Keyword {
                        arg: child
                            .child_by_field_name("name")
                            .map(|n| self.text(n).to_string()),
                        value,
                    });
                }
                "dictionary_splat" => {
                    let value = named(child)
                        .first()
                        .map(|v| self.expr(*v))
                        .unwrap_or_else(|| self.missing_value());
                    keywords.push(Keyword { arg: None, value });
                }
                _ => args.push(self.expr(child)),
            }
        }

        (args, keywords)
    }

    fn target(&self, node: Node, ctx: ExprContext) -> SyntaxNode {
        match node.kind() {
            "identifier" => SyntaxNode::new(
                NodeKind::Name {
                    id: self.text(node).to_string(),
                    ctx,
                },
                line_of(node),
            ),
            "pattern_list" | "tuple_pattern" | "tuple" | "expression_list" => SyntaxNode::new(
                NodeKind::Tuple {
                    elts: named(node).into_iter().map(|e| self.target(e, ctx)).collect(),
                    ctx,
                },
                line_of(node),
            ),
            "list_pattern" | "list" => SyntaxNode::new(
                NodeKind::List {
                    elts: named(node).into_iter().map(|e| self.target(e, ctx)).collect(),
                    ctx,
                },
                line_of(node),
            ),
            "list_splat_pattern" | "list_splat" => {
                let inner = named(node)
                    .first()
                    .map(|i| self.target(*i, ctx))
                    .unwrap_or_else(|| self.missing_value());
                SyntaxNode::new(
                    NodeKind::Starred {
                        value: Box::new(inner),
                        ctx,
                    },
                    line_of(node),
                )
            }
            "parenthesized_expression" => match named(node).first() {
                Some(inner) => self.target(*inner, ctx),
                None => self.expr(node),
            },
            "attribute" => self.attribute(node, ctx),
            _ => self.expr(node),
        }
    }

    fn attribute(&self, node: Node, ctx: ExprContext) -> SyntaxNode {
        let value = node
            .child_by_field_name("object")
            .map(|o| self.expr(o))
            .unwrap_or_else(|| self.missing_value());
        let attr = node
            .child_by_field_name("attribute")
            .map(|a| self.text(a).to_string())
            .unwrap_or_default();

        SyntaxNode::new(
            NodeKind::Attribute {
                value: Box::new(value),
                attr,
                ctx,
            },
            line_of(node),
        )
    }

    fn expr(&self, node: Node) -> SyntaxNode {
        let line = line_of(node);
        match node.kind() {
            "identifier" => SyntaxNode::new(
                NodeKind::Name {
                    id: self.text(node).to_string(),
                    ctx: ExprContext::Load,
                },
                line,
            ),
            "attribute" => self.attribute(node, ExprContext::Load),
            "call" => self.call(node),
            "binary_operator" => self.binary(node),
            "unary_operator" => {
                let op = match node.child_by_field_name("operator").map(|o| o.kind()) {
                    Some("-") => UnaryOperator::USub,
                    Some("+") => UnaryOperator::UAdd,
                    Some("~") => UnaryOperator::Invert,
                    _ => return self.generic(node, "unary_op"),
                };
                self.unary(node, op)
            }
            "not_operator" => self.unary(node, UnaryOperator::Not),
            "boolean_operator" => self.generic(node, "bool_op"),
            "comparison_operator" => self.comparison(node),
            "conditional_expression" => self.generic(node, "if_exp"),
            "named_expression" => {
                let mut children = Vec::new();
                if let Some(name) = node.child_by_field_name("name") {
                    children.push(self.target(name, ExprContext::Store));
                }
                if let Some(value) = node.child_by_field_name("value") {
                    children.push(self.expr(value));
                }
                self.other(node, "named_expr", children)
            }
            "await" => self.generic(node, "await"),
            "yield" => {
                let parts = named(node);
                let value = match parts.as_slice() {
                    [] => None,
                    [single] => Some(self.expr(*single)),
                    _ => Some(SyntaxNode::new(
                        NodeKind::Tuple {
                            elts: parts.iter().map(|p| self.expr(*p)).collect(),
                            ctx: ExprContext::Load,
                        },
                        line_of(parts[0]),
                    )),
                };
                SyntaxNode::new(
                    NodeKind::Yield {
                        value: value.map(Box::new),
                        delegate: has_token(node, "from"),
                    },
                    line,
                )
            }
            "parenthesized_expression" | "type" => match named(node).first() {
                Some(inner) => self.expr(*inner),
                None => self.other(node, "empty", Vec::new()),
            },
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => SyntaxNode::new(
                NodeKind::Tuple {
                    elts: self.elements(node),
                    ctx: ExprContext::Load,
                },
                line,
            ),
            "list" | "list_pattern" => SyntaxNode::new(
                NodeKind::List {
                    elts: self.elements(node),
                    ctx: ExprContext::Load,
                },
                line,
            ),
            "set" => SyntaxNode::new(
                NodeKind::Set {
                    elts: self.elements(node),
                },
                line,
            ),
            "dictionary" => self.dictionary(node),
            "list_splat" | "parenthesized_list_splat" | "list_splat_pattern" => {
                let inner = named(node)
                    .first()
                    .map(|i| self.expr(*i))
                    .unwrap_or_else(|| self.missing_value());
                SyntaxNode::new(
                    NodeKind::Starred {
                        value: Box::new(inner),
                        ctx: ExprContext::Load,
                    },
                    line,
                )
            }
            "list_comprehension"
            | "set_comprehension"
            | "generator_expression"
            | "dictionary_comprehension" => self.comprehension(node),
            "lambda" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameters(p))
                    .unwrap_or_default();
                let body = node
                    .child_by_field_name("body")
                    .map(|b| self.expr(b))
                    .unwrap_or_else(|| self.missing_value());
                SyntaxNode::new(
                    NodeKind::Lambda {
                        params,
                        body: Box::new(body),
                    },
                    line,
                )
            }
            "subscript" => {
                let mut children = Vec::new();
                if let Some(value) = node.child_by_field_name("value") {
                    children.push(self.expr(value));
                }
                children.extend(
                    field_all(node, "subscript")
                        .into_iter()
                        .map(|s| self.expr(s)),
                );
                self.other(node, "subscript", children)
            }
            "string" => self.string(node),
            "concatenated_string" => self.concatenated_string(node),
            "integer" => SyntaxNode::new(NodeKind::Constant(parse_integer(self.text(node))), line),
            "float" => SyntaxNode::new(NodeKind::Constant(parse_float(self.text(node))), line),
            "true" => SyntaxNode::new(NodeKind::Constant(Constant::Bool(true)), line),
            "false" => SyntaxNode::new(NodeKind::Constant(Constant::Bool(false)), line),
            "none" => SyntaxNode::new(NodeKind::Constant(Constant::None), line),
            "ellipsis" => SyntaxNode::new(NodeKind::Constant(Constant::Ellipsis), line),
            kind => self.generic(node, kind),
        }
    }

    fn elements(&self, node: Node) -> Vec<SyntaxNode> {
        named(node).into_iter().map(|e| self.expr(e)).collect()
    }

    fn unary(&self, node: Node, op: UnaryOperator) -> SyntaxNode {
        let Some(argument) = node.child_by_field_name("argument") else {
            return self.generic(node, "unary_op");
        };
        SyntaxNode::new(
            NodeKind::UnaryOp {
                op,
                operand: Box::new(self.expr(argument)),
            },
            line_of(node),
        )
    }

    fn call(&self, node: Node) -> SyntaxNode {
        let func = node
            .child_by_field_name("function")
            .map(|f| self.expr(f))
            .unwrap_or_else(|| self.missing_value());

        let (args, keywords) = match node.child_by_field_name("arguments") {
            Some(a) if a.kind() == "argument_list" => self.arguments(a),
            // f(x for x in y)
            Some(gen) => (vec![self.expr(gen)], Vec::new()),
            None => (Vec::new(), Vec::new()),
        };

        SyntaxNode::new(
            NodeKind::Call(Call {
                func: Box::new(func),
                args,
                keywords,
            }),
            line_of(node),
        )
    }

    fn binary(&self, node: Node) -> SyntaxNode {
        let op = node
            .child_by_field_name("operator")
            .and_then(|o| BinOperator::from_token(o.kind()));
        let (Some(left), Some(right), Some(op)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
            op,
        ) else {
            return self.generic(node, "bin_op");
        };

        SyntaxNode::new(
            NodeKind::BinOp {
                left: Box::new(self.expr(left)),
                op,
                right: Box::new(self.expr(right)),
            },
            line_of(node),
        )
    }

    fn comparison(&self, node: Node) -> SyntaxNode {
        let mut operands = Vec::new();
        let mut ops = Vec::new();

        let children = all_children(node);
        let mut i = 0;
        while i < children.len() {
            let child = children[i];
            i += 1;
            if child.kind() == "comment" {
                continue;
            }
            if child.is_named() {
                operands.push(self.expr(child));
                continue;
            }
            // `is not` / `not in` may arrive as two separate tokens
            let next = children.get(i).filter(|n| !n.is_named()).map(|n| n.kind());
            let token = match (child.kind(), next) {
                ("is", Some("not")) => {
                    i += 1;
                    "is not"
                }
                ("not", Some("in")) => {
                    i += 1;
                    "not in"
                }
                (kind, _) => kind,
            };
            if let Some(op) = CmpOperator::from_token(token) {
                ops.push(op);
            }
        }

        if operands.len() < 2 || ops.len() != operands.len() - 1 {
            return self.generic(node, "compare");
        }

        let left = operands.remove(0);
        SyntaxNode::new(
            NodeKind::Compare {
                left: Box::new(left),
                ops,
                comparators: operands,
            },
            line_of(node),
        )
    }

    fn dictionary(&self, node: Node) -> SyntaxNode {
        let mut keys = Vec::new();
        let mut values = Vec::new();

        for entry in named(node) {
            match entry.kind() {
                "pair" => {
                    keys.push(entry.child_by_field_name("key").map(|k| self.expr(k)));
                    values.push(
                        entry
                            .child_by_field_name("value")
                            .map(|v| self.expr(v))
                            .unwrap_or_else(|| self.missing_value()),
                    );
                }
                "dictionary_splat" => {
                    keys.push(None);
                    values.push(
                        named(entry)
                            .first()
                            .map(|v| self.expr(*v))
                            .unwrap_or_else(|| self.missing_value()),
                    );
                }
                _ => {}
            }
        }

        SyntaxNode::new(NodeKind::Dict { keys, values }, line_of(node))
    }

    fn comprehension(&self, node: Node) -> SyntaxNode {
        let mut children = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "pair" {
                children.extend(named(body).into_iter().map(|p| self.expr(p)));
            } else {
                children.push(self.expr(body));
            }
        }

        for clause in named(node) {
            match clause.kind() {
                "for_in_clause" => {
                    let mut parts = Vec::new();
                    if let Some(left) = clause.child_by_field_name("left") {
                        parts.push(self.target(left, ExprContext::Store));
                    }
                    parts.extend(
                        field_all(clause, "right")
                            .into_iter()
                            .map(|r| self.expr(r)),
                    );
                    children.push(self.other(clause, "comprehension", parts));
                }
                "if_clause" => children.extend(named(clause).into_iter().map(|c| self.expr(c))),
                _ => {}
            }
        }

        self.other(node, node.kind(), children)
    }

    /// Prefix letters of a string literal (`f`, `rb`, ...), lowercased.
    fn string_prefix(&self, node: Node) -> String {
        let start = all_children(node)
            .into_iter()
            .find(|c| c.kind() == "string_start")
            .map(|s| self.text(s))
            .unwrap_or_else(|| self.text(node));
        start
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn interpolations(&self, node: Node) -> Vec<SyntaxNode> {
        named(node)
            .into_iter()
            .filter(|c| c.kind() == "interpolation")
            .filter_map(|i| {
                i.child_by_field_name("expression")
                    .or_else(|| named(i).first().copied())
            })
            .map(|e| self.expr(e))
            .collect()
    }

    fn string_content(&self, node: Node) -> String {
        named(node)
            .into_iter()
            .filter(|c| matches!(c.kind(), "string_content" | "escape_sequence"))
            .map(|c| self.text(c))
            .collect()
    }

    fn string(&self, node: Node) -> SyntaxNode {
        let prefix = self.string_prefix(node);
        let kind = if prefix.contains('f') {
            NodeKind::JoinedStr {
                values: self.interpolations(node),
            }
        } else if prefix.contains('b') {
            NodeKind::Constant(Constant::Bytes)
        } else {
            NodeKind::Constant(Constant::Str(self.string_content(node)))
        };
        SyntaxNode::new(kind, line_of(node))
    }

    fn concatenated_string(&self, node: Node) -> SyntaxNode {
        let parts: Vec<Node> = named(node)
            .into_iter()
            .filter(|p| p.kind() == "string")
            .collect();
        let prefixes: Vec<String> = parts.iter().map(|p| self.string_prefix(*p)).collect();

        let kind = if prefixes.iter().any(|p| p.contains('f')) {
            NodeKind::JoinedStr {
                values: parts.iter().flat_map(|p| self.interpolations(*p)).collect(),
            }
        } else if prefixes.iter().any(|p| p.contains('b')) {
            NodeKind::Constant(Constant::Bytes)
        } else {
            NodeKind::Constant(Constant::Str(
                parts.iter().map(|p| self.string_content(*p)).collect(),
            ))
        };
        SyntaxNode::new(kind, line_of(node))
    }
}

fn parse_integer(text: &str) -> Constant {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if cleaned.ends_with(['j', 'J']) {
        return Constant::Complex;
    }
    let cleaned = cleaned.trim_end_matches(['l', 'L']);
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };

    // Python integers are unbounded; anything past i128 only needs to stay "large".
    Constant::Int(i128::from_str_radix(digits, radix).unwrap_or(i128::MAX))
}

fn parse_float(text: &str) -> Constant {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if cleaned.ends_with(['j', 'J']) {
        return Constant::Complex;
    }
    Constant::Float(cleaned.parse::<f64>().unwrap_or(f64::INFINITY))
}
