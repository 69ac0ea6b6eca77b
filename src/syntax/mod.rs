//! Syntax tree model consumed by the detectors.
//!
//! The tree mirrors the shape of a Python abstract syntax tree: statements and
//! expressions are [`SyntaxNode`]s tagged with a [`NodeKind`], and every node
//! produced from real source carries its 1-based line number.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Source text │────▶│ tree-sitter  │────▶│ lower.rs     │
//! └─────────────┘     │ (CST)        │     │ (SyntaxNode) │
//!                     └──────────────┘     └──────────────┘
//! ```
//!
//! Only the node kinds the detectors inspect get their own variant. Everything
//! else (return, raise, subscripts, comprehensions, ...) is kept as
//! [`NodeKind::Other`] so its children are still reachable by [`walk`].

mod lower;

use std::collections::VecDeque;

pub use lower::parse;

/// Whether a name or attribute is read, written or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Load,
    Store,
    Del,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOperator {
    /// Map an operator token (`"+"`, `"//="`, ...) to an operator.
    ///
    /// Augmented forms are accepted with their trailing `=`.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = token.strip_suffix('=').filter(|t| !t.is_empty()).unwrap_or(token);
        Some(match op {
            "+" => BinOperator::Add,
            "-" => BinOperator::Sub,
            "*" => BinOperator::Mult,
            "@" => BinOperator::MatMult,
            "/" => BinOperator::Div,
            "//" => BinOperator::FloorDiv,
            "%" => BinOperator::Mod,
            "**" => BinOperator::Pow,
            "<<" => BinOperator::LShift,
            ">>" => BinOperator::RShift,
            "|" => BinOperator::BitOr,
            "^" => BinOperator::BitXor,
            "&" => BinOperator::BitAnd,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Invert,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => CmpOperator::Eq,
            "!=" | "<>" => CmpOperator::NotEq,
            "<" => CmpOperator::Lt,
            "<=" => CmpOperator::LtE,
            ">" => CmpOperator::Gt,
            ">=" => CmpOperator::GtE,
            "is" => CmpOperator::Is,
            "is not" => CmpOperator::IsNot,
            "in" => CmpOperator::In,
            "not in" => CmpOperator::NotIn,
            _ => return None,
        })
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i128),
    Float(f64),
    Complex,
    Str(String),
    Bytes,
    Bool(bool),
    None,
    Ellipsis,
}

impl Constant {
    /// Numeric value, following Python's numeric tower: booleans count as
    /// the integers 0 and 1, complex literals are not real numbers.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Constant::Int(v) => Some(*v as f64),
            Constant::Float(v) => Some(*v),
            Constant::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Constant::Str(_))
    }
}

/// How a parameter binds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Declared before a `/` separator.
    PositionalOnly,
    /// Ordinary positional-or-keyword parameter.
    Positional,
    /// `*args`
    VarArgs,
    /// Declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`
    VarKeywords,
}

/// One formal parameter of a function or lambda.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<SyntaxNode>,
    pub annotation: Option<SyntaxNode>,
    pub line: Option<usize>,
}

impl Param {
    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ParamKind::PositionalOnly | ParamKind::Positional)
    }
}

/// A keyword argument of a call. `arg` is `None` for `**mapping`.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: SyntaxNode,
}

/// A name in an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<SyntaxNode>,
    pub decorators: Vec<SyntaxNode>,
    pub returns: Option<Box<SyntaxNode>>,
    pub is_async: bool,
}

impl FunctionDef {
    /// Parameters that can be passed positionally.
    pub fn positional_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.is_positional())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<SyntaxNode>,
    pub keywords: Vec<Keyword>,
    pub body: Vec<SyntaxNode>,
    pub decorators: Vec<SyntaxNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: Box<SyntaxNode>,
    pub args: Vec<SyntaxNode>,
    pub keywords: Vec<Keyword>,
}

impl Call {
    /// Attribute name of the callee for `obj.method(...)` calls.
    pub fn method_name(&self) -> Option<&str> {
        match &self.func.kind {
            NodeKind::Attribute { attr, .. } => Some(attr),
            _ => None,
        }
    }
}

/// Kind-specific payload of a syntax node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        body: Vec<SyntaxNode>,
    },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Assign {
        targets: Vec<SyntaxNode>,
        value: Box<SyntaxNode>,
    },
    AugAssign {
        target: Box<SyntaxNode>,
        op: BinOperator,
        value: Box<SyntaxNode>,
    },
    AnnAssign {
        target: Box<SyntaxNode>,
        annotation: Box<SyntaxNode>,
        value: Option<Box<SyntaxNode>>,
    },
    Call(Call),
    BinOp {
        left: Box<SyntaxNode>,
        op: BinOperator,
        right: Box<SyntaxNode>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<SyntaxNode>,
    },
    Compare {
        left: Box<SyntaxNode>,
        ops: Vec<CmpOperator>,
        comparators: Vec<SyntaxNode>,
    },
    Import {
        names: Vec<Alias>,
    },
    ImportFrom {
        /// `None` for `from . import x`.
        module: Option<String>,
        names: Vec<Alias>,
        level: usize,
    },
    ExceptHandler {
        type_: Option<Box<SyntaxNode>>,
        name: Option<String>,
        body: Vec<SyntaxNode>,
    },
    While {
        test: Box<SyntaxNode>,
        body: Vec<SyntaxNode>,
        orelse: Vec<SyntaxNode>,
    },
    If {
        test: Box<SyntaxNode>,
        body: Vec<SyntaxNode>,
        orelse: Vec<SyntaxNode>,
    },
    For {
        target: Box<SyntaxNode>,
        iter: Box<SyntaxNode>,
        body: Vec<SyntaxNode>,
        orelse: Vec<SyntaxNode>,
        is_async: bool,
    },
    Try {
        body: Vec<SyntaxNode>,
        handlers: Vec<SyntaxNode>,
        orelse: Vec<SyntaxNode>,
        finalbody: Vec<SyntaxNode>,
    },
    With {
        /// Context expressions followed by their optional `as` targets.
        items: Vec<SyntaxNode>,
        body: Vec<SyntaxNode>,
        is_async: bool,
    },
    Attribute {
        value: Box<SyntaxNode>,
        attr: String,
        ctx: ExprContext,
    },
    Name {
        id: String,
        ctx: ExprContext,
    },
    Constant(Constant),
    Yield {
        value: Option<Box<SyntaxNode>>,
        /// `yield from`
        delegate: bool,
    },
    Tuple {
        elts: Vec<SyntaxNode>,
        ctx: ExprContext,
    },
    List {
        elts: Vec<SyntaxNode>,
        ctx: ExprContext,
    },
    Dict {
        /// `None` keys stand for `**mapping` entries.
        keys: Vec<Option<SyntaxNode>>,
        values: Vec<SyntaxNode>,
    },
    Set {
        elts: Vec<SyntaxNode>,
    },
    JoinedStr {
        values: Vec<SyntaxNode>,
    },
    Lambda {
        params: Vec<Param>,
        body: Box<SyntaxNode>,
    },
    Starred {
        value: Box<SyntaxNode>,
        ctx: ExprContext,
    },
    Pass,
    Break,
    Continue,
    /// Any construct without a dedicated variant.
    Other {
        label: String,
        children: Vec<SyntaxNode>,
    },
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// 1-based source line; `None` for synthetic nodes.
    pub line: Option<usize>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, line: Option<usize>) -> Self {
        Self { kind, line }
    }

    /// Direct children in field order.
    pub fn children(&self) -> Vec<&SyntaxNode> {
        fn params_children(params: &[Param]) -> impl Iterator<Item = &SyntaxNode> {
            params
                .iter()
                .flat_map(|p| p.annotation.iter().chain(p.default.iter()))
        }

        let mut out: Vec<&SyntaxNode> = Vec::new();
        match &self.kind {
            NodeKind::Module { body } => out.extend(body),
            NodeKind::FunctionDef(f) => {
                out.extend(params_children(&f.params));
                out.extend(&f.body);
                out.extend(&f.decorators);
                out.extend(f.returns.as_deref());
            }
            NodeKind::ClassDef(c) => {
                out.extend(&c.bases);
                out.extend(c.keywords.iter().map(|k| &k.value));
                out.extend(&c.body);
                out.extend(&c.decorators);
            }
            NodeKind::Assign { targets, value } => {
                out.extend(targets);
                out.push(value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                out.push(target);
                out.push(annotation);
                out.extend(value.as_deref());
            }
            NodeKind::Call(call) => {
                out.push(&call.func);
                out.extend(&call.args);
                out.extend(call.keywords.iter().map(|k| &k.value));
            }
            NodeKind::BinOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Compare {
                left, comparators, ..
            } => {
                out.push(left);
                out.extend(comparators);
            }
            NodeKind::Import { .. } | NodeKind::ImportFrom { .. } => {}
            NodeKind::ExceptHandler { type_, body, .. } => {
                out.extend(type_.as_deref());
                out.extend(body);
            }
            NodeKind::While { test, body, orelse } | NodeKind::If { test, body, orelse } => {
                out.push(test);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                out.push(target);
                out.push(iter);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                out.extend(body);
                out.extend(handlers);
                out.extend(orelse);
                out.extend(finalbody);
            }
            NodeKind::With { items, body, .. } => {
                out.extend(items);
                out.extend(body);
            }
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Name { .. } | NodeKind::Constant(_) => {}
            NodeKind::Yield { value, .. } => out.extend(value.as_deref()),
            NodeKind::Tuple { elts, .. } | NodeKind::List { elts, .. } | NodeKind::Set { elts } => {
                out.extend(elts)
            }
            NodeKind::Dict { keys, values } => {
                out.extend(keys.iter().flatten());
                out.extend(values);
            }
            NodeKind::JoinedStr { values } => out.extend(values),
            NodeKind::Lambda { params, body } => {
                out.extend(params_children(params));
                out.push(body);
            }
            NodeKind::Starred { value, .. } => out.push(value),
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue => {}
            NodeKind::Other { children, .. } => out.extend(children),
        }
        out
    }

    /// Name of a bare name reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Name { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match &self.kind {
            NodeKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_str_constant(&self) -> bool {
        self.as_constant().is_some_and(Constant::is_str)
    }

    /// True for `if`/`for`/`while`/`try` statements.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::If { .. } | NodeKind::For { .. } | NodeKind::While { .. } | NodeKind::Try { .. }
        )
    }

    /// Breadth-first traversal of this node and all descendants.
    pub fn walk(&self) -> Walk<'_> {
        walk(self)
    }
}

/// Breadth-first iterator over a subtree, root first.
pub struct Walk<'a> {
    queue: VecDeque<&'a SyntaxNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children());
        Some(node)
    }
}

/// Walk `root` and every descendant, breadth-first in field order.
pub fn walk(root: &SyntaxNode) -> Walk<'_> {
    let mut queue = VecDeque::new();
    queue.push_back(root);
    Walk { queue }
}
