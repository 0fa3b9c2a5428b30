//! HIR types - the syntax tree with every name resolved and every
//! constant expression folded

use sysy_ast::{BinOp, UnaryOp};
use sysy_lexer::Span;

use crate::func::{FuncSignature, FuncTable};
use crate::symbol::{SymbolValue, Type};

/// The resolved compilation unit
#[derive(Debug, Clone, Default)]
pub struct ResolvedProgram {
    /// Global declarations in source order
    pub globals: Vec<ResolvedDef>,
    /// Function definitions in source order
    pub functions: Vec<ResolvedFunction>,
    /// Every registered signature, runtime library included
    pub signatures: FuncTable,
}

impl ResolvedProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&ResolvedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&ResolvedDef> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn pretty_print(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Resolved Program ===\n\n");

        out.push_str("--- Signatures ---\n");
        for sig in self.signatures.iter() {
            out.push_str(&format!("  {}\n", sig.pretty_print()));
        }
        out.push('\n');

        out.push_str("--- Globals ---\n");
        for def in &self.globals {
            out.push_str(&def.pretty_print(1));
        }
        out.push('\n');

        out.push_str("--- Functions ---\n");
        for f in &self.functions {
            out.push_str(&format!("  {}\n", f.signature.pretty_print()));
            out.push_str(&f.body.pretty_print(2));
        }

        out
    }
}

/// A declared name together with its binding
#[derive(Debug, Clone)]
pub struct ResolvedDef {
    pub name: String,
    pub value: SymbolValue,
    pub ty: Type,
    pub is_const: bool,
    pub init: Option<ResolvedInit>,
    pub span: Span,
}

impl ResolvedDef {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let const_str = if self.is_const { "const " } else { "" };
        let mut out = format!("{}{}{} {} => {}\n", ind, const_str, self.ty, self.name, self.value);
        match &self.init {
            None => {}
            Some(ResolvedInit::Scalar(e)) => {
                out.push_str(&format!("{}  init: {}\n", ind, e.pretty_print()));
            }
            Some(ResolvedInit::Aggregate(elems)) => {
                let elems: Vec<_> = elems.iter().map(ResolvedExpr::pretty_print).collect();
                out.push_str(&format!("{}  init: {{{}}}\n", ind, elems.join(", ")));
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub enum ResolvedInit {
    Scalar(ResolvedExpr),
    /// Row-major, exactly one element per array slot, zero padded
    Aggregate(Vec<ResolvedExpr>),
}

/// Resolved function
#[derive(Debug, Clone)]
pub struct ResolvedFunction {
    pub name: String,
    pub signature: FuncSignature,
    pub body: ResolvedBlock,
    pub span: Span,
}

/// Resolved block
#[derive(Debug, Clone)]
pub struct ResolvedBlock {
    pub stmts: Vec<ResolvedStmt>,
    pub span: Span,
}

impl ResolvedBlock {
    pub fn pretty_print(&self, indent: usize) -> String {
        let mut out = format!("{}Block\n", "  ".repeat(indent));
        for stmt in &self.stmts {
            out.push_str(&stmt.pretty_print(indent + 1));
        }
        out
    }
}

/// Resolved statement
#[derive(Debug, Clone)]
pub enum ResolvedStmt {
    Decl(Vec<ResolvedDef>),
    Assign {
        target: ResolvedLVal,
        value: ResolvedExpr,
        span: Span,
    },
    Expr(Option<ResolvedExpr>),
    Block(ResolvedBlock),
    If {
        cond: ResolvedExpr,
        then_branch: Box<ResolvedStmt>,
        else_branch: Option<Box<ResolvedStmt>>,
        span: Span,
    },
    While {
        cond: ResolvedExpr,
        body: Box<ResolvedStmt>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Return(Option<ResolvedExpr>, Span),
}

impl ResolvedStmt {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        match self {
            ResolvedStmt::Decl(defs) => defs.iter().map(|d| d.pretty_print(indent)).collect(),
            ResolvedStmt::Assign { target, value, .. } => {
                format!("{}{} = {}\n", ind, target.pretty_print(), value.pretty_print())
            }
            ResolvedStmt::Expr(None) => format!("{};\n", ind),
            ResolvedStmt::Expr(Some(e)) => format!("{}{};\n", ind, e.pretty_print()),
            ResolvedStmt::Block(b) => b.pretty_print(indent),
            ResolvedStmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let mut out = format!("{}if {}\n", ind, cond.pretty_print());
                out.push_str(&then_branch.pretty_print(indent + 1));
                if let Some(e) = else_branch {
                    out.push_str(&format!("{}else\n", ind));
                    out.push_str(&e.pretty_print(indent + 1));
                }
                out
            }
            ResolvedStmt::While { cond, body, .. } => {
                let mut out = format!("{}while {}\n", ind, cond.pretty_print());
                out.push_str(&body.pretty_print(indent + 1));
                out
            }
            ResolvedStmt::Break(_) => format!("{}break\n", ind),
            ResolvedStmt::Continue(_) => format!("{}continue\n", ind),
            ResolvedStmt::Return(None, _) => format!("{}return\n", ind),
            ResolvedStmt::Return(Some(e), _) => format!("{}return {}\n", ind, e.pretty_print()),
        }
    }
}

/// Assignment target
#[derive(Debug, Clone)]
pub struct ResolvedLVal {
    pub name: String,
    /// Identifier of the storage being written
    pub storage: String,
    pub indices: Vec<ResolvedExpr>,
    pub span: Span,
}

impl ResolvedLVal {
    pub fn pretty_print(&self) -> String {
        let indices: String = self
            .indices
            .iter()
            .map(|i| format!("[{}]", i.pretty_print()))
            .collect();
        format!("{}{}", self.storage, indices)
    }
}

/// Resolved expression.
///
/// `value` is the annotation the code generator consumes: a literal for
/// anything that folded, otherwise the identifier holding the result.
#[derive(Debug, Clone)]
pub struct ResolvedExpr {
    pub kind: ResolvedExprKind,
    pub value: SymbolValue,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ResolvedExprKind {
    /// Folded to `value`; no children survive
    Literal,
    /// Read of a whole runtime variable; `value` is its storage
    Var { name: String },
    /// Subscripted read; `value` is a fresh temporary
    Index {
        name: String,
        storage: String,
        indices: Vec<ResolvedExpr>,
    },
    Binary {
        op: BinOp,
        left: Box<ResolvedExpr>,
        right: Box<ResolvedExpr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<ResolvedExpr>,
    },
    Call {
        callee: String,
        /// `None` when the callee is unknown or the arity is wrong
        signature: Option<FuncSignature>,
        args: Vec<ResolvedExpr>,
    },
    /// Poisoned placeholder left behind by a reported error
    Error,
}

impl ResolvedExpr {
    pub fn literal(value: i32, span: Span) -> Self {
        Self {
            kind: ResolvedExprKind::Literal,
            value: SymbolValue::Constant(value),
            ty: Type::Int,
            span,
        }
    }

    pub fn as_constant(&self) -> Option<i32> {
        self.value.as_constant()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ResolvedExprKind::Error)
    }

    /// Compact pretty print (for inline display)
    pub fn pretty_print(&self) -> String {
        match &self.kind {
            ResolvedExprKind::Literal | ResolvedExprKind::Var { .. } => self.value.to_string(),
            ResolvedExprKind::Index {
                storage, indices, ..
            } => {
                let indices: String = indices
                    .iter()
                    .map(|i| format!("[{}]", i.pretty_print()))
                    .collect();
                format!("{}{}", storage, indices)
            }
            ResolvedExprKind::Binary { op, left, right } => format!(
                "({} {} {}) => {}",
                left.pretty_print(),
                op,
                right.pretty_print(),
                self.value
            ),
            ResolvedExprKind::Unary { op, expr } => {
                format!("{}{} => {}", op, expr.pretty_print(), self.value)
            }
            ResolvedExprKind::Call { callee, args, .. } => {
                let args: Vec<_> = args.iter().map(ResolvedExpr::pretty_print).collect();
                format!("{}({}) => {}", callee, args.join(", "), self.value)
            }
            ResolvedExprKind::Error => format!("<error {}>", self.value),
        }
    }
}
