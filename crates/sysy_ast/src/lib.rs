use sysy_lexer::Span;

/// A complete SysY compilation unit
#[derive(Debug, Clone)]
pub struct CompUnit {
    pub items: Vec<Item>,
}

/// Top-level items
#[derive(Debug, Clone)]
pub enum Item {
    Decl(Decl),
    Function(FuncDef),
}

/// `const int a = 1, b[2] = {1, 2};` or `int a, b = 3;`
#[derive(Debug, Clone)]
pub struct Decl {
    pub is_const: bool,
    pub defs: Vec<VarDef>,
    pub span: Span,
}

/// One declarator inside a declaration
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: Ident,
    /// Array dimensions, outermost first. Empty for scalars.
    pub dims: Vec<Expr>,
    pub init: Option<InitVal>,
    pub span: Span,
}

/// Initializer: a scalar expression or a braced aggregate
#[derive(Debug, Clone)]
pub enum InitVal {
    Expr(Expr),
    List(Vec<InitVal>, Span),
}

impl InitVal {
    pub fn span(&self) -> Span {
        match self {
            InitVal::Expr(e) => e.span,
            InitVal::List(_, span) => *span,
        }
    }
}

/// Return type of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncType {
    Int,
    Void,
}

impl std::fmt::Display for FuncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncType::Int => write!(f, "int"),
            FuncType::Void => write!(f, "void"),
        }
    }
}

/// Function definition
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub ret: FuncType,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// Function parameter: `int x` or `int a[][3]`
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    /// `Some` for array parameters; holds the dimensions after the omitted first one
    pub array_dims: Option<Vec<Expr>>,
    pub span: Span,
}

/// A braced block
#[derive(Debug, Clone)]
pub struct Block {
    pub items: Vec<BlockItem>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum BlockItem {
    Decl(Decl),
    Stmt(Stmt),
}

/// Statements
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `lval = expr;`
    Assign(LVal, Expr),
    /// `expr;` or the empty statement `;`
    Expr(Option<Expr>),
    Block(Block),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    Break,
    Continue,
    Return(Option<Expr>),
}

/// Left value: a name with zero or more subscripts
#[derive(Debug, Clone)]
pub struct LVal {
    pub name: Ident,
    pub indices: Vec<Expr>,
    pub span: Span,
}

/// Expressions
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal, unnarrowed
    IntLiteral(i64),
    /// Variable or array element reference
    LVal(LVal),
    /// Binary operation: a + b
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// Unary operation: -x, !x, +x
    Unary(UnaryOp, Box<Expr>),
    /// Function call: foo(a, b)
    Call(Ident, Vec<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq => 3,
            BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::NotEq => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::LtEq => write!(f, "<="),
            BinOp::GtEq => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos, // +
    Neg, // -
    Not, // !
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Pos => write!(f, "+"),
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Identifier with span
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: String, span: Span) -> Self {
        Self { name, span }
    }
}

// === Pretty Printing ===

impl CompUnit {
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&item.pretty_print(0));
            out.push('\n');
        }
        out
    }
}

impl Item {
    pub fn pretty_print(&self, indent: usize) -> String {
        match self {
            Item::Decl(d) => d.pretty_print(indent),
            Item::Function(f) => f.pretty_print(indent),
        }
    }
}

impl Decl {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let kind = if self.is_const { "ConstDecl" } else { "VarDecl" };
        let mut out = format!("{}{}\n", ind, kind);
        for def in &self.defs {
            let dims: String = def
                .dims
                .iter()
                .map(|d| format!("[{}]", d.pretty_print()))
                .collect();
            match &def.init {
                Some(init) => {
                    out.push_str(&format!("{}  {}{} =\n", ind, def.name.name, dims));
                    out.push_str(&init.pretty_print(indent + 2));
                }
                None => out.push_str(&format!("{}  {}{}\n", ind, def.name.name, dims)),
            }
        }
        out
    }
}

impl InitVal {
    pub fn pretty_print(&self, indent: usize) -> String {
        match self {
            InitVal::Expr(e) => e.pretty_print_indented(indent),
            InitVal::List(items, _) => {
                let mut out = format!("{}InitList\n", "  ".repeat(indent));
                for item in items {
                    out.push_str(&item.pretty_print(indent + 1));
                }
                out
            }
        }
    }
}

impl FuncDef {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let params: Vec<_> = self.params.iter().map(Param::pretty_print).collect();
        let mut out = format!(
            "{}Function '{}' ({}) -> {}\n",
            ind,
            self.name.name,
            params.join(", "),
            self.ret
        );
        out.push_str(&self.body.pretty_print(indent + 1));
        out
    }
}

impl Param {
    pub fn pretty_print(&self) -> String {
        match &self.array_dims {
            None => format!("int {}", self.name.name),
            Some(dims) => {
                let rest: String = dims.iter().map(|d| format!("[{}]", d.pretty_print())).collect();
                format!("int {}[]{}", self.name.name, rest)
            }
        }
    }
}

impl Block {
    pub fn pretty_print(&self, indent: usize) -> String {
        let mut out = format!("{}Block\n", "  ".repeat(indent));
        for item in &self.items {
            match item {
                BlockItem::Decl(d) => out.push_str(&d.pretty_print(indent + 1)),
                BlockItem::Stmt(s) => out.push_str(&s.pretty_print(indent + 1)),
            }
        }
        out
    }
}

impl Stmt {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        match &self.kind {
            StmtKind::Assign(lval, value) => {
                let mut out = format!("{}Assign {}\n", ind, lval.pretty_print());
                out.push_str(&value.pretty_print_indented(indent + 1));
                out
            }
            StmtKind::Expr(None) => format!("{}Empty\n", ind),
            StmtKind::Expr(Some(e)) => {
                let mut out = format!("{}ExprStmt\n", ind);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            StmtKind::Block(b) => b.pretty_print(indent),
            StmtKind::If(cond, then_stmt, else_stmt) => {
                let mut out = format!("{}If\n", ind);
                out.push_str(&format!("{}condition:\n", "  ".repeat(indent + 1)));
                out.push_str(&cond.pretty_print_indented(indent + 2));
                out.push_str(&format!("{}then:\n", "  ".repeat(indent + 1)));
                out.push_str(&then_stmt.pretty_print(indent + 2));
                if let Some(e) = else_stmt {
                    out.push_str(&format!("{}else:\n", "  ".repeat(indent + 1)));
                    out.push_str(&e.pretty_print(indent + 2));
                }
                out
            }
            StmtKind::While(cond, body) => {
                let mut out = format!("{}While\n", ind);
                out.push_str(&format!("{}condition:\n", "  ".repeat(indent + 1)));
                out.push_str(&cond.pretty_print_indented(indent + 2));
                out.push_str(&format!("{}body:\n", "  ".repeat(indent + 1)));
                out.push_str(&body.pretty_print(indent + 2));
                out
            }
            StmtKind::Break => format!("{}Break\n", ind),
            StmtKind::Continue => format!("{}Continue\n", ind),
            StmtKind::Return(None) => format!("{}Return\n", ind),
            StmtKind::Return(Some(e)) => {
                let mut out = format!("{}Return\n", ind);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
        }
    }
}

impl LVal {
    pub fn pretty_print(&self) -> String {
        let indices: String = self
            .indices
            .iter()
            .map(|i| format!("[{}]", i.pretty_print()))
            .collect();
        format!("{}{}", self.name.name, indices)
    }
}

impl Expr {
    /// Pretty print with indentation for full AST display
    pub fn pretty_print_indented(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        match &self.kind {
            ExprKind::IntLiteral(n) => format!("{}Int({})\n", ind, n),
            ExprKind::LVal(lval) => format!("{}LVal({})\n", ind, lval.pretty_print()),
            ExprKind::Binary(l, op, r) => {
                let mut out = format!("{}Binary({})\n", ind, op);
                out.push_str(&l.pretty_print_indented(indent + 1));
                out.push_str(&r.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Unary(op, e) => {
                let mut out = format!("{}Unary({})\n", ind, op);
                out.push_str(&e.pretty_print_indented(indent + 1));
                out
            }
            ExprKind::Call(callee, args) => {
                let mut out = format!("{}Call({})\n", ind, callee.name);
                for arg in args {
                    out.push_str(&arg.pretty_print_indented(indent + 1));
                }
                out
            }
        }
    }

    /// Compact pretty print (for inline display)
    pub fn pretty_print(&self) -> String {
        match &self.kind {
            ExprKind::IntLiteral(n) => format!("{}", n),
            ExprKind::LVal(lval) => lval.pretty_print(),
            ExprKind::Binary(l, op, r) => {
                format!("({} {} {})", l.pretty_print(), op, r.pretty_print())
            }
            ExprKind::Unary(op, e) => format!("{}{}", op, e.pretty_print()),
            ExprKind::Call(callee, args) => {
                let args: Vec<_> = args.iter().map(Expr::pretty_print).collect();
                format!("{}({})", callee.name, args.join(", "))
            }
        }
    }
}
