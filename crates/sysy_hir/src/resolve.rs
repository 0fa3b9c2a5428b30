//! Name resolution - binds every identifier to a symbol and folds constants

use log::{debug, trace};
use sysy_ast::*;
use sysy_lexer::Span;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveErrorKind};
use crate::fold::{fold_symbols, fold_unary, narrow_literal, FoldError};
use crate::func::{FuncSignature, FuncTable, FuncTableError, ParamInfo};
use crate::hir::*;
use crate::ident::{CounterAllocator, IdentAllocator};
use crate::init::{element_count, flatten, InitSlot, MAX_ARRAY_ELEMENTS};
use crate::scope::{ScopeError, ScopeStack};
use crate::symbol::{Symbol, SymbolValue, Type};

/// Outcome of a full run: the annotated tree is produced even when
/// errors were reported, with poisoned nodes where they occurred.
#[derive(Debug)]
pub struct Resolution {
    pub program: ResolvedProgram,
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<ResolvedProgram, Vec<ResolveError>> {
        if self.errors.is_empty() {
            Ok(self.program)
        } else {
            Err(self.errors)
        }
    }
}

/// What the first pass learned about one top-level item
enum Collected {
    Globals(Vec<(Ident, Symbol)>),
    Function { sig: FuncSignature, registered: bool },
}

/// Name resolver
pub struct Resolver<A: IdentAllocator = CounterAllocator> {
    config: ResolverConfig,
    alloc: A,
    scopes: ScopeStack<Symbol>,
    funcs: FuncTable,
    /// Errors encountered
    errors: Vec<ResolveError>,
    /// Return type of the function being resolved
    current_ret: Option<FuncType>,
    /// Number of enclosing `while` loops
    loop_depth: usize,
    /// Nesting of operands a constant `&&`/`||` left side never evaluates
    unevaluated: usize,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Resolver::with_allocator(config, CounterAllocator::new())
    }

    /// Resolve a compilation unit with the default configuration
    pub fn resolve(unit: CompUnit) -> Result<ResolvedProgram, Vec<ResolveError>> {
        Resolver::new().run(unit).into_result()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: IdentAllocator> Resolver<A> {
    pub fn with_allocator(config: ResolverConfig, alloc: A) -> Self {
        Self {
            config,
            alloc,
            scopes: ScopeStack::new(),
            funcs: FuncTable::new(),
            errors: Vec::new(),
            current_ret: None,
            loop_depth: 0,
            unevaluated: 0,
        }
    }

    /// Resolve every item of `unit`, collecting all errors. The unit is
    /// consumed; annotations live in the returned tree.
    pub fn run(mut self, unit: CompUnit) -> Resolution {
        if self.config.runtime_library {
            if let Err(FuncTableError::Duplicate(name)) = self.funcs.register_runtime_library(&mut self.alloc) {
                self.error(ResolveErrorKind::DuplicateFunction(name), Span::default());
            }
        }

        let mut program = ResolvedProgram::new();
        if self.config.forward_references {
            self.resolve_two_pass(&unit, &mut program);
        } else {
            self.resolve_in_order(&unit, &mut program);
        }

        debug!(
            "resolved {} global(s), {} function(s), {} error(s)",
            program.globals.len(),
            program.functions.len(),
            self.errors.len()
        );

        program.signatures = self.funcs;
        Resolution {
            program,
            errors: self.errors,
        }
    }

    /// Single walk: a function sees only what precedes it, plus itself
    fn resolve_in_order(&mut self, unit: &CompUnit, program: &mut ResolvedProgram) {
        for item in &unit.items {
            match item {
                Item::Decl(decl) => {
                    let defs = self.resolve_decl(decl, &[]);
                    program.globals.extend(defs);
                }
                Item::Function(f) => {
                    let sig = self.build_signature(f);
                    let registered = self.register_function(f, &sig);
                    let resolved = self.resolve_function(f, sig);
                    if registered {
                        program.functions.push(resolved);
                    }
                }
            }
        }
    }

    /// First pass resolves globals and collects every signature; the
    /// second resolves bodies against globals rebound in source order.
    fn resolve_two_pass(&mut self, unit: &CompUnit, program: &mut ResolvedProgram) {
        let mut collected = Vec::with_capacity(unit.items.len());
        for item in &unit.items {
            match item {
                Item::Decl(decl) => {
                    let defs = self.resolve_decl(decl, &[]);
                    let bindings = defs
                        .iter()
                        .map(|def| {
                            let ident = Ident::new(def.name.clone(), def.span);
                            let symbol = Symbol::new(def.value.clone(), def.ty.clone(), def.is_const);
                            (ident, symbol)
                        })
                        .collect();
                    program.globals.extend(defs);
                    collected.push(Collected::Globals(bindings));
                }
                Item::Function(f) => {
                    let sig = self.build_signature(f);
                    let registered = self.register_function(f, &sig);
                    collected.push(Collected::Function { sig, registered });
                }
            }
        }

        trace!("second pass over {} item(s)", unit.items.len());
        self.scopes = ScopeStack::new();
        for (item, collected) in unit.items.iter().zip(collected) {
            match (item, collected) {
                (Item::Decl(_), Collected::Globals(bindings)) => {
                    for (name, symbol) in bindings {
                        // already checked for duplicates in the first pass
                        let bound = self.declare(&name, symbol);
                        debug_assert!(bound, "global '{}' rebound twice", name.name);
                    }
                }
                (Item::Function(f), Collected::Function { sig, registered }) => {
                    let resolved = self.resolve_function(f, sig);
                    if registered {
                        program.functions.push(resolved);
                    }
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Scopes and diagnostics
    // ========================================================================

    fn error(&mut self, kind: ResolveErrorKind, span: Span) {
        debug!("resolve error: {} at {}..{}", kind, span.start, span.end);
        self.errors.push(ResolveError::new(kind, span));
    }

    /// Run `f` inside a fresh child scope
    fn in_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.enter_scope();
        let result = f(self);
        let popped = self.scopes.exit_scope();
        debug_assert!(popped.is_ok(), "scope stack underflow");
        result
    }

    /// Bind `ident` in the innermost scope; reports a duplicate and
    /// returns false if the name is already there
    fn declare(&mut self, ident: &Ident, symbol: Symbol) -> bool {
        match self.scopes.declare(ident.name.clone(), symbol) {
            Ok(()) => true,
            Err(ScopeError::Duplicate(name)) => {
                self.error(ResolveErrorKind::DuplicateDeclaration(name), ident.span);
                false
            }
            Err(ScopeError::Underflow) => false,
        }
    }

    fn expect_int(&mut self, expr: &ResolvedExpr) {
        if !expr.ty.is_int() && !expr.is_error() {
            self.error(
                ResolveErrorKind::TypeMismatch {
                    expected: "int".to_string(),
                    found: expr.ty.to_string(),
                },
                expr.span,
            );
        }
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn build_signature(&mut self, f: &FuncDef) -> FuncSignature {
        let mut params = Vec::with_capacity(f.params.len());
        for param in &f.params {
            let ty = match &param.array_dims {
                None => Type::Int,
                Some(dims) => {
                    let mut rest = Vec::with_capacity(dims.len());
                    for dim in dims {
                        rest.push(self.eval_dimension(&param.name.name, dim));
                    }
                    Type::Pointer(rest)
                }
            };
            params.push(ParamInfo {
                name: param.name.name.clone(),
                ty,
                ident: self.alloc.fresh_named(&param.name.name),
            });
        }

        FuncSignature {
            name: f.name.name.clone(),
            ret: f.ret,
            params,
            builtin: false,
        }
    }

    fn register_function(&mut self, f: &FuncDef, sig: &FuncSignature) -> bool {
        match self.funcs.register(sig.clone()) {
            Ok(()) => true,
            Err(_) => {
                self.error(ResolveErrorKind::DuplicateFunction(f.name.name.clone()), f.name.span);
                false
            }
        }
    }

    fn resolve_function(&mut self, f: &FuncDef, sig: FuncSignature) -> ResolvedFunction {
        debug!("resolve function '{}'", f.name.name);
        self.current_ret = Some(f.ret);
        self.loop_depth = 0;

        // Parameters and the outermost block items share one scope
        let body = self.in_scope(|r| {
            for (param, info) in f.params.iter().zip(&sig.params) {
                let symbol = Symbol::new(SymbolValue::Runtime(info.ident.clone()), info.ty.clone(), false);
                r.declare(&param.name, symbol);
            }
            r.resolve_block_items(&f.body)
        });

        self.current_ret = None;
        ResolvedFunction {
            name: f.name.name.clone(),
            signature: sig,
            body,
            span: f.span,
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// `rest` holds the block items after this declaration, used to tell
    /// whether a local scalar is ever reassigned
    fn resolve_decl(&mut self, decl: &Decl, rest: &[BlockItem]) -> Vec<ResolvedDef> {
        let mut defs = Vec::with_capacity(decl.defs.len());
        for def in &decl.defs {
            if let Some(resolved) = self.resolve_var_def(decl.is_const, def, rest) {
                defs.push(resolved);
            }
        }
        defs
    }

    fn resolve_var_def(&mut self, is_const: bool, def: &VarDef, rest: &[BlockItem]) -> Option<ResolvedDef> {
        let name = &def.name.name;
        let mut dims = Vec::with_capacity(def.dims.len());
        for dim in &def.dims {
            dims.push(self.eval_dimension(name, dim));
        }

        // The initializer is resolved before the name comes into scope,
        // so `int a = a + 1;` reads the outer `a`
        let (value, ty, init) = if dims.is_empty() {
            self.resolve_scalar_def(is_const, def, rest)?
        } else {
            self.resolve_array_def(is_const, def, dims)?
        };

        if !self.declare(&def.name, Symbol::new(value.clone(), ty.clone(), is_const)) {
            return None;
        }
        trace!("bind '{}' => {} : {}", name, value, ty);

        Some(ResolvedDef {
            name: name.clone(),
            value,
            ty,
            is_const,
            init,
            span: def.span,
        })
    }

    fn resolve_scalar_def(
        &mut self,
        is_const: bool,
        def: &VarDef,
        rest: &[BlockItem],
    ) -> Option<(SymbolValue, Type, Option<ResolvedInit>)> {
        let name = &def.name.name;
        let init = match &def.init {
            None => None,
            Some(InitVal::Expr(e)) => {
                let init = self.resolve_expr(e);
                self.expect_int(&init);
                Some(init)
            }
            Some(InitVal::List(_, span)) => {
                self.error(
                    ResolveErrorKind::InvalidInitializer {
                        name: name.clone(),
                        reason: "scalar initialized with a braced list".to_string(),
                    },
                    *span,
                );
                None
            }
        };

        if is_const {
            let Some(init) = init else {
                if def.init.is_none() {
                    self.missing_const_initializer(def);
                }
                return None;
            };
            return match init.as_constant() {
                Some(n) => Some((SymbolValue::Constant(n), Type::Int, Some(ResolvedInit::Scalar(init)))),
                None => {
                    self.error(ResolveErrorKind::NonConstantInitializer(name.clone()), def.span);
                    None
                }
            };
        }

        let Some(init) = init else {
            let storage = self.alloc.fresh_named(name);
            return Some((SymbolValue::Runtime(storage), Type::Int, None));
        };

        if self.scopes.is_global() {
            // Globals are stored, but their initial value must be static
            if !init.value.is_constant() {
                self.error(ResolveErrorKind::NonConstantInitializer(name.clone()), def.span);
            }
            let storage = self.alloc.fresh_named(name);
            return Some((SymbolValue::Runtime(storage), Type::Int, Some(ResolvedInit::Scalar(init))));
        }

        let value = match init.as_constant() {
            Some(n) if !is_assigned_in(name, rest) => SymbolValue::Constant(n),
            _ => SymbolValue::Runtime(self.alloc.fresh_named(name)),
        };
        Some((value, Type::Int, Some(ResolvedInit::Scalar(init))))
    }

    fn resolve_array_def(
        &mut self,
        is_const: bool,
        def: &VarDef,
        dims: Vec<usize>,
    ) -> Option<(SymbolValue, Type, Option<ResolvedInit>)> {
        let name = &def.name.name;
        let Some(total) = element_count(&dims) else {
            self.error(
                ResolveErrorKind::ArrayTooLarge {
                    name: name.clone(),
                    limit: MAX_ARRAY_ELEMENTS,
                },
                def.span,
            );
            if is_const {
                return None;
            }
            let storage = self.alloc.fresh_named(name);
            return Some((SymbolValue::Runtime(storage), Type::Array(dims), None));
        };

        let init = match &def.init {
            None if is_const => {
                self.missing_const_initializer(def);
                return None;
            }
            None => None,
            Some(init) => match flatten(init, &dims, total) {
                Ok(slots) => {
                    let mut elems = Vec::with_capacity(slots.len());
                    for slot in slots {
                        let elem = match slot {
                            InitSlot::Expr(e) => {
                                let elem = self.resolve_expr(e);
                                self.expect_int(&elem);
                                elem
                            }
                            InitSlot::Zero => ResolvedExpr::literal(0, init.span()),
                        };
                        elems.push(elem);
                    }

                    let static_init = is_const || self.scopes.is_global();
                    if static_init && elems.iter().any(|e| !e.value.is_constant()) {
                        self.error(ResolveErrorKind::NonConstantInitializer(name.clone()), def.span);
                        if is_const {
                            return None;
                        }
                    }
                    Some(ResolvedInit::Aggregate(elems))
                }
                Err(err) => {
                    self.error(
                        ResolveErrorKind::InvalidInitializer {
                            name: name.clone(),
                            reason: err.to_string(),
                        },
                        err.span(),
                    );
                    if is_const {
                        return None;
                    }
                    None
                }
            },
        };

        // Arrays always live in memory, even when every element is known
        let storage = self.alloc.fresh_named(name);
        Some((SymbolValue::Runtime(storage), Type::Array(dims), init))
    }

    fn missing_const_initializer(&mut self, def: &VarDef) {
        self.error(
            ResolveErrorKind::InvalidInitializer {
                name: def.name.name.clone(),
                reason: "constant requires an initializer".to_string(),
            },
            def.span,
        );
    }

    /// Fold one array dimension. Falls back to 1 after reporting, so the
    /// declaration still gets a usable type.
    fn eval_dimension(&mut self, name: &str, dim: &Expr) -> usize {
        let resolved = self.resolve_expr(dim);
        match resolved.as_constant() {
            Some(n) if n > 0 => n as usize,
            Some(n) => {
                self.error(
                    ResolveErrorKind::InvalidDimension {
                        name: name.to_string(),
                        value: n,
                    },
                    dim.span,
                );
                1
            }
            None => {
                if !resolved.is_error() {
                    self.error(ResolveErrorKind::NonConstantDimension(name.to_string()), dim.span);
                }
                1
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn resolve_block(&mut self, block: &Block) -> ResolvedBlock {
        self.in_scope(|r| r.resolve_block_items(block))
    }

    /// Resolve the items of `block` in the current scope
    fn resolve_block_items(&mut self, block: &Block) -> ResolvedBlock {
        let mut stmts = Vec::with_capacity(block.items.len());
        for (i, item) in block.items.iter().enumerate() {
            let stmt = match item {
                BlockItem::Decl(decl) => ResolvedStmt::Decl(self.resolve_decl(decl, &block.items[i + 1..])),
                BlockItem::Stmt(stmt) => self.resolve_stmt(stmt),
            };
            stmts.push(stmt);
        }
        ResolvedBlock {
            stmts,
            span: block.span,
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> ResolvedStmt {
        match &stmt.kind {
            StmtKind::Assign(target, value) => {
                let target = self.resolve_assign_target(target);
                let value = self.resolve_expr(value);
                self.expect_int(&value);
                ResolvedStmt::Assign {
                    target,
                    value,
                    span: stmt.span,
                }
            }

            StmtKind::Expr(expr) => ResolvedStmt::Expr(expr.as_ref().map(|e| self.resolve_expr(e))),

            StmtKind::Block(block) => ResolvedStmt::Block(self.resolve_block(block)),

            StmtKind::If(cond, then_branch, else_branch) => {
                let cond = self.resolve_expr(cond);
                self.expect_int(&cond);
                let then_branch = Box::new(self.resolve_stmt(then_branch));
                let else_branch = else_branch.as_ref().map(|s| Box::new(self.resolve_stmt(s)));
                ResolvedStmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span: stmt.span,
                }
            }

            StmtKind::While(cond, body) => {
                let cond = self.resolve_expr(cond);
                self.expect_int(&cond);
                self.loop_depth += 1;
                let body = Box::new(self.resolve_stmt(body));
                self.loop_depth -= 1;
                ResolvedStmt::While {
                    cond,
                    body,
                    span: stmt.span,
                }
            }

            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(ResolveErrorKind::JumpOutsideLoop("break"), stmt.span);
                }
                ResolvedStmt::Break(stmt.span)
            }

            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(ResolveErrorKind::JumpOutsideLoop("continue"), stmt.span);
                }
                ResolvedStmt::Continue(stmt.span)
            }

            StmtKind::Return(value) => {
                let value = value.as_ref().map(|e| self.resolve_expr(e));
                match (self.current_ret, &value) {
                    (Some(FuncType::Int), Some(v)) => self.expect_int(v),
                    (Some(FuncType::Int), None) => self.error(
                        ResolveErrorKind::TypeMismatch {
                            expected: "int".to_string(),
                            found: "void".to_string(),
                        },
                        stmt.span,
                    ),
                    (Some(FuncType::Void), Some(v)) if !v.is_error() => self.error(
                        ResolveErrorKind::TypeMismatch {
                            expected: "void".to_string(),
                            found: v.ty.to_string(),
                        },
                        v.span,
                    ),
                    _ => {}
                }
                ResolvedStmt::Return(value, stmt.span)
            }
        }
    }

    fn resolve_assign_target(&mut self, lval: &LVal) -> ResolvedLVal {
        let indices = self.resolve_indices(&lval.indices);
        let name = &lval.name.name;

        let Some(symbol) = self.scopes.lookup(name).cloned() else {
            self.error(ResolveErrorKind::UndeclaredIdentifier(name.clone()), lval.name.span);
            return ResolvedLVal {
                name: name.clone(),
                storage: self.alloc.fresh_temp(),
                indices,
                span: lval.span,
            };
        };

        if symbol.is_const || symbol.value.is_constant() {
            self.error(ResolveErrorKind::AssignToConstant(name.clone()), lval.span);
        }

        let ty = self.index_type(&symbol.ty, indices.len(), lval.span);
        if !ty.is_int() {
            self.error(
                ResolveErrorKind::TypeMismatch {
                    expected: "int".to_string(),
                    found: ty.to_string(),
                },
                lval.span,
            );
        }

        let storage = match symbol.value {
            SymbolValue::Runtime(storage) => storage,
            SymbolValue::Constant(_) => self.alloc.fresh_temp(),
        };
        ResolvedLVal {
            name: name.clone(),
            storage,
            indices,
            span: lval.span,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn resolve_expr(&mut self, expr: &Expr) -> ResolvedExpr {
        match &expr.kind {
            ExprKind::IntLiteral(n) => ResolvedExpr::literal(narrow_literal(*n), expr.span),

            ExprKind::LVal(lval) => self.resolve_lval(lval),

            ExprKind::Unary(op, inner) => {
                let inner = self.resolve_expr(inner);
                self.expect_int(&inner);
                if let Some(v) = inner.as_constant() {
                    let folded = fold_unary(*op, v);
                    trace!("fold {}{} => {}", op, v, folded);
                    return ResolvedExpr::literal(folded, expr.span);
                }
                ResolvedExpr {
                    kind: ResolvedExprKind::Unary {
                        op: *op,
                        expr: Box::new(inner),
                    },
                    value: SymbolValue::Runtime(self.alloc.fresh_temp()),
                    ty: Type::Int,
                    span: expr.span,
                }
            }

            ExprKind::Binary(left, op, right) => {
                let left = self.resolve_expr(left);
                let skipped = match (op, left.as_constant()) {
                    (BinOp::And, Some(0)) => true,
                    (BinOp::Or, Some(v)) => v != 0,
                    _ => false,
                };
                if skipped {
                    self.unevaluated += 1;
                }
                let right = self.resolve_expr(right);
                if skipped {
                    self.unevaluated -= 1;
                }
                self.expect_int(&left);
                self.expect_int(&right);
                match fold_symbols(*op, &left.value, &right.value) {
                    Ok(Some(folded)) => {
                        trace!("fold {} {} {} => {}", left.value, op, right.value, folded);
                        ResolvedExpr::literal(folded, expr.span)
                    }
                    Ok(None) => ResolvedExpr {
                        kind: ResolvedExprKind::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        value: SymbolValue::Runtime(self.alloc.fresh_temp()),
                        ty: Type::Int,
                        span: expr.span,
                    },
                    Err(FoldError::DivisionByZero) => {
                        if self.unevaluated == 0 {
                            self.error(ResolveErrorKind::DivisionByZero, expr.span);
                        }
                        ResolvedExpr::literal(0, expr.span)
                    }
                }
            }

            ExprKind::Call(callee, args) => self.resolve_call(callee, args, expr.span),
        }
    }

    fn resolve_indices(&mut self, indices: &[Expr]) -> Vec<ResolvedExpr> {
        let mut resolved = Vec::with_capacity(indices.len());
        for index in indices {
            let index = self.resolve_expr(index);
            self.expect_int(&index);
            resolved.push(index);
        }
        resolved
    }

    /// Type left after applying `count` subscripts to `ty`
    fn index_type(&mut self, ty: &Type, count: usize, span: Span) -> Type {
        let mut current = ty.clone();
        for _ in 0..count {
            match current.index() {
                Some(next) => current = next,
                None => {
                    self.error(
                        ResolveErrorKind::TypeMismatch {
                            expected: "array".to_string(),
                            found: current.to_string(),
                        },
                        span,
                    );
                    return Type::Int;
                }
            }
        }
        current
    }

    fn resolve_lval(&mut self, lval: &LVal) -> ResolvedExpr {
        let indices = self.resolve_indices(&lval.indices);
        let name = &lval.name.name;

        let Some(symbol) = self.scopes.lookup(name).cloned() else {
            self.error(ResolveErrorKind::UndeclaredIdentifier(name.clone()), lval.name.span);
            return ResolvedExpr {
                kind: ResolvedExprKind::Error,
                value: SymbolValue::Runtime(self.alloc.fresh_temp()),
                ty: Type::Int,
                span: lval.span,
            };
        };

        if indices.is_empty() {
            return match symbol.value {
                SymbolValue::Constant(n) => ResolvedExpr::literal(n, lval.span),
                SymbolValue::Runtime(storage) => ResolvedExpr {
                    kind: ResolvedExprKind::Var { name: name.clone() },
                    value: SymbolValue::Runtime(storage),
                    ty: symbol.ty,
                    span: lval.span,
                },
            };
        }

        let ty = self.index_type(&symbol.ty, indices.len(), lval.span);
        let storage = match symbol.value {
            SymbolValue::Runtime(storage) => storage,
            SymbolValue::Constant(_) => self.alloc.fresh_temp(),
        };
        ResolvedExpr {
            kind: ResolvedExprKind::Index {
                name: name.clone(),
                storage,
                indices,
            },
            value: SymbolValue::Runtime(self.alloc.fresh_temp()),
            ty,
            span: lval.span,
        }
    }

    fn resolve_call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> ResolvedExpr {
        let args: Vec<_> = args.iter().map(|a| self.resolve_expr(a)).collect();
        let value = SymbolValue::Runtime(self.alloc.fresh_temp());

        let Some(sig) = self.funcs.get(&callee.name).cloned() else {
            self.error(ResolveErrorKind::UndeclaredFunction(callee.name.clone()), callee.span);
            return ResolvedExpr {
                kind: ResolvedExprKind::Call {
                    callee: callee.name.clone(),
                    signature: None,
                    args,
                },
                value,
                ty: Type::Int,
                span,
            };
        };

        let ty = match sig.ret {
            FuncType::Int => Type::Int,
            FuncType::Void => Type::Void,
        };

        let signature = if args.len() != sig.arity() {
            self.error(
                ResolveErrorKind::ArityMismatch {
                    name: callee.name.clone(),
                    expected: sig.arity(),
                    found: args.len(),
                },
                span,
            );
            None
        } else {
            for (arg, param) in args.iter().zip(&sig.params) {
                self.check_argument(arg, &param.ty);
            }
            Some(sig)
        };

        ResolvedExpr {
            kind: ResolvedExprKind::Call {
                callee: callee.name.clone(),
                signature,
                args,
            },
            value,
            ty,
            span,
        }
    }

    fn check_argument(&mut self, arg: &ResolvedExpr, expected: &Type) {
        if arg.is_error() {
            return;
        }
        let matches = match expected {
            Type::Pointer(_) => arg.ty.decay() == *expected,
            other => arg.ty == *other,
        };
        if !matches {
            self.error(
                ResolveErrorKind::TypeMismatch {
                    expected: expected.to_string(),
                    found: arg.ty.to_string(),
                },
                arg.span,
            );
        }
    }
}

/// Whether any statement in `items` assigns to `name`. Shadowing is
/// ignored, so an inner `name` being written also counts.
fn is_assigned_in(name: &str, items: &[BlockItem]) -> bool {
    items.iter().any(|item| match item {
        BlockItem::Decl(_) => false,
        BlockItem::Stmt(stmt) => stmt_assigns(name, stmt),
    })
}

fn stmt_assigns(name: &str, stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Assign(target, _) => target.name.name == name,
        StmtKind::Block(block) => is_assigned_in(name, &block.items),
        StmtKind::If(_, then_branch, else_branch) => {
            stmt_assigns(name, then_branch) || else_branch.as_ref().is_some_and(|s| stmt_assigns(name, s))
        }
        StmtKind::While(_, body) => stmt_assigns(name, body),
        StmtKind::Expr(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Return(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysy_parser::Parser;

    fn run_with(source: &str, config: ResolverConfig) -> Resolution {
        let unit = Parser::parse(source).unwrap();
        Resolver::with_config(config).run(unit)
    }

    fn run(source: &str) -> Resolution {
        run_with(source, ResolverConfig::default())
    }

    fn kinds(res: &Resolution) -> Vec<ResolveErrorKind> {
        res.errors.iter().map(|e| e.kind.clone()).collect()
    }

    fn body<'a>(res: &'a Resolution, name: &str) -> &'a [ResolvedStmt] {
        &res.program.function(name).unwrap().body.stmts
    }

    fn decl(stmt: &ResolvedStmt) -> &ResolvedDef {
        match stmt {
            ResolvedStmt::Decl(defs) => &defs[0],
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    fn returned(stmt: &ResolvedStmt) -> &ResolvedExpr {
        match stmt {
            ResolvedStmt::Return(Some(e), _) => e,
            other => panic!("expected return with value, got {:?}", other),
        }
    }

    fn mismatch(expected: &str, found: &str) -> ResolveErrorKind {
        ResolveErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    #[test]
    fn test_shadowing_and_folding() {
        let res = run(r#"
            int main() {
                int a = 1 + 2;
                {
                    int a = a + 1;
                    putint(a);
                }
                return a;
            }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);

        let stmts = body(&res, "main");
        assert_eq!(decl(&stmts[0]).value, SymbolValue::Constant(3));

        let ResolvedStmt::Block(inner) = &stmts[1] else {
            panic!("expected block");
        };
        assert_eq!(decl(&inner.stmts[0]).value, SymbolValue::Constant(4));
        let ResolvedStmt::Expr(Some(call)) = &inner.stmts[1] else {
            panic!("expected call statement");
        };
        let ResolvedExprKind::Call { args, signature, .. } = &call.kind else {
            panic!("expected call");
        };
        assert!(signature.as_ref().is_some_and(|s| s.builtin));
        assert_eq!(args[0].as_constant(), Some(4));
        assert_eq!(call.ty, Type::Void);

        let ret = returned(&stmts[2]);
        assert!(matches!(ret.kind, ResolvedExprKind::Literal));
        assert_eq!(ret.as_constant(), Some(3));
    }

    #[test]
    fn test_call_annotated_with_signature() {
        let res = run(r#"
            int add(int x, int y) { return x + y; }
            int main() { return add(2, 3); }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);

        let add = res.program.function("add").unwrap();
        let ret = returned(&add.body.stmts[0]);
        let ResolvedExprKind::Binary { left, right, .. } = &ret.kind else {
            panic!("expected runtime addition");
        };
        assert_eq!(left.value.as_runtime(), Some(add.signature.params[0].ident.as_str()));
        assert_eq!(right.value.as_runtime(), Some(add.signature.params[1].ident.as_str()));

        let call = returned(&body(&res, "main")[0]);
        let ResolvedExprKind::Call { callee, signature, args } = &call.kind else {
            panic!("expected call");
        };
        assert_eq!(callee, "add");
        assert_eq!(signature.as_ref(), Some(&add.signature));
        let args: Vec<_> = args.iter().map(ResolvedExpr::as_constant).collect();
        assert_eq!(args, [Some(2), Some(3)]);
    }

    #[test]
    fn test_arity_mismatch() {
        let res = run(r#"
            int add(int x, int y) { return x + y; }
            int main() { return add(2); }
        "#);
        assert_eq!(
            kinds(&res),
            [ResolveErrorKind::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
            }]
        );

        let call = returned(&body(&res, "main")[0]);
        assert!(matches!(call.kind, ResolvedExprKind::Call { signature: None, .. }));
    }

    #[test]
    fn test_undeclared_function_reported_once() {
        let res = run("int main() { foo(); return 0; }");
        assert_eq!(kinds(&res), [ResolveErrorKind::UndeclaredFunction("foo".to_string())]);
    }

    #[test]
    fn test_const_requires_constant_initializer() {
        let res = run(r#"
            int main() {
                int v = getint();
                const int x = v + 1;
                return 0;
            }
        "#);
        assert_eq!(kinds(&res), [ResolveErrorKind::NonConstantInitializer("x".to_string())]);
        let ResolvedStmt::Decl(defs) = &body(&res, "main")[1] else {
            panic!("expected declaration");
        };
        assert!(defs.is_empty());
    }

    #[test]
    fn test_rejected_const_stays_unbound() {
        let res = run(r#"
            int main() {
                int v = getint();
                const int x = v;
                return x;
            }
        "#);
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::NonConstantInitializer("x".to_string()),
                ResolveErrorKind::UndeclaredIdentifier("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_only_within_one_scope() {
        let res = run("int main() { int a; int a; { int a; } return 0; }");
        assert_eq!(kinds(&res), [ResolveErrorKind::DuplicateDeclaration("a".to_string())]);
    }

    #[test]
    fn test_parameters_share_the_body_scope() {
        let res = run(r#"
            int f(int x, int x) { return x; }
            int g(int y) { int y; return y; }
            int main() { return 0; }
        "#);
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::DuplicateDeclaration("x".to_string()),
                ResolveErrorKind::DuplicateDeclaration("y".to_string()),
            ]
        );
    }

    #[test]
    fn test_reassigned_variable_is_runtime() {
        let res = run(r#"
            int main() {
                int a = 1;
                while (a) {
                    a = a - 1;
                }
                return a;
            }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);

        let stmts = body(&res, "main");
        let a = decl(&stmts[0]);
        let storage = a.value.as_runtime().unwrap();
        assert!(matches!(&a.init, Some(ResolvedInit::Scalar(e)) if e.as_constant() == Some(1)));

        let ResolvedStmt::While { body: loop_body, .. } = &stmts[1] else {
            panic!("expected while");
        };
        let ResolvedStmt::Block(block) = loop_body.as_ref() else {
            panic!("expected block");
        };
        let ResolvedStmt::Assign { target, .. } = &block.stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(target.storage, storage);

        assert_eq!(returned(&stmts[2]).value.as_runtime(), Some(storage));
    }

    #[test]
    fn test_globals() {
        let res = run(r#"
            const int N = 2 * 3;
            int g = N + 1;
            int arr[N] = {1, 2};
            int main() { return N + g; }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);

        let n = res.program.global("N").unwrap();
        assert!(n.is_const);
        assert_eq!(n.value, SymbolValue::Constant(6));

        let g = res.program.global("g").unwrap();
        assert!(g.value.as_runtime().is_some());
        assert!(matches!(&g.init, Some(ResolvedInit::Scalar(e)) if e.as_constant() == Some(7)));

        let arr = res.program.global("arr").unwrap();
        assert_eq!(arr.ty, Type::Array(vec![6]));
        let Some(ResolvedInit::Aggregate(elems)) = &arr.init else {
            panic!("expected aggregate initializer");
        };
        let elems: Vec<_> = elems.iter().filter_map(ResolvedExpr::as_constant).collect();
        assert_eq!(elems, [1, 2, 0, 0, 0, 0]);

        let ret = returned(&body(&res, "main")[0]);
        let ResolvedExprKind::Binary { left, right, .. } = &ret.kind else {
            panic!("expected runtime addition");
        };
        assert_eq!(left.as_constant(), Some(6));
        assert_eq!(right.value, g.value);
    }

    #[test]
    fn test_global_initializer_must_be_constant() {
        let res = run("int a = getint(); int main() { return a; }");
        assert_eq!(kinds(&res), [ResolveErrorKind::NonConstantInitializer("a".to_string())]);
        // still bound, so the use in main resolves
        assert!(res.program.global("a").is_some());
    }

    #[test]
    fn test_forward_references() {
        let source = r#"
            int main() { return helper(1); }
            int helper(int x) { return x; }
        "#;
        assert!(run(source).is_ok());

        let config = ResolverConfig {
            forward_references: false,
            ..ResolverConfig::default()
        };
        let res = run_with(source, config);
        assert_eq!(kinds(&res), [ResolveErrorKind::UndeclaredFunction("helper".to_string())]);
    }

    #[test]
    fn test_bodies_only_see_earlier_globals() {
        let res = run(r#"
            int main() { return later; }
            int later = 1;
        "#);
        assert_eq!(kinds(&res), [ResolveErrorKind::UndeclaredIdentifier("later".to_string())]);
    }

    #[test]
    fn test_recursion_without_forward_references() {
        let config = ResolverConfig {
            forward_references: false,
            ..ResolverConfig::default()
        };
        let res = run_with(
            r#"
            int f(int n) {
                if (n) return f(n - 1);
                return 0;
            }
            int main() { return f(3); }
            "#,
            config,
        );
        assert!(res.is_ok(), "{:?}", res.errors);
    }

    #[test]
    fn test_duplicate_functions() {
        let res = run(r#"
            int f() { return 0; }
            int f() { return 1; }
            int getint() { return 0; }
            int main() { return 0; }
        "#);
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::DuplicateFunction("f".to_string()),
                ResolveErrorKind::DuplicateFunction("getint".to_string()),
            ]
        );
        let names: Vec<_> = res.program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["f", "main"]);
    }

    #[test]
    fn test_without_runtime_library() {
        let config = ResolverConfig {
            runtime_library: false,
            ..ResolverConfig::default()
        };
        let res = run_with("int main() { putint(1); return 0; }", config);
        assert_eq!(kinds(&res), [ResolveErrorKind::UndeclaredFunction("putint".to_string())]);
        assert_eq!(res.program.signatures.len(), 1);
    }

    #[test]
    fn test_type_mismatches() {
        let res = run(r#"
            void p() {}
            int sum(int a[], int n) { return a[0] + n; }
            int main() {
                int arr[2][3];
                int x = p();
                sum(arr[1], 3);
                sum(arr, 3);
                sum(1, 3);
                arr[0] = 1;
                x[0] = 1;
                return;
            }
        "#);
        assert_eq!(
            kinds(&res),
            [
                mismatch("int", "void"),
                mismatch("int[]", "int[2][3]"),
                mismatch("int[]", "int"),
                mismatch("int", "int[3]"),
                mismatch("array", "int"),
                mismatch("int", "void"),
            ]
        );
    }

    #[test]
    fn test_void_function_returning_value() {
        let res = run("void f() { return 1; } int main() { f(); return 0; }");
        assert_eq!(kinds(&res), [mismatch("void", "int")]);
    }

    #[test]
    fn test_assign_to_constant_and_stray_jumps() {
        let res = run(r#"
            const int c = 1;
            int main() {
                c = 2;
                break;
                while (1) { continue; }
                return 0;
            }
        "#);
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::AssignToConstant("c".to_string()),
                ResolveErrorKind::JumpOutsideLoop("break"),
            ]
        );
    }

    #[test]
    fn test_division_by_zero_in_constant() {
        let res = run("const int z = 1 / 0; int main() { return z; }");
        assert_eq!(kinds(&res), [ResolveErrorKind::DivisionByZero]);
        assert_eq!(res.program.global("z").unwrap().value, SymbolValue::Constant(0));
    }

    #[test]
    fn test_unevaluated_operand_skips_division_by_zero() {
        let res = run(r#"
            const int c = 0 && (1 / 0);
            const int d = 1 || (1 % 0);
            int main() { return c + d; }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);
        assert_eq!(res.program.global("c").unwrap().value, SymbolValue::Constant(0));
        assert_eq!(res.program.global("d").unwrap().value, SymbolValue::Constant(1));

        // evaluated right-hand sides still divide
        let res = run("const int e = 1 && (1 / 0); const int f = 0 || (2 % 0); int main() { return e + f; }");
        assert_eq!(
            kinds(&res),
            [ResolveErrorKind::DivisionByZero, ResolveErrorKind::DivisionByZero]
        );
    }

    #[test]
    fn test_oversized_array_reported_not_allocated() {
        let res = run(r#"
            int a[65536][65536][65536][65536] = {1};
            int b[2147483647][4] = {};
            int main() { return 0; }
        "#);
        let too_large = |name: &str| ResolveErrorKind::ArrayTooLarge {
            name: name.to_string(),
            limit: MAX_ARRAY_ELEMENTS,
        };
        assert_eq!(kinds(&res), [too_large("a"), too_large("b")]);

        let a = res.program.global("a").unwrap();
        assert_eq!(a.ty, Type::Array(vec![65536, 65536, 65536, 65536]));
        assert!(a.init.is_none());
        assert!(res.program.global("b").unwrap().init.is_none());
    }

    #[test]
    fn test_oversized_const_array_rejected() {
        let res = run("int main() { const int t[4096][4096][2] = {}; return 0; }");
        assert_eq!(
            kinds(&res),
            [ResolveErrorKind::ArrayTooLarge {
                name: "t".to_string(),
                limit: MAX_ARRAY_ELEMENTS,
            }]
        );
    }

    #[test]
    fn test_dimension_errors() {
        let res = run(r#"
            int main() {
                int n = getint();
                int a[n];
                int b[0];
                return 0;
            }
        "#);
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::NonConstantDimension("a".to_string()),
                ResolveErrorKind::InvalidDimension {
                    name: "b".to_string(),
                    value: 0,
                },
            ]
        );
    }

    #[test]
    fn test_initializer_errors() {
        let res = run(r#"
            int main() {
                int a[2] = {1, 2, 3};
                int s = {1};
                const int c;
                return 0;
            }
        "#);
        let names: Vec<_> = res
            .errors
            .iter()
            .map(|e| match &e.kind {
                ResolveErrorKind::InvalidInitializer { name, .. } => name.as_str(),
                other => panic!("unexpected error {}", other),
            })
            .collect();
        assert_eq!(names, ["a", "s", "c"]);
    }

    #[test]
    fn test_const_array_needs_constant_elements() {
        let res = run(r#"
            int main() {
                int v = getint();
                const int a[2] = {1, v};
                const int b[2][2] = {{1}, {2, 3}};
                return b[1][0];
            }
        "#);
        assert_eq!(kinds(&res), [ResolveErrorKind::NonConstantInitializer("a".to_string())]);

        let ret = returned(&body(&res, "main")[3]);
        assert!(matches!(ret.kind, ResolvedExprKind::Index { .. }));
        assert_eq!(ret.ty, Type::Int);
    }

    #[test]
    fn test_undeclared_identifier_does_not_cascade() {
        let res = run("int main() { int a = b + 1; return a + c; }");
        assert_eq!(
            kinds(&res),
            [
                ResolveErrorKind::UndeclaredIdentifier("b".to_string()),
                ResolveErrorKind::UndeclaredIdentifier("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_literals_wrap_to_i32() {
        let res = run(r#"
            const int m = -2147483648;
            const int o = 2147483647 + 1;
            int main() { return 0; }
        "#);
        assert!(res.is_ok(), "{:?}", res.errors);
        assert_eq!(res.program.global("m").unwrap().value, SymbolValue::Constant(i32::MIN));
        assert_eq!(res.program.global("o").unwrap().value, SymbolValue::Constant(i32::MIN));
    }

    #[test]
    fn test_short_circuit_folds_when_both_sides_constant() {
        let res = run("int main() { int v = getint(); return (0 && 1) + (2 || 0) + (0 && v); }");
        assert!(res.is_ok(), "{:?}", res.errors);

        let ret = returned(&body(&res, "main")[1]);
        let ResolvedExprKind::Binary { left, right, .. } = &ret.kind else {
            panic!("expected runtime addition");
        };
        assert_eq!(left.as_constant(), Some(1));
        assert!(matches!(right.kind, ResolvedExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let unit = Parser::parse(
            r#"
            int g[3] = {1, 2};
            int main() { int i = getint(); g[i] = g[0] + i; return g[i]; }
            "#,
        )
        .unwrap();
        let first = Resolver::new().run(unit.clone());
        let second = Resolver::new().run(unit);
        assert!(first.is_ok());
        assert_eq!(first.program.pretty_print(), second.program.pretty_print());
    }

    #[test]
    fn test_resolve_entry_point() {
        let unit = Parser::parse("int main() { return x; }").unwrap();
        let errors = Resolver::resolve(unit).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ResolveErrorKind::UndeclaredIdentifier("x".to_string()));
    }
}
