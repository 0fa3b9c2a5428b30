use sysy_ast::*;
use sysy_lexer::{Lexer, Span, SpannedToken, Token};
use thiserror::Error;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

#[derive(Debug, Clone, Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        let tokens = Lexer::tokenize(source).map_err(|e| ParseError {
            message: e.message,
            span: e.span,
        })?;
        Ok(Self { tokens, pos: 0 })
    }

    pub fn parse(source: &str) -> ParseResult<CompUnit> {
        let mut parser = Parser::new(source)?;
        parser.parse_comp_unit()
    }

    // === Token Access ===

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_nth(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn peek_span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) -> &SpannedToken {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<SpannedToken> {
        if self.check(&expected) {
            Ok(self.advance().clone())
        } else {
            Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, self.peek()),
                span: self.peek_span(),
            })
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Ident> {
        match self.peek().clone() {
            Token::Ident(name) => {
                let span = self.peek_span();
                self.advance();
                Ok(Ident::new(name, span))
            }
            _ => Err(ParseError {
                message: format!("expected identifier, found '{}'", self.peek()),
                span: self.peek_span(),
            }),
        }
    }

    // === Items ===

    fn parse_comp_unit(&mut self) -> ParseResult<CompUnit> {
        let mut items = Vec::new();

        while !self.is_at_end() {
            items.push(self.parse_item()?);
        }

        Ok(CompUnit { items })
    }

    fn parse_item(&mut self) -> ParseResult<Item> {
        match (self.peek(), self.peek_nth(1), self.peek_nth(2)) {
            (Token::Const, _, _) => self.parse_decl().map(Item::Decl),
            (Token::Void, _, _) => self.parse_func_def().map(Item::Function),
            (Token::Int, Token::Ident(_), Token::LParen) => {
                self.parse_func_def().map(Item::Function)
            }
            (Token::Int, _, _) => self.parse_decl().map(Item::Decl),
            _ => Err(ParseError {
                message: format!(
                    "expected declaration or function definition, found '{}'",
                    self.peek()
                ),
                span: self.peek_span(),
            }),
        }
    }

    fn parse_decl(&mut self) -> ParseResult<Decl> {
        let start = self.peek_span();
        let is_const = self.eat(&Token::Const);
        self.expect(Token::Int)?;

        let mut defs = vec![self.parse_var_def()?];
        while self.eat(&Token::Comma) {
            defs.push(self.parse_var_def()?);
        }

        let end = self.expect(Token::Semi)?;
        Ok(Decl {
            is_const,
            defs,
            span: start.to(end.span),
        })
    }

    fn parse_var_def(&mut self) -> ParseResult<VarDef> {
        let name = self.expect_ident()?;
        let mut span = name.span;

        let mut dims = Vec::new();
        while self.eat(&Token::LBracket) {
            dims.push(self.parse_expr()?);
            span = span.to(self.expect(Token::RBracket)?.span);
        }

        let init = if self.eat(&Token::Eq) {
            let init = self.parse_init_val()?;
            span = span.to(init.span());
            Some(init)
        } else {
            None
        };

        Ok(VarDef {
            name,
            dims,
            init,
            span,
        })
    }

    fn parse_init_val(&mut self) -> ParseResult<InitVal> {
        if !self.check(&Token::LBrace) {
            return self.parse_expr().map(InitVal::Expr);
        }

        let start = self.advance().span;
        let mut items = Vec::new();

        if !self.check(&Token::RBrace) {
            items.push(self.parse_init_val()?);
            while self.eat(&Token::Comma) {
                items.push(self.parse_init_val()?);
            }
        }

        let end = self.expect(Token::RBrace)?;
        Ok(InitVal::List(items, start.to(end.span)))
    }

    fn parse_func_def(&mut self) -> ParseResult<FuncDef> {
        let start = self.peek_span();
        let ret = match self.peek() {
            Token::Int => FuncType::Int,
            Token::Void => FuncType::Void,
            _ => {
                return Err(ParseError {
                    message: format!("expected return type, found '{}'", self.peek()),
                    span: start,
                });
            }
        };
        self.advance();

        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            params.push(self.parse_param()?);
            while self.eat(&Token::Comma) {
                params.push(self.parse_param()?);
            }
        }
        self.expect(Token::RParen)?;

        let body = self.parse_block()?;
        let span = start.to(body.span);

        Ok(FuncDef {
            ret,
            name,
            params,
            body,
            span,
        })
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        let start = self.expect(Token::Int)?.span;
        let name = self.expect_ident()?;
        let mut span = start.to(name.span);

        let array_dims = if self.eat(&Token::LBracket) {
            span = span.to(self.expect(Token::RBracket)?.span);
            let mut dims = Vec::new();
            while self.eat(&Token::LBracket) {
                dims.push(self.parse_expr()?);
                span = span.to(self.expect(Token::RBracket)?.span);
            }
            Some(dims)
        } else {
            None
        };

        Ok(Param {
            name,
            array_dims,
            span,
        })
    }

    // === Statements ===

    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.peek_span();
        self.expect(Token::LBrace)?;

        let mut items = Vec::new();

        while !self.check(&Token::RBrace) && !self.is_at_end() {
            let item = match self.peek() {
                Token::Const | Token::Int => BlockItem::Decl(self.parse_decl()?),
                _ => BlockItem::Stmt(self.parse_stmt()?),
            };
            items.push(item);
        }

        let end = self.expect(Token::RBrace)?;
        Ok(Block {
            items,
            span: start.to(end.span),
        })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.peek_span();

        let kind = match self.peek() {
            Token::LBrace => StmtKind::Block(self.parse_block()?),
            Token::Semi => {
                self.advance();
                StmtKind::Expr(None)
            }
            Token::If => {
                self.advance();
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let then_stmt = Box::new(self.parse_stmt()?);
                let else_stmt = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                StmtKind::If(cond, then_stmt, else_stmt)
            }
            Token::While => {
                self.advance();
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                StmtKind::While(cond, Box::new(self.parse_stmt()?))
            }
            Token::Break => {
                self.advance();
                self.expect(Token::Semi)?;
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                self.expect(Token::Semi)?;
                StmtKind::Continue
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(Token::Semi)?;
                StmtKind::Return(value)
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.check(&Token::Eq) {
                    let eq_span = self.peek_span();
                    let ExprKind::LVal(target) = expr.kind else {
                        return Err(ParseError {
                            message: "left side of assignment is not assignable".to_string(),
                            span: expr.span.to(eq_span),
                        });
                    };
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(Token::Semi)?;
                    StmtKind::Assign(target, value)
                } else {
                    self.expect(Token::Semi)?;
                    StmtKind::Expr(Some(expr))
                }
            }
        };

        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(Stmt {
            kind,
            span: start.to(end),
        })
    }

    // === Expression Parsing (precedence climbing) ===

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.advance(); // consume operator
            let right = self.parse_binary(prec + 1)?;

            let span = left.span.to(right.span);
            left = Expr {
                kind: ExprKind::Binary(Box::new(left), op, Box::new(right)),
                span,
            };
        }

        Ok(left)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.peek() {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Mod),
            Token::EqEq => Some(BinOp::Eq),
            Token::NotEq => Some(BinOp::NotEq),
            Token::Lt => Some(BinOp::Lt),
            Token::Gt => Some(BinOp::Gt),
            Token::LtEq => Some(BinOp::LtEq),
            Token::GtEq => Some(BinOp::GtEq),
            Token::AndAnd => Some(BinOp::And),
            Token::OrOr => Some(BinOp::Or),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.peek_span();

        let op = match self.peek() {
            Token::Plus => UnaryOp::Pos,
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            _ => return self.parse_primary(),
        };

        self.advance();
        let expr = self.parse_unary()?;
        let span = start.to(expr.span);
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(expr)),
            span,
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.peek_span();

        match self.peek().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::IntLiteral(n),
                    span: start,
                })
            }
            Token::Ident(name) => {
                self.advance();
                let ident = Ident::new(name, start);

                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        args.push(self.parse_expr()?);
                        while self.eat(&Token::Comma) {
                            args.push(self.parse_expr()?);
                        }
                    }
                    let end = self.expect(Token::RParen)?;
                    return Ok(Expr {
                        kind: ExprKind::Call(ident, args),
                        span: start.to(end.span),
                    });
                }

                let mut indices = Vec::new();
                let mut span = start;
                while self.eat(&Token::LBracket) {
                    indices.push(self.parse_expr()?);
                    span = span.to(self.expect(Token::RBracket)?.span);
                }

                Ok(Expr {
                    kind: ExprKind::LVal(LVal {
                        name: ident,
                        indices,
                        span,
                    }),
                    span,
                })
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(ParseError {
                message: format!("expected expression, found '{}'", self.peek()),
                span: start,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main() {
        let source = "int main() { return 0; }";
        let ast = Parser::parse(source).unwrap();
        assert_eq!(ast.items.len(), 1);
        let Item::Function(f) = &ast.items[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name.name, "main");
        assert_eq!(f.ret, FuncType::Int);
        assert_eq!(f.body.items.len(), 1);
    }

    #[test]
    fn test_parse_globals_and_functions() {
        let source = "const int N = 10, M = N * 2; int g[N][2]; void f(int a[], int b[][3], int c) {}";
        let ast = Parser::parse(source).unwrap();
        assert_eq!(ast.items.len(), 3);

        let Item::Decl(d) = &ast.items[0] else {
            panic!("expected declaration");
        };
        assert!(d.is_const);
        assert_eq!(d.defs.len(), 2);

        let Item::Decl(g) = &ast.items[1] else {
            panic!("expected declaration");
        };
        assert_eq!(g.defs[0].dims.len(), 2);

        let Item::Function(f) = &ast.items[2] else {
            panic!("expected function");
        };
        assert_eq!(f.ret, FuncType::Void);
        assert_eq!(f.params[0].array_dims.as_ref().map(Vec::len), Some(0));
        assert_eq!(f.params[1].array_dims.as_ref().map(Vec::len), Some(1));
        assert!(f.params[2].array_dims.is_none());
    }

    #[test]
    fn test_parse_nested_initializer() {
        let source = "int a[2][2] = {{1, 2}, {}, 3};";
        let ast = Parser::parse(source).unwrap();
        let Item::Decl(d) = &ast.items[0] else {
            panic!("expected declaration");
        };
        let Some(InitVal::List(items, _)) = &d.defs[0].init else {
            panic!("expected aggregate initializer");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[1], InitVal::List(inner, _) if inner.is_empty()));
        assert!(matches!(&items[2], InitVal::Expr(_)));
    }

    #[test]
    fn test_precedence() {
        let mut parser = Parser::new("1 + 2 * 3 < 4 || !x && y").unwrap();
        let expr = parser.parse_expr().unwrap();
        assert_eq!(expr.pretty_print(), "(((1 + (2 * 3)) < 4) || (!x && y))");
    }

    #[test]
    fn test_assignment_and_statements() {
        let source = "int main() { int a; a = 1; a; ; while (a) { if (a) break; else continue; } return; }";
        let ast = Parser::parse(source).unwrap();
        let Item::Function(f) = &ast.items[0] else {
            panic!("expected function");
        };
        let kinds: Vec<_> = f
            .body
            .items
            .iter()
            .map(|item| match item {
                BlockItem::Decl(_) => "decl",
                BlockItem::Stmt(s) => match &s.kind {
                    StmtKind::Assign(..) => "assign",
                    StmtKind::Expr(Some(_)) => "expr",
                    StmtKind::Expr(None) => "empty",
                    StmtKind::While(..) => "while",
                    StmtKind::Return(None) => "return",
                    _ => "other",
                },
            })
            .collect();
        assert_eq!(kinds, ["decl", "assign", "expr", "empty", "while", "return"]);
    }

    #[test]
    fn test_assign_to_non_lvalue_is_error() {
        let err = Parser::parse("int main() { 1 = 2; }").unwrap_err();
        assert!(err.message.contains("not assignable"));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = Parser::parse("int a = 1").unwrap_err();
        assert!(err.message.contains("expected ';'"));
    }
}
