use logos::Logos;
use thiserror::Error;

/// Span in source code (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A token with its span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

fn parse_radix(slice: &str, radix: u32) -> Option<i64> {
    i64::from_str_radix(slice, radix).ok()
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // === Keywords ===
    #[token("const")]
    Const,
    #[token("int")]
    Int,
    #[token("void")]
    Void,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,

    // === Literals ===
    // Values are kept wide here; narrowing to `int` happens during folding.
    #[regex(r"[1-9][0-9]*", |lex| parse_radix(lex.slice(), 10))]
    #[regex(r"0[0-7]*", |lex| parse_radix(lex.slice(), 8))]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| parse_radix(&lex.slice()[2..], 16))]
    IntLiteral(i64),

    // === Identifiers ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // === Punctuation ===
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // === Special ===
    Eof,
}

impl Token {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Const
                | Token::Int
                | Token::Void
                | Token::If
                | Token::Else
                | Token::While
                | Token::Break
                | Token::Continue
                | Token::Return
        )
    }

    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Eq
                | Token::EqEq
                | Token::NotEq
                | Token::Lt
                | Token::Gt
                | Token::LtEq
                | Token::GtEq
                | Token::AndAnd
                | Token::OrOr
                | Token::Not
        )
    }

    pub fn is_delimiter(&self) -> bool {
        matches!(
            self,
            Token::LParen
                | Token::RParen
                | Token::LBrace
                | Token::RBrace
                | Token::LBracket
                | Token::RBracket
                | Token::Comma
                | Token::Semi
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Const => write!(f, "const"),
            Token::Int => write!(f, "int"),
            Token::Void => write!(f, "void"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Return => write!(f, "return"),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer wrapper that produces SpannedTokens
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Token>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: Token::lexer(source),
            finished: false,
        }
    }

    /// Tokenize the entire source into a Vec, ending with `Token::Eof`
    pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();

        loop {
            let spanned = lexer.next_token()?;
            let is_eof = spanned.token == Token::Eof;
            tokens.push(spanned);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        if self.finished {
            let len = self.inner.source().len();
            return Ok(SpannedToken {
                token: Token::Eof,
                span: Span::new(len, len),
            });
        }

        match self.inner.next() {
            Some(Ok(token)) => {
                let span = self.inner.span();
                Ok(SpannedToken {
                    token,
                    span: Span::new(span.start, span.end),
                })
            }
            Some(Err(())) => {
                let span = self.inner.span();
                Err(LexError {
                    message: format!("unexpected input: '{}'", self.inner.slice()),
                    span: Span::new(span.start, span.end),
                })
            }
            None => {
                self.finished = true;
                let len = self.inner.source().len();
                Ok(SpannedToken {
                    token: Token::Eof,
                    span: Span::new(len, len),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}
