//! Resolution diagnostics

use sysy_lexer::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveErrorKind {
    #[error("'{0}' is already declared in this scope")]
    DuplicateDeclaration(String),
    #[error("use of undeclared identifier '{0}'")]
    UndeclaredIdentifier(String),
    #[error("call to undeclared function '{0}'")]
    UndeclaredFunction(String),
    #[error("function '{0}' is already defined")]
    DuplicateFunction(String),
    #[error("function '{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("initializer of '{0}' is not a compile-time constant")]
    NonConstantInitializer(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("cannot assign to constant '{0}'")]
    AssignToConstant(String),
    #[error("'{0}' outside of a loop")]
    JumpOutsideLoop(&'static str),
    #[error("array dimension of '{0}' is not a compile-time constant")]
    NonConstantDimension(String),
    #[error("array dimension of '{name}' must be positive, found {value}")]
    InvalidDimension { name: String, value: i32 },
    #[error("array '{name}' has more than {limit} elements")]
    ArrayTooLarge { name: String, limit: usize },
    #[error("invalid initializer for '{name}': {reason}")]
    InvalidInitializer { name: String, reason: String },
    #[error("division by zero in constant expression")]
    DivisionByZero,
}

/// A diagnostic tied to the source position of the offending node
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {}..{}", span.start, span.end)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Span,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}
