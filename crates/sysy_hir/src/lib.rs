//! HIR (High-level Intermediate Representation) and Name Resolution
//!
//! This crate transforms the SysY AST into HIR by:
//! 1. Resolving every identifier through a stack of lexical scopes
//! 2. Folding constant expressions into literals
//! 3. Collecting function signatures and checking every call against them
//! 4. Reporting duplicate, undeclared and ill-typed uses

mod config;
mod error;
mod fold;
mod func;
mod hir;
mod ident;
mod init;
mod resolve;
mod scope;
mod symbol;

pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveErrorKind};
pub use fold::{fold_binary, fold_symbols, fold_unary, narrow_literal, FoldError};
pub use func::{FuncSignature, FuncTable, FuncTableError, ParamInfo};
pub use hir::*;
pub use ident::{CounterAllocator, IdentAllocator};
pub use init::{element_count, flatten, InitError, InitSlot, MAX_ARRAY_ELEMENTS};
pub use resolve::{Resolution, Resolver};
pub use scope::{ScopeError, ScopeGuard, ScopeStack, ScopeTable};
pub use symbol::{Symbol, SymbolValue, Type};
