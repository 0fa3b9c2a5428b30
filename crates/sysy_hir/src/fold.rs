//! Constant folding over 32-bit two's-complement integers.
//!
//! Every operation wraps on overflow, including literals that do not fit
//! in `int` (so `-2147483648` folds to `i32::MIN`).

use sysy_ast::{BinOp, UnaryOp};
use thiserror::Error;

use crate::symbol::SymbolValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FoldError {
    #[error("division by zero in constant expression")]
    DivisionByZero,
}

/// Narrow a lexed literal to `int`
pub fn narrow_literal(n: i64) -> i32 {
    n as i32
}

pub fn fold_unary(op: UnaryOp, value: i32) -> i32 {
    match op {
        UnaryOp::Pos => value,
        UnaryOp::Neg => value.wrapping_neg(),
        UnaryOp::Not => (value == 0) as i32,
    }
}

pub fn fold_binary(op: BinOp, lhs: i32, rhs: i32) -> Result<i32, FoldError> {
    let value = match op {
        BinOp::Add => lhs.wrapping_add(rhs),
        BinOp::Sub => lhs.wrapping_sub(rhs),
        BinOp::Mul => lhs.wrapping_mul(rhs),
        BinOp::Div | BinOp::Mod if rhs == 0 => return Err(FoldError::DivisionByZero),
        BinOp::Div => lhs.wrapping_div(rhs),
        BinOp::Mod => lhs.wrapping_rem(rhs),
        BinOp::Eq => (lhs == rhs) as i32,
        BinOp::NotEq => (lhs != rhs) as i32,
        BinOp::Lt => (lhs < rhs) as i32,
        BinOp::Gt => (lhs > rhs) as i32,
        BinOp::LtEq => (lhs <= rhs) as i32,
        BinOp::GtEq => (lhs >= rhs) as i32,
        BinOp::And => (lhs != 0 && rhs != 0) as i32,
        BinOp::Or => (lhs != 0 || rhs != 0) as i32,
    };
    Ok(value)
}

/// Fold a binary operation over symbol values.
///
/// `Ok(None)` when either side is only known at runtime.
pub fn fold_symbols(
    op: BinOp,
    lhs: &SymbolValue,
    rhs: &SymbolValue,
) -> Result<Option<i32>, FoldError> {
    match (lhs.as_constant(), rhs.as_constant()) {
        (Some(l), Some(r)) => fold_binary(op, l, r).map(Some),
        _ => Ok(None),
    }
}
