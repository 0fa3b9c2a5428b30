//! Aggregate initializer normalization

use sysy_ast::{Expr, InitVal};
use sysy_lexer::Span;
use thiserror::Error;

/// One element of a flattened array initializer
#[derive(Debug, Clone, Copy)]
pub enum InitSlot<'a> {
    Expr(&'a Expr),
    /// Implicitly zero-filled
    Zero,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("array must be initialized with a braced list")]
    ScalarForArray(Span),
    #[error("braced list does not start on a sub-array boundary")]
    Misaligned(Span),
    #[error("too many initializers")]
    TooMany(Span),
}

impl InitError {
    pub fn span(&self) -> Span {
        match self {
            InitError::ScalarForArray(span)
            | InitError::Misaligned(span)
            | InitError::TooMany(span) => *span,
        }
    }
}

/// Largest element count an array may have
pub const MAX_ARRAY_ELEMENTS: usize = 1 << 24;

/// Number of elements in an array with `dims`, or `None` when the
/// product overflows or exceeds [`MAX_ARRAY_ELEMENTS`].
pub fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| n <= MAX_ARRAY_ELEMENTS)
}

/// Flatten `init` for an array with `dims` into row-major order,
/// padding with zeros to exactly `total` elements. `total` must come
/// from [`element_count`] for the same `dims`.
///
/// A nested list at flat position `p` fills the largest trailing
/// sub-array of `dims` whose size divides `p`.
pub fn flatten<'a>(init: &'a InitVal, dims: &[usize], total: usize) -> Result<Vec<InitSlot<'a>>, InitError> {
    match init {
        InitVal::Expr(e) => Err(InitError::ScalarForArray(e.span)),
        InitVal::List(items, _) => {
            let mut out = Vec::with_capacity(total);
            fill(items, dims, total, &mut out)?;
            Ok(out)
        }
    }
}

// every trailing product of `dims` is at most `total`, so none overflow
fn fill<'a>(
    items: &'a [InitVal],
    dims: &[usize],
    total: usize,
    out: &mut Vec<InitSlot<'a>>,
) -> Result<(), InitError> {
    let start = out.len();

    for item in items {
        let pos = out.len() - start;
        if pos >= total {
            return Err(InitError::TooMany(item.span()));
        }

        match item {
            InitVal::Expr(e) => out.push(InitSlot::Expr(e)),
            InitVal::List(sub, span) => {
                let (k, size) = (1..dims.len())
                    .map(|k| (k, dims[k..].iter().product::<usize>()))
                    .find(|&(_, size)| pos % size == 0)
                    .ok_or(InitError::Misaligned(*span))?;
                fill(sub, &dims[k..], size, out)?;
            }
        }
    }

    out.resize_with(start + total, || InitSlot::Zero);
    Ok(())
}
