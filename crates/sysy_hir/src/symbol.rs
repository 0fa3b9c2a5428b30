//! Symbol values and the value types they carry

use std::fmt;

/// What a name is bound to.
///
/// A `Constant` is fully known at its declaration and never changes. A
/// `Runtime` holds an identifier minted by an [`IdentAllocator`](crate::IdentAllocator);
/// the storage behind it belongs to the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolValue {
    Constant(i32),
    Runtime(String),
}

impl SymbolValue {
    pub fn as_constant(&self) -> Option<i32> {
        match self {
            SymbolValue::Constant(n) => Some(*n),
            SymbolValue::Runtime(_) => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&str> {
        match self {
            SymbolValue::Constant(_) => None,
            SymbolValue::Runtime(ident) => Some(ident),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, SymbolValue::Constant(_))
    }
}

impl fmt::Display for SymbolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolValue::Constant(n) => write!(f, "{}", n),
            SymbolValue::Runtime(ident) => write!(f, "{}", ident),
        }
    }
}

/// Shape of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    /// Fully sized array, outermost dimension first
    Array(Vec<usize>),
    /// Array parameter with its first dimension omitted; holds the rest
    Pointer(Vec<usize>),
    /// Result of calling a `void` function
    Void,
}

impl Type {
    /// Type produced by one subscript, or `None` if not subscriptable
    pub fn index(&self) -> Option<Type> {
        match self {
            Type::Array(dims) => match dims.split_first() {
                Some((_, [])) => Some(Type::Int),
                Some((_, rest)) => Some(Type::Array(rest.to_vec())),
                None => None,
            },
            Type::Pointer(rest) if rest.is_empty() => Some(Type::Int),
            Type::Pointer(rest) => Some(Type::Array(rest.clone())),
            Type::Int | Type::Void => None,
        }
    }

    /// Array-to-pointer conversion applied to call arguments
    pub fn decay(&self) -> Type {
        match self {
            Type::Array(dims) => Type::Pointer(dims.get(1..).unwrap_or_default().to_vec()),
            other => other.clone(),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Void => write!(f, "void"),
            Type::Array(dims) => {
                write!(f, "int")?;
                for d in dims {
                    write!(f, "[{}]", d)?;
                }
                Ok(())
            }
            Type::Pointer(rest) => {
                write!(f, "int[]")?;
                for d in rest {
                    write!(f, "[{}]", d)?;
                }
                Ok(())
            }
        }
    }
}

/// Entry the resolver keeps in its scope tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub value: SymbolValue,
    pub ty: Type,
    /// Declared with `const`
    pub is_const: bool,
}

impl Symbol {
    pub fn new(value: SymbolValue, ty: Type, is_const: bool) -> Self {
        Self {
            value,
            ty,
            is_const,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_array() {
        let ty = Type::Array(vec![2, 3]);
        assert_eq!(ty.index(), Some(Type::Array(vec![3])));
        assert_eq!(ty.index().and_then(|t| t.index()), Some(Type::Int));
        assert_eq!(Type::Int.index(), None);
    }

    #[test]
    fn test_index_pointer() {
        assert_eq!(Type::Pointer(vec![]).index(), Some(Type::Int));
        assert_eq!(Type::Pointer(vec![4]).index(), Some(Type::Array(vec![4])));
    }

    #[test]
    fn test_decay() {
        assert_eq!(Type::Array(vec![5]).decay(), Type::Pointer(vec![]));
        assert_eq!(Type::Array(vec![2, 3]).decay(), Type::Pointer(vec![3]));
        assert_eq!(Type::Pointer(vec![3]).decay(), Type::Pointer(vec![3]));
        assert_eq!(Type::Int.decay(), Type::Int);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::Array(vec![2, 3]).to_string(), "int[2][3]");
        assert_eq!(Type::Pointer(vec![3]).to_string(), "int[][3]");
        assert_eq!(SymbolValue::Constant(-4).to_string(), "-4");
        assert_eq!(SymbolValue::Runtime("@a".into()).to_string(), "@a");
    }
}
