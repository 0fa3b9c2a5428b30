//! Lexical scopes

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use log::trace;
use thiserror::Error;

use crate::symbol::SymbolValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("'{0}' is already declared in this scope")]
    Duplicate(String),
    #[error("cannot exit the global scope")]
    Underflow,
}

/// Names declared in one lexical scope
#[derive(Debug, Clone)]
pub struct ScopeTable<T = SymbolValue> {
    names: HashMap<String, T>,
}

impl<T> ScopeTable<T> {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Insert a name; fails if this table already has it
    pub fn insert(&mut self, name: String, value: T) -> Result<(), ScopeError> {
        if self.names.contains_key(&name) {
            return Err(ScopeError::Duplicate(name));
        }
        self.names.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.names.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<T> Default for ScopeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack of scope tables. The bottom table is the global scope and is
/// never popped.
#[derive(Debug, Clone)]
pub struct ScopeStack<T = SymbolValue> {
    scopes: Vec<ScopeTable<T>>,
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeTable::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(ScopeTable::new());
        trace!("enter scope (depth {})", self.scopes.len());
    }

    /// Pop the innermost scope and hand back its table
    pub fn exit_scope(&mut self) -> Result<ScopeTable<T>, ScopeError> {
        if self.scopes.len() <= 1 {
            return Err(ScopeError::Underflow);
        }
        trace!("exit scope (depth {})", self.scopes.len());
        self.scopes.pop().ok_or(ScopeError::Underflow)
    }

    /// Push a scope that is popped when the returned guard drops
    pub fn enter(&mut self) -> ScopeGuard<'_, T> {
        self.enter_scope();
        ScopeGuard { stack: self }
    }

    /// Declare in the innermost scope. Shadowing outer names is fine.
    pub fn declare(&mut self, name: impl Into<String>, value: T) -> Result<(), ScopeError> {
        match self.scopes.last_mut() {
            Some(top) => top.insert(name.into(), value),
            None => Err(ScopeError::Underflow),
        }
    }

    /// Innermost binding of `name`
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_current(&self, name: &str) -> Option<&T> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// Number of live tables, global included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn global(&self) -> &ScopeTable<T> {
        &self.scopes[0]
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope entered through [`ScopeStack::enter`]
pub struct ScopeGuard<'a, T> {
    stack: &'a mut ScopeStack<T>,
}

impl<T> Deref for ScopeGuard<'_, T> {
    type Target = ScopeStack<T>;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl<T> DerefMut for ScopeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl<T> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        let popped = self.stack.exit_scope();
        debug_assert!(popped.is_ok(), "scope guard outlived its scope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(n: i32) -> SymbolValue {
        SymbolValue::Constant(n)
    }

    #[test]
    fn test_shadowing_round_trip() {
        let mut stack = ScopeStack::new();
        stack.declare("a", constant(1)).unwrap();

        stack.enter_scope();
        stack.declare("a", constant(2)).unwrap();
        stack.declare("b", SymbolValue::Runtime("@b".into())).unwrap();
        assert_eq!(stack.lookup("a"), Some(&constant(2)));
        stack.exit_scope().unwrap();

        assert_eq!(stack.lookup("a"), Some(&constant(1)));
        assert_eq!(stack.lookup("b"), None);
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut stack = ScopeStack::new();
        stack.declare("x", constant(1)).unwrap();
        assert_eq!(
            stack.declare("x", constant(2)),
            Err(ScopeError::Duplicate("x".into()))
        );
        // the first binding is untouched
        assert_eq!(stack.lookup("x"), Some(&constant(1)));

        stack.enter_scope();
        assert!(stack.declare("x", constant(3)).is_ok());
    }

    #[test]
    fn test_exit_global_scope_fails() {
        let mut stack: ScopeStack = ScopeStack::new();
        assert_eq!(stack.exit_scope().unwrap_err(), ScopeError::Underflow);
        assert!(stack.is_global());
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let mut stack = ScopeStack::new();
        stack.declare("a", constant(1)).unwrap();
        {
            let mut inner = stack.enter();
            inner.declare("a", constant(2)).unwrap();
            assert_eq!(inner.depth(), 2);
            assert_eq!(inner.lookup("a"), Some(&constant(2)));
        }
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.lookup("a"), Some(&constant(1)));
    }

    #[test]
    fn test_guard_pops_on_early_return() {
        fn declare_twice(stack: &mut ScopeStack) -> Result<(), ScopeError> {
            let mut scope = stack.enter();
            scope.declare("y", constant(1))?;
            scope.declare("y", constant(2))?;
            Ok(())
        }

        let mut stack = ScopeStack::new();
        assert!(declare_twice(&mut stack).is_err());
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.lookup("y"), None);
    }

    #[test]
    fn test_lookup_current_ignores_outer() {
        let mut stack = ScopeStack::new();
        stack.declare("g", constant(0)).unwrap();
        stack.enter_scope();
        assert_eq!(stack.lookup_current("g"), None);
        assert_eq!(stack.lookup("g"), Some(&constant(0)));
        assert!(stack.global().contains("g"));
    }
}
