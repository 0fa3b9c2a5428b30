//! Function signatures

use std::collections::HashMap;

use log::debug;
use sysy_ast::FuncType;
use thiserror::Error;

use crate::ident::IdentAllocator;
use crate::symbol::Type;

/// One parameter of a function signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    /// Identifier the body uses to refer to this parameter
    pub ident: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSignature {
    pub name: String,
    pub ret: FuncType,
    pub params: Vec<ParamInfo>,
    /// Provided by the runtime library rather than the source
    pub builtin: bool,
}

impl FuncSignature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn pretty_print(&self) -> String {
        let params: Vec<_> = self
            .params
            .iter()
            .map(|p| format!("{} {} => {}", p.ty, p.name, p.ident))
            .collect();
        let builtin = if self.builtin { " [runtime]" } else { "" };
        format!("{} {}({}){}", self.ret, self.name, params.join(", "), builtin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FuncTableError {
    #[error("function '{0}' is already defined")]
    Duplicate(String),
}

/// All function signatures of one compilation unit
#[derive(Debug, Clone, Default)]
pub struct FuncTable {
    funcs: HashMap<String, FuncSignature>,
    /// Registration order, for stable output
    order: Vec<String>,
}

impl FuncTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sig: FuncSignature) -> Result<(), FuncTableError> {
        if self.funcs.contains_key(&sig.name) {
            return Err(FuncTableError::Duplicate(sig.name));
        }
        debug!("register function {}", sig.pretty_print());
        self.order.push(sig.name.clone());
        self.funcs.insert(sig.name.clone(), sig);
        Ok(())
    }

    /// Register the SysY runtime library functions. Fails on the first
    /// library name that is already in the table.
    pub fn register_runtime_library(&mut self, alloc: &mut impl IdentAllocator) -> Result<(), FuncTableError> {
        let library: [(&str, FuncType, &[(&str, Type)]); 8] = [
            ("getint", FuncType::Int, &[]),
            ("getch", FuncType::Int, &[]),
            ("getarray", FuncType::Int, &[("a", Type::Pointer(Vec::new()))]),
            ("putint", FuncType::Void, &[("n", Type::Int)]),
            ("putch", FuncType::Void, &[("c", Type::Int)]),
            (
                "putarray",
                FuncType::Void,
                &[("n", Type::Int), ("a", Type::Pointer(Vec::new()))],
            ),
            ("starttime", FuncType::Void, &[]),
            ("stoptime", FuncType::Void, &[]),
        ];

        for (name, ret, params) in library {
            let params = params
                .iter()
                .map(|(param, ty)| ParamInfo {
                    name: param.to_string(),
                    ty: ty.clone(),
                    ident: alloc.fresh_named(param),
                })
                .collect();
            let sig = FuncSignature {
                name: name.to_string(),
                ret,
                params,
                builtin: true,
            };
            self.register(sig)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FuncSignature> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Signatures in registration order
    pub fn iter(&self) -> impl Iterator<Item = &FuncSignature> {
        self.order.iter().filter_map(|name| self.funcs.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::CounterAllocator;

    fn sig(name: &str) -> FuncSignature {
        FuncSignature {
            name: name.to_string(),
            ret: FuncType::Int,
            params: vec![ParamInfo {
                name: "x".into(),
                ty: Type::Int,
                ident: "@x".into(),
            }],
            builtin: false,
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut table = FuncTable::new();
        table.register(sig("f")).unwrap();
        assert_eq!(table.get("f").map(FuncSignature::arity), Some(1));
        assert!(table.get("g").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = FuncTable::new();
        table.register(sig("f")).unwrap();
        assert_eq!(
            table.register(sig("f")),
            Err(FuncTableError::Duplicate("f".into()))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_runtime_library() {
        let mut table = FuncTable::new();
        table.register_runtime_library(&mut CounterAllocator::new()).unwrap();
        assert_eq!(table.len(), 8);

        let putarray = table.get("putarray").unwrap();
        assert!(putarray.builtin);
        assert_eq!(putarray.ret, FuncType::Void);
        assert_eq!(putarray.params[1].ty, Type::Pointer(vec![]));

        let names: Vec<_> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "getint");
        assert_eq!(names[7], "stoptime");
    }

    #[test]
    fn test_runtime_library_collision_reported() {
        let mut table = FuncTable::new();
        let mut alloc = CounterAllocator::new();
        table.register(FuncSignature {
            name: "getch".into(),
            ret: FuncType::Int,
            params: Vec::new(),
            builtin: false,
        })
        .unwrap();

        assert_eq!(
            table.register_runtime_library(&mut alloc),
            Err(FuncTableError::Duplicate("getch".into()))
        );
        // getint precedes the collision and is kept
        assert!(table.get("getint").is_some());
        assert!(!table.get("getch").unwrap().builtin);
    }
}
