//! Generated identifiers for runtime values

use std::collections::{HashMap, HashSet};

/// Source of fresh identifiers. The resolver treats them as opaque
/// strings; a code generator may supply its own naming scheme.
pub trait IdentAllocator {
    /// Identifier for an anonymous intermediate value
    fn fresh_temp(&mut self) -> String;

    /// Identifier for storage backing the source-level `name`
    fn fresh_named(&mut self, name: &str) -> String;
}

/// Default allocator: `%0`, `%1`, ... for temporaries and `@name`,
/// `@name_1`, ... for named storage.
#[derive(Debug, Default)]
pub struct CounterAllocator {
    next_temp: u32,
    counters: HashMap<String, u32>,
    used: HashSet<String>,
}

impl CounterAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentAllocator for CounterAllocator {
    fn fresh_temp(&mut self) -> String {
        let ident = format!("%{}", self.next_temp);
        self.next_temp += 1;
        ident
    }

    fn fresh_named(&mut self, name: &str) -> String {
        let count = self.counters.entry(name.to_string()).or_insert(0);
        loop {
            let candidate = if *count == 0 {
                format!("@{}", name)
            } else {
                format!("@{}_{}", name, count)
            };
            *count += 1;
            // `a_1` declared by the user must not collide with the second `a`
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

impl<A: IdentAllocator + ?Sized> IdentAllocator for &mut A {
    fn fresh_temp(&mut self) -> String {
        (**self).fresh_temp()
    }

    fn fresh_named(&mut self, name: &str) -> String {
        (**self).fresh_named(name)
    }
}
