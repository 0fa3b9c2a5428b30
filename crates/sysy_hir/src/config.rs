/// Knobs for one resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Let a function call another that is defined later in the file.
    /// Signatures are collected in a first pass when set.
    pub forward_references: bool,
    /// Pre-register `getint`, `putint` and the rest of the SysY runtime
    pub runtime_library: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            forward_references: true,
            runtime_library: true,
        }
    }
}
