//! Identifier types for compilation modules.

use std::fmt;

/// Identifies a module of the program being compiled.
///
/// Modules are numbered in the order preanalysis first reaches them, so the
/// root module passed to the compiler is always `ModuleId::new(0)` unless it
/// imports another module first.
///
/// # Example
///
/// ```
/// use quill_core::ModuleId;
///
/// let module = ModuleId::new(0);
/// assert_eq!(module.index(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Create a new module ID with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module_{}", self.0)
    }
}

impl From<u32> for ModuleId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

impl From<ModuleId> for u32 {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}
