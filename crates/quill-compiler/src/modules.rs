//! Module resolution.
//!
//! Imports are resolved synchronously during preanalysis through a
//! [`ModuleResolver`]. [`ModuleRegistry`] is the in-memory resolver: front
//! ends register every parsed module up front and the compiler asks for them
//! by dotted path.

use quill_core::Fingerprint;
use quill_syntax::SyntaxModule;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Source of imported modules.
pub trait ModuleResolver<'ast> {
    /// Look up the syntax of a module by its dotted path.
    fn resolve(&self, path: &str) -> Option<SyntaxModule<'ast>>;
}

/// Errors raised while registering modules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two different trees were registered under one path.
    #[error("module '{path}' is already registered with different contents")]
    Conflict {
        /// The dotted module path.
        path: String,
    },
}

/// In-memory [`ModuleResolver`].
///
/// Registering the same tree twice is accepted; trees are compared by
/// structural fingerprint, so a re-parse of unchanged source is a no-op.
#[derive(Debug, Default)]
pub struct ModuleRegistry<'ast> {
    modules: FxHashMap<String, (SyntaxModule<'ast>, Fingerprint)>,
}

impl<'ast> ModuleRegistry<'ast> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own path.
    pub fn register(&mut self, module: SyntaxModule<'ast>) -> Result<(), RegistryError> {
        let path = module.dotted_path();
        let fingerprint = module.fingerprint();
        match self.modules.get(&path) {
            Some((_, existing)) if *existing != fingerprint => {
                Err(RegistryError::Conflict { path })
            }
            Some(_) => Ok(()),
            None => {
                tracing::trace!(%path, %fingerprint, "registered module");
                self.modules.insert(path, (module, fingerprint));
                Ok(())
            }
        }
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl<'ast> ModuleResolver<'ast> for ModuleRegistry<'ast> {
    fn resolve(&self, path: &str) -> Option<SyntaxModule<'ast>> {
        self.modules.get(path).map(|(module, _)| *module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use quill_syntax::SyntaxBuilder;

    #[test]
    fn register_and_resolve() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let mut registry = ModuleRegistry::new();
        registry
            .register(b.module("std.math", vec![b.export_let("pi", b.int(3))]))
            .unwrap();
        assert!(registry.resolve("std.math").is_some());
        assert!(registry.resolve("std.io").is_none());
    }

    #[test]
    fn identical_reregistration_is_accepted() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let mut registry = ModuleRegistry::new();
        registry.register(b.module("m", vec![b.let_("x", b.int(1))])).unwrap();
        registry.register(b.module("m", vec![b.let_("x", b.int(1))])).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let mut registry = ModuleRegistry::new();
        registry.register(b.module("m", vec![b.let_("x", b.int(1))])).unwrap();
        let err = registry
            .register(b.module("m", vec![b.let_("x", b.int(2))]))
            .unwrap_err();
        assert_eq!(err, RegistryError::Conflict { path: "m".into() });
    }
}
