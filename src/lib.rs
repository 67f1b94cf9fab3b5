//! Quill
//!
//! Facade over the Quill workspace crates:
//!
//! - [`core`]: spans, errors and diagnostics
//! - [`syntax`]: the syntax tree and [`SyntaxBuilder`]
//! - [`compiler`]: the semantic core and IR
//!
//! # Example
//!
//! ```
//! use quill::{Bump, CompilerOptions, SyntaxBuilder};
//!
//! let arena = Bump::new();
//! let b = SyntaxBuilder::new(&arena);
//! let entry = b.closure(
//!     vec![b.param("arg", b.ident("int32"))],
//!     Some(b.ident("int32")),
//!     vec![b.ret(b.add(b.ident("arg"), b.int(1)))],
//! );
//! let module = b.module("main", vec![b.let_("entry", entry)]);
//!
//! let result = quill::compile(&[module], CompilerOptions::default());
//! assert!(result.is_success());
//! ```

pub use quill_compiler as compiler;
pub use quill_core as core;
pub use quill_syntax as syntax;

pub use bumpalo::Bump;
pub use quill_compiler::{
    CompilationResult, Compiler, CompilerOptions, IrModule, ModuleRegistry, RegistryError,
};
pub use quill_core::{CompilationError, Diagnostics, Span};
pub use quill_syntax::{SyntaxBuilder, SyntaxModule};

use thiserror::Error;

/// Errors of [`build`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// A library module could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Compilation reported errors.
    #[error("compilation failed with {} error(s):\n{diagnostics}", diagnostics.error_count())]
    Failed {
        /// Every diagnostic of the failed compilation.
        diagnostics: Diagnostics,
    },
}

/// Compile root modules that only import each other.
pub fn compile(modules: &[SyntaxModule<'_>], options: CompilerOptions) -> CompilationResult {
    Compiler::new(options).compile(modules)
}

/// Compile `roots` against a set of importable library modules.
///
/// # Errors
///
/// [`BuildError::Registry`] when two different library modules share a
/// path, [`BuildError::Failed`] when compilation reports an error.
pub fn build<'ast>(
    roots: &[SyntaxModule<'ast>],
    library: impl IntoIterator<Item = SyntaxModule<'ast>>,
    options: CompilerOptions,
) -> Result<Vec<IrModule>, BuildError> {
    let mut registry = ModuleRegistry::new();
    for module in library {
        registry.register(module)?;
    }
    tracing::debug!(roots = roots.len(), library = registry.len(), "building");

    let result = Compiler::new(options).with_resolver(&registry).compile(roots);
    if result.is_success() {
        Ok(result.modules)
    } else {
        Err(BuildError::Failed {
            diagnostics: result.diagnostics,
        })
    }
}
