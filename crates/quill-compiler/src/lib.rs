//! Quill Compiler
//!
//! The semantic core of the Quill language: it takes syntax trees and
//! produces IR modules.
//!
//! ## Architecture
//!
//! ```text
//! SyntaxModule ──► Phase 1: preanalysis   node skeleton, scopes, imports
//!              ──► Phase 2: analysis      parallel task scheduler
//!              ──► entry validation
//!              ──► Phase 3: simplify      constant folding to a fixed point
//!              ──► Phase 4: lowering      worklist of reachable functions
//!              ──► IrModule
//! ```
//!
//! ## Modules
//!
//! - [`node`]: the analyzed node model ([`Program`])
//! - [`scope`]: scopes and symbols
//! - [`passes`]: preanalysis and entry point validation
//! - [`analysis`]: dependency-driven analysis scheduler
//! - [`overload`]: overload registration and resolution
//! - [`typeclass`]: typeclass instantiation and its cache
//! - [`clone`]: node cloning for inlining and specialization
//! - [`simplify`]: the simplification engine
//! - [`lower`] and [`ir`]: IR generation

pub mod analysis;
pub mod arena;
pub mod clone;
pub mod ir;
pub mod lower;
pub mod modules;
pub mod node;
pub mod options;
pub mod overload;
pub mod passes;
pub mod return_checker;
pub mod scope;
pub mod simplify;
pub mod typeclass;
pub mod types;

pub use analysis::{Analyzer, Task};
pub use ir::{IrFunction, IrModule, IrSymbol, IrType, IrVariable, Instruction, InstrKind, Value};
pub use lower::lower_program;
pub use modules::{ModuleRegistry, ModuleResolver, RegistryError};
pub use node::Program;
pub use options::CompilerOptions;
pub use passes::{Preanalysis, validate_entry_point};
pub use simplify::{SimplifyReport, simplify_program};

// Re-export the shared error types for convenience
pub use quill_core::{CompilationError, Diagnostic, DiagnosticKind, Diagnostics, Span};

use quill_syntax::SyntaxModule;

/// Counters describing one compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Simplification passes run (zero when disabled or never reached).
    pub simplify_passes: usize,
    /// Typeclass instances created.
    pub instances: usize,
}

/// Result of compilation.
#[derive(Debug)]
pub struct CompilationResult {
    /// One IR module per loaded module, empty when compilation failed.
    pub modules: Vec<IrModule>,
    /// Every error and warning raised.
    pub diagnostics: Diagnostics,
    /// Pass and instance counters, filled in as far as compilation got.
    pub stats: CompileStats,
}

impl CompilationResult {
    /// Check if compilation succeeded (no errors).
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// The IR module with the given dotted path.
    pub fn module(&self, path: &str) -> Option<&IrModule> {
        self.modules.iter().find(|m| m.path == path)
    }
}

/// The main compiler entry point.
pub struct Compiler<'r, 'ast> {
    options: CompilerOptions,
    resolver: Option<&'r dyn ModuleResolver<'ast>>,
}

impl<'r, 'ast> Compiler<'r, 'ast> {
    /// A compiler without an import resolver: only the root modules passed
    /// to [`Compiler::compile`] can be imported.
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            resolver: None,
        }
    }

    /// Resolve imports of modules outside the root set through `resolver`.
    pub fn with_resolver(mut self, resolver: &'r dyn ModuleResolver<'ast>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a set of root modules.
    ///
    /// Compilation stops at the first phase that raised an error; every
    /// error of that phase is reported in the diagnostics.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, modules: &[SyntaxModule<'ast>]) -> CompilationResult {
        let program = Program::new();
        let mut diagnostics = Diagnostics::new();
        let mut stats = CompileStats::default();

        let modules = match self.run(&program, modules, &mut diagnostics, &mut stats) {
            Ok(modules) => modules,
            Err(errors) => {
                for error in &errors {
                    diagnostics.push_error(error, None);
                }
                Vec::new()
            }
        };
        stats.instances = program.instance_count();
        tracing::debug!(
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            "compilation finished"
        );

        CompilationResult {
            modules,
            diagnostics,
            stats,
        }
    }

    fn run(
        &self,
        program: &Program,
        modules: &[SyntaxModule<'ast>],
        diagnostics: &mut Diagnostics,
        stats: &mut CompileStats,
    ) -> Result<Vec<IrModule>, Vec<CompilationError>> {
        let output = Preanalysis::new(program, self.resolver)
            .run(modules)
            .map_err(|e| vec![e])?;

        Analyzer::new(program, &self.options).run(output.roots)?;

        if let Some(entry) = &self.options.entry_point {
            validate_entry_point(program, &output.modules, entry).map_err(|e| vec![e])?;
        }

        if self.options.simplify {
            let report = simplify_program(program, &self.options);
            stats.simplify_passes = report.passes;
            if report.capped {
                diagnostics.push_warning(
                    format!(
                        "simplification stopped after {} passes without reaching a fixed point",
                        report.passes
                    ),
                    None,
                    Span::default(),
                );
            }
        }

        let entry_name = self.options.entry_point.as_deref().unwrap_or("entry");
        lower_program(program, &output.modules, entry_name).map_err(|e| vec![e])
    }
}

impl Default for Compiler<'_, '_> {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}
