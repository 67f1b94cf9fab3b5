//! Syntax tree definitions.
//!
//! - [`expr`]: expression nodes
//! - [`stmt`]: statement and declaration nodes
//! - [`ops`]: operators and bracket kinds

pub mod expr;
pub mod ops;
pub mod stmt;

pub use expr::*;
pub use ops::*;
pub use stmt::*;

use quill_core::Span;

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    /// The identifier text
    pub name: &'ast str,
    /// Source location
    pub span: Span,
}

/// A dotted module path such as `std.math`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulePath<'ast> {
    /// Path segments in order
    pub segments: &'ast [&'ast str],
    /// Source location
    pub span: Span,
}

impl<'ast> ModulePath<'ast> {
    /// The path joined with dots.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// The final segment, used as the binding name of statement imports.
    pub fn last(&self) -> Option<&'ast str> {
        self.segments.last().copied()
    }
}

/// A parsed module.
///
/// The module borrows from an arena allocator. All nodes are allocated in the
/// arena and remain valid for the lifetime of the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntaxModule<'ast> {
    /// Dotted module name split into segments.
    pub path: &'ast [&'ast str],
    /// Top-level statements in declaration order.
    pub items: &'ast [Stmt<'ast>],
    /// Source location of the whole module.
    pub span: Span,
}

impl<'ast> SyntaxModule<'ast> {
    /// The module name joined with dots.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}
