//! Statement and declaration nodes.

use quill_core::Span;

use crate::ast::{Expr, Ident, ModulePath};

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// `let x = e;`
    Let(&'ast LetStmt<'ast>),
    /// `fn f(...) -> T { ... }`
    Fn(&'ast FnDecl<'ast>),
    /// `return e;`
    Return(&'ast ReturnStmt<'ast>),
    /// `if (c) { ... } else { ... }`
    If(&'ast IfStmt<'ast>),
    /// `{ ... }`
    Block(&'ast Block<'ast>),
    /// `e;`
    Expr(&'ast ExprStmt<'ast>),
    /// `import a.b;`
    Import(&'ast ImportStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Let(s) => s.span,
            Self::Fn(s) => s.span,
            Self::Return(s) => s.span,
            Self::If(s) => s.span,
            Self::Block(s) => s.span,
            Self::Expr(s) => s.span,
            Self::Import(s) => s.span,
        }
    }
}

/// A `let` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetStmt<'ast> {
    /// Declared name
    pub name: Ident<'ast>,
    /// Optional type annotation
    pub ty: Option<Expr<'ast>>,
    /// Initializer
    pub init: Expr<'ast>,
    /// Visible to importers of the module
    pub exported: bool,
    /// Source location
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    /// Parameter name
    pub name: Ident<'ast>,
    /// Expression producing the parameter type
    pub ty: Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A named function declaration.
///
/// Declarations with the same name in the same scope form an overload set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FnDecl<'ast> {
    /// Function name
    pub name: Ident<'ast>,
    /// Parameters with explicit types
    pub params: &'ast [Param<'ast>],
    /// Return type, `void` when absent
    pub ret: Option<Expr<'ast>>,
    /// Body; absent for abstract typeclass members
    pub body: Option<Block<'ast>>,
    /// Visible to importers of the module
    pub exported: bool,
    /// Source location
    pub span: Span,
}

/// A `return` statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    /// Returned value
    pub value: Option<Expr<'ast>>,
    /// Source location
    pub span: Span,
}

/// An `if` statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    /// Condition
    pub cond: Expr<'ast>,
    /// Taken when the condition holds
    pub then_branch: Block<'ast>,
    /// Taken otherwise
    pub else_branch: Option<Block<'ast>>,
    /// Source location
    pub span: Span,
}

/// A braced block of statements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    /// Statements in order
    pub stmts: &'ast [Stmt<'ast>],
    /// Source location
    pub span: Span,
}

/// An expression evaluated for its effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    /// The expression
    pub expr: Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A statement-mode import binding the module under its last path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportStmt<'ast> {
    /// The imported module
    pub path: ModulePath<'ast>,
    /// Source location
    pub span: Span,
}
