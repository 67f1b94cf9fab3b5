//! Expression nodes.
//!
//! Provides nodes for:
//! - Literals and identifiers
//! - Binary operations and postfix application (calls)
//! - Member access
//! - Closures, struct bodies and typeclass definitions
//! - Import expressions (a module used as a value)

use quill_core::Span;

use crate::ast::{BinaryOp, Block, Bracket, FnDecl, Ident, ModulePath, Param, Stmt};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Identifier reference
    Ident(Ident<'ast>),
    /// Integer literal
    Int(IntLit),
    /// Boolean literal
    Bool(BoolLit),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Postfix application `f(...)`
    Call(&'ast CallExpr<'ast>),
    /// Member access `a.b`
    Member(&'ast MemberExpr<'ast>),
    /// Closure `λ(x: int32) -> int32 { ... }`
    Closure(&'ast ClosureExpr<'ast>),
    /// Module used as a value `import a.b`
    Import(&'ast ImportExpr<'ast>),
    /// Structural type `struct { ... }`
    Struct(&'ast StructExpr<'ast>),
    /// Typeclass definition `typeclass(T: type) { ... }`
    Typeclass(&'ast TypeclassExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Ident(e) => e.span,
            Self::Int(e) => e.span,
            Self::Bool(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Call(e) => e.span,
            Self::Member(e) => e.span,
            Self::Closure(e) => e.span,
            Self::Import(e) => e.span,
            Self::Struct(e) => e.span,
            Self::Typeclass(e) => e.span,
        }
    }
}

/// An integer literal.
///
/// The value is kept wide; range checking is a semantic concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLit {
    /// Literal value
    pub value: i64,
    /// Source location
    pub span: Span,
}

/// A boolean literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolLit {
    /// Literal value
    pub value: bool,
    /// Source location
    pub span: Span,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    /// Left operand
    pub lhs: Expr<'ast>,
    /// Operator
    pub op: BinaryOp,
    /// Right operand
    pub rhs: Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A postfix application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    /// The applied expression
    pub callee: Expr<'ast>,
    /// Bracket kind used at the call site
    pub bracket: Bracket,
    /// Arguments in order
    pub args: &'ast [Expr<'ast>],
    /// Source location
    pub span: Span,
}

/// A member access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    /// Base expression
    pub base: Expr<'ast>,
    /// Member name
    pub member: Ident<'ast>,
    /// Source location
    pub span: Span,
}

/// A closure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosureExpr<'ast> {
    /// Parameters with explicit types
    pub params: &'ast [Param<'ast>],
    /// Return type, `void` when absent
    pub ret: Option<Expr<'ast>>,
    /// Body
    pub body: Block<'ast>,
    /// Source location
    pub span: Span,
}

/// A module used as a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportExpr<'ast> {
    /// The imported module
    pub path: ModulePath<'ast>,
    /// Source location
    pub span: Span,
}

/// A structural type definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructExpr<'ast> {
    /// Member declarations
    pub body: &'ast [Stmt<'ast>],
    /// Source location
    pub span: Span,
}

/// A typeclass definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeclassExpr<'ast> {
    /// Typeclass parameters (usually of type `type`)
    pub params: &'ast [Param<'ast>],
    /// Member functions; members without a body are abstract
    pub members: &'ast [FnDecl<'ast>],
    /// Source location
    pub span: Span,
}
