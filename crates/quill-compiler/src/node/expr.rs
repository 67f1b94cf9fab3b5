//! Analyzed expressions.

use std::sync::OnceLock;

use parking_lot::RwLock;
use quill_core::{ModuleId, Span};
use quill_syntax::{BinaryOp, Bracket};

use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, TypeId, VarId};

/// A compile-time constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i32),
    Bool(bool),
}

impl Literal {
    /// The type of this constant.
    pub fn ty(self) -> TypeId {
        match self {
            Literal::Int(_) => TypeId::INT32,
            Literal::Bool(_) => TypeId::BOOL,
        }
    }

    /// The expression kind holding this constant.
    pub fn into_kind(self) -> ExprKind {
        match self {
            Literal::Int(v) => ExprKind::Int(v),
            Literal::Bool(v) => ExprKind::Bool(v),
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Reference to a name, resolved during analysis.
    Ident { name: String },
    Int(i32),
    Bool(bool),
    /// A builtin type used as a value.
    TypeLit(TypeId),
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Postfix application.
    Call {
        callee: ExprId,
        bracket: Bracket,
        args: Vec<ExprId>,
    },
    Closure {
        function: FunctionId,
        ty: TypeId,
    },
    /// A module used as a value.
    Import { module: ModuleId },
    Member { base: ExprId, name: String },
    Struct { ty: TypeId, members: Vec<StmtId> },
    Typeclass { ty: TypeId },
    /// A specialized typeclass.
    Instance { ty: TypeId },
    /// The value of a variable; the target of the variable's symbol.
    Var(VarId),
    /// The target of a `fn` symbol.
    OverloadSet { set: OverloadSetId, ty: TypeId },
}

impl ExprKind {
    /// The constant this expression denotes, if it is a literal.
    pub fn literal(&self) -> Option<Literal> {
        match self {
            ExprKind::Int(v) => Some(Literal::Int(*v)),
            ExprKind::Bool(v) => Some(Literal::Bool(*v)),
            _ => None,
        }
    }
}

/// What a call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// A function chosen by overload resolution or a closure call.
    Function(FunctionId),
    /// A typeclass instantiation producing the given instance node.
    Instantiate(ExprId),
}

/// What an expression refers to after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    None,
    /// Identifiers and member accesses: the symbol's target expression.
    Ref(ExprId),
    Call(CallTarget),
}

/// Analysis result of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprInfo {
    /// Static type.
    pub ty: TypeId,
    /// For expressions of type `type`, the type they denote.
    pub value: Option<TypeId>,
    pub binding: Binding,
}

impl ExprInfo {
    pub fn of(ty: TypeId) -> Self {
        Self {
            ty,
            value: None,
            binding: Binding::None,
        }
    }
}

/// An expression node.
#[derive(Debug)]
pub struct ExprNode {
    pub span: Span,
    /// Lexical scope the expression appears in.
    pub scope: ScopeId,
    kind: RwLock<ExprKind>,
    info: OnceLock<ExprInfo>,
}

impl ExprNode {
    pub fn new(span: Span, scope: ScopeId, kind: ExprKind) -> Self {
        Self {
            span,
            scope,
            kind: RwLock::new(kind),
            info: OnceLock::new(),
        }
    }

    /// A node whose analysis result is already known.
    pub fn analyzed(span: Span, scope: ScopeId, kind: ExprKind, info: ExprInfo) -> Self {
        let node = Self::new(span, scope, kind);
        let _ = node.info.set(info);
        node
    }

    /// Snapshot of the current variant.
    pub fn kind(&self) -> ExprKind {
        self.kind.read().clone()
    }

    /// Replace the variant. Only simplification rewrites children.
    pub fn set_kind(&self, kind: ExprKind) {
        *self.kind.write() = kind;
    }

    pub fn literal(&self) -> Option<Literal> {
        self.kind.read().literal()
    }

    pub fn info(&self) -> Option<&ExprInfo> {
        self.info.get()
    }

    /// Record the analysis result. The first result wins.
    pub fn set_info(&self, info: ExprInfo) {
        let _ = self.info.set(info);
    }
}
