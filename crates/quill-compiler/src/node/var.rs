//! Variables.

use std::sync::OnceLock;

use parking_lot::RwLock;
use quill_core::Span;

use crate::arena::{ExprId, ScopeId, TypeId};

/// How a variable gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// A parameter, typed by an expression producing a type.
    Plain { ty_expr: ExprId, index: usize },
    /// A `let` in a block or at module level.
    Expr {
        init: ExprId,
        annotation: Option<ExprId>,
    },
    /// A `let` inside a struct body.
    Member {
        owner: TypeId,
        init: ExprId,
        annotation: Option<ExprId>,
    },
}

impl VarKind {
    /// The initializer of expression-backed and member variables.
    pub fn init(&self) -> Option<ExprId> {
        match self {
            VarKind::Plain { .. } => None,
            VarKind::Expr { init, .. } | VarKind::Member { init, .. } => Some(*init),
        }
    }

    /// The same variable with a different initializer.
    pub fn with_init(self, new_init: ExprId) -> Self {
        match self {
            VarKind::Plain { .. } => self,
            VarKind::Expr { annotation, .. } => VarKind::Expr {
                init: new_init,
                annotation,
            },
            VarKind::Member {
                owner, annotation, ..
            } => VarKind::Member {
                owner,
                init: new_init,
                annotation,
            },
        }
    }
}

/// A variable node.
#[derive(Debug)]
pub struct VarNode {
    pub name: String,
    pub span: Span,
    /// Parameter scope of the function owning this variable; `None` for
    /// module globals, struct members and typeclass parameters.
    pub owner: Option<ScopeId>,
    kind: RwLock<VarKind>,
    expr: OnceLock<ExprId>,
}

impl VarNode {
    pub fn new(name: impl Into<String>, span: Span, owner: Option<ScopeId>, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            span,
            owner,
            kind: RwLock::new(kind),
            expr: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> VarKind {
        *self.kind.read()
    }

    pub fn set_kind(&self, kind: VarKind) {
        *self.kind.write() = kind;
    }

    /// The `Var` expression referring to this variable.
    pub fn expr(&self) -> Option<ExprId> {
        self.expr.get().copied()
    }

    pub fn set_expr(&self, expr: ExprId) {
        let _ = self.expr.set(expr);
    }

    pub fn is_local(&self) -> bool {
        self.owner.is_some()
    }
}
