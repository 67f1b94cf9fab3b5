//! Analyzed statements.

use std::sync::OnceLock;

use parking_lot::RwLock;
use quill_core::{ModuleId, Span};

use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, VarId};

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let`; the variable carries the initializer.
    Decl { var: VarId },
    Return { value: Option<ExprId> },
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    /// `fn`; the body is analyzed as its own task.
    Fn {
        function: FunctionId,
        set: OverloadSetId,
    },
    Block { scope: ScopeId, stmts: Vec<StmtId> },
    Expr(ExprId),
    Import { module: ModuleId },
}

/// A statement node.
#[derive(Debug)]
pub struct StmtNode {
    pub span: Span,
    /// Lexical scope the statement appears in.
    pub scope: ScopeId,
    kind: RwLock<StmtKind>,
    done: OnceLock<()>,
}

impl StmtNode {
    pub fn new(span: Span, scope: ScopeId, kind: StmtKind) -> Self {
        Self {
            span,
            scope,
            kind: RwLock::new(kind),
            done: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> StmtKind {
        self.kind.read().clone()
    }

    pub fn set_kind(&self, kind: StmtKind) {
        *self.kind.write() = kind;
    }

    pub fn is_analyzed(&self) -> bool {
        self.done.get().is_some()
    }

    pub fn mark_analyzed(&self) {
        let _ = self.done.set(());
    }

    /// Whether this is a block with no statements.
    pub fn is_empty_block(&self) -> bool {
        matches!(&*self.kind.read(), StmtKind::Block { stmts, .. } if stmts.is_empty())
    }
}
