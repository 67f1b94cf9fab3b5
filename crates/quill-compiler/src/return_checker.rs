//! Return path verification for non-void functions.
//!
//! [`ReturnChecker`] walks a body's statement tree and reports whether every
//! path through it ends in a `return`.
//!
//! ```text
//! return e;                       returns
//! { s1; s2; ... }                 returns if any statement returns
//! if c { a } else { b }           returns if both a and b return
//! if c { a }                      never returns on its own
//! ```

use crate::arena::StmtId;
use crate::node::{Program, StmtKind};

/// Verifies all code paths return a value.
pub struct ReturnChecker<'p> {
    program: &'p Program,
}

impl<'p> ReturnChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Check whether every path through `stmt` reaches a `return`.
    ///
    /// # Arguments
    ///
    /// * `stmt` - A function body or any statement inside one
    pub fn all_paths_return(&self, stmt: StmtId) -> bool {
        match self.program.stmt(stmt).kind() {
            StmtKind::Return { .. } => true,
            StmtKind::Block { stmts, .. } => stmts.iter().any(|&s| self.all_paths_return(s)),
            StmtKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => self.all_paths_return(then_branch) && self.all_paths_return(else_branch),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ExprId;
    use crate::scope::ScopeKind;
    use quill_core::Span;

    fn block(program: &Program, stmts: Vec<StmtId>) -> StmtId {
        let scope = program.new_scope(program.builtin_scope(), ScopeKind::Block);
        program.new_stmt(Span::default(), scope, StmtKind::Block { scope, stmts })
    }

    fn ret(program: &Program) -> StmtId {
        program.new_stmt(
            Span::default(),
            program.builtin_scope(),
            StmtKind::Return { value: None },
        )
    }

    fn cond(program: &Program) -> ExprId {
        program.new_expr(
            Span::default(),
            program.builtin_scope(),
            crate::node::ExprKind::Bool(true),
        )
    }

    #[test]
    fn empty_body_does_not_return() {
        let program = Program::new();
        let body = block(&program, vec![]);
        assert!(!ReturnChecker::new(&program).all_paths_return(body));
    }

    #[test]
    fn trailing_return() {
        let program = Program::new();
        let r = ret(&program);
        let body = block(&program, vec![r]);
        assert!(ReturnChecker::new(&program).all_paths_return(body));
    }

    #[test]
    fn if_without_else_is_not_enough() {
        let program = Program::new();
        let then_branch = {
            let r = ret(&program);
            block(&program, vec![r])
        };
        let c = cond(&program);
        let stmt = program.new_stmt(
            Span::default(),
            program.builtin_scope(),
            StmtKind::If {
                cond: c,
                then_branch,
                else_branch: None,
            },
        );
        let body = block(&program, vec![stmt]);
        assert!(!ReturnChecker::new(&program).all_paths_return(body));
    }

    #[test]
    fn if_else_both_returning() {
        let program = Program::new();
        let then_branch = {
            let r = ret(&program);
            block(&program, vec![r])
        };
        let else_branch = {
            let r = ret(&program);
            block(&program, vec![r])
        };
        let c = cond(&program);
        let stmt = program.new_stmt(
            Span::default(),
            program.builtin_scope(),
            StmtKind::If {
                cond: c,
                then_branch,
                else_branch: Some(else_branch),
            },
        );
        let body = block(&program, vec![stmt]);
        assert!(ReturnChecker::new(&program).all_paths_return(body));
    }
}
