//! Statement analysis.

use quill_core::CompilationError;

use super::{Analyzer, Interrupt};
use crate::arena::{StmtId, TypeId};
use crate::node::StmtKind;

impl Analyzer<'_> {
    pub(super) fn analyze_stmt(&self, id: StmtId) -> Result<(), Interrupt> {
        let program = self.program;
        let node = program.stmt(id);
        if node.is_analyzed() {
            return Ok(());
        }

        match node.kind() {
            StmtKind::Decl { var } => {
                let expr = program.var(var).expr().ok_or_else(|| {
                    Interrupt::from(CompilationError::internal("variable without expression"))
                })?;
                self.info(expr)?;
            }
            StmtKind::Return { value } => {
                let function = program.enclosing_function(node.scope).ok_or_else(|| {
                    Interrupt::from(CompilationError::mismatch(
                        "'return' outside of a function",
                        node.span,
                    ))
                })?;
                let signature = self.signature(function)?;
                let actual = match value {
                    Some(value) => self.info(value)?.ty,
                    None => TypeId::VOID,
                };
                if actual != signature.ret {
                    return Err(CompilationError::mismatch(
                        format!(
                            "'{}' returns '{}', found '{}'",
                            program.function(function).name,
                            program.explain(signature.ret),
                            program.explain(actual)
                        ),
                        node.span,
                    )
                    .into());
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_info = self.info(cond)?;
                if cond_info.ty != TypeId::BOOL {
                    return Err(CompilationError::mismatch(
                        format!(
                            "condition must be 'bool', found '{}'",
                            program.explain(cond_info.ty)
                        ),
                        program.expr(cond).span,
                    )
                    .into());
                }
                self.stmt_done(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.stmt_done(else_branch)?;
                }
            }
            StmtKind::Block { stmts, .. } => {
                for stmt in stmts {
                    self.stmt_done(stmt)?;
                }
            }
            StmtKind::Expr(expr) => {
                self.info(expr)?;
            }
            StmtKind::Fn { .. } | StmtKind::Import { .. } => {}
        }

        node.mark_analyzed();
        Ok(())
    }
}
