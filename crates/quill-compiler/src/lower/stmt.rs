//! Statement lowering.

use quill_core::CompilationError;

use super::{FunctionBuilder, LowerContext};
use crate::arena::StmtId;
use crate::ir::{InstrKind, Value};
use crate::node::StmtKind;

impl LowerContext<'_> {
    pub(super) fn lower_stmt(
        &mut self,
        b: &mut FunctionBuilder,
        stmt: StmtId,
    ) -> Result<(), CompilationError> {
        let program = self.program;
        match program.stmt(stmt).kind() {
            StmtKind::Decl { var } => {
                let node = program.var(var);
                let ty = node
                    .expr()
                    .and_then(|e| program.expr(e).info().map(|i| i.ty))
                    .ok_or_else(|| CompilationError::internal("local was not analyzed"))?;
                let Some(init) = node.kind().init() else {
                    return Ok(());
                };
                if !self.is_runtime(ty) {
                    // Still evaluate calls for their effect on the worklist.
                    self.lower_expr(b, init)?;
                    return Ok(());
                }
                let value = self.value(b, init)?;
                let ir_ty = self.ir_type(ty);
                let local = b.declare_local(var, &node.name, ir_ty);
                b.emit(InstrKind::Copy, vec![value], Some(local));
            }
            StmtKind::Return { value } => {
                let inputs = match value {
                    Some(value) => self.lower_expr(b, value)?.into_iter().collect(),
                    None => Vec::new(),
                };
                b.emit(InstrKind::Return, inputs, None);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.value(b, cond)?;
                let then_label = b.new_label();
                let end_label = b.new_label();
                let else_label = match else_branch {
                    Some(_) => b.new_label(),
                    None => end_label,
                };
                b.emit(
                    InstrKind::Branch,
                    vec![cond, Value::Label(then_label), Value::Label(else_label)],
                    None,
                );
                b.emit_label(then_label);
                self.lower_stmt(b, then_branch)?;
                b.emit_jump(end_label);
                if let Some(else_branch) = else_branch {
                    b.emit_label(else_label);
                    self.lower_stmt(b, else_branch)?;
                    b.emit_jump(end_label);
                }
                b.emit_label(end_label);
            }
            StmtKind::Block { stmts, .. } => {
                for s in stmts {
                    self.lower_stmt(b, s)?;
                }
            }
            StmtKind::Expr(expr) => {
                self.lower_expr(b, expr)?;
            }
            // Nested functions are generated when referenced.
            StmtKind::Fn { .. } | StmtKind::Import { .. } => {}
        }
        Ok(())
    }
}
