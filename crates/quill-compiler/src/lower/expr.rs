//! Expression lowering.

use quill_core::{CompilationError, Span};

use super::{FunctionBuilder, LowerContext};
use crate::arena::ExprId;
use crate::ir::{InstrKind, Value, VarRef};
use crate::node::{Binding, CallTarget, ExprKind, Literal, VarKind};

impl LowerContext<'_> {
    /// Lower `expr`, returning its runtime value (if it has one).
    pub(super) fn lower_expr(
        &mut self,
        b: &mut FunctionBuilder,
        expr: ExprId,
    ) -> Result<Option<Value>, CompilationError> {
        let program = self.program;
        let node = program.expr(expr);
        let info = node
            .info()
            .cloned()
            .ok_or_else(|| CompilationError::internal("expression reached lowering unanalyzed"))?;

        match node.kind() {
            ExprKind::Int(v) => Ok(Some(Value::Int(v))),
            ExprKind::Bool(v) => Ok(Some(Value::Bool(v))),
            ExprKind::Ident { .. } | ExprKind::Member { .. } => match info.binding {
                Binding::Ref(target) => self.reference(b, target, node.span),
                Binding::None | Binding::Call(_) => Ok(None),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.value(b, lhs)?;
                let r = self.value(b, rhs)?;
                let ty = self.ir_type(info.ty);
                let out = b.temp(ty);
                b.emit(InstrKind::from_binary(op), vec![l, r], Some(out.clone()));
                Ok(Some(Value::Var(out)))
            }
            ExprKind::Call { args, .. } => match info.binding {
                Binding::Call(CallTarget::Function(function)) => {
                    let mut inputs = Vec::with_capacity(args.len());
                    for arg in args {
                        inputs.push(self.value(b, arg)?);
                    }
                    let callee = self.enqueue(function)?;
                    if self.is_runtime(info.ty) {
                        let ty = self.ir_type(info.ty);
                        let out = b.temp(ty);
                        b.emit(InstrKind::Call(callee), inputs, Some(out.clone()));
                        Ok(Some(Value::Var(out)))
                    } else {
                        b.emit(InstrKind::Call(callee), inputs, None);
                        Ok(None)
                    }
                }
                Binding::Call(CallTarget::Instantiate(_)) | Binding::Ref(_) | Binding::None => {
                    Ok(None)
                }
            },
            ExprKind::TypeLit(_)
            | ExprKind::Closure { .. }
            | ExprKind::Import { .. }
            | ExprKind::Struct { .. }
            | ExprKind::Typeclass { .. }
            | ExprKind::Instance { .. }
            | ExprKind::Var(_)
            | ExprKind::OverloadSet { .. } => Ok(None),
        }
    }

    /// Lower an expression that must have a runtime value.
    pub(super) fn value(
        &mut self,
        b: &mut FunctionBuilder,
        expr: ExprId,
    ) -> Result<Value, CompilationError> {
        self.lower_expr(b, expr)?.ok_or_else(|| {
            CompilationError::internal(format!(
                "expression of type '{}' has no runtime value",
                self.program
                    .expr(expr)
                    .info()
                    .map(|i| self.program.explain(i.ty))
                    .unwrap_or_default()
            ))
        })
    }

    /// The value a name or member access refers to.
    fn reference(
        &mut self,
        b: &mut FunctionBuilder,
        target: ExprId,
        span: Span,
    ) -> Result<Option<Value>, CompilationError> {
        let program = self.program;
        let target_node = program.expr(target);
        let Some(ty) = target_node.info().map(|i| i.ty) else {
            return Err(CompilationError::internal("reference to an unanalyzed expression"));
        };
        if !self.is_runtime(ty) {
            return Ok(None);
        }

        let ExprKind::Var(var) = target_node.kind() else {
            // A symbol bound directly to an expression (typeclass arguments).
            return self.lower_expr(b, target);
        };
        let node = program.var(var);
        match node.kind() {
            VarKind::Plain { .. } => match b.param(var) {
                Some(param) => Ok(Some(Value::Var(param))),
                None => Err(CompilationError::internal(format!(
                    "parameter '{}' outside its function",
                    node.name
                ))),
            },
            VarKind::Expr { init, .. } if node.is_local() => {
                if let Some(local) = b.local(var) {
                    return Ok(Some(Value::Var(local)));
                }
                // Elided declarations keep their constant.
                match program.literal(init) {
                    Some(literal) => Ok(Some(match literal {
                        Literal::Int(v) => Value::Int(v),
                        Literal::Bool(v) => Value::Bool(v),
                    })),
                    None => Err(CompilationError::UseBeforeDeclaration {
                        name: node.name.clone(),
                        span,
                    }),
                }
            }
            VarKind::Expr { .. } | VarKind::Member { .. } => Ok(self
                .global(var)?
                .map(|name| Value::Var(VarRef::Global(name)))),
        }
    }
}
