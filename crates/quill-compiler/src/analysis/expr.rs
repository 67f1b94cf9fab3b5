//! Expression analysis.

use quill_core::{CompilationError, Span};
use quill_syntax::{BinaryOp, Bracket};

use super::{Analyzer, Interrupt};
use crate::arena::{ExprId, ScopeId, TypeId, VarId};
use crate::node::{Binding, CallTarget, ExprInfo, ExprKind, ExprNode, Resolution, VarKind};
use crate::overload;
use crate::typeclass;
use crate::types::TypeDef;

impl Analyzer<'_> {
    pub(super) fn analyze_expr(&self, id: ExprId) -> Result<(), Interrupt> {
        let node = self.program.expr(id);
        if node.info().is_some() {
            return Ok(());
        }

        let info = match node.kind() {
            ExprKind::Ident { name } => {
                let target = self.lookup(node.scope, &name, node.span)?;
                self.check_capture(node.scope, target, &name, node.span)?;
                let target_info = self.info(target)?;
                ExprInfo {
                    ty: target_info.ty,
                    value: target_info.value,
                    binding: Binding::Ref(target),
                }
            }
            ExprKind::Int(_) => ExprInfo::of(TypeId::INT32),
            ExprKind::Bool(_) => ExprInfo::of(TypeId::BOOL),
            ExprKind::TypeLit(ty) => ExprInfo {
                ty: TypeId::TYPE,
                value: Some(ty),
                binding: Binding::None,
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.info(lhs)?;
                let r = self.info(rhs)?;
                ExprInfo::of(self.binary_type(op, l.ty, r.ty, node.span)?)
            }
            ExprKind::Call {
                callee,
                bracket,
                args,
            } => self.analyze_call(&node, callee, bracket, &args)?,
            ExprKind::Closure { function, ty } => {
                self.signature(function)?;
                ExprInfo::of(ty)
            }
            ExprKind::Import { module } => ExprInfo::of(self.program.module(module).ty),
            ExprKind::Member { base, name } => self.analyze_member(&node, base, &name)?,
            ExprKind::Struct { ty, .. }
            | ExprKind::Typeclass { ty }
            | ExprKind::Instance { ty }
            | ExprKind::OverloadSet { ty, .. } => ExprInfo::of(ty),
            ExprKind::Var(var) => self.analyze_var(var)?,
        };

        node.set_info(info);
        Ok(())
    }

    /// Reject references from a closure (or struct body) to the parameters
    /// and locals of an enclosing function.
    fn check_capture(
        &self,
        scope: ScopeId,
        target: ExprId,
        name: &str,
        span: Span,
    ) -> Result<(), CompilationError> {
        let ExprKind::Var(var) = self.program.expr(target).kind() else {
            return Ok(());
        };
        let Some(owner) = self.program.var(var).owner else {
            return Ok(());
        };
        if self.program.function_scope_of(scope) == Some(owner) {
            Ok(())
        } else {
            Err(CompilationError::UnsupportedCapture {
                name: name.to_string(),
                span,
            })
        }
    }

    fn binary_type(
        &self,
        op: BinaryOp,
        lhs: TypeId,
        rhs: TypeId,
        span: Span,
    ) -> Result<TypeId, CompilationError> {
        let scalar = |t: TypeId| t == TypeId::INT32 || t == TypeId::BOOL;
        let ok = if op.is_equality() {
            lhs == rhs && scalar(lhs)
        } else {
            lhs == TypeId::INT32 && rhs == TypeId::INT32
        };
        if !ok {
            let expected = if op.is_equality() {
                "operands of the same scalar type"
            } else {
                "int32 operands"
            };
            return Err(CompilationError::mismatch(
                format!(
                    "operator '{}' requires {}, found '{}' and '{}'",
                    op,
                    expected,
                    self.program.explain(lhs),
                    self.program.explain(rhs)
                ),
                span,
            ));
        }
        Ok(if op.is_arithmetic() {
            TypeId::INT32
        } else {
            TypeId::BOOL
        })
    }

    fn analyze_var(&self, var: VarId) -> Result<ExprInfo, Interrupt> {
        let node = self.program.var(var);
        match node.kind() {
            VarKind::Plain { ty_expr, .. } => Ok(ExprInfo::of(self.type_value(ty_expr)?)),
            VarKind::Expr { init, annotation } | VarKind::Member {
                init, annotation, ..
            } => {
                let init_info = self.info(init)?;
                if init_info.ty == TypeId::VOID {
                    return Err(CompilationError::mismatch(
                        format!("'{}' cannot be bound to a void value", node.name),
                        node.span,
                    )
                    .into());
                }
                if let Some(annotation) = annotation {
                    let declared = self.type_value(annotation)?;
                    if declared != init_info.ty {
                        return Err(CompilationError::mismatch(
                            format!(
                                "'{}' is declared as '{}' but initialized with '{}'",
                                node.name,
                                self.program.explain(declared),
                                self.program.explain(init_info.ty)
                            ),
                            node.span,
                        )
                        .into());
                    }
                }
                Ok(ExprInfo {
                    ty: init_info.ty,
                    value: init_info.value,
                    binding: Binding::None,
                })
            }
        }
    }

    fn analyze_member(
        &self,
        node: &ExprNode,
        base: ExprId,
        name: &str,
    ) -> Result<ExprInfo, Interrupt> {
        let base_info = self.info(base)?;
        let target = match self.program.resolve_member(base_info.ty, name) {
            None => {
                return Err(CompilationError::NoMembers {
                    ty: self.program.explain(base_info.ty),
                    span: node.span,
                }
                .into());
            }
            Some(Resolution::Found(symbol)) => {
                self.program.symbol(symbol).expr().ok_or_else(|| {
                    Interrupt::from(CompilationError::internal(format!(
                        "member '{}' is unbound",
                        name
                    )))
                })?
            }
            Some(Resolution::Pending(scope)) => {
                return Err(Interrupt::WaitName {
                    scope,
                    name: name.to_string(),
                });
            }
            Some(Resolution::Missing) => {
                return Err(CompilationError::UnresolvedName {
                    name: format!("{}.{}", self.program.explain(base_info.ty), name),
                    span: node.span,
                }
                .into());
            }
        };
        let target_info = self.info(target)?;
        Ok(ExprInfo {
            ty: target_info.ty,
            value: target_info.value,
            binding: Binding::Ref(target),
        })
    }

    fn analyze_call(
        &self,
        node: &ExprNode,
        callee: ExprId,
        bracket: Bracket,
        args: &[ExprId],
    ) -> Result<ExprInfo, Interrupt> {
        let program = self.program;
        let callee_info = self.info(callee)?;
        let mut arg_infos = Vec::with_capacity(args.len());
        for &arg in args {
            arg_infos.push(self.info(arg)?);
        }
        let arg_types: Vec<TypeId> = arg_infos.iter().map(|i| i.ty).collect();

        match &*program.ty(callee_info.ty) {
            TypeDef::OverloadSet { set } => {
                self.set_ready(*set)?;
                let function = overload::resolve(program, *set, bracket, &arg_types, node.span)?;
                let signature = self.signature(function)?;
                let f = program.function(function);
                if f.body().is_none() {
                    return Err(CompilationError::NotCallable {
                        ty: format!("abstract member '{}'", f.name),
                        span: node.span,
                    }
                    .into());
                }
                Ok(ExprInfo {
                    ty: signature.ret,
                    value: None,
                    binding: Binding::Call(CallTarget::Function(function)),
                })
            }
            TypeDef::Closure { function } => {
                if bracket != Bracket::Paren {
                    return Err(CompilationError::NoMatchingOverload {
                        name: "closure".to_string(),
                        args: program.explain_all(&arg_types),
                        span: node.span,
                    }
                    .into());
                }
                let signature = self.signature(*function)?;
                if signature.params.len() != args.len() {
                    return Err(CompilationError::ArityMismatch {
                        name: "closure".to_string(),
                        expected: signature.params.len(),
                        got: args.len(),
                        span: node.span,
                    }
                    .into());
                }
                for (index, (&param, &arg)) in
                    signature.params.iter().zip(arg_types.iter()).enumerate()
                {
                    if param != arg {
                        return Err(CompilationError::mismatch(
                            format!(
                                "argument {} of closure: expected '{}', found '{}'",
                                index + 1,
                                program.explain(param),
                                program.explain(arg)
                            ),
                            program.expr(args[index]).span,
                        )
                        .into());
                    }
                }
                Ok(ExprInfo {
                    ty: signature.ret,
                    value: None,
                    binding: Binding::Call(CallTarget::Function(*function)),
                })
            }
            TypeDef::Typeclass { params, .. } => {
                if bracket != Bracket::Paren {
                    return Err(CompilationError::NoMatchingOverload {
                        name: "typeclass".to_string(),
                        args: program.explain_all(&arg_types),
                        span: node.span,
                    }
                    .into());
                }
                if params.len() != args.len() {
                    return Err(CompilationError::ArityMismatch {
                        name: "typeclass".to_string(),
                        expected: params.len(),
                        got: args.len(),
                        span: node.span,
                    }
                    .into());
                }
                for (index, &param) in params.iter().enumerate() {
                    let param_expr = program.var(param).expr().ok_or_else(|| {
                        Interrupt::from(CompilationError::internal("parameter without expression"))
                    })?;
                    let expected = self.info(param_expr)?.ty;
                    if expected != arg_types[index] {
                        return Err(CompilationError::mismatch(
                            format!(
                                "typeclass argument {}: expected '{}', found '{}'",
                                index + 1,
                                program.explain(expected),
                                program.explain(arg_types[index])
                            ),
                            program.expr(args[index]).span,
                        )
                        .into());
                    }
                }
                let keys: Vec<TypeId> = arg_infos.iter().map(|i| i.value.unwrap_or(i.ty)).collect();
                let instance = typeclass::instantiate(
                    program,
                    callee_info.ty,
                    args,
                    keys,
                    node.span,
                    node.scope,
                )?;
                if !instance.roots.is_empty() {
                    self.spawn(instance.roots);
                }
                Ok(ExprInfo {
                    ty: instance.ty,
                    value: None,
                    binding: Binding::Call(CallTarget::Instantiate(instance.expr)),
                })
            }
            _ => Err(CompilationError::NotCallable {
                ty: program.explain(callee_info.ty),
                span: node.span,
            }
            .into()),
        }
    }
}
