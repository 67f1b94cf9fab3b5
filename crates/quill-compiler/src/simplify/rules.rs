//! Per-node simplification rules.

use super::{Claim, SimplifyContext, Simplifier, fold_binary};
use crate::arena::{ExprId, FunctionId, StmtId, VarId};
use crate::node::{
    Binding, CallTarget, ExprInfo, ExprKind, ExprNode, Literal, StmtKind, StmtNode,
};
use crate::return_checker::ReturnChecker;
use crate::types::TypeDef;

impl Simplifier<'_> {
    /// The simplest equivalent of `id`.
    pub fn expr(&self, ctx: &SimplifyContext, id: ExprId) -> ExprId {
        match ctx.claim_expr(id) {
            Claim::Fresh => {}
            Claim::Busy => return id,
            Claim::Done(result) => return result,
        }
        ctx.visit();
        let result = self.rewrite_expr(ctx, id);
        ctx.finish_expr(id, result);
        result
    }

    /// The simplest equivalent of `id`.
    pub fn stmt(&self, ctx: &SimplifyContext, id: StmtId) -> StmtId {
        match ctx.claim_stmt(id) {
            Claim::Fresh => {}
            Claim::Busy => return id,
            Claim::Done(result) => return result,
        }
        ctx.visit();
        let result = self.rewrite_stmt(ctx, id);
        ctx.finish_stmt(id, result);
        result
    }

    /// Simplify a variable's initializer in place.
    fn var(&self, ctx: &SimplifyContext, id: VarId) {
        if !ctx.claim_var(id) {
            return;
        }
        let var = self.program.var(id);
        let kind = var.kind();
        if let Some(init) = kind.init() {
            let simplified = self.expr(ctx, init);
            if simplified != init {
                var.set_kind(kind.with_init(simplified));
            }
        }
        ctx.finish_var(id);
    }

    /// Simplify a function body in place.
    fn function(&self, ctx: &SimplifyContext, id: FunctionId) {
        let function = self.program.function(id);
        if function.generic {
            return;
        }
        if let Some(body) = function.body() {
            let simplified = self.stmt(ctx, body);
            if simplified != body {
                function.set_body(simplified);
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn rewrite_expr(&self, ctx: &SimplifyContext, id: ExprId) -> ExprId {
        let program = self.program;
        let node = program.expr(id);
        // Generic typeclass members are never analyzed.
        let Some(info) = node.info().cloned() else {
            return id;
        };

        match node.kind() {
            ExprKind::Ident { .. } => self.reference(ctx, &node, &info).unwrap_or(id),
            ExprKind::Member { base, name } => {
                let simplified = self.expr(ctx, base);
                if simplified != base {
                    node.set_kind(ExprKind::Member {
                        base: simplified,
                        name,
                    });
                }
                self.reference(ctx, &node, &info).unwrap_or(id)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let (l, r) = (self.expr(ctx, lhs), self.expr(ctx, rhs));
                if (l, r) != (lhs, rhs) {
                    node.set_kind(ExprKind::Binary { op, lhs: l, rhs: r });
                }
                match (program.literal(l), program.literal(r)) {
                    (Some(a), Some(b)) => fold_binary(op, a, b)
                        .map(|value| self.literal(&node, value))
                        .unwrap_or(id),
                    _ => id,
                }
            }
            ExprKind::Call {
                callee,
                bracket,
                args,
            } => {
                let simplified_callee = self.expr(ctx, callee);
                let simplified_args: Vec<ExprId> =
                    args.iter().map(|&a| self.expr(ctx, a)).collect();
                if simplified_callee != callee || simplified_args != args {
                    node.set_kind(ExprKind::Call {
                        callee: simplified_callee,
                        bracket,
                        args: simplified_args.clone(),
                    });
                }
                match info.binding {
                    Binding::Call(CallTarget::Instantiate(instance)) => {
                        self.expr(ctx, instance);
                        instance
                    }
                    Binding::Call(CallTarget::Function(function)) => {
                        let literals: Option<Vec<Literal>> =
                            simplified_args.iter().map(|&a| program.literal(a)).collect();
                        literals
                            .and_then(|literals| self.fold_call(function, literals))
                            .map(|value| self.literal(&node, value))
                            .unwrap_or(id)
                    }
                    Binding::Call(_) | Binding::Ref(_) | Binding::None => id,
                }
            }
            ExprKind::Closure { function, .. } => {
                self.function(ctx, function);
                id
            }
            ExprKind::Struct { ty, members } => {
                let simplified: Vec<StmtId> = members.iter().map(|&m| self.stmt(ctx, m)).collect();
                if simplified != members {
                    node.set_kind(ExprKind::Struct {
                        ty,
                        members: simplified,
                    });
                }
                id
            }
            ExprKind::Instance { ty } => {
                if let TypeDef::Instance { functions, .. } = &*program.ty(ty) {
                    for &function in functions {
                        self.function(ctx, function);
                    }
                }
                id
            }
            ExprKind::Var(var) => {
                self.var(ctx, var);
                id
            }
            ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::TypeLit(_)
            | ExprKind::Import { .. }
            | ExprKind::Typeclass { .. }
            | ExprKind::OverloadSet { .. } => id,
        }
    }

    /// A reference to a variable initialized with a literal becomes that
    /// literal.
    fn reference(&self, ctx: &SimplifyContext, node: &ExprNode, info: &ExprInfo) -> Option<ExprId> {
        let Binding::Ref(target) = info.binding else {
            return None;
        };
        let ExprKind::Var(var) = self.program.expr(target).kind() else {
            return None;
        };
        self.var(ctx, var);
        let init = self.program.var(var).kind().init()?;
        let value = self.program.literal(init)?;
        Some(self.literal(node, value))
    }

    /// A fresh literal node in place of `node`.
    pub(super) fn literal(&self, node: &ExprNode, value: Literal) -> ExprId {
        self.program.exprs.push(ExprNode::analyzed(
            node.span,
            node.scope,
            value.into_kind(),
            ExprInfo::of(value.ty()),
        ))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn rewrite_stmt(&self, ctx: &SimplifyContext, id: StmtId) -> StmtId {
        let program = self.program;
        let node = program.stmt(id);
        if !node.is_analyzed() {
            return id;
        }

        match node.kind() {
            StmtKind::Decl { var } => {
                self.var(ctx, var);
                let var = program.var(var);
                let literal_init = var
                    .kind()
                    .init()
                    .and_then(|init| program.literal(init))
                    .is_some();
                if var.is_local() && literal_init {
                    self.empty_block(&node)
                } else {
                    id
                }
            }
            StmtKind::Return { value: Some(value) } => {
                let simplified = self.expr(ctx, value);
                if simplified != value {
                    node.set_kind(StmtKind::Return {
                        value: Some(simplified),
                    });
                }
                id
            }
            StmtKind::Return { value: None } | StmtKind::Import { .. } => id,
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let simplified_cond = self.expr(ctx, cond);
                match program.literal(simplified_cond) {
                    Some(Literal::Bool(true)) => return self.stmt(ctx, then_branch),
                    Some(Literal::Bool(false)) => {
                        return match else_branch {
                            Some(else_branch) => self.stmt(ctx, else_branch),
                            None => self.empty_block(&node),
                        };
                    }
                    _ => {}
                }
                let simplified_then = self.stmt(ctx, then_branch);
                let simplified_else = else_branch.map(|e| self.stmt(ctx, e));
                if simplified_cond != cond
                    || simplified_then != then_branch
                    || simplified_else != else_branch
                {
                    node.set_kind(StmtKind::If {
                        cond: simplified_cond,
                        then_branch: simplified_then,
                        else_branch: simplified_else,
                    });
                }
                id
            }
            StmtKind::Block { scope, stmts } => {
                let returns = ReturnChecker::new(program);
                let mut simplified = Vec::with_capacity(stmts.len());
                let mut reachable = true;
                for &stmt in &stmts {
                    if reachable {
                        let stmt = self.stmt(ctx, stmt);
                        reachable = !returns.all_paths_return(stmt);
                        simplified.push(stmt);
                    } else if matches!(
                        program.stmt(stmt).kind(),
                        StmtKind::Fn { .. } | StmtKind::Import { .. }
                    ) {
                        // Declarations stay visible to the statements above.
                        simplified.push(self.stmt(ctx, stmt));
                    }
                }
                if simplified != stmts {
                    node.set_kind(StmtKind::Block {
                        scope,
                        stmts: simplified,
                    });
                }
                id
            }
            StmtKind::Expr(expr) => {
                let simplified = self.expr(ctx, expr);
                if simplified != expr {
                    node.set_kind(StmtKind::Expr(simplified));
                }
                id
            }
            StmtKind::Fn { function, .. } => {
                self.function(ctx, function);
                id
            }
        }
    }

    /// An analyzed empty block in place of `node`.
    fn empty_block(&self, node: &StmtNode) -> StmtId {
        let block = StmtNode::new(
            node.span,
            node.scope,
            StmtKind::Block {
                scope: node.scope,
                stmts: Vec::new(),
            },
        );
        block.mark_analyzed();
        self.program.stmts.push(block)
    }
}
