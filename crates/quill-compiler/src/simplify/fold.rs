//! Constant folding.
//!
//! # Supported folds
//!
//! - Integer arithmetic with 32-bit wrapping; division and remainder by
//!   zero are left for run time
//! - Integer comparisons
//! - Boolean equality
//! - Calls with all-literal arguments, by simplifying an inlined copy of
//!   the callee body and reading its definite `return`
//!
//! Call folding nests at most [`CompilerOptions::max_inline_depth`] deep.
//! A call reached at that depth is left in place for the current pass and
//! folded again from depth zero once the pass ends; its result then serves
//! the deeper folds of the next pass. Recursion deeper than the bound
//! therefore still folds, a bounded slice per pass.
//!
//! [`CompilerOptions::max_inline_depth`]: crate::options::CompilerOptions::max_inline_depth

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use quill_syntax::BinaryOp;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{Memo, SimplifyContext, Simplifier};
use crate::arena::{FunctionId, StmtId};
use crate::clone::{CloneMode, Replacement, clone_with_replacement};
use crate::node::{ExprInfo, ExprNode, Literal, StmtKind};

/// Fold a binary operator over two constants.
///
/// Returns `None` when the operation is not foldable.
pub fn fold_binary(op: BinaryOp, lhs: Literal, rhs: Literal) -> Option<Literal> {
    match (lhs, rhs) {
        (Literal::Int(a), Literal::Int(b)) => Some(match op {
            BinaryOp::Add => Literal::Int(a.wrapping_add(b)),
            BinaryOp::Sub => Literal::Int(a.wrapping_sub(b)),
            BinaryOp::Mul => Literal::Int(a.wrapping_mul(b)),
            BinaryOp::Div if b == 0 => return None,
            BinaryOp::Div => Literal::Int(a.wrapping_div(b)),
            BinaryOp::Rem if b == 0 => return None,
            BinaryOp::Rem => Literal::Int(a.wrapping_rem(b)),
            BinaryOp::Equal => Literal::Bool(a == b),
            BinaryOp::NotEqual => Literal::Bool(a != b),
            BinaryOp::Less => Literal::Bool(a < b),
            BinaryOp::LessEqual => Literal::Bool(a <= b),
            BinaryOp::Greater => Literal::Bool(a > b),
            BinaryOp::GreaterEqual => Literal::Bool(a >= b),
        }),
        (Literal::Bool(a), Literal::Bool(b)) => match op {
            BinaryOp::Equal => Some(Literal::Bool(a == b)),
            BinaryOp::NotEqual => Some(Literal::Bool(a != b)),
            _ => None,
        },
        _ => None,
    }
}

/// A folded call: the callee and its literal arguments.
type CallKey = (FunctionId, Vec<Literal>);

/// Results of folded calls, shared by every pass of one compilation.
///
/// Only complete evaluations are stored. A call whose evaluation was cut
/// off (by the inline depth or by recursion on identical arguments) and
/// produced nothing is remembered as cut until the top-level fold that
/// reached it ends, then forgotten, so a later fold evaluates it again.
#[derive(Debug, Default)]
pub struct CallCache {
    results: RwLock<FxHashMap<CallKey, Memo<Option<Literal>>>>,
    /// Calls reached at the inline depth, resumed from depth zero after
    /// the pass.
    deferred: Mutex<Vec<CallKey>>,
    /// Calls cut off within the running top-level fold.
    cut: Mutex<FxHashSet<CallKey>>,
    /// Held by a top-level fold for its whole evaluation.
    evaluating: Mutex<()>,
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn finished(&self, key: &CallKey) -> Option<Option<Literal>> {
        match self.results.read().get(key) {
            Some(Memo::Done(result)) => Some(*result),
            Some(Memo::Pending) | None => None,
        }
    }

    fn take_deferred(&self) -> Vec<CallKey> {
        let mut seen = FxHashSet::default();
        std::mem::take(&mut *self.deferred.lock())
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

/// Control flow of a simplified statement during return extraction.
enum Flow {
    /// Falls through without effect.
    Continue,
    Return(Literal),
    /// Anything that cannot be decided statically.
    Unknown,
}

impl Simplifier<'_> {
    /// The constant result of calling `function` with `args`, if the body
    /// folds to one.
    ///
    /// Top-level folds run one at a time across workers, so a fold never
    /// observes another worker's unfinished evaluation and the outcome does
    /// not depend on the schedule.
    pub(super) fn fold_call(&self, function: FunctionId, args: Vec<Literal>) -> Option<Literal> {
        let key = (function, args);
        if let Some(result) = self.calls.finished(&key) {
            return result;
        }
        let _evaluating = (self.depth == 0).then(|| self.calls.evaluating.lock());
        {
            let mut results = self.calls.results.write();
            match results.get(&key) {
                Some(Memo::Done(result)) => return *result,
                // Recursion with identical arguments.
                Some(Memo::Pending) => {
                    self.truncate();
                    return None;
                }
                None => {}
            }
            if self.calls.cut.lock().contains(&key) {
                self.truncate();
                return None;
            }
            if self.depth >= self.max_depth {
                // A zero depth turns call folding off.
                if self.depth > 0 {
                    tracing::trace!(?function, args = ?key.1, "call fold deferred");
                    self.calls.cut.lock().insert(key.clone());
                    self.calls.deferred.lock().push(key);
                }
                self.truncate();
                return None;
            }
            results.insert(key.clone(), Memo::Pending);
        }

        let truncated = AtomicBool::new(false);
        let result = self.evaluate(function, &key.1, &truncated);
        let truncated = truncated.into_inner();
        tracing::trace!(
            ?function,
            args = ?key.1,
            ?result,
            truncated,
            depth = self.depth,
            "call folded"
        );

        let mut results = self.calls.results.write();
        if truncated && result.is_none() {
            results.remove(&key);
            self.calls.cut.lock().insert(key);
            self.truncate();
        } else {
            results.insert(key, Memo::Done(result));
        }
        if self.depth == 0 {
            self.calls.cut.lock().clear();
        }
        result
    }

    /// Fold again, from depth zero, every call the last pass reached at
    /// the inline depth. Returns how many were resumed.
    pub(super) fn resume_deferred(&self) -> usize {
        let deferred = self.calls.take_deferred();
        for (function, args) in &deferred {
            self.fold_call(*function, args.clone());
        }
        deferred.len()
    }

    fn truncate(&self) {
        if let Some(flag) = self.truncated {
            flag.store(true, Ordering::Relaxed);
        }
    }

    fn evaluate(
        &self,
        function: FunctionId,
        args: &[Literal],
        truncated: &AtomicBool,
    ) -> Option<Literal> {
        let program = self.program;
        let callee = program.function(function);
        let body = callee.body()?;
        if callee.params.len() != args.len() {
            return None;
        }

        let mut map = Replacement::default();
        for (&param, &value) in callee.params.iter().zip(args) {
            let param_expr = program.var(param).expr()?;
            let node = program.expr(param_expr);
            let literal = program.exprs.push(ExprNode::analyzed(
                node.span,
                node.scope,
                value.into_kind(),
                ExprInfo::of(value.ty()),
            ));
            map.exprs.insert(param_expr, literal);
        }
        let (mut copy, _) = clone_with_replacement(program, CloneMode::Inline, map, body).ok()?;

        let inner = Simplifier {
            program,
            calls: self.calls,
            max_passes: self.max_passes,
            max_depth: self.max_depth,
            depth: self.depth + 1,
            truncated: Some(truncated),
        };
        for _ in 0..self.max_passes {
            let ctx = SimplifyContext::new();
            copy = inner.stmt(&ctx, copy);
            if ctx.replacements() == 0 {
                break;
            }
        }

        match self.flow(copy) {
            Flow::Return(value) => Some(value),
            Flow::Continue | Flow::Unknown => None,
        }
    }

    fn flow(&self, stmt: StmtId) -> Flow {
        let program = self.program;
        match program.stmt(stmt).kind() {
            StmtKind::Return { value: Some(value) } => {
                program.literal(value).map_or(Flow::Unknown, Flow::Return)
            }
            StmtKind::Block { stmts, .. } => {
                for s in stmts {
                    match self.flow(s) {
                        Flow::Continue => {}
                        decided => return decided,
                    }
                }
                Flow::Continue
            }
            StmtKind::Expr(expr) if program.literal(expr).is_some() => Flow::Continue,
            StmtKind::Fn { .. } | StmtKind::Import { .. } => Flow::Continue,
            StmtKind::Decl { .. }
            | StmtKind::Return { value: None }
            | StmtKind::If { .. }
            | StmtKind::Expr(_) => Flow::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(
            fold_binary(BinaryOp::Add, Literal::Int(i32::MAX), Literal::Int(1)),
            Some(Literal::Int(i32::MIN))
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, Literal::Int(i32::MIN), Literal::Int(-1)),
            Some(Literal::Int(i32::MIN))
        );
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        assert_eq!(fold_binary(BinaryOp::Div, Literal::Int(1), Literal::Int(0)), None);
        assert_eq!(fold_binary(BinaryOp::Rem, Literal::Int(1), Literal::Int(0)), None);
    }

    #[test]
    fn comparisons_produce_booleans() {
        assert_eq!(
            fold_binary(BinaryOp::Less, Literal::Int(1), Literal::Int(2)),
            Some(Literal::Bool(true))
        );
        assert_eq!(
            fold_binary(BinaryOp::Equal, Literal::Bool(true), Literal::Bool(false)),
            Some(Literal::Bool(false))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, Literal::Bool(true), Literal::Bool(false)),
            None
        );
    }
}
