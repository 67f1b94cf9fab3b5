//! Analysis (phase 2) - resolve names, types and overloads.
//!
//! Every node's analysis is a [`Task`] keyed by the node's handle. Tasks read
//! the results of other tasks from set-once cells; a missing result becomes
//! an [`Interrupt::Wait`] on the task that produces it. Side effects (writing
//! a result, registering overloads, creating instances) happen only after
//! every dependency is available, so a task re-run after a wake-up does the
//! same thing the first successful run would have done.
//!
//! ## Dependencies
//!
//! ```text
//! identifier      → the expression its symbol refers to
//! member access   → base expression, then the member's expression
//! call            → callee, arguments, overload set (or signature)
//! signature       → parameter type expressions, return type expression
//! body            → signature, body statements
//! overload set    → every member signature
//! ```

mod expr;
mod function;
pub mod scheduler;
mod stmt;

use quill_core::{CompilationError, Span};

use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, TypeId};
use crate::node::{ExprInfo, ExprKind, Program, Resolution, Signature};
use crate::options::CompilerOptions;
use scheduler::{Runner, Scheduler};

/// A unit of analysis work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Expr(ExprId),
    Stmt(StmtId),
    /// Parameter and return types of a function.
    Signature(FunctionId),
    /// Statements of a function body, plus the return check.
    Body(FunctionId),
    /// Registration of every member signature of an overload set.
    OverloadSet(OverloadSetId),
}

/// Why a task stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Another task must complete first.
    Wait(Task),
    /// A name must be declared in (or the scope closed) first.
    WaitName { scope: ScopeId, name: String },
    /// Fatal error.
    Fail(CompilationError),
}

impl From<CompilationError> for Interrupt {
    fn from(error: CompilationError) -> Self {
        Interrupt::Fail(error)
    }
}

/// Phase 2 driver.
pub struct Analyzer<'p> {
    program: &'p Program,
    scheduler: Scheduler,
    workers: usize,
}

impl<'p> Analyzer<'p> {
    pub fn new(program: &'p Program, options: &CompilerOptions) -> Self {
        Self {
            program,
            scheduler: Scheduler::new(),
            workers: options.worker_threads.max(1),
        }
    }

    /// Analyze everything reachable from `roots`.
    ///
    /// # Errors
    ///
    /// Every fatal error raised before the scheduler stopped.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&self, roots: Vec<Task>) -> Result<(), Vec<CompilationError>> {
        tracing::debug!(
            roots = roots.len(),
            workers = self.workers,
            "analysis started"
        );
        self.scheduler.spawn(roots);
        let result = self.scheduler.run(self, self.workers);
        tracing::debug!(
            completed = self.scheduler.completed(),
            ok = result.is_ok(),
            "analysis finished"
        );
        result
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Queue tasks created while analyzing (typeclass instances).
    pub(crate) fn spawn(&self, tasks: Vec<Task>) {
        self.scheduler.spawn(tasks);
    }

    // ========================================================================
    // Dependency accessors
    // ========================================================================

    /// Analysis result of `expr`, or a wait on it.
    pub(crate) fn info(&self, expr: ExprId) -> Result<ExprInfo, Interrupt> {
        self.program
            .expr(expr)
            .info()
            .cloned()
            .ok_or(Interrupt::Wait(Task::Expr(expr)))
    }

    /// The type denoted by a type-valued expression.
    pub(crate) fn type_value(&self, expr: ExprId) -> Result<TypeId, Interrupt> {
        let info = self.info(expr)?;
        match info.value {
            Some(ty) if info.ty == TypeId::TYPE => Ok(ty),
            _ => Err(CompilationError::mismatch(
                format!(
                    "expected a type, found a value of type '{}'",
                    self.program.explain(info.ty)
                ),
                self.program.expr(expr).span,
            )
            .into()),
        }
    }

    pub(crate) fn signature(&self, function: FunctionId) -> Result<Signature, Interrupt> {
        self.program
            .function(function)
            .signature()
            .cloned()
            .ok_or(Interrupt::Wait(Task::Signature(function)))
    }

    pub(crate) fn stmt_done(&self, stmt: StmtId) -> Result<(), Interrupt> {
        if self.program.stmt(stmt).is_analyzed() {
            Ok(())
        } else {
            Err(Interrupt::Wait(Task::Stmt(stmt)))
        }
    }

    pub(crate) fn set_ready(&self, set: OverloadSetId) -> Result<(), Interrupt> {
        if self.program.set(set).is_ready() {
            Ok(())
        } else {
            Err(Interrupt::Wait(Task::OverloadSet(set)))
        }
    }

    /// Resolve `name` from `scope` to the expression its symbol refers to.
    pub(crate) fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        span: Span,
    ) -> Result<ExprId, Interrupt> {
        match self.program.resolve(scope, name) {
            Resolution::Found(symbol) => self.program.symbol(symbol).expr().ok_or_else(|| {
                CompilationError::internal(format!("symbol '{}' is unbound", name)).into()
            }),
            Resolution::Pending(scope) => Err(Interrupt::WaitName {
                scope,
                name: name.to_string(),
            }),
            Resolution::Missing => Err(CompilationError::UnresolvedName {
                name: name.to_string(),
                span,
            }
            .into()),
        }
    }
}

impl Runner for Analyzer<'_> {
    fn run(&self, task: Task) -> Result<(), Interrupt> {
        match task {
            Task::Expr(id) => self.analyze_expr(id),
            Task::Stmt(id) => self.analyze_stmt(id),
            Task::Signature(id) => self.analyze_signature(id),
            Task::Body(id) => self.analyze_body(id),
            Task::OverloadSet(id) => self.analyze_set(id),
        }
    }

    fn park(&self, scope: ScopeId, name: &str, task: Task) -> bool {
        self.program.scope(scope).wait(name, task)
    }

    fn describe(&self, task: Task) -> (String, Span) {
        let program = self.program;
        match task {
            Task::Expr(id) => {
                let node = program.expr(id);
                let label = match node.kind() {
                    ExprKind::Var(var) => format!("'{}'", program.var(var).name),
                    ExprKind::Ident { name } => format!("'{}'", name),
                    ExprKind::Member { name, .. } => format!("'.{}'", name),
                    ExprKind::Call { .. } => "call".to_string(),
                    _ => "expression".to_string(),
                };
                (label, node.span)
            }
            Task::Stmt(id) => ("statement".to_string(), program.stmt(id).span),
            Task::Signature(id) => {
                let f = program.function(id);
                (format!("signature of '{}'", f.name), f.span)
            }
            Task::Body(id) => {
                let f = program.function(id);
                (format!("body of '{}'", f.name), f.span)
            }
            Task::OverloadSet(id) => {
                let set = program.set(id);
                (format!("overload set '{}'", set.name), set.span)
            }
        }
    }
}
