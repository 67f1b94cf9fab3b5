//! Simplification (phase 3) - rewrite the analyzed tree to a fixed point.
//!
//! Each pass walks every module's root statements on the worker pool and
//! asks every reachable node for its simplest equivalent. A node answers
//! with itself, a replacement, or a freshly built literal; a parent that
//! receives a different handle writes it back into its own children.
//!
//! Results are memoized per node within a pass ([`SimplifyContext`]), so a
//! node shared by several parents (or reachable through a cycle) is
//! simplified at most once per pass. Passes repeat until one makes no
//! replacement and no call folding was cut off by the inline depth, up to
//! [`CompilerOptions::max_simplify_passes`].

mod fold;
mod rules;

pub use fold::{CallCache, fold_binary};

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use quill_core::ModuleId;
use rustc_hash::FxHashMap;

use crate::arena::{ExprId, StmtId, VarId};
use crate::node::Program;
use crate::options::CompilerOptions;

/// Memo table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Memo<T> {
    /// Being simplified by some caller up the stack (or another worker).
    Pending,
    Done(T),
}

/// Outcome of claiming a memo slot.
enum Claim<T> {
    /// The caller owns the slot and must finish it.
    Fresh,
    Busy,
    Done(T),
}

fn claim<K: Hash + Eq + Copy, T: Copy>(table: &RwLock<FxHashMap<K, Memo<T>>>, key: K) -> Claim<T> {
    let seen = |memo: &Memo<T>| match memo {
        Memo::Pending => Claim::Busy,
        Memo::Done(value) => Claim::Done(*value),
    };
    if let Some(memo) = table.read().get(&key) {
        return seen(memo);
    }
    let mut table = table.write();
    if let Some(memo) = table.get(&key) {
        return seen(memo);
    }
    table.insert(key, Memo::Pending);
    Claim::Fresh
}

/// Per-pass simplification state.
#[derive(Debug, Default)]
pub struct SimplifyContext {
    exprs: RwLock<FxHashMap<ExprId, Memo<ExprId>>>,
    stmts: RwLock<FxHashMap<StmtId, Memo<StmtId>>>,
    vars: RwLock<FxHashMap<VarId, Memo<()>>>,
    replacements: AtomicUsize,
    visits: AtomicUsize,
}

impl SimplifyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes that simplified to a different handle in this pass.
    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::Relaxed)
    }

    /// Nodes simplified (not served from the memo) in this pass.
    pub fn visits(&self) -> usize {
        self.visits.load(Ordering::Relaxed)
    }

    fn claim_expr(&self, id: ExprId) -> Claim<ExprId> {
        claim(&self.exprs, id)
    }

    fn finish_expr(&self, id: ExprId, result: ExprId) {
        if result != id {
            self.replacements.fetch_add(1, Ordering::Relaxed);
        }
        self.exprs.write().insert(id, Memo::Done(result));
    }

    fn claim_stmt(&self, id: StmtId) -> Claim<StmtId> {
        claim(&self.stmts, id)
    }

    fn finish_stmt(&self, id: StmtId, result: StmtId) {
        if result != id {
            self.replacements.fetch_add(1, Ordering::Relaxed);
        }
        self.stmts.write().insert(id, Memo::Done(result));
    }

    fn claim_var(&self, id: VarId) -> bool {
        matches!(claim(&self.vars, id), Claim::Fresh)
    }

    fn finish_var(&self, id: VarId) {
        self.vars.write().insert(id, Memo::Done(()));
    }

    fn visit(&self) {
        self.visits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Simplification rules over one program.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier<'p> {
    program: &'p Program,
    calls: &'p CallCache,
    max_passes: usize,
    max_depth: usize,
    /// Nesting of call folding this simplifier runs under.
    depth: usize,
    /// Raised when a nested call fold gave up before finishing.
    truncated: Option<&'p AtomicBool>,
}

impl<'p> Simplifier<'p> {
    pub fn new(program: &'p Program, calls: &'p CallCache, options: &CompilerOptions) -> Self {
        Self {
            program,
            calls,
            max_passes: options.max_simplify_passes.max(1),
            max_depth: options.max_inline_depth,
            depth: 0,
            truncated: None,
        }
    }

    /// Run one pass over every module's root statements.
    pub fn pass(&self, ctx: &SimplifyContext, workers: usize) {
        let program = self.program;
        let roots: Vec<(ModuleId, usize, StmtId)> = program
            .modules
            .ids()
            .into_iter()
            .flat_map(|module| {
                program
                    .module(module)
                    .stmts()
                    .into_iter()
                    .enumerate()
                    .map(move |(index, stmt)| (module, index, stmt))
            })
            .collect();

        let next = AtomicUsize::new(0);
        let (roots, next) = (&roots, &next);
        let workers = workers.clamp(1, roots.len().max(1));
        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(move || {
                    while let Some(&(module, index, stmt)) =
                        roots.get(next.fetch_add(1, Ordering::Relaxed))
                    {
                        let simplified = self.stmt(ctx, stmt);
                        if simplified != stmt {
                            program.module(module).replace_stmt(index, simplified);
                        }
                    }
                });
            }
        });
    }
}

/// Outcome of the simplification phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyReport {
    /// Passes run, including the final one that changed nothing.
    pub passes: usize,
    /// The pass cap was reached before a fixed point.
    pub capped: bool,
}

/// Simplify every module of `program` to a fixed point.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn simplify_program(program: &Program, options: &CompilerOptions) -> SimplifyReport {
    let calls = CallCache::new();
    let simplifier = Simplifier::new(program, &calls, options);
    let workers = options.worker_threads.max(1);

    let mut passes = 0;
    while passes < simplifier.max_passes {
        passes += 1;
        let ctx = SimplifyContext::new();
        simplifier.pass(&ctx, workers);
        let resumed = simplifier.resume_deferred();
        tracing::debug!(
            pass = passes,
            replacements = ctx.replacements(),
            visits = ctx.visits(),
            resumed,
            "simplification pass"
        );
        if ctx.replacements() == 0 && resumed == 0 {
            return SimplifyReport {
                passes,
                capped: false,
            };
        }
    }

    tracing::warn!(passes, "simplification stopped before reaching a fixed point");
    SimplifyReport {
        passes,
        capped: true,
    }
}
