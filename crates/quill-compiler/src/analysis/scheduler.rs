//! Dependency-driven task scheduler.
//!
//! Tasks run on a bounded pool of scoped worker threads pulling from one
//! shared queue. A task either completes or yields the first dependency it
//! is missing; the scheduler records the edge, spawns the dependency if it
//! has never been spawned, and re-queues the waiting task once the
//! dependency completes.
//!
//! ```text
//!            spawn               Ok
//!   ────────► ready ──► running ────► done ──► wake dependents
//!               ▲          │
//!               │          │ Wait(dep) / WaitName(scope, name)
//!               └─ wake ── blocked
//! ```
//!
//! When nothing is runnable and nothing is running, the scheduler stops.
//! Anything still blocked at that point is either a dependency cycle
//! (strongly connected components of the blocked graph) or a name that was
//! never declared.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use quill_core::{CompilationError, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{Interrupt, Task};
use crate::arena::ScopeId;

/// The work the scheduler drives.
pub trait Runner: Sync {
    /// Run a task to completion or to its first missing dependency.
    fn run(&self, task: Task) -> Result<(), Interrupt>;

    /// Park `task` on `scope` until `name` is declared there or the scope
    /// closes. Returns `false` when the question is already answered.
    fn park(&self, scope: ScopeId, name: &str, task: Task) -> bool;

    /// Diagnostic label and location of a task.
    fn describe(&self, task: Task) -> (String, Span);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Blocker {
    Task(Task),
    Name { name: String },
}

#[derive(Debug, Default)]
struct State {
    ready: VecDeque<Task>,
    spawned: FxHashSet<Task>,
    done: FxHashSet<Task>,
    /// dependency -> tasks waiting for it
    dependents: FxHashMap<Task, Vec<Task>>,
    blocked: FxHashMap<Task, Blocker>,
    active: usize,
    errors: Vec<CompilationError>,
}

impl State {
    fn complete(&mut self, task: Task) {
        self.done.insert(task);
        if let Some(waiting) = self.dependents.remove(&task) {
            for t in waiting {
                self.blocked.remove(&t);
                self.ready.push_back(t);
            }
        }
    }
}

/// Shared queue and waiter graph.
#[derive(Debug, Default)]
pub struct Scheduler {
    state: Mutex<State>,
    wakeup: Condvar,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue tasks that have never been spawned.
    pub fn spawn(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut state = self.state.lock();
        for task in tasks {
            if state.spawned.insert(task) {
                state.ready.push_back(task);
            }
        }
        self.wakeup.notify_all();
    }

    /// Re-queue tasks parked on a name.
    pub fn wake(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for task in tasks {
            if state.blocked.remove(&task).is_some() {
                tracing::trace!(?task, "woken by scope");
                state.ready.push_back(task);
            }
        }
        self.wakeup.notify_all();
    }

    /// Whether `task` has completed.
    pub fn is_done(&self, task: Task) -> bool {
        self.state.lock().done.contains(&task)
    }

    /// Number of completed tasks.
    pub fn completed(&self) -> usize {
        self.state.lock().done.len()
    }

    /// Drive every spawned task to completion on `workers` threads.
    ///
    /// # Errors
    ///
    /// The first fatal error raised by a task, or the diagnostics of a
    /// stall (cycles and never-declared names).
    pub fn run<R: Runner>(&self, runner: &R, workers: usize) -> Result<(), Vec<CompilationError>> {
        let workers = workers.max(1);
        std::thread::scope(|s| {
            for index in 0..workers {
                s.spawn(move || self.worker(runner, index));
            }
        });

        let mut state = self.state.lock();
        if !state.errors.is_empty() {
            return Err(std::mem::take(&mut state.errors));
        }
        if !state.blocked.is_empty() {
            return Err(stall_errors(&state, runner));
        }
        Ok(())
    }

    fn worker<R: Runner>(&self, runner: &R, index: usize) {
        loop {
            let task = {
                let mut state = self.state.lock();
                loop {
                    if !state.errors.is_empty() {
                        self.wakeup.notify_all();
                        return;
                    }
                    if let Some(task) = state.ready.pop_front() {
                        state.active += 1;
                        break task;
                    }
                    if state.active == 0 {
                        self.wakeup.notify_all();
                        return;
                    }
                    self.wakeup.wait(&mut state);
                }
            };

            tracing::trace!(worker = index, ?task, "running task");
            let outcome = runner.run(task);

            let mut state = self.state.lock();
            state.active -= 1;
            match outcome {
                Ok(()) => state.complete(task),
                Err(Interrupt::Wait(dep)) => {
                    if state.done.contains(&dep) {
                        state.ready.push_back(task);
                    } else {
                        tracing::trace!(?task, ?dep, "blocked on task");
                        state.dependents.entry(dep).or_default().push(task);
                        state.blocked.insert(task, Blocker::Task(dep));
                        if state.spawned.insert(dep) {
                            state.ready.push_back(dep);
                        }
                    }
                }
                Err(Interrupt::WaitName { scope, name }) => {
                    if runner.park(scope, &name, task) {
                        tracing::trace!(?task, %name, "blocked on name");
                        state.blocked.insert(task, Blocker::Name { name });
                    } else {
                        state.ready.push_back(task);
                    }
                }
                Err(Interrupt::Fail(error)) => {
                    tracing::debug!(?task, %error, "task failed");
                    state.errors.push(error);
                }
            }
            self.wakeup.notify_all();
        }
    }
}

/// Explain why blocked tasks can never run.
fn stall_errors<R: Runner>(state: &State, runner: &R) -> Vec<CompilationError> {
    let mut errors = Vec::new();

    let mut names: Vec<(Span, String)> = state
        .blocked
        .iter()
        .filter_map(|(&task, blocker)| match blocker {
            Blocker::Name { name } => Some((runner.describe(task).1, name.clone())),
            Blocker::Task(_) => None,
        })
        .collect();
    names.sort_by_key(|(span, _)| (span.line, span.col));
    for (span, name) in names {
        errors.push(CompilationError::UnresolvedName { name, span });
    }

    let mut graph: DiGraph<Task, ()> = DiGraph::new();
    let mut nodes: FxHashMap<Task, NodeIndex> = FxHashMap::default();
    let mut node = |graph: &mut DiGraph<Task, ()>, task: Task| {
        *nodes.entry(task).or_insert_with(|| graph.add_node(task))
    };
    for (&task, blocker) in &state.blocked {
        if let Blocker::Task(dep) = blocker {
            let from = node(&mut graph, task);
            let to = node(&mut graph, *dep);
            graph.add_edge(from, to, ());
        }
    }

    let mut cycles: Vec<(Span, String)> = Vec::new();
    for component in tarjan_scc(&graph) {
        let first = component[0];
        let cyclic = component.len() > 1 || graph.contains_edge(first, first);
        if !cyclic {
            continue;
        }
        // Each blocked task waits on exactly one dependency, so a cyclic
        // component is a simple cycle; walk it from its earliest member.
        let tasks: Vec<Task> = component.iter().map(|&n| graph[n]).collect();
        let start = tasks
            .iter()
            .copied()
            .min_by_key(|&t| {
                let span = runner.describe(t).1;
                (span.line, span.col)
            })
            .unwrap_or(graph[first]);
        let mut chain = vec![runner.describe(start).0];
        let mut current = start;
        while let Some(Blocker::Task(next)) = state.blocked.get(&current) {
            if *next == start || chain.len() > tasks.len() {
                break;
            }
            chain.push(runner.describe(*next).0);
            current = *next;
        }
        chain.push(runner.describe(start).0);
        cycles.push((runner.describe(start).1, chain.join(" -> ")));
    }
    cycles.sort_by_key(|(span, _)| (span.line, span.col));
    for (span, chain) in cycles {
        errors.push(CompilationError::CyclicDependency { chain, span });
    }

    if errors.is_empty() {
        errors.push(CompilationError::internal(format!(
            "analysis stalled with {} blocked task(s)",
            state.blocked.len()
        )));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaId, ExprId, ScopeId, SymbolId};
    use crate::scope::{LocalLookup, Scope, ScopeKind};

    fn t(n: usize) -> Task {
        Task::Expr(ExprId::from_index(n))
    }

    /// Each task depends on the listed tasks; completes once they are done.
    struct Graph<'s> {
        deps: FxHashMap<Task, Vec<Task>>,
        scheduler: &'s Scheduler,
    }

    impl Runner for Graph<'_> {
        fn run(&self, task: Task) -> Result<(), Interrupt> {
            for dep in self.deps.get(&task).into_iter().flatten() {
                if !self.scheduler.is_done(*dep) {
                    return Err(Interrupt::Wait(*dep));
                }
            }
            Ok(())
        }

        fn park(&self, _: ScopeId, _: &str, _: Task) -> bool {
            false
        }

        fn describe(&self, task: Task) -> (String, Span) {
            match task {
                Task::Expr(e) => (format!("t{}", e.index()), Span::new(e.index() as u32, 1, 1)),
                other => (format!("{:?}", other), Span::default()),
            }
        }
    }

    #[test]
    fn dependencies_run_first() {
        let scheduler = Scheduler::new();
        let mut deps = FxHashMap::default();
        deps.insert(t(1), vec![t(2), t(3)]);
        deps.insert(t(2), vec![t(3)]);
        let graph = Graph {
            deps,
            scheduler: &scheduler,
        };
        scheduler.spawn([t(1)]);
        scheduler.run(&graph, 4).unwrap();
        assert!(scheduler.is_done(t(1)));
        assert!(scheduler.is_done(t(2)));
        assert!(scheduler.is_done(t(3)));
        assert_eq!(scheduler.completed(), 3);
    }

    #[test]
    fn cycle_is_reported() {
        let scheduler = Scheduler::new();
        let mut deps = FxHashMap::default();
        deps.insert(t(1), vec![t(2)]);
        deps.insert(t(2), vec![t(3)]);
        deps.insert(t(3), vec![t(1)]);
        deps.insert(t(4), vec![t(1)]);
        let graph = Graph {
            deps,
            scheduler: &scheduler,
        };
        scheduler.spawn([t(4)]);
        let errors = scheduler.run(&graph, 2).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            CompilationError::CyclicDependency { chain, .. } => {
                assert_eq!(chain, "t1 -> t2 -> t3 -> t1");
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    /// A task that needs `name` declared in a scope before it can finish.
    struct NameWaiter {
        scope: Scope,
    }

    impl Runner for NameWaiter {
        fn run(&self, _: Task) -> Result<(), Interrupt> {
            match self.scope.lookup_local("x") {
                LocalLookup::Found(_) => Ok(()),
                LocalLookup::Open => Err(Interrupt::WaitName {
                    scope: ScopeId::from_index(0),
                    name: "x".into(),
                }),
                LocalLookup::Closed => Err(Interrupt::Fail(
                    CompilationError::UnresolvedName {
                        name: "x".into(),
                        span: Span::default(),
                    },
                )),
            }
        }

        fn park(&self, _: ScopeId, name: &str, task: Task) -> bool {
            self.scope.wait(name, task)
        }

        fn describe(&self, _: Task) -> (String, Span) {
            ("x".into(), Span::new(7, 1, 1))
        }
    }

    #[test]
    fn name_never_declared_is_unresolved() {
        let scheduler = Scheduler::new();
        let runner = NameWaiter {
            scope: Scope::new(None, ScopeKind::Module),
        };
        scheduler.spawn([t(1)]);
        let errors = scheduler.run(&runner, 1).unwrap_err();
        assert!(matches!(
            &errors[0],
            CompilationError::UnresolvedName { name, span } if name == "x" && span.line == 7
        ));
    }

    #[test]
    fn declaration_wakes_parked_task() {
        let scheduler = Scheduler::new();
        let runner = NameWaiter {
            scope: Scope::new(None, ScopeKind::Module),
        };
        scheduler.spawn([t(1)]);
        // First run parks the task.
        assert!(scheduler.run(&runner, 1).is_err());

        let woken = runner
            .scope
            .declare("x", SymbolId::from_index(0), Span::default())
            .unwrap();
        assert_eq!(woken, vec![t(1)]);
        scheduler.wake(woken);
        scheduler.run(&runner, 1).unwrap();
        assert!(scheduler.is_done(t(1)));
    }
}
