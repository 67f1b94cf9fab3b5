//! Compiler configuration.

/// Options controlling one compilation.
///
/// # Example
///
/// ```
/// use quill_compiler::CompilerOptions;
///
/// let options = CompilerOptions::default()
///     .with_worker_threads(2)
///     .with_entry_point(None);
/// assert_eq!(options.worker_threads, 2);
/// assert!(options.entry_point.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Size of the analysis and simplification worker pool.
    pub worker_threads: usize,
    /// Name of the entry symbol in the root modules.
    ///
    /// `None` compiles a library: no entry is validated and every function
    /// of the root modules is lowered.
    pub entry_point: Option<String>,
    /// Run the simplification engine between analysis and lowering.
    pub simplify: bool,
    /// Upper bound on simplification passes before giving up with a warning.
    pub max_simplify_passes: usize,
    /// Upper bound on nested call folding within one pass. Calls reached
    /// at the bound are folded over later passes; zero turns call folding
    /// off.
    pub max_inline_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(8),
            entry_point: Some("entry".to_string()),
            simplify: true,
            max_simplify_passes: 64,
            max_inline_depth: 32,
        }
    }
}

impl CompilerOptions {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_entry_point(mut self, entry: Option<&str>) -> Self {
        self.entry_point = entry.map(str::to_string);
        self
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    pub fn with_max_simplify_passes(mut self, passes: usize) -> Self {
        self.max_simplify_passes = passes;
        self
    }

    pub fn with_max_inline_depth(mut self, depth: usize) -> Self {
        self.max_inline_depth = depth;
        self
    }
}
