//! Resource limits for listfile execution
//!
//! These limits turn runaway listfiles (unbounded recursion, endless loops,
//! self-referencing variables) into reported fatal errors instead of
//! exhausting the native stack or spinning forever.

/// Resource limits for a run
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum nesting of frames: function/macro calls, `include()`,
    /// `add_subdirectory()` and block replays (`if`, `foreach`, `while`)
    /// Default: 100
    pub max_call_depth: usize,

    /// Maximum iterations for a single loop
    /// Default: 100,000
    pub max_loop_iterations: usize,

    /// Maximum nested re-expansion of variable values
    /// Default: 32
    pub max_expansion_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 100,
            max_loop_iterations: 100_000,
            max_expansion_depth: 32,
        }
    }
}

impl ExecutionLimits {
    /// Create new limits with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum call depth
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set maximum loop iterations
    pub fn max_loop_iterations(mut self, count: usize) -> Self {
        self.max_loop_iterations = count;
        self
    }

    /// Set maximum expansion depth
    pub fn max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }
}

/// Execution counters for tracking resource usage
#[derive(Debug, Clone, Default)]
pub struct ExecutionCounters {
    /// Number of invocations dispatched
    pub invocations: usize,

    /// Current frame depth
    pub call_depth: usize,

    /// Deepest frame depth reached during the run
    pub max_call_depth_seen: usize,
}

impl ExecutionCounters {
    /// Create new counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatched invocation
    pub fn tick_invocation(&mut self) {
        self.invocations += 1;
    }

    /// Push a frame, returns error if depth exceeded
    pub fn push_frame(&mut self, limits: &ExecutionLimits) -> Result<(), LimitExceeded> {
        // Check before incrementing so we don't leave invalid state on failure
        if self.call_depth >= limits.max_call_depth {
            return Err(LimitExceeded::MaxCallDepth(limits.max_call_depth));
        }
        self.call_depth += 1;
        self.max_call_depth_seen = self.max_call_depth_seen.max(self.call_depth);
        Ok(())
    }

    /// Pop a frame
    pub fn pop_frame(&mut self) {
        if self.call_depth > 0 {
            self.call_depth -= 1;
        }
    }
}

/// Per-loop iteration guard.
///
/// Each loop command owns one, so nested loops are counted independently.
#[derive(Debug, Clone, Default)]
pub struct LoopGuard {
    iterations: usize,
}

impl LoopGuard {
    /// Start counting a fresh loop
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an iteration, returns error if limit exceeded
    pub fn tick(&mut self, limits: &ExecutionLimits) -> Result<(), LimitExceeded> {
        self.iterations += 1;
        if self.iterations > limits.max_loop_iterations {
            return Err(LimitExceeded::MaxLoopIterations(limits.max_loop_iterations));
        }
        Ok(())
    }

    /// Iterations counted so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Error returned when a resource limit is exceeded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitExceeded {
    #[error("maximum recursion depth exceeded ({0})")]
    MaxCallDepth(usize),

    #[error("maximum loop iterations exceeded ({0})")]
    MaxLoopIterations(usize),

    #[error("maximum variable expansion depth exceeded ({0})")]
    MaxExpansionDepth(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionLimits::default();
        assert_eq!(limits.max_call_depth, 100);
        assert_eq!(limits.max_loop_iterations, 100_000);
        assert_eq!(limits.max_expansion_depth, 32);
    }

    #[test]
    fn test_builder_pattern() {
        let limits = ExecutionLimits::new()
            .max_call_depth(10)
            .max_loop_iterations(50)
            .max_expansion_depth(4);

        assert_eq!(limits.max_call_depth, 10);
        assert_eq!(limits.max_loop_iterations, 50);
        assert_eq!(limits.max_expansion_depth, 4);
    }

    #[test]
    fn test_loop_guard() {
        let limits = ExecutionLimits::new().max_loop_iterations(3);
        let mut guard = LoopGuard::new();

        for _ in 0..3 {
            assert!(guard.tick(&limits).is_ok());
        }

        // 4th iteration should fail
        assert_eq!(
            guard.tick(&limits),
            Err(LimitExceeded::MaxLoopIterations(3))
        );

        // A new loop starts from zero
        let mut fresh = LoopGuard::new();
        assert!(fresh.tick(&limits).is_ok());
        assert_eq!(fresh.iterations(), 1);
    }

    #[test]
    fn test_frame_depth() {
        let limits = ExecutionLimits::new().max_call_depth(2);
        let mut counters = ExecutionCounters::new();

        assert!(counters.push_frame(&limits).is_ok());
        assert!(counters.push_frame(&limits).is_ok());

        // 3rd frame should fail without changing the depth
        assert_eq!(
            counters.push_frame(&limits),
            Err(LimitExceeded::MaxCallDepth(2))
        );
        assert_eq!(counters.call_depth, 2);

        // Pop and try again
        counters.pop_frame();
        assert!(counters.push_frame(&limits).is_ok());
        assert_eq!(counters.max_call_depth_seen, 2);
    }
}
