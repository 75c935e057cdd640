//! Graph construction configuration
//!
//! Budgets and checks applied while a [`Graph`](crate::ir::Graph) is built and
//! finalized. Budgets protect the enclosing compiler against runaway input: exceeding
//! one yields [`Error::ResourceExhaustion`](crate::Error::ResourceExhaustion) and the
//! graph is abandoned.

/// Configuration for graph construction and finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
    /// Maximum number of blocks a graph may create, entry included (default: 1 << 20)
    pub max_blocks: usize,

    /// Maximum loop nesting depth accepted by block ordering (default: 64)
    pub max_loop_depth: usize,

    /// Run [`Graph::verify`](crate::ir::Graph::verify) at the end of
    /// [`Graph::finalize`](crate::ir::Graph::finalize) (default: on in debug builds)
    pub verify: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_blocks: 1 << 20,
            max_loop_depth: 64,
            verify: cfg!(debug_assertions),
        }
    }
}

impl GraphConfig {
    /// Creates a configuration that always verifies finalized graphs
    #[must_use]
    pub fn strict() -> Self {
        Self {
            verify: true,
            ..Self::default()
        }
    }

    /// Sets the block budget
    #[must_use]
    pub const fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Sets the loop nesting budget
    #[must_use]
    pub const fn with_max_loop_depth(mut self, max_loop_depth: usize) -> Self {
        self.max_loop_depth = max_loop_depth;
        self
    }

    /// Enables or disables verification during finalization
    #[must_use]
    pub const fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}
