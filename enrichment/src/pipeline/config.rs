//! Configuration for the per-record retry loop.

/// Configuration for the per-record retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Highest retry number that still re-queries (default: 4).
    ///
    /// A record whose retry number exceeds this value is abandoned.
    pub max_retries: u32,
    /// Upper bound on resolve/validate cycles per record and run (default: 5).
    ///
    /// Kept at `max_retries + 1` by [`PipelineConfig::with_max_retries`] so a
    /// fresh record reaches the ceiling within one run.
    pub max_cycles: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            max_cycles: 5,
        }
    }
}

impl PipelineConfig {
    /// Set the retry ceiling, and the cycle bound to `max + 1`.
    #[must_use]
    pub const fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self.max_cycles = (max as usize).saturating_add(1);
        self
    }

    /// Set the maximum number of cycles per record.
    #[must_use]
    pub const fn with_max_cycles(mut self, max: usize) -> Self {
        self.max_cycles = max;
        self
    }
}
