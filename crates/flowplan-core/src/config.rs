use serde::{Deserialize, Serialize};

/// Tuning knobs for one propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Absolute tolerance, in items per minute, for edge balance checks and
    /// for deciding that the logistics fixpoint has stopped changing.
    pub tolerance: f64,
    /// Upper bound on logistics fixpoint passes.
    pub max_iterations: usize,
}

impl EngineConfig {
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;
    pub const DEFAULT_MAX_ITERATIONS: usize = 32;

    /// Whether two rates are equal within tolerance.
    pub fn close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tolerance
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}
