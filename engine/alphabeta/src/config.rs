//! Search configuration parameters.

use search_core::Q;
use thiserror::Error;

/// Rejected configuration values. The setter that returns this leaves the
/// previous configuration in place.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration rejected: {0}")]
    Rejected(String),
}

/// Configuration for the alpha-beta engine.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Nominal iterative-deepening target.
    pub base_depth: i32,

    /// Absolute depth cap, extensions included.
    pub max_depth: i32,

    /// Maximum ply inside quiescence.
    pub quiescence_depth: i32,

    /// Wall-clock budget for the whole search in milliseconds; 0 = none.
    pub time_limit_ms: f64,

    /// Maximum wall-clock per incremental step in milliseconds; 0 = run
    /// to completion within one call.
    pub frame_budget_ms: f64,

    /// UCB exploration constant `c`.
    pub exploration_constant: f64,

    /// Null-move pruning and its depth reduction R.
    pub use_null_move: bool,
    pub null_move_reduction: i32,

    /// Late-move reductions.
    pub use_lmr: bool,

    /// Aspiration window search and its half-width.
    pub use_aspiration_windows: bool,
    pub aspiration_window: Q,

    /// Transposition table budget in megabytes.
    pub tt_size_mb: usize,

    /// Entropy-driven adaptive depth policy and its bounds.
    pub adaptive_depth: bool,
    pub low_entropy_threshold: Q,
    pub high_entropy_threshold: Q,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_depth: 10,
            max_depth: 30,
            quiescence_depth: 8,
            time_limit_ms: 0.0,
            frame_budget_ms: 2.0,
            exploration_constant: std::f64::consts::SQRT_2,
            use_null_move: true,
            null_move_reduction: 3,
            use_lmr: true,
            use_aspiration_windows: true,
            aspiration_window: Q::from_float(0.25),
            tt_size_mb: 64,
            adaptive_depth: true,
            low_entropy_threshold: Q::from_float(0.5),
            high_entropy_threshold: Q::from_float(2.5),
        }
    }
}

impl SearchConfig {
    /// Small, fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            base_depth: 4,
            max_depth: 8,
            quiescence_depth: 4,
            frame_budget_ms: 0.0,
            tt_size_mb: 1,
            adaptive_depth: false,
            ..Default::default()
        }
    }

    /// Validate every knob; out-of-range values are rejected as a unit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_depth < 1 {
            return Err(ConfigError::Rejected(format!(
                "base_depth must be >= 1, got {}",
                self.base_depth
            )));
        }
        if self.max_depth < self.base_depth {
            return Err(ConfigError::Rejected(format!(
                "max_depth {} below base_depth {}",
                self.max_depth, self.base_depth
            )));
        }
        if self.quiescence_depth < 0 {
            return Err(ConfigError::Rejected(format!(
                "quiescence_depth must be >= 0, got {}",
                self.quiescence_depth
            )));
        }
        if self.time_limit_ms < 0.0 || !self.time_limit_ms.is_finite() {
            return Err(ConfigError::Rejected(format!(
                "time_limit_ms must be a finite value >= 0, got {}",
                self.time_limit_ms
            )));
        }
        if self.frame_budget_ms < 0.0 || !self.frame_budget_ms.is_finite() {
            return Err(ConfigError::Rejected(format!(
                "frame_budget_ms must be a finite value >= 0, got {}",
                self.frame_budget_ms
            )));
        }
        if self.tt_size_mb < 1 {
            return Err(ConfigError::Rejected(format!(
                "tt_size_mb must be >= 1, got {}",
                self.tt_size_mb
            )));
        }
        if self.use_null_move && self.null_move_reduction < 1 {
            return Err(ConfigError::Rejected(format!(
                "null_move_reduction must be >= 1, got {}",
                self.null_move_reduction
            )));
        }
        if self.use_aspiration_windows && self.aspiration_window <= Q::ZERO {
            return Err(ConfigError::Rejected(
                "aspiration_window must be positive".to_string(),
            ));
        }
        if self.adaptive_depth && self.low_entropy_threshold >= self.high_entropy_threshold {
            return Err(ConfigError::Rejected(
                "low_entropy_threshold must be below high_entropy_threshold".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder pattern: set base search depth.
    pub fn with_base_depth(mut self, depth: i32) -> Self {
        self.base_depth = depth;
        self
    }

    /// Builder pattern: set the per-step frame budget.
    pub fn with_frame_budget_ms(mut self, budget: f64) -> Self {
        self.frame_budget_ms = budget;
        self
    }

    /// Builder pattern: set the total time limit.
    pub fn with_time_limit_ms(mut self, limit: f64) -> Self {
        self.time_limit_ms = limit;
        self
    }

    /// Builder pattern: set the transposition table size.
    pub fn with_tt_size_mb(mut self, mb: usize) -> Self {
        self.tt_size_mb = mb;
        self
    }
}
