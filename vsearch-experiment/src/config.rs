use serde::{Deserialize, Serialize};

/// Fixed design of one session. Built once, never mutated while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub set_sizes: Vec<u32>,
    /// Per set size; the first half of each block is target-present.
    pub trials_per_set: usize,
    pub response_timeout_ms: u64,
    /// Half-open range `[lo, hi)` for the pre-stimulus delay.
    pub fixation_range_ms: (u64, u64),
    pub feedback_duration_ms: u64,
    /// Side length of the square search grid.
    pub grid_size: u32,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            set_sizes: vec![5, 10, 15, 20],
            trials_per_set: 10,
            response_timeout_ms: 4000,
            fixation_range_ms: (500, 1000),
            feedback_duration_ms: 800,
            grid_size: 5,
        }
    }
}

impl ExperimentConfig {
    pub fn total_trials(&self) -> usize {
        self.set_sizes.len() * self.trials_per_set
    }
}
