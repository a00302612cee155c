//! Scheduling the exponent of importance weight for PER.
use serde::{Deserialize, Serialize};

/// Scheduler of the exponent of importance weight for PER.
///
/// $\beta$ grows linearly with the number of sampled batches and is capped
/// at 1. It is computed from the counter rather than accumulated, so the value
/// after `n` batches does not depend on rounding of earlier steps.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Increment of $\beta$ per sampled batch.
    pub beta_increment: f32,

    /// Number of sampled batches.
    pub n_samples: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_increment: f32) -> Self {
        Self {
            beta_0,
            beta_increment,
            n_samples: 0,
        }
    }

    /// Gets the exponent of importance sampling weight.
    pub fn beta(&self) -> f32 {
        let beta = self.beta_0 + self.beta_increment * self.n_samples as f32;
        beta.min(1.)
    }

    /// Counts a sampled batch.
    pub fn add_n_samples(&mut self) {
        self.n_samples += 1;
    }
}
