//! Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
//!
//! Both structures are serializable, so that they can be kept in YAML files
//! next to the other configurations of a training run.
use crate::PerError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Hyperparameters of prioritized experience replay.
///
/// # Examples
///
/// ```
/// use per_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.7)
///     .beta_0(0.4)
///     .beta_increment(1e-5);
/// assert_eq!(config.epsilon, 0.01);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Added to absolute errors before clamping, so that no record ends up with
    /// zero priority.
    pub epsilon: f32,

    /// Exponent converting clamped errors into priorities. A value of 0 results
    /// in uniform sampling, 1 in sampling proportional to the error.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Increment of the importance sampling exponent per sampled batch.
    /// The exponent is capped at 1.
    pub beta_increment: f32,

    /// Upper clamp of absolute errors. It is also the priority given to the
    /// first record of an empty buffer.
    pub abs_err_upper: f32,
}

impl Default for PerConfig {
    /// - `epsilon = 0.01`
    /// - `alpha = 0.6`
    /// - `beta_0 = 0.3`
    /// - `beta_increment = 2e-6`
    /// - `abs_err_upper = 1.0`
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            alpha: 0.6,
            beta_0: 0.3,
            beta_increment: 2e-6,
            abs_err_upper: 1.0,
        }
    }
}

impl PerConfig {
    /// Sets `epsilon`.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the increment of the importance sampling exponent.
    pub fn beta_increment(mut self, beta_increment: f32) -> Self {
        self.beta_increment = beta_increment;
        self
    }

    /// Sets the upper clamp of absolute errors.
    pub fn abs_err_upper(mut self, abs_err_upper: f32) -> Self {
        self.abs_err_upper = abs_err_upper;
        self
    }

    /// Checks that every hyperparameter lies in its domain.
    pub fn validate(&self) -> Result<(), PerError> {
        let invalid = |msg: String| Err(PerError::InvalidConfig(msg));

        if !(self.epsilon >= 0.) || !self.epsilon.is_finite() {
            return invalid(format!("epsilon must be non-negative, got {}", self.epsilon));
        }
        if !(self.alpha >= 0.) || !self.alpha.is_finite() {
            return invalid(format!("alpha must be non-negative, got {}", self.alpha));
        }
        if !(0. ..=1.).contains(&self.beta_0) {
            return invalid(format!("beta_0 must be in [0, 1], got {}", self.beta_0));
        }
        if !(self.beta_increment >= 0.) || !self.beta_increment.is_finite() {
            return invalid(format!(
                "beta_increment must be non-negative, got {}",
                self.beta_increment
            ));
        }
        if !(self.abs_err_upper > 0.) || !self.abs_err_upper.is_finite() {
            return invalid(format!(
                "abs_err_upper must be positive, got {}",
                self.abs_err_upper
            ));
        }

        Ok(())
    }
}

fn default_seed() -> u64 {
    42
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
///
/// The capacity has no default; `seed` and `per_config` fall back to their
/// defaults when missing in a YAML file.
///
/// # Examples
///
/// ```
/// use per_buffer::{PerConfig, PrioritizedReplayBufferConfig};
///
/// let config = PrioritizedReplayBufferConfig::new(10_000)
///     .seed(7)
///     .per_config(PerConfig::default().alpha(0.5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PrioritizedReplayBufferConfig {
    /// Number of record slots. When the buffer is full, new records replace
    /// the oldest ones.
    pub capacity: usize,

    /// Seed of the random number generator used for sampling.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Hyperparameters of prioritized sampling.
    #[serde(default)]
    pub per_config: PerConfig,
}

impl PrioritizedReplayBufferConfig {
    /// Creates a configuration with the given capacity and default values
    /// for the others.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seed: default_seed(),
            per_config: PerConfig::default(),
        }
    }

    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the hyperparameters of prioritized sampling.
    pub fn per_config(mut self, per_config: PerConfig) -> Self {
        self.per_config = per_config;
        self
    }

    /// Checks the capacity and the hyperparameters.
    pub fn validate(&self) -> Result<(), PerError> {
        if self.capacity == 0 {
            return Err(PerError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }
        self.per_config.validate()
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
