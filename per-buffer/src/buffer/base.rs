//! Prioritized replay buffer built on [`PriorityTree`].
mod iw_scheduler;
use super::{PerBatch, PerConfig, PrioritizedReplayBufferConfig};
use crate::{ExperienceBufferBase, PerError, PriorityTree, ReplayBufferBase};
use anyhow::Result;
pub use iw_scheduler::IwScheduler;
use log::{info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Stabilizer in the denominator of importance sampling weights.
const DELTA: f32 = 1e-4;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// A fixed-capacity replay buffer sampling records by priority.
///
/// Records are kept in a circular store of `capacity` slots; each slot has a
/// leaf in a [`PriorityTree`]. The buffer interacts with its collaborators as
/// follows:
///
/// ```mermaid
/// graph LR
///     Actor -- insert --> Buffer
///     Buffer -- add --> PriorityTree
///     Learner -- sample --> Buffer
///     Buffer -- lookup --> PriorityTree
///     Learner -- "update(ixs, abs_errors)" --> Buffer
///     Buffer -- update --> PriorityTree
/// ```
///
/// * [`insert`](Self::insert) gives a new record the maximum priority present
///   in the tree, or `abs_err_upper` if the tree is empty, so that every record
///   is sampled at least once before its error is known.
/// * [`sample`](Self::sample) splits the total priority into `n` strata of equal
///   width and draws one record from each of them. The importance sampling
///   weight of a record with normalized priority $p$ is
///   $(p / (p_{min} + \delta))^{-\beta}$, where $p_{min}$ is the minimum
///   normalized priority over the populated slots. $\beta$ is then annealed
///   towards 1 by [`IwScheduler`].
/// * [`update`](Self::update) sets the priority of each given leaf to
///   $\min(|e| + \epsilon, e_{upper})^\alpha$.
///
/// The buffer is not synchronized; see [`SharedReplayBuffer`](super::SharedReplayBuffer)
/// for sharing it among threads.
///
/// # Examples
///
/// ```
/// use per_buffer::{PrioritizedReplayBuffer, PrioritizedReplayBufferConfig};
///
/// let config = PrioritizedReplayBufferConfig::new(8).seed(1);
/// let mut buffer = PrioritizedReplayBuffer::new(&config).unwrap();
/// for i in 0..8 {
///     buffer.insert(i);
/// }
///
/// let batch = buffer.sample(4).unwrap();
/// let abs_errors = vec![0.5; batch.len()];
/// buffer.update(&batch.ixs, &abs_errors).unwrap();
/// ```
#[derive(Debug)]
pub struct PrioritizedReplayBuffer<T> {
    /// Priorities and records.
    tree: PriorityTree<T>,

    /// Hyperparameters.
    per_config: PerConfig,

    /// Scheduler of the importance sampling exponent.
    iw_scheduler: IwScheduler,

    /// Random number generator for sampling.
    rng: StdRng,
}

impl<T> PrioritizedReplayBuffer<T> {
    /// Creates an empty replay buffer.
    pub fn new(config: &PrioritizedReplayBufferConfig) -> Result<Self, PerError> {
        config.validate()?;
        let per_config = config.per_config.clone();
        info!(
            "Creates prioritized replay buffer with capacity {}, {:?}",
            config.capacity, per_config
        );

        Ok(Self {
            tree: PriorityTree::new(config.capacity)?,
            iw_scheduler: IwScheduler::new(per_config.beta_0, per_config.beta_increment),
            per_config,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Returns the number of record slots.
    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    /// Returns the number of records in the buffer.
    pub fn size(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if no record has been inserted.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns `true` if the buffer overwrites the oldest record on insertion.
    pub fn is_full(&self) -> bool {
        self.tree.is_full()
    }

    /// Sum of the priorities of all records.
    pub fn total_priority(&self) -> f32 {
        self.tree.total_priority()
    }

    /// Current importance sampling exponent.
    pub fn beta(&self) -> f32 {
        self.iw_scheduler.beta()
    }

    /// Hyperparameters of the buffer.
    pub fn per_config(&self) -> &PerConfig {
        &self.per_config
    }

    /// The underlying priority tree.
    pub fn tree(&self) -> &PriorityTree<T> {
        &self.tree
    }

    /// Maximum priority over the records, zero for an empty buffer.
    pub fn max_priority(&self) -> f32 {
        self.tree.max_priority()
    }

    /// Minimum priority over the records, zero for an empty buffer.
    pub fn min_priority(&self) -> f32 {
        self.tree.min_priority()
    }

    /// Priority of the record at a leaf index.
    pub fn priority(&self, ix: usize) -> Result<f32, PerError> {
        self.tree.priority(ix)
    }

    /// Converts an absolute error into a priority.
    ///
    /// A NaN error is absorbed by the clamp and yields `abs_err_upper^alpha`;
    /// [`PrioritizedReplayBuffer::update`] rejects NaN before calling this.
    pub fn priority_of(&self, abs_error: f32) -> f32 {
        let PerConfig {
            epsilon,
            alpha,
            abs_err_upper,
            ..
        } = self.per_config;
        (abs_error.abs() + epsilon).min(abs_err_upper).powf(alpha)
    }

    /// Inserts a record, overwriting the oldest one if the buffer is full.
    pub fn insert(&mut self, record: T) {
        let max_p = self.tree.max_priority();
        let p = if max_p > 0. {
            max_p
        } else {
            self.per_config.abs_err_upper
        };

        let was_full = self.tree.is_full();
        self.tree.add(p, record);

        if !was_full && self.tree.is_full() {
            info!(
                "Replay buffer is full ({} records), the oldest records will be overwritten",
                self.tree.capacity()
            );
        }
    }

    /// Rewrites the priorities of records from their absolute errors.
    ///
    /// All indices and errors are checked before any priority is written, so
    /// a failed call leaves the buffer unchanged. A NaN error fails with
    /// [`PerError::NanError`].
    pub fn update(&mut self, ixs: &[usize], abs_errors: &[f32]) -> Result<(), PerError> {
        if ixs.len() != abs_errors.len() {
            return Err(PerError::LengthMismatch {
                n_ixs: ixs.len(),
                n_errors: abs_errors.len(),
            });
        }
        for (&ix, abs_error) in ixs.iter().zip(abs_errors.iter()) {
            self.tree.priority(ix)?;
            if abs_error.is_nan() {
                return Err(PerError::NanError { ix });
            }
        }

        for (&ix, &abs_error) in ixs.iter().zip(abs_errors.iter()) {
            let p = self.priority_of(abs_error);
            self.tree.update(ix, p)?;
        }

        Ok(())
    }
}

impl<T: Clone> PrioritizedReplayBuffer<T> {
    /// Draws `n` records by stratified priority-weighted sampling.
    ///
    /// Fails with [`PerError::EmptyBuffer`] if the total priority is zero.
    pub fn sample(&mut self, n: usize) -> Result<PerBatch<T>, PerError> {
        let total = self.tree.total_priority();
        if !(total > 0.) {
            return Err(PerError::EmptyBuffer);
        }

        let beta = self.iw_scheduler.beta();
        let p_min = self.tree.min_priority() / total;
        let segment = total / n as f32;

        let mut ixs = Vec::with_capacity(n);
        let mut records = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);

        for i in 0..n {
            let v = segment * i as f32 + segment * self.rng.gen::<f32>();
            let (ix, p, record) = self.tree.lookup(v)?;
            let p = p / total;
            ixs.push(ix);
            records.push(record.clone());
            weights.push((p / (p_min + DELTA)).powf(-beta));
        }

        self.iw_scheduler.add_n_samples();
        trace!(
            "Sampled {} records, total priority = {}, beta = {}",
            n,
            total,
            beta
        );

        Ok(PerBatch {
            ixs,
            records,
            weights,
        })
    }
}

impl<T> ExperienceBufferBase for PrioritizedReplayBuffer<T> {
    type Item = T;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.insert(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.size()
    }
}

impl<T: Clone> ReplayBufferBase for PrioritizedReplayBuffer<T> {
    type Config = PrioritizedReplayBufferConfig;
    type Batch = PerBatch<T>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self::new(config)?)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }

    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        Ok(self.update(ixs, td_errs)?)
    }
}
