//! Replay buffer interface.
//!
//! Collaborators such as a training loop interact with a replay buffer only
//! through these traits: experiences are pushed by the process interacting with
//! an environment, and batches are drawn and re-prioritized by the learner.
use anyhow::Result;

/// Interface for buffers that store experiences.
///
/// # Examples
///
/// ```
/// use per_buffer::{ExperienceBufferBase, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig};
///
/// let config = PrioritizedReplayBufferConfig::new(4);
/// let mut buffer = PrioritizedReplayBuffer::new(&config).unwrap();
/// buffer.push("transition").unwrap();
/// assert_eq!(buffer.len(), 1);
/// ```
pub trait ExperienceBufferBase {
    /// The type of experiences stored in the buffer.
    type Item;

    /// Pushes an experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the number of experiences in the buffer.
    fn len(&self) -> usize;
}

/// Interface for replay buffers that generate batches for training.
///
/// It is independent of [`ExperienceBufferBase`], so that a learner can own a
/// replay buffer without knowing how experiences are pushed into it.
pub trait ReplayBufferBase {
    /// Configuration of the replay buffer.
    type Config: Clone;

    /// Batch generated for training.
    type Batch;

    /// Builds a replay buffer from a configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Draws a batch of `size` experiences.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Rewrites the priorities of experiences from their absolute TD errors.
    ///
    /// `ixs` are the indices returned in a batch and `td_errs` must have the
    /// same length.
    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()>;
}
