#![warn(missing_docs)]
//! Prioritized experience replay for reinforcement learning.
//!
//! Records are sampled with probability proportional to their priority, which
//! is rewritten from the errors a learner computes for them. Sampling and
//! priority updates take O(log N) time on a [`PriorityTree`].
pub mod buffer;
pub mod error;
pub mod priority_tree;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};
pub use buffer::{
    IwScheduler, PerBatch, PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig,
    SharedReplayBuffer,
};
pub use error::PerError;
pub use priority_tree::PriorityTree;
