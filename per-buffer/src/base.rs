//! Interfaces of the replay buffer.
mod replay_buffer;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
