//! Prioritized experience replay.
//!
//! # Key Components
//!
//! - [`PrioritizedReplayBuffer`]: circular record store sampled by priority
//! - [`PerBatch`]: records drawn in a batch, with leaf indices and importance weights
//! - [`PerConfig`], [`PrioritizedReplayBufferConfig`]: configuration
//! - [`IwScheduler`]: annealing of the importance sampling exponent
//! - [`SharedReplayBuffer`]: the buffer behind a mutex
//!
//! # Examples
//!
//! ```
//! use per_buffer::{PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig};
//!
//! let config = PrioritizedReplayBufferConfig::new(1000)
//!     .seed(42)
//!     .per_config(PerConfig::default().alpha(0.6).beta_0(0.4));
//! let mut buffer = PrioritizedReplayBuffer::new(&config).unwrap();
//!
//! for i in 0..100 {
//!     buffer.insert(vec![i as f32; 4]);
//! }
//!
//! // A learning step.
//! let batch = buffer.sample(32).unwrap();
//! let td_errs = batch.records.iter().map(|r| r[0] / 100.).collect::<Vec<_>>();
//! buffer.update(&batch.ixs, &td_errs).unwrap();
//! ```
mod base;
mod batch;
mod config;
mod shared;
pub use base::{IwScheduler, PrioritizedReplayBuffer};
pub use batch::PerBatch;
pub use config::{PerConfig, PrioritizedReplayBufferConfig};
pub use shared::SharedReplayBuffer;
