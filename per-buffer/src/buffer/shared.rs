//! Replay buffer shared among threads.
use super::{PerBatch, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig};
use crate::PerError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable handle of a [`PrioritizedReplayBuffer`] behind a single mutex.
///
/// Each method holds the lock for the whole operation, so a partially
/// propagated priority update is never observed by another thread. Actors
/// pushing records and a learner sampling batches can each keep a clone.
///
/// # Examples
///
/// ```
/// use per_buffer::{PrioritizedReplayBufferConfig, SharedReplayBuffer};
/// use std::thread;
///
/// let buffer = SharedReplayBuffer::build(&PrioritizedReplayBufferConfig::new(64)).unwrap();
/// let handles = (0..4)
///     .map(|id| {
///         let buffer = buffer.clone();
///         thread::spawn(move || (0..8).for_each(|i| buffer.insert((id, i))))
///     })
///     .collect::<Vec<_>>();
/// handles.into_iter().for_each(|h| h.join().unwrap());
///
/// assert_eq!(buffer.size(), 32);
/// ```
#[derive(Debug)]
pub struct SharedReplayBuffer<T> {
    inner: Arc<Mutex<PrioritizedReplayBuffer<T>>>,
}

impl<T> Clone for SharedReplayBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> From<PrioritizedReplayBuffer<T>> for SharedReplayBuffer<T> {
    fn from(buffer: PrioritizedReplayBuffer<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }
}

impl<T> SharedReplayBuffer<T> {
    /// Creates an empty shared replay buffer.
    pub fn build(config: &PrioritizedReplayBufferConfig) -> Result<Self, PerError> {
        Ok(PrioritizedReplayBuffer::new(config)?.into())
    }

    fn lock(&self) -> MutexGuard<'_, PrioritizedReplayBuffer<T>> {
        // Operations mutate the tree only after their checks have passed and
        // cannot panic halfway through a propagation.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`PrioritizedReplayBuffer::insert`].
    pub fn insert(&self, record: T) {
        self.lock().insert(record)
    }

    /// See [`PrioritizedReplayBuffer::update`].
    pub fn update(&self, ixs: &[usize], abs_errors: &[f32]) -> Result<(), PerError> {
        self.lock().update(ixs, abs_errors)
    }

    /// See [`PrioritizedReplayBuffer::total_priority`].
    pub fn total_priority(&self) -> f32 {
        self.lock().total_priority()
    }

    /// See [`PrioritizedReplayBuffer::size`].
    pub fn size(&self) -> usize {
        self.lock().size()
    }

    /// Runs `f` with the buffer locked.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut PrioritizedReplayBuffer<T>) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<T: Clone> SharedReplayBuffer<T> {
    /// See [`PrioritizedReplayBuffer::sample`].
    pub fn sample(&self, n: usize) -> Result<PerBatch<T>, PerError> {
        self.lock().sample(n)
    }
}
