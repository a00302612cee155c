//! Batch drawn from [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).

/// A batch of records with their leaf indices and importance sampling weights.
///
/// The three vectors have the same length. `ixs` are to be passed back to
/// [`PrioritizedReplayBuffer::update`](super::PrioritizedReplayBuffer::update)
/// together with the errors computed for `records`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerBatch<T> {
    /// Leaf indices of the sampled records in the priority tree.
    pub ixs: Vec<usize>,

    /// Sampled records.
    pub records: Vec<T>,

    /// Importance sampling weights.
    pub weights: Vec<f32>,
}

impl<T> PerBatch<T> {
    /// Returns the number of samples in the batch.
    pub fn len(&self) -> usize {
        self.ixs.len()
    }

    /// Returns `true` if the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.ixs.is_empty()
    }

    /// Decomposes the batch into leaf indices, records and weights.
    pub fn unpack(self) -> (Vec<usize>, Vec<T>, Vec<f32>) {
        (self.ixs, self.records, self.weights)
    }
}
