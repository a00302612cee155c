//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// All variants are contract violations detected at the boundary of the
/// priority tree or the replay buffer. They are reported to the caller as is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerError {
    /// Sampling was requested while the total priority is zero.
    #[error("Cannot sample from a replay buffer with zero total priority")]
    EmptyBuffer,

    /// A leaf index outside of the populated leaf range of the priority tree.
    #[error("Leaf index {ix} is out of range: {n_leaves} populated leaves from index {first_leaf}")]
    IndexOutOfRange {
        /// The index given by the caller.
        ix: usize,

        /// The index of the first leaf in the tree.
        first_leaf: usize,

        /// The number of populated leaves.
        n_leaves: usize,
    },

    /// Leaf indices and errors given to a priority update differ in length.
    #[error("Length mismatch in priority update: {n_ixs} indices, {n_errors} errors")]
    LengthMismatch {
        /// Number of leaf indices.
        n_ixs: usize,

        /// Number of errors.
        n_errors: usize,
    },

    /// An absolute error given to a priority update is NaN.
    #[error("Absolute error for leaf index {ix} is NaN")]
    NanError {
        /// The leaf index paired with the error.
        ix: usize,
    },

    /// Invalid value in the configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
