//! Error types for pressure payload decoding.

use thiserror::Error;

/// Errors produced while turning a raw sensor payload into a pressure matrix.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload held fewer samples than a full grid needs.
    #[error("pressure payload too short: recovered {actual} of {expected} samples")]
    Shortfall {
        /// Samples required for a full grid.
        expected: usize,
        /// Samples the payload actually provided.
        actual: usize,
    },

    /// The decoded samples could not be arranged into the grid.
    #[error("pressure grid shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl DecodeError {
    /// Creates a shortfall error.
    #[must_use]
    pub const fn shortfall(expected: usize, actual: usize) -> Self {
        Self::Shortfall { expected, actual }
    }
}
