use crate::shape::Shape;

/// All errors that can occur in the tensor layer.
///
/// Covers element-count mismatches when building tensors, out-of-range
/// dimensions and indices, and shape disagreements when stacking.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Index tuple has the wrong number of coordinates for the tensor.
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Dimension index out of range for the tensor's rank.
    #[error("dimension out of range: dim {dim} for tensor with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Element index out of range along one dimension.
    #[error("index out of range: index {index} at dim {dim} of size {size}")]
    IndexOutOfRange { dim: usize, index: usize, size: usize },

    /// Element count mismatch when creating from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// `stack` was given no tensors.
    #[error("stack: empty tensor list")]
    EmptyStack,

    /// A tensor passed to `stack` differs in shape from the first one.
    #[error("stack: tensor {index} has shape {got} but expected {expected}")]
    StackShapeMismatch {
        index: usize,
        expected: Shape,
        got: Shape,
    },
}

/// Convenience Result type used throughout vitset-core.
pub type Result<T> = std::result::Result<T, Error>;
