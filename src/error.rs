use thiserror::Error;

/// Failures of the layout algebra.
///
/// With fully static operands these are construction-time defects: the
/// operation can never succeed for any runtime input. With dynamic operands
/// they propagate to the caller, who is expected to have arranged
/// divisibility up front (e.g. ceil-div on grid dimensions).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("shape {shape} and stride {stride} are not congruent")]
    ShapeMismatch { shape: String, stride: String },

    #[error("{num} is not divisible by {den}")]
    Divisibility { num: i64, den: i64 },

    #[error("element sizes {old} and {new} are not whole multiples")]
    Recast { old: usize, new: usize },

    #[error("rank {got} exceeds layout rank {expected}")]
    RankMismatch { expected: usize, got: usize },

    #[error("index {index} out of bounds for domain of size {size}")]
    OutOfBounds { index: i64, size: i64 },

    #[error("slice spec {spec} does not match layout {layout}")]
    InvalidSlice { spec: String, layout: String },

    #[error("negative stride {0} is outside the supported envelope here")]
    NegativeStride(i64),
}

pub type Result<T> = core::result::Result<T, LayoutError>;
