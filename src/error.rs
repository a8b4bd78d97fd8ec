//! Error types for graph construction, persistence and search.

use thiserror::Error;

/// Errors that can occur while building, persisting or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Invalid parameter value (rejected before any work starts).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Distance function name that is not supported.
    #[error("unknown distance function {0:?}: specify Euclidian or mips")]
    UnknownMetric(String),

    /// A neighbor list would exceed the configured max degree.
    #[error("node {node}: degree {degree} exceeds max degree {max_degree}")]
    DegreeOverflow {
        node: u32,
        degree: usize,
        max_degree: usize,
    },

    /// Node id or position outside the valid range.
    #[error("index {index} out of range (len {len})")]
    OutOfBounds { index: usize, len: usize },

    /// Vector dimension does not match the point set.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Operation needs at least one point.
    #[error("index is empty")]
    EmptyIndex,

    /// Malformed or truncated file contents.
    #[error("format error: {0}")]
    Format(String),

    /// I/O error (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The graph arena could not be allocated.
    #[error("allocation failed: {0}")]
    Allocation(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Map an I/O error raised while reading a file into a format error when the
    /// file simply ended early.
    pub(crate) fn from_read(err: std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            IndexError::Format(format!("{what}: file is truncated"))
        } else {
            IndexError::Io(err)
        }
    }
}
