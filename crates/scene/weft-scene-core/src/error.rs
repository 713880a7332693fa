use thiserror::Error;

/// Reconstruction failures. Serialization itself cannot fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer {0} is missing from the transfer list")]
    MissingBuffer(usize),
    #[error("buffer {buffer} holds {actual} bytes, expected {expected}")]
    BufferLength {
        buffer: usize,
        expected: usize,
        actual: usize,
    },
    #[error("buffer {0} is referenced twice")]
    BufferReused(usize),
    #[error("geometry {0} does not exist")]
    MissingGeometry(usize),
    #[error("node {0} does not exist")]
    MissingNode(usize),
    #[error("node {0} is reachable more than once")]
    NodeRevisited(usize),
    #[error("buffer {buffer} declares a size that overflows: {count} items of {item_bytes} bytes")]
    SizeOverflow {
        buffer: usize,
        count: usize,
        item_bytes: usize,
    },
    #[error("attribute '{name}' has item size 0")]
    ZeroItemSize { name: String },
}
