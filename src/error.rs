//! Error module for the Rusty NEF library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq, Clone)]
pub enum NefError {
    /// Error for invalid parameters, e.g., a non-positive time constant.
    InvalidParameter(String),
    /// Error for a transform whose shape does not match the connected nodes.
    DimensionMismatch { expected: usize, actual: usize },
    /// Error for a node name not found in the network.
    UnknownNode(String),
    /// Error for a node name already used in the network.
    DuplicateNode(String),
    /// Error for an operation not supported by the target node, e.g., wiring into an input.
    InvalidOperation(String),
    /// Error while solving for decoding weights.
    DecoderSolve(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for NefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NefError::InvalidParameter(e) => write!(f, "Invalid parameter: {}", e),
            NefError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {} but got {}",
                expected, actual
            ),
            NefError::UnknownNode(name) => write!(f, "Unknown node: {}", name),
            NefError::DuplicateNode(name) => write!(f, "Duplicate node name: {}", name),
            NefError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
            NefError::DecoderSolve(e) => write!(f, "Decoder solve error: {}", e),
            NefError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for NefError {}
