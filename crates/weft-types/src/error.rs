//! Error types for the Weft engine.
//!
//! All crates return `WeftResult<T>` from fallible operations.
//! Recoverable solver events (a stalled inner solve, a rejected line
//! search) are *not* errors — they are reported on the step result —
//! so every variant here either aborts a step or rejects an input.

use thiserror::Error;

/// Unified error type for the Weft engine.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Mesh data is malformed: index out of range, degenerate rest
    /// triangle, inconsistent buffer lengths.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Material parameter is out of valid range.
    #[error("Invalid material parameter: {0}")]
    InvalidMaterial(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The state handed to a step already contains a penetration.
    #[error("Penetrating input state: {0}")]
    PenetratingState(String),

    /// A gradient, Hessian, or iterate produced a non-finite value.
    /// The step is aborted without mutating the caller's state.
    #[error("Non-finite value in {context}")]
    NonFinite { context: &'static str },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, WeftError>`.
pub type WeftResult<T> = Result<T, WeftError>;
