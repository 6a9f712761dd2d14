//! Custom error types for flowkit operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for flowkit operations
pub type Result<T> = std::result::Result<T, FlowkitError>;

/// Error type for flowkit operations
#[derive(Error, Debug)]
pub enum FlowkitError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid flow file '{path}': {reason}")]
    InvalidFileFormat {
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Unknown sort field name
    #[error("Unknown sort field '{name}'")]
    UnknownField {
        /// The field name as given
        name: String,
    },

    /// Read failure on an input stream
    #[error("Error reading '{}'", path.display())]
    Input {
        /// Path of the stream
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Write or close failure on the output stream
    #[error("Error writing '{}'", path.display())]
    Output {
        /// Path of the stream
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Failure creating, writing, or reading a temporary run file
    #[error("Temporary file error")]
    TempFile {
        /// Underlying I/O error
        source: io::Error,
    },

    /// A run file ended in the middle of a node
    #[error("Temporary run #{id} is truncated")]
    TruncatedRun {
        /// Run id
        id: u32,
    },

    /// Sort buffer allocation fell below the in-core minimum
    #[error("Error allocating space for {records} records")]
    Allocation {
        /// Smallest record count that was attempted
        records: usize,
    },

    /// A derived-key callback failed
    #[error("Key field '{name}' failed: {reason}")]
    KeyField {
        /// Name of the derived key
        name: String,
        /// Explanation from the callback
        reason: String,
    },
}
