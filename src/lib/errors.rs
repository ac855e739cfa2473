//! Custom error types for mapcons input handling.

use thiserror::Error;

/// Result type alias for mapcons input handling
pub type Result<T> = std::result::Result<T, MapconsError>;

/// Error type for mapcons input handling
#[derive(Error, Debug)]
pub enum MapconsError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM", "FASTA")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Reference sequence named on the command line is missing from the header
    #[error("Reference sequence '{ref_name}' not found in header")]
    ReferenceNotFound {
        /// The reference sequence name
        ref_name: String,
    },

    /// External program could not be started
    #[error("Program '{program}' could not be run: {reason}")]
    ProgramUnavailable {
        /// The program name or path
        program: String,
        /// Explanation of the problem
        reason: String,
    },
}
