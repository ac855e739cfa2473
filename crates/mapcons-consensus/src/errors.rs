//! Error types for consensus calculation.

use thiserror::Error;

/// Result type alias for consensus operations
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Error type for consensus operations
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Data points reached the builder with a decreasing position.
    ///
    /// This indicates sessions were registered in the wrong order and aborts the consensus.
    #[error("Data points not sorted: position {current} follows position {previous}")]
    PositionsOutOfOrder {
        /// Position of the previously resolved data point
        previous: i64,
        /// Position of the offending data point
        current: i64,
    },

    /// The calculation was interrupted through its cancellation token
    #[error("Consensus calculation was cancelled")]
    Cancelled,

    /// An external assembly or search service failed
    #[error("{service} failed: {message}")]
    Service {
        /// Which service failed (e.g. "assembler")
        service: &'static str,
        /// The service's error message, including its causes
        message: String,
    },

    /// Invalid option value provided
    #[error("Invalid option '{option}': {reason}")]
    InvalidOption {
        /// The option name
        option: &'static str,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Invalid fraction for a frequency option
    #[error("Invalid frequency for '{option}': {value} (must be greater than 0 and at most 1)")]
    InvalidFrequency {
        /// The option name
        option: &'static str,
        /// The invalid value
        value: f64,
    },

    /// A read's alignment description does not match its bases
    #[error("Invalid alignment for read '{read}': {reason}")]
    InvalidAlignment {
        /// The read name
        read: String,
        /// Explanation of the problem
        reason: String,
    },
}

impl ConsensusError {
    /// Returns true if this error is the cancellation outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
