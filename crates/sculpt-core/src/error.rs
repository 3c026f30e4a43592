//! Pipeline errors
//!
//! Interpretation, validation and import failures are reported inside a
//! [`CommandReport`](crate::CommandReport); these are the failures that leave
//! no report at all.

use crate::config::ConfigError;

/// Errors returned by [`CommandPipeline`](crate::CommandPipeline)
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Another command is running and the policy is `Reject`
    #[error("another command is still running")]
    Busy,

    /// The command was cancelled before any action ran
    #[error("command cancelled")]
    Cancelled,

    /// `choose` was called with nothing on offer
    #[error("no model choices are pending")]
    NoPendingChoice,

    /// `choose` index past the offered candidates
    #[error("choice {index} is out of range, {available} candidates are on offer")]
    ChoiceOutOfRange {
        /// Requested index (zero-based)
        index: usize,
        /// Candidates on offer
        available: usize,
    },

    /// Blank command text
    #[error("command is empty")]
    EmptyCommand,

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A client could not be constructed
    #[error("pipeline setup failed: {0}")]
    Setup(String),
}

impl PipelineError {
    /// Check if retrying the same call can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Busy | PipelineError::Cancelled)
    }
}
