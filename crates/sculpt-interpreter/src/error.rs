//! Error types for command interpretation
//!
//! Every variant is terminal for the command it occurred in: the scene is
//! never touched when interpretation fails.

/// Interpretation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    /// Could not reach the language-model service
    #[error("language model unreachable: {0}")]
    Unreachable(String),

    /// Service answered with a non-success status
    #[error("language model returned {status}: {body}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// No answer within the configured timeout
    #[error("language model timed out after {timeout_secs}s")]
    Timeout {
        /// Configured limit
        timeout_secs: u64,
    },

    /// Answer was not valid JSON
    #[error("could not parse model output: {0}")]
    Malformed(String),

    /// Answer parsed but contained no recognizable action
    #[error("the command was not understood")]
    Unrecognized,

    /// Answer was empty
    #[error("the language model returned an empty response")]
    EmptyResponse,
}

impl InterpreterError {
    /// Whether retrying the same command may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout { .. } | Self::EmptyResponse => true,
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::Unrecognized => false,
        }
    }

    /// Short message suitable for the user's feedback line
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable(_) | Self::Service { .. } | Self::Timeout { .. } => {
                format!("The command could not be processed: {self}. Please try again.")
            }
            Self::Malformed(_) | Self::EmptyResponse => {
                "The command could not be processed: the response was unusable.".to_string()
            }
            Self::Unrecognized => "Sorry, I did not understand that command.".to_string(),
        }
    }
}

/// Maximum response body kept in `Service` errors
pub(crate) const MAX_ERROR_BODY: usize = 512;

pub(crate) fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
