//! Error types for asset import
//!
//! Any failure after download leaves the arena as it was: staged handles are
//! released by the staging guard before the error reaches the caller.

/// Asset import failure
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Search returned no downloadable models
    #[error("no downloadable models found for '{term}'")]
    NoResults {
        /// Search term
        term: String,
    },

    /// Payload is neither an archive nor a glTF document
    #[error("unsupported package format: {detail}")]
    UnsupportedFormat {
        /// What was found instead
        detail: String,
    },

    /// Archive holds no `.gltf` or `.glb` entry
    #[error("archive contains no .gltf or .glb model")]
    MissingModelEntry,

    /// Archive could not be read
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Archive entry could not be read
    #[error("archive entry error: {0}")]
    Io(#[from] std::io::Error),

    /// Model document failed to parse or validate
    #[error("invalid model document: {0}")]
    InvalidDocument(String),

    /// Download exceeds the configured limit
    #[error("download of {bytes} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Reported or received size
        bytes: u64,
        /// Configured limit
        limit: u64,
    },

    /// Asset service call failed
    #[error("asset service {operation} failed: {message}")]
    Service {
        /// Which call
        operation: &'static str,
        /// HTTP status, if one was received
        status: Option<u16>,
        /// Detail
        message: String,
    },

    /// Import abandoned before completion
    #[error("import cancelled")]
    Cancelled,
}

impl ImportError {
    /// Service error helper
    pub fn service(operation: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Whether retrying the import may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service { status, .. } => status.map_or(true, |s| s == 429 || s >= 500),
            Self::Cancelled => true,
            _ => false,
        }
    }

    /// Short label for metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoResults { .. } => "no_results",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::MissingModelEntry => "missing_model_entry",
            Self::Archive(_) | Self::Io(_) => "archive",
            Self::InvalidDocument(_) => "invalid_document",
            Self::TooLarge { .. } => "too_large",
            Self::Service { .. } => "service",
            Self::Cancelled => "cancelled",
        }
    }
}
