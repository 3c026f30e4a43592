//! Error types for action validation
//!
//! A `SchemaError` always concerns one candidate (or one `addMultiple` item)
//! and never aborts its siblings. `EmptyBatch` and `NotABatch` are the only
//! batch-level failures.

/// Malformed action candidate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Nothing to validate
    #[error("the command produced no actions")]
    EmptyBatch,

    /// Top-level value is neither an object nor an array
    #[error("expected an action object or array, found {found}")]
    NotABatch {
        /// JSON type found
        found: &'static str,
    },

    /// Element is not a JSON object
    #[error("expected an action object, found {found}")]
    NotAnObject {
        /// JSON type found
        found: &'static str,
    },

    /// Element has no `action` tag and no `feedback`
    #[error("missing field `action`")]
    MissingTag,

    /// Tag is not part of the vocabulary
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// A required field is absent
    #[error("{action}: missing field `{field}`")]
    MissingField {
        /// Action tag
        action: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Shape outside the closed enumeration
    #[error("{action}: unknown shape '{value}' in field `{field}`")]
    UnknownShape {
        /// Action tag
        action: &'static str,
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Field present but unusable
    #[error("{action}: invalid field `{field}`: {reason}")]
    InvalidField {
        /// Action tag
        action: &'static str,
        /// Field name (dotted path for nested values)
        field: String,
        /// What was wrong
        reason: String,
    },

    /// `targetId`/`targetIds` entry is not an object id
    #[error("{action}: '{value}' in field `{field}` is not an object id")]
    InvalidTargetId {
        /// Action tag
        action: &'static str,
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },
}

impl SchemaError {
    /// Field the error is about, if any
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::MissingTag | SchemaError::UnknownAction(_) => Some("action"),
            SchemaError::MissingField { field, .. }
            | SchemaError::UnknownShape { field, .. }
            | SchemaError::InvalidTargetId { field, .. } => Some(*field),
            SchemaError::InvalidField { field, .. } => Some(field.as_str()),
            SchemaError::EmptyBatch | SchemaError::NotABatch { .. } | SchemaError::NotAnObject { .. } => None,
        }
    }

    /// Whether the whole batch is unusable (as opposed to one element)
    #[inline]
    #[must_use]
    pub fn is_batch_level(&self) -> bool {
        matches!(self, SchemaError::EmptyBatch | SchemaError::NotABatch { .. })
    }

    pub(crate) fn invalid(action: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            action,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// JSON type name for diagnostics
pub(crate) fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
