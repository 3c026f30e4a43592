//! Per-command feedback
//!
//! Every action yields exactly one [`FeedbackEntry`]; a [`CommandReport`]
//! collects them in action order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// The action changed (or read) the scene as requested
    Applied,
    /// The action was understood but had nothing to act on
    Skipped,
    /// The action was invalid or its work failed
    Failed,
}

impl EntryStatus {
    /// Metrics label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Applied => "applied",
            EntryStatus::Skipped => "skipped",
            EntryStatus::Failed => "failed",
        }
    }
}

/// Feedback for one action of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Position of the action in its batch
    pub index: usize,
    /// Outcome
    pub status: EntryStatus,
    /// User-facing text
    pub message: String,
}

impl FeedbackEntry {
    /// Applied entry
    #[must_use]
    pub fn applied(index: usize, message: impl Into<String>) -> Self {
        Self::new(index, EntryStatus::Applied, message)
    }

    /// Skipped entry
    #[must_use]
    pub fn skipped(index: usize, message: impl Into<String>) -> Self {
        Self::new(index, EntryStatus::Skipped, message)
    }

    /// Failed entry
    #[must_use]
    pub fn failed(index: usize, message: impl Into<String>) -> Self {
        Self::new(index, EntryStatus::Failed, message)
    }

    fn new(index: usize, status: EntryStatus, message: impl Into<String>) -> Self {
        Self {
            index,
            status,
            message: message.into(),
        }
    }
}

/// Aggregated result of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    /// Correlation id, also recorded on the command span
    pub command_id: Uuid,
    /// Command text as received
    pub command: String,
    /// One entry per action, in action order
    pub entries: Vec<FeedbackEntry>,
    /// Completion time
    pub finished_at: DateTime<Utc>,
}

impl CommandReport {
    /// Create report
    #[must_use]
    pub fn new(command_id: Uuid, command: impl Into<String>, entries: Vec<FeedbackEntry>) -> Self {
        Self {
            command_id,
            command: command.into(),
            entries,
            finished_at: Utc::now(),
        }
    }

    /// Messages joined with newlines
    #[must_use]
    pub fn text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of entries with `status`
    #[must_use]
    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Entries that applied
    #[inline]
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(EntryStatus::Applied)
    }

    /// Entries that failed
    #[inline]
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(EntryStatus::Failed)
    }

    /// Whether every entry applied
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.status == EntryStatus::Applied)
    }
}

impl std::fmt::Display for CommandReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
