use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire-level tag of a pending mutation. Matches the `type` field of the
/// remote batch contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    StatusChange,
    ChecklistResponse,
    Expense,
    Signature,
    Photo,
    ChatMessage,
    TimeEntry,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::StatusChange => "status_change",
            MutationKind::ChecklistResponse => "checklist_response",
            MutationKind::Expense => "expense",
            MutationKind::Signature => "signature",
            MutationKind::Photo => "photo",
            MutationKind::ChatMessage => "chat_message",
            MutationKind::TimeEntry => "time_entry",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
