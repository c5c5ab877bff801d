use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of named collections the local store exposes. Adding a
/// collection is a schema change, not a runtime decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    WorkOrders,
    Equipment,
    Checklists,
    StandardWeights,
    ChecklistResponses,
    Expenses,
    Photos,
    Signatures,
    ChatMessages,
    TimeEntries,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::WorkOrders,
        Collection::Equipment,
        Collection::Checklists,
        Collection::StandardWeights,
        Collection::ChecklistResponses,
        Collection::Expenses,
        Collection::Photos,
        Collection::Signatures,
        Collection::ChatMessages,
        Collection::TimeEntries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::WorkOrders => "work_orders",
            Collection::Equipment => "equipment",
            Collection::Checklists => "checklists",
            Collection::StandardWeights => "standard_weights",
            Collection::ChecklistResponses => "checklist_responses",
            Collection::Expenses => "expenses",
            Collection::Photos => "photos",
            Collection::Signatures => "signatures",
            Collection::ChatMessages => "chat_messages",
            Collection::TimeEntries => "time_entries",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
