use serde::{Deserialize, Serialize};

/// Checklist template pulled from the remote system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub name: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item_id: String,
    pub label: String,
    pub required: bool,
}
