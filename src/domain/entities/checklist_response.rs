use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistResponse {
    pub work_order_id: RecordId,
    pub checklist_id: RecordId,
    pub item_id: String,
    pub value: serde_json::Value,
    pub note: Option<String>,
    pub responded_at: DateTime<Utc>,
}
