use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub work_order_id: RecordId,
    pub category: String,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub incurred_at: DateTime<Utc>,
}
