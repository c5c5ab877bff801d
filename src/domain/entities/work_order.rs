use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub number: String,
    pub customer_name: String,
    pub site_address: Option<String>,
    pub status: WorkOrderStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Scheduled,
    EnRoute,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Scheduled => "scheduled",
            WorkOrderStatus::EnRoute => "en_route",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Payload of a locally authored status transition. The work order record is
/// the entity this mutation originates from; the mutation itself carries its
/// own idempotency id because several transitions for one work order can be
/// queued back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderStatusChange {
    pub work_order_id: RecordId,
    pub status: WorkOrderStatus,
    pub changed_at: DateTime<Utc>,
}
