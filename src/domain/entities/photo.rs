use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Photo metadata. The image bytes themselves are uploaded by the device
/// capability layer; the engine only tracks the record and its mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub work_order_id: RecordId,
    pub file_name: String,
    pub content_type: String,
    pub byte_size: u64,
    pub caption: Option<String>,
    pub captured_at: DateTime<Utc>,
}
