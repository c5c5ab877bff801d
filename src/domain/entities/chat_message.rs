use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub conversation_id: RecordId,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
