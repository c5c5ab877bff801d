use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-collection sync bookkeeping, written only by the sync coordinator at
/// the end of a successful drain or pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
}
