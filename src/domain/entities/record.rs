use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A domain payload wrapped with the bookkeeping the local store needs.
///
/// `synced` flips false→true exactly once, when the remote endpoint
/// acknowledges the mutation that carried this record; only the sync
/// coordinator performs that write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    pub id: RecordId,
    pub payload: T,
    pub synced: bool,
    pub updated_at: DateTime<Utc>,
}

impl<T> StoredRecord<T> {
    /// A freshly authored, not-yet-acknowledged record.
    pub fn draft(payload: T) -> Self {
        Self {
            id: RecordId::generate(),
            payload,
            synced: false,
            updated_at: Utc::now(),
        }
    }

    /// A record mirrored from the remote system of record.
    pub fn from_remote(id: RecordId, payload: T) -> Self {
        Self {
            id,
            payload,
            synced: true,
            updated_at: Utc::now(),
        }
    }
}
