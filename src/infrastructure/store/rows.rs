use crate::domain::entities::{PendingMutation, StoredRecord, SyncMetadata};
use crate::domain::value_objects::{OutboxStatus, RecordId};
use crate::shared::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub payload: String,
    pub is_synced: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    pub mutation_id: String,
    pub scope_key: String,
    pub payload: String,
    pub status: String,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    pub next_attempt_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncMetadataRow {
    pub last_sync_at: Option<i64>,
    pub cursor: Option<String>,
}

pub fn record_from_row<T: DeserializeOwned>(row: RecordRow) -> Result<StoredRecord<T>> {
    let payload = serde_json::from_str(&row.payload)?;
    Ok(StoredRecord {
        id: RecordId::new(row.id).map_err(AppError::Validation)?,
        payload,
        synced: row.is_synced,
        updated_at: timestamp_from_millis(row.updated_at)?,
    })
}

pub fn mutation_from_row(row: OutboxRow) -> Result<PendingMutation> {
    let payload = serde_json::from_str(&row.payload)?;
    Ok(PendingMutation {
        id: RecordId::new(row.mutation_id).map_err(AppError::Validation)?,
        payload,
        status: OutboxStatus::from(row.status.as_str()),
        attempt_count: row.attempt_count.max(0) as u32,
        last_error: row.last_error,
        created_at: timestamp_from_millis(row.created_at)?,
        next_attempt_at: timestamp_from_millis(row.next_attempt_at)?,
    })
}

pub fn sync_metadata_from_row(row: SyncMetadataRow) -> Result<SyncMetadata> {
    let last_sync_at = row.last_sync_at.map(timestamp_from_millis).transpose()?;
    Ok(SyncMetadata {
        last_sync_at,
        cursor: row.cursor,
    })
}

fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Internal(format!("timestamp out of range: {millis}")))
}
