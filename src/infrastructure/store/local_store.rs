use crate::domain::entities::{PendingMutation, StoredRecord, SyncMetadata};
use crate::domain::value_objects::{Collection, RecordId};
use crate::infrastructure::database::DbPool;
use crate::infrastructure::store::outbox::Outbox;
use crate::infrastructure::store::rows::{
    record_from_row, sync_metadata_from_row, RecordRow, SyncMetadataRow,
};
use crate::shared::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::Sqlite;
use std::marker::PhantomData;
use tracing::warn;

/// Durable, collection-partitioned record store. Pure persistence; nothing in
/// here knows about the network.
#[derive(Clone)]
pub struct LocalStore {
    pool: DbPool,
}

impl LocalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn collection<T>(&self, collection: Collection) -> CollectionStore<T>
    where
        T: Serialize + DeserializeOwned,
    {
        CollectionStore {
            pool: self.pool.clone(),
            collection,
            _marker: PhantomData,
        }
    }

    /// The optimistic two-step write: persist the entity record and enqueue
    /// its mutation in one transaction, so a crash between the two cannot
    /// strand a record without its outbox entry.
    pub async fn put_with_mutation<T>(
        &self,
        collection: Collection,
        record: &StoredRecord<T>,
        mutation: &PendingMutation,
    ) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let payload = serde_json::to_string(&record.payload)?;
        let mut tx = self.pool.begin().await?;
        put_record(
            &mut *tx,
            collection,
            record.id.as_str(),
            &payload,
            record.synced,
            record.updated_at.timestamp_millis(),
        )
        .await?;
        Outbox::insert(&mut *tx, mutation).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Flips a record's synced flag to true. Only the sync coordinator calls
    /// this; the flag is never reverted.
    pub async fn mark_synced(&self, collection: Collection, id: &RecordId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE records SET is_synced = 1 WHERE collection = ?1 AND id = ?2",
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn sync_metadata(&self, collection: Collection) -> Result<Option<SyncMetadata>> {
        let row: Option<SyncMetadataRow> =
            sqlx::query_as("SELECT last_sync_at, cursor FROM sync_metadata WHERE collection = ?1")
                .bind(collection.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(sync_metadata_from_row).transpose()
    }

    pub async fn put_sync_metadata(
        &self,
        collection: Collection,
        metadata: &SyncMetadata,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (collection, last_sync_at, cursor)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(collection) DO UPDATE SET
                last_sync_at = excluded.last_sync_at,
                cursor = excluded.cursor
            "#,
        )
        .bind(collection.as_str())
        .bind(metadata.last_sync_at.map(|t| t.timestamp_millis()))
        .bind(&metadata.cursor)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Destroys every collection, the outbox and all sync bookkeeping.
    /// Pending (not yet acknowledged) records are permanently lost.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM records").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM outbox").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM sync_metadata")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        warn!("local data reset: pending records were discarded");
        Ok(())
    }
}

/// Typed view over one collection.
pub struct CollectionStore<T> {
    pool: DbPool,
    collection: Collection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CollectionStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord<T>>> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT id, payload, is_synced, updated_at FROM records WHERE collection = ?1 AND id = ?2",
        )
        .bind(self.collection.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    pub async fn list(&self) -> Result<Vec<StoredRecord<T>>> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, payload, is_synced, updated_at FROM records WHERE collection = ?1 ORDER BY updated_at DESC",
        )
        .bind(self.collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    pub async fn list_unsynced(&self) -> Result<Vec<StoredRecord<T>>> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, payload, is_synced, updated_at FROM records WHERE collection = ?1 AND is_synced = 0 ORDER BY id ASC",
        )
        .bind(self.collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    /// Upsert by id. Safe to retry: a second put overwrites the first.
    pub async fn put(&self, record: &StoredRecord<T>) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)?;
        put_record(
            &self.pool,
            self.collection,
            record.id.as_str(),
            &payload,
            record.synced,
            record.updated_at.timestamp_millis(),
        )
        .await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1 AND id = ?2")
            .bind(self.collection.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1")
            .bind(self.collection.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

async fn put_record<'e, E>(
    executor: E,
    collection: Collection,
    id: &str,
    payload: &str,
    synced: bool,
    updated_at: i64,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO records (collection, id, payload, is_synced, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(collection, id) DO UPDATE SET
            payload = excluded.payload,
            is_synced = excluded.is_synced,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(payload)
    .bind(synced)
    .bind(updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Expense, MutationPayload};
    use crate::infrastructure::database::Database;
    use chrono::Utc;

    async fn setup() -> LocalStore {
        let pool = Database::initialize_in_memory().await.unwrap();
        LocalStore::new(pool)
    }

    fn sample_expense() -> Expense {
        Expense {
            work_order_id: RecordId::generate(),
            category: "toll".to_string(),
            amount_cents: 450,
            note: None,
            incurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let store = setup().await;
        let expenses = store.collection::<Expense>(Collection::Expenses);

        let record = StoredRecord::draft(sample_expense());
        expenses.put(&record).await.unwrap();

        let loaded = expenses.get(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.payload, record.payload);
        assert!(!loaded.synced);
    }

    #[tokio::test]
    async fn test_put_overwrites_by_id() {
        let store = setup().await;
        let expenses = store.collection::<Expense>(Collection::Expenses);

        let mut record = StoredRecord::draft(sample_expense());
        expenses.put(&record).await.unwrap();

        record.payload.amount_cents = 900;
        expenses.put(&record).await.unwrap();

        let all = expenses.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload.amount_cents, 900);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = setup().await;
        let expenses = store.collection::<Expense>(Collection::Expenses);
        let photos = store.collection::<Expense>(Collection::Photos);

        expenses
            .put(&StoredRecord::draft(sample_expense()))
            .await
            .unwrap();

        assert_eq!(photos.list().await.unwrap().len(), 0);
        assert_eq!(expenses.clear().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_synced_is_monotonic() {
        let store = setup().await;
        let expenses = store.collection::<Expense>(Collection::Expenses);

        let record = StoredRecord::draft(sample_expense());
        expenses.put(&record).await.unwrap();

        assert!(store
            .mark_synced(Collection::Expenses, &record.id)
            .await
            .unwrap());
        let loaded = expenses.get(&record.id).await.unwrap().unwrap();
        assert!(loaded.synced);

        // Unknown id is reported, not an error.
        assert!(!store
            .mark_synced(Collection::Expenses, &RecordId::generate())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_put_with_mutation_is_atomic_and_visible() {
        let store = setup().await;
        let outbox = Outbox::new(store.pool.clone());

        let record = StoredRecord::draft(sample_expense());
        let mutation = PendingMutation::draft(
            record.id.clone(),
            MutationPayload::Expense(record.payload.clone()),
        );

        store
            .put_with_mutation(Collection::Expenses, &record, &mutation)
            .await
            .unwrap();

        let expenses = store.collection::<Expense>(Collection::Expenses);
        assert!(expenses.get(&record.id).await.unwrap().is_some());
        assert_eq!(outbox.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sync_metadata_upsert() {
        let store = setup().await;

        assert!(store
            .sync_metadata(Collection::WorkOrders)
            .await
            .unwrap()
            .is_none());

        let meta = SyncMetadata {
            last_sync_at: Some(Utc::now()),
            cursor: Some("2026-08-23T10:00:00Z".to_string()),
        };
        store
            .put_sync_metadata(Collection::WorkOrders, &meta)
            .await
            .unwrap();

        let loaded = store
            .sync_metadata(Collection::WorkOrders)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.cursor, meta.cursor);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = setup().await;
        let expenses = store.collection::<Expense>(Collection::Expenses);
        let outbox = Outbox::new(store.pool.clone());

        let record = StoredRecord::draft(sample_expense());
        let mutation = PendingMutation::draft(
            record.id.clone(),
            MutationPayload::Expense(record.payload.clone()),
        );
        store
            .put_with_mutation(Collection::Expenses, &record, &mutation)
            .await
            .unwrap();

        store.reset().await.unwrap();

        assert_eq!(expenses.list().await.unwrap().len(), 0);
        assert_eq!(outbox.pending_count().await.unwrap(), 0);
    }
}
