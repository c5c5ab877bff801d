use async_trait::async_trait;
use chrono::Utc;
use fieldsync::{
    Collection, ConnectivityMonitor, Database, Expense, LocalStore, MutationOutcome,
    MutationPayload, Outbox, OutcomeStatus, PendingMutation, RecordId, RemoteChanges,
    RemoteGateway, Result, SharedConnectivity, StoredRecord, SyncConfig, SyncCoordinator,
};
use std::sync::Arc;
use tempfile::TempDir;

struct AcceptAllRemote;

#[async_trait]
impl RemoteGateway for AcceptAllRemote {
    async fn submit_batch(&self, mutations: &[PendingMutation]) -> Result<Vec<MutationOutcome>> {
        Ok(mutations
            .iter()
            .map(|m| MutationOutcome {
                id: m.id.clone(),
                status: OutcomeStatus::Ok,
                message: None,
            })
            .collect())
    }

    async fn fetch_changes(&self, _since: Option<&str>) -> Result<RemoteChanges> {
        Ok(RemoteChanges::default())
    }
}

fn sample_expense(work_order: &RecordId) -> Expense {
    Expense {
        work_order_id: work_order.clone(),
        category: "parts".to_string(),
        amount_cents: 12_500,
        note: Some("compressor relay".to_string()),
        incurred_at: Utc::now(),
    }
}

/// A queued mutation and its record must survive a process restart, then
/// drain normally once the device comes back online.
#[tokio::test]
async fn queued_work_survives_reopen_and_drains() {
    let temp_dir = TempDir::new().unwrap();
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("fieldsync.db").display()
    );

    let record = StoredRecord::draft(sample_expense(&RecordId::generate()));
    let mutation = PendingMutation::draft(
        record.id.clone(),
        MutationPayload::Expense(record.payload.clone()),
    );

    // First "session": author while offline, then shut down.
    {
        let pool = Database::initialize(&db_url, 1).await.unwrap();
        let store = LocalStore::new(pool.clone());
        store
            .put_with_mutation(Collection::Expenses, &record, &mutation)
            .await
            .unwrap();
        pool.close().await;
    }

    // Second "session": everything is still there.
    let pool = Database::initialize(&db_url, 1).await.unwrap();
    let store = LocalStore::new(pool.clone());
    let outbox = Outbox::new(pool.clone());

    assert_eq!(outbox.pending_count().await.unwrap(), 1);
    let queued = outbox.peek_batch(Utc::now(), 10).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, mutation.id);

    let expenses = store.collection::<Expense>(Collection::Expenses);
    let reloaded = expenses.get(&record.id).await.unwrap().unwrap();
    assert!(!reloaded.synced);
    assert_eq!(reloaded.payload, record.payload);

    // Connectivity returns; the mutation drains with its original id.
    let connectivity = Arc::new(SharedConnectivity::new());
    let coordinator = SyncCoordinator::new(
        store.clone(),
        outbox.clone(),
        Arc::new(AcceptAllRemote),
        connectivity.clone(),
        SyncConfig::default(),
    );
    connectivity.mark_online();
    let report = coordinator.run_cycle().await.unwrap();

    assert_eq!(report.acked, 1);
    assert_eq!(outbox.pending_count().await.unwrap(), 0);
    assert!(expenses.get(&record.id).await.unwrap().unwrap().synced);

    pool.close().await;
}
