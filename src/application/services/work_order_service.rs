use crate::application::services::SyncCoordinator;
use crate::domain::entities::{
    Checklist, ChecklistResponse, Equipment, Expense, MutationPayload, PendingMutation, Photo,
    Signature, StandardWeight, StoredRecord, TimeEntry, TimeEntryKind, WorkOrder, WorkOrderStatus,
    WorkOrderStatusChange,
};
use crate::domain::value_objects::{Collection, RecordId};
use crate::infrastructure::store::LocalStore;
use crate::shared::error::{AppError, Result};
use chrono::Utc;
use tracing::info;

/// Field-facing operations on a work order. Every write follows the same
/// pattern: persist the record and its outbox mutation in one transaction,
/// return immediately, and nudge the coordinator to deliver when it can.
pub struct WorkOrderService {
    store: LocalStore,
    coordinator: SyncCoordinator,
}

impl WorkOrderService {
    pub fn new(store: LocalStore, coordinator: SyncCoordinator) -> Self {
        Self { store, coordinator }
    }

    pub async fn work_order(&self, id: &RecordId) -> Result<Option<StoredRecord<WorkOrder>>> {
        self.store
            .collection::<WorkOrder>(Collection::WorkOrders)
            .get(id)
            .await
    }

    pub async fn work_orders(&self) -> Result<Vec<StoredRecord<WorkOrder>>> {
        self.store
            .collection::<WorkOrder>(Collection::WorkOrders)
            .list()
            .await
    }

    /// Applies a status transition optimistically. The work order record is
    /// rewritten with the new status and marked unsynced again; the mutation
    /// carries its own id because several transitions can queue back to back.
    pub async fn update_status(
        &self,
        work_order_id: &RecordId,
        status: WorkOrderStatus,
    ) -> Result<StoredRecord<WorkOrder>> {
        let work_orders = self.store.collection::<WorkOrder>(Collection::WorkOrders);
        let mut record = work_orders.get(work_order_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("work order {work_order_id} not found"))
        })?;

        let now = Utc::now();
        record.payload.status = status;
        record.synced = false;
        record.updated_at = now;

        let mutation = PendingMutation::draft(
            RecordId::generate(),
            MutationPayload::StatusChange(WorkOrderStatusChange {
                work_order_id: work_order_id.clone(),
                status,
                changed_at: now,
            }),
        );

        self.store
            .put_with_mutation(Collection::WorkOrders, &record, &mutation)
            .await?;
        info!(%work_order_id, status = status.as_str(), "work order status queued");
        self.coordinator.sync_now();
        Ok(record)
    }

    pub async fn save_checklist_response(
        &self,
        work_order_id: &RecordId,
        checklist_id: &RecordId,
        item_id: &str,
        value: serde_json::Value,
        note: Option<String>,
    ) -> Result<StoredRecord<ChecklistResponse>> {
        if item_id.trim().is_empty() {
            return Err(AppError::Validation(
                "checklist item id must not be empty".to_string(),
            ));
        }

        let record = StoredRecord::draft(ChecklistResponse {
            work_order_id: work_order_id.clone(),
            checklist_id: checklist_id.clone(),
            item_id: item_id.to_string(),
            value,
            note,
            responded_at: Utc::now(),
        });
        self.enqueue(
            Collection::ChecklistResponses,
            &record,
            MutationPayload::ChecklistResponse(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    pub async fn save_expense(
        &self,
        work_order_id: &RecordId,
        category: &str,
        amount_cents: i64,
        note: Option<String>,
    ) -> Result<StoredRecord<Expense>> {
        if category.trim().is_empty() {
            return Err(AppError::Validation(
                "expense category must not be empty".to_string(),
            ));
        }
        if amount_cents <= 0 {
            return Err(AppError::Validation(
                "expense amount must be positive".to_string(),
            ));
        }

        let record = StoredRecord::draft(Expense {
            work_order_id: work_order_id.clone(),
            category: category.trim().to_string(),
            amount_cents,
            note,
            incurred_at: Utc::now(),
        });
        self.enqueue(
            Collection::Expenses,
            &record,
            MutationPayload::Expense(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    pub async fn save_signature(
        &self,
        work_order_id: &RecordId,
        signer_name: &str,
        signer_role: Option<String>,
        image_png_base64: String,
    ) -> Result<StoredRecord<Signature>> {
        if signer_name.trim().is_empty() {
            return Err(AppError::Validation(
                "signer name must not be empty".to_string(),
            ));
        }
        if image_png_base64.is_empty() {
            return Err(AppError::Validation(
                "signature image must not be empty".to_string(),
            ));
        }

        let record = StoredRecord::draft(Signature {
            work_order_id: work_order_id.clone(),
            signer_name: signer_name.trim().to_string(),
            signer_role,
            image_png_base64,
            signed_at: Utc::now(),
        });
        self.enqueue(
            Collection::Signatures,
            &record,
            MutationPayload::Signature(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    /// Stores photo metadata; the image bytes are handled by the device
    /// capability layer outside the engine.
    pub async fn attach_photo(
        &self,
        work_order_id: &RecordId,
        file_name: &str,
        content_type: &str,
        byte_size: u64,
        caption: Option<String>,
    ) -> Result<StoredRecord<Photo>> {
        if file_name.trim().is_empty() {
            return Err(AppError::Validation(
                "photo file name must not be empty".to_string(),
            ));
        }

        let record = StoredRecord::draft(Photo {
            work_order_id: work_order_id.clone(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            byte_size,
            caption,
            captured_at: Utc::now(),
        });
        self.enqueue(
            Collection::Photos,
            &record,
            MutationPayload::Photo(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    pub async fn record_time_entry(
        &self,
        work_order_id: &RecordId,
        kind: TimeEntryKind,
    ) -> Result<StoredRecord<TimeEntry>> {
        let record = StoredRecord::draft(TimeEntry {
            work_order_id: work_order_id.clone(),
            kind,
            latitude: None,
            longitude: None,
            recorded_at: Utc::now(),
        });
        self.enqueue(
            Collection::TimeEntries,
            &record,
            MutationPayload::TimeEntry(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    /// Position sample taken while travelling to the site. Queued like any
    /// other mutation so the route survives offline stretches.
    pub async fn record_location_ping(
        &self,
        work_order_id: &RecordId,
        latitude: f64,
        longitude: f64,
    ) -> Result<StoredRecord<TimeEntry>> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::Validation(format!(
                "coordinates out of range: {latitude}, {longitude}"
            )));
        }

        let record = StoredRecord::draft(TimeEntry {
            work_order_id: work_order_id.clone(),
            kind: TimeEntryKind::LocationPing,
            latitude: Some(latitude),
            longitude: Some(longitude),
            recorded_at: Utc::now(),
        });
        self.enqueue(
            Collection::TimeEntries,
            &record,
            MutationPayload::TimeEntry(record.payload.clone()),
        )
        .await?;
        Ok(record)
    }

    pub async fn checklist_responses(
        &self,
        work_order_id: &RecordId,
    ) -> Result<Vec<StoredRecord<ChecklistResponse>>> {
        let all = self
            .store
            .collection::<ChecklistResponse>(Collection::ChecklistResponses)
            .list()
            .await?;
        Ok(all
            .into_iter()
            .filter(|r| &r.payload.work_order_id == work_order_id)
            .collect())
    }

    /// Cached server-owned reference data, refreshed by the coordinator's
    /// pull phase.
    pub async fn equipment(&self) -> Result<Vec<StoredRecord<Equipment>>> {
        self.store
            .collection::<Equipment>(Collection::Equipment)
            .list()
            .await
    }

    pub async fn checklists(&self) -> Result<Vec<StoredRecord<Checklist>>> {
        self.store
            .collection::<Checklist>(Collection::Checklists)
            .list()
            .await
    }

    pub async fn standard_weights(&self) -> Result<Vec<StoredRecord<StandardWeight>>> {
        self.store
            .collection::<StandardWeight>(Collection::StandardWeights)
            .list()
            .await
    }

    pub async fn expenses(&self, work_order_id: &RecordId) -> Result<Vec<StoredRecord<Expense>>> {
        let all = self
            .store
            .collection::<Expense>(Collection::Expenses)
            .list()
            .await?;
        Ok(all
            .into_iter()
            .filter(|r| &r.payload.work_order_id == work_order_id)
            .collect())
    }

    async fn enqueue<T>(
        &self,
        collection: Collection,
        record: &StoredRecord<T>,
        payload: MutationPayload,
    ) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let mutation = PendingMutation::draft(record.id.clone(), payload);
        self.store
            .put_with_mutation(collection, record, &mutation)
            .await?;
        self.coordinator.sync_now();
        Ok(())
    }
}
