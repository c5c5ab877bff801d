use crate::domain::entities::{Checklist, Equipment, PendingMutation, StandardWeight, WorkOrder};
use crate::domain::value_objects::RecordId;
use crate::shared::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-mutation result of a batch submission, keyed by the mutation's
/// idempotency id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub id: RecordId,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Rejected,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecord<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub payload: T,
}

/// Server-owned reference data changed since the client's cursor.
#[derive(Debug, Default, Deserialize)]
pub struct RemoteChanges {
    #[serde(default)]
    pub work_orders: Vec<RemoteRecord<WorkOrder>>,
    #[serde(default)]
    pub equipment: Vec<RemoteRecord<Equipment>>,
    #[serde(default)]
    pub checklists: Vec<RemoteRecord<Checklist>>,
    #[serde(default)]
    pub standard_weights: Vec<RemoteRecord<StandardWeight>>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The remote batch endpoint. Repeated delivery of the same mutation id must
/// be a server-side no-op; the outcome is still reported as `Ok`.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn submit_batch(&self, mutations: &[PendingMutation]) -> Result<Vec<MutationOutcome>>;
    async fn fetch_changes(&self, since: Option<&str>) -> Result<RemoteChanges>;
}
