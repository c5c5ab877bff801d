use crate::domain::entities::{
    ChatMessage, ChecklistResponse, Expense, Photo, Signature, TimeEntry, WorkOrderStatusChange,
};
use crate::domain::value_objects::{Collection, MutationKind, OutboxStatus, RecordId, ScopeKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tagged payload of a locally authored change. Serializes to the remote
/// wire shape `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MutationPayload {
    StatusChange(WorkOrderStatusChange),
    ChecklistResponse(ChecklistResponse),
    Expense(Expense),
    Signature(Signature),
    Photo(Photo),
    ChatMessage(ChatMessage),
    TimeEntry(TimeEntry),
}

impl MutationPayload {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationPayload::StatusChange(_) => MutationKind::StatusChange,
            MutationPayload::ChecklistResponse(_) => MutationKind::ChecklistResponse,
            MutationPayload::Expense(_) => MutationKind::Expense,
            MutationPayload::Signature(_) => MutationKind::Signature,
            MutationPayload::Photo(_) => MutationKind::Photo,
            MutationPayload::ChatMessage(_) => MutationKind::ChatMessage,
            MutationPayload::TimeEntry(_) => MutationKind::TimeEntry,
        }
    }

    /// Every mutation for one work order shares a scope key so it reaches the
    /// server in authoring order, whatever its kind.
    pub fn scope_key(&self) -> ScopeKey {
        match self {
            MutationPayload::StatusChange(p) => ScopeKey::work_order(&p.work_order_id),
            MutationPayload::ChecklistResponse(p) => ScopeKey::work_order(&p.work_order_id),
            MutationPayload::Expense(p) => ScopeKey::work_order(&p.work_order_id),
            MutationPayload::Signature(p) => ScopeKey::work_order(&p.work_order_id),
            MutationPayload::Photo(p) => ScopeKey::work_order(&p.work_order_id),
            MutationPayload::ChatMessage(p) => ScopeKey::conversation(&p.conversation_id),
            MutationPayload::TimeEntry(p) => ScopeKey::work_order(&p.work_order_id),
        }
    }
}

/// A change-record waiting in the outbox. `id` is generated once at authoring
/// time and never regenerated on retry; it is the idempotency key presented
/// to the remote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub id: RecordId,
    pub payload: MutationPayload,
    pub status: OutboxStatus,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn draft(id: RecordId, payload: MutationPayload) -> Self {
        let now = Utc::now();
        Self {
            id,
            payload,
            status: OutboxStatus::Pending,
            attempt_count: 0,
            last_error: None,
            created_at: now,
            next_attempt_at: now,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.payload.kind()
    }

    pub fn scope_key(&self) -> ScopeKey {
        self.payload.scope_key()
    }

    /// The entity record to flip to `synced` once this mutation is
    /// acknowledged. For most kinds the mutation id *is* the record id; a
    /// status change instead points back at its work order.
    pub fn record_ref(&self) -> (Collection, RecordId) {
        match &self.payload {
            MutationPayload::StatusChange(p) => {
                (Collection::WorkOrders, p.work_order_id.clone())
            }
            MutationPayload::ChecklistResponse(_) => {
                (Collection::ChecklistResponses, self.id.clone())
            }
            MutationPayload::Expense(_) => (Collection::Expenses, self.id.clone()),
            MutationPayload::Signature(_) => (Collection::Signatures, self.id.clone()),
            MutationPayload::Photo(_) => (Collection::Photos, self.id.clone()),
            MutationPayload::ChatMessage(_) => (Collection::ChatMessages, self.id.clone()),
            MutationPayload::TimeEntry(_) => (Collection::TimeEntries, self.id.clone()),
        }
    }
}
