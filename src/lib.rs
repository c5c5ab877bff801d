//! Offline-first store-and-forward sync engine for field technicians.
//!
//! Every write lands in the local SQLite store and queues a mutation in the
//! durable outbox; the [`SyncCoordinator`] drains the outbox to the remote
//! batch endpoint whenever connectivity allows and marks records synced as
//! acknowledgments come back. The device keeps working with no connectivity
//! at all; sync is a background concern, never a prerequisite.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ConnectivityMonitor, MutationOutcome, OutcomeStatus, RemoteChanges, RemoteGateway,
    RemoteRecord,
};
pub use application::services::{
    ConversationMessage, CycleReport, MessagingService, SyncCoordinator, SyncPhase,
    SyncStatusSnapshot, WorkOrderService,
};
pub use domain::entities::{
    ChatMessage, Checklist, ChecklistItem, ChecklistResponse, Equipment, Expense, MutationPayload,
    PendingMutation, Photo, Signature, StandardWeight, StoredRecord, SyncMetadata, TimeEntry,
    TimeEntryKind, WorkOrder, WorkOrderStatus, WorkOrderStatusChange,
};
pub use domain::value_objects::{Collection, MutationKind, OutboxStatus, RecordId, ScopeKey};
pub use infrastructure::connectivity::SharedConnectivity;
pub use infrastructure::database::{Database, DbPool};
pub use infrastructure::remote::HttpRemoteGateway;
pub use infrastructure::store::{CollectionStore, FailureDisposition, LocalStore, Outbox};
pub use shared::config::{AppConfig, DatabaseConfig, RemoteConfig, SyncConfig};
pub use shared::error::{AppError, Result};
