mod chat_message;
mod checklist;
mod checklist_response;
mod equipment;
mod expense;
mod mutation;
mod photo;
mod record;
mod signature;
mod standard_weight;
mod sync_metadata;
mod time_entry;
mod work_order;

pub use chat_message::ChatMessage;
pub use checklist::{Checklist, ChecklistItem};
pub use checklist_response::ChecklistResponse;
pub use equipment::Equipment;
pub use expense::Expense;
pub use mutation::{MutationPayload, PendingMutation};
pub use photo::Photo;
pub use record::StoredRecord;
pub use signature::Signature;
pub use standard_weight::StandardWeight;
pub use sync_metadata::SyncMetadata;
pub use time_entry::{TimeEntry, TimeEntryKind};
pub use work_order::{WorkOrder, WorkOrderStatus, WorkOrderStatusChange};
