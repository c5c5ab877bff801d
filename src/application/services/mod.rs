mod messaging_service;
mod sync_coordinator;
mod work_order_service;

pub use messaging_service::{ConversationMessage, MessagingService};
pub use sync_coordinator::{CycleReport, SyncCoordinator, SyncPhase, SyncStatusSnapshot};
pub use work_order_service::WorkOrderService;
