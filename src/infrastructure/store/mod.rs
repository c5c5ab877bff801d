mod local_store;
mod outbox;
mod rows;

pub use local_store::{CollectionStore, LocalStore};
pub use outbox::{FailureDisposition, Outbox};
