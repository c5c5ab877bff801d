mod collection;
mod mutation_kind;
mod outbox_status;
mod record_id;
mod scope_key;

pub use collection::Collection;
pub use mutation_kind::MutationKind;
pub use outbox_status::OutboxStatus;
pub use record_id::RecordId;
pub use scope_key::ScopeKey;
