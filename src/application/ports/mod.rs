pub mod connectivity;
pub mod remote_gateway;

pub use connectivity::ConnectivityMonitor;
pub use remote_gateway::{
    MutationOutcome, OutcomeStatus, RemoteChanges, RemoteGateway, RemoteRecord,
};
