pub mod connectivity;
pub mod database;
pub mod remote;
pub mod store;
