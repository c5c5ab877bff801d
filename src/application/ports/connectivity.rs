use tokio::sync::watch;

/// Reachability signal consumed by the sync coordinator.
///
/// The monitor is a hint, not a guarantee: platform glue reports transitions
/// through `mark_online`/`mark_offline`, and the coordinator independently
/// calls `mark_offline` when its own batch request fails at the transport
/// level. Ambiguous platform signals should be reported as offline.
pub trait ConnectivityMonitor: Send + Sync {
    fn is_online(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
    fn mark_online(&self);
    fn mark_offline(&self);
}
