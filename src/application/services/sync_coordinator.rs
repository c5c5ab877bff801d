use crate::application::ports::{ConnectivityMonitor, MutationOutcome, OutcomeStatus, RemoteGateway};
use crate::domain::entities::{PendingMutation, StoredRecord, SyncMetadata};
use crate::domain::value_objects::{Collection, RecordId};
use crate::infrastructure::store::{CollectionStore, LocalStore, Outbox};
use crate::shared::config::SyncConfig;
use crate::shared::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Collections mirrored from the server by the pull phase. Locally authored
/// collections are never overwritten by pulls.
const PULLED_COLLECTIONS: [Collection; 4] = [
    Collection::WorkOrders,
    Collection::Equipment,
    Collection::Checklists,
    Collection::StandardWeights,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Draining,
    Applying,
    Backoff,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusSnapshot {
    pub is_online: bool,
    pub is_syncing: bool,
    pub phase: SyncPhase,
    pub pending_count: u32,
    pub dead_letter_count: u32,
    pub failure_streak: u32,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Outcome of one `run_cycle` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// False when the call was coalesced into a cycle already in flight.
    pub ran: bool,
    pub batches: u32,
    pub acked: u32,
    pub rejected: u32,
    pub retried: u32,
    pub pulled: u32,
}

impl CycleReport {
    fn coalesced() -> Self {
        Self::default()
    }
}

struct StatusInner {
    phase: SyncPhase,
    last_sync_at: Option<DateTime<Utc>>,
    failure_streak: u32,
}

struct CoordinatorInner {
    store: LocalStore,
    outbox: Outbox,
    remote: Arc<dyn RemoteGateway>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    config: SyncConfig,
    status: RwLock<StatusInner>,
    // Single-flight guard: at most one batch request is ever outstanding.
    cycle_gate: Mutex<()>,
    wake: Notify,
    shutdown_tx: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// The engine's control loop: drains the outbox against the remote batch
/// endpoint, applies per-item results back to the local store, and reports
/// aggregate status. Construct one per database and inject it into
/// collaborators; there is no ambient global.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    pub fn new(
        store: LocalStore,
        outbox: Outbox,
        remote: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                outbox,
                remote,
                connectivity,
                config,
                status: RwLock::new(StatusInner {
                    phase: SyncPhase::Idle,
                    last_sync_at: None,
                    failure_streak: 0,
                }),
                cycle_gate: Mutex::new(()),
                wake: Notify::new(),
                shutdown_tx,
                task: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Spawns the background loop that reacts to connectivity regained, the
    /// periodic timer, and `sync_now` nudges.
    pub fn start(&self) {
        let mut task = self.inner.task.lock().expect("task slot lock poisoned");
        if task.is_some() {
            return;
        }

        let inner = self.inner.clone();
        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        *task = Some(tokio::spawn(run_loop(inner, shutdown_rx)));
        info!("sync coordinator started");
    }

    pub async fn stop(&self) {
        let handle = {
            let mut task = self.inner.task.lock().expect("task slot lock poisoned");
            task.take()
        };
        if let Some(handle) = handle {
            let _ = self.inner.shutdown_tx.send(true);
            let _ = handle.await;
            let _ = self.inner.shutdown_tx.send(false);
            info!("sync coordinator stopped");
        }
    }

    /// Manually requests a cycle. Coalesces: if a cycle is already running
    /// the nudge is absorbed by the single-flight guard.
    pub fn sync_now(&self) {
        self.inner.wake.notify_one();
    }

    /// Runs one full drain-and-pull cycle inline. Returns a coalesced report
    /// when another cycle is already in flight.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.inner.run_cycle().await
    }

    pub async fn status(&self) -> Result<SyncStatusSnapshot> {
        let pending_count = self.inner.outbox.pending_count().await?;
        let dead_letter_count = self.inner.outbox.dead_letter_count().await?;
        let status = self.inner.status.read().await;

        Ok(SyncStatusSnapshot {
            is_online: self.inner.connectivity.is_online(),
            is_syncing: matches!(status.phase, SyncPhase::Draining | SyncPhase::Applying),
            phase: status.phase,
            pending_count,
            dead_letter_count,
            failure_streak: status.failure_streak,
            last_sync_at: status.last_sync_at,
        })
    }

    /// Dead-lettered mutations, surfaced for user-visible diagnostics.
    pub async fn dead_letters(&self) -> Result<Vec<PendingMutation>> {
        self.inner.outbox.dead_letters().await
    }

    /// Puts a dead-lettered mutation back in the retry set and nudges the
    /// loop, for the operator path after the underlying data was corrected.
    pub async fn requeue_dead_letter(&self, id: &RecordId) -> Result<bool> {
        let requeued = self.inner.outbox.requeue_dead_letter(id).await?;
        if requeued {
            self.sync_now();
        }
        Ok(requeued)
    }
}

impl CoordinatorInner {
    async fn set_phase(&self, phase: SyncPhase) {
        self.status.write().await.phase = phase;
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let Ok(_guard) = self.cycle_gate.try_lock() else {
            debug!("sync cycle already in flight, coalescing");
            return Ok(CycleReport::coalesced());
        };

        let mut report = CycleReport {
            ran: true,
            ..Default::default()
        };

        loop {
            if !self.connectivity.is_online() {
                self.set_phase(SyncPhase::Offline).await;
                return Ok(report);
            }

            let batch = self
                .outbox
                .peek_batch(Utc::now(), self.config.batch_size as usize)
                .await?;
            if batch.is_empty() {
                // The queue stopped yielding without a transport failure;
                // clear the streak so the loop returns to its triggers
                // instead of re-running on the backoff timer.
                self.status.write().await.failure_streak = 0;
                break;
            }

            self.set_phase(SyncPhase::Draining).await;
            report.batches += 1;

            match self.remote.submit_batch(&batch).await {
                Ok(outcomes) => {
                    // Going offline mid-request aborts the cycle without
                    // trusting the response; the server may have applied the
                    // batch, but re-delivery is idempotent.
                    if !self.connectivity.is_online() {
                        debug!("went offline mid-request, discarding batch response");
                        self.set_phase(SyncPhase::Offline).await;
                        return Ok(report);
                    }
                    self.set_phase(SyncPhase::Applying).await;
                    self.status.write().await.failure_streak = 0;
                    self.apply_outcomes(&batch, outcomes, &mut report).await?;
                }
                Err(err) => {
                    warn!(error = %err, size = batch.len(), "batch request failed");
                    if err.is_transient() {
                        // The monitor is a hint; our own request failure is
                        // authoritative enough to stop trying.
                        self.connectivity.mark_offline();
                    }
                    self.record_batch_failure(&batch, &err.to_string()).await?;
                    self.set_phase(SyncPhase::Backoff).await;
                    return Ok(report);
                }
            }
        }

        if self.connectivity.is_online() {
            if let Err(err) = self.pull_changes(&mut report).await {
                warn!(error = %err, "pull of remote changes failed");
                if err.is_transient() {
                    self.connectivity.mark_offline();
                }
            }
        }

        let phase = if self.connectivity.is_online() {
            SyncPhase::Idle
        } else {
            SyncPhase::Offline
        };
        self.set_phase(phase).await;
        Ok(report)
    }

    async fn apply_outcomes(
        &self,
        batch: &[PendingMutation],
        outcomes: Vec<MutationOutcome>,
        report: &mut CycleReport,
    ) -> Result<()> {
        let by_id: HashMap<&str, &PendingMutation> =
            batch.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut resolved: HashSet<String> = HashSet::new();
        let mut acked_refs: Vec<&PendingMutation> = Vec::new();
        let mut acked_collections: HashSet<Collection> = HashSet::new();
        let mut acked = 0u32;
        let now = Utc::now();

        for outcome in outcomes {
            let Some(mutation) = by_id.get(outcome.id.as_str()) else {
                // Late or duplicate result for something no longer queued;
                // acknowledgment is idempotent so this is harmless.
                debug!(mutation_id = %outcome.id, "result for unknown mutation, ignoring");
                continue;
            };
            if !resolved.insert(mutation.id.as_str().to_string()) {
                continue;
            }

            match outcome.status {
                OutcomeStatus::Ok => {
                    self.outbox.ack(&mutation.id).await?;
                    acked_refs.push(*mutation);
                    acked += 1;
                    report.acked += 1;
                }
                OutcomeStatus::Rejected => {
                    let message = outcome
                        .message
                        .unwrap_or_else(|| "rejected by server".to_string());
                    warn!(mutation_id = %mutation.id, %message, "mutation rejected, dead-lettered");
                    self.outbox.reject(&mutation.id, &message).await?;
                    report.rejected += 1;
                }
            }
        }

        // Items the server did not answer for are treated as transient.
        for mutation in batch {
            if !resolved.contains(mutation.id.as_str()) {
                let delay = retry_backoff(&self.config, mutation.attempt_count);
                self.outbox
                    .fail(
                        &mutation.id,
                        "no result in batch response",
                        now + delay,
                        self.config.max_retries,
                    )
                    .await?;
                report.retried += 1;
            }
        }

        // Flip records to synced only after the outbox reflects this batch:
        // a record with another mutation still queued against it (a second
        // status change for the same work order) stays unsynced until that
        // one is acknowledged too.
        for mutation in acked_refs {
            let (collection, record_id) = mutation.record_ref();
            let still_referenced = self
                .outbox
                .pending_in_scope(&mutation.scope_key())
                .await?
                .iter()
                .any(|queued| queued.record_ref() == (collection, record_id.clone()));
            if still_referenced {
                debug!(mutation_id = %mutation.id, %collection, "record still has queued mutations, deferring synced flag");
                acked_collections.insert(collection);
                continue;
            }
            if !self.store.mark_synced(collection, &record_id).await? {
                warn!(mutation_id = %mutation.id, %collection, "acknowledged mutation has no local record");
            }
            acked_collections.insert(collection);
        }

        if acked > 0 {
            self.status.write().await.last_sync_at = Some(now);
            for collection in acked_collections {
                let mut meta = self
                    .store
                    .sync_metadata(collection)
                    .await?
                    .unwrap_or(SyncMetadata {
                        last_sync_at: None,
                        cursor: None,
                    });
                meta.last_sync_at = Some(now);
                self.store.put_sync_metadata(collection, &meta).await?;
            }
        }

        Ok(())
    }

    async fn record_batch_failure(&self, batch: &[PendingMutation], error: &str) -> Result<()> {
        let now = Utc::now();
        for mutation in batch {
            let delay = retry_backoff(&self.config, mutation.attempt_count);
            self.outbox
                .fail(&mutation.id, error, now + delay, self.config.max_retries)
                .await?;
        }
        let mut status = self.status.write().await;
        status.failure_streak = status.failure_streak.saturating_add(1);
        Ok(())
    }

    /// Read-through refresh of server-owned reference data, cursor-based.
    async fn pull_changes(&self, report: &mut CycleReport) -> Result<()> {
        let since = self
            .store
            .sync_metadata(Collection::WorkOrders)
            .await?
            .and_then(|meta| meta.cursor);

        let changes = self.remote.fetch_changes(since.as_deref()).await?;

        let work_orders = self.store.collection(Collection::WorkOrders);
        for remote in changes.work_orders {
            report.pulled += self
                .upsert_pulled(&work_orders, remote.id, remote.payload)
                .await?;
        }
        let equipment = self.store.collection(Collection::Equipment);
        for remote in changes.equipment {
            report.pulled += self
                .upsert_pulled(&equipment, remote.id, remote.payload)
                .await?;
        }
        let checklists = self.store.collection(Collection::Checklists);
        for remote in changes.checklists {
            report.pulled += self
                .upsert_pulled(&checklists, remote.id, remote.payload)
                .await?;
        }
        let standard_weights = self.store.collection(Collection::StandardWeights);
        for remote in changes.standard_weights {
            report.pulled += self
                .upsert_pulled(&standard_weights, remote.id, remote.payload)
                .await?;
        }

        let now = Utc::now();
        for collection in PULLED_COLLECTIONS {
            let mut meta = self
                .store
                .sync_metadata(collection)
                .await?
                .unwrap_or(SyncMetadata {
                    last_sync_at: None,
                    cursor: None,
                });
            meta.last_sync_at = Some(now);
            meta.cursor = changes.updated_at.clone().or(meta.cursor);
            self.store.put_sync_metadata(collection, &meta).await?;
        }

        Ok(())
    }

    async fn upsert_pulled<T>(
        &self,
        collection: &CollectionStore<T>,
        id: RecordId,
        payload: T,
    ) -> Result<u32>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        // A record with a mutation still queued keeps its optimistic state;
        // the server's copy wins only once our write has been acknowledged.
        if let Some(existing) = collection.get(&id).await? {
            if !existing.synced {
                return Ok(0);
            }
        }
        collection.put(&StoredRecord::from_remote(id, payload)).await?;
        Ok(1)
    }
}

async fn run_loop(inner: Arc<CoordinatorInner>, mut shutdown: watch::Receiver<bool>) {
    let mut online_rx = inner.connectivity.subscribe();
    let mut ticker =
        tokio::time::interval(Duration::from_secs(inner.config.sync_interval.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; swallow it so startup does not race
    // the platform's initial connectivity report.
    ticker.tick().await;

    // A previous session may have left queued work, and the monitor may have
    // flipped online before we subscribed. Nudge ourselves once.
    if inner.connectivity.is_online() {
        inner.wake.notify_one();
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = inner.wake.notified() => {}
            _ = ticker.tick() => {
                // The periodic trigger is the only one auto_sync disables;
                // reconnect drains and manual sync_now always work.
                if !inner.config.auto_sync || !inner.connectivity.is_online() {
                    continue;
                }
                match inner.outbox.pending_count().await {
                    Ok(0) => continue,
                    Ok(_) => {}
                    Err(err) => {
                        error!(error = %err, "failed to read pending count");
                        continue;
                    }
                }
            }
            changed = online_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if !*online_rx.borrow() {
                    inner.set_phase(SyncPhase::Offline).await;
                    continue;
                }
                info!("connectivity regained, draining outbox");
            }
        }

        // Drive cycles until the outbox drains or we go offline; failed
        // cycles retry with exponential backoff.
        while inner.connectivity.is_online() {
            if let Err(err) = inner.run_cycle().await {
                error!(error = %err, "sync cycle failed");
            }

            let streak = inner.status.read().await.failure_streak;
            if streak == 0 {
                break;
            }
            let delay = retry_backoff_std(&inner.config, streak);
            debug!(delay_ms = delay.as_millis() as u64, streak, "sync backoff");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // A manual sync_now cuts the backoff short.
                _ = inner.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
    debug!("sync loop exited");
}

fn retry_backoff(config: &SyncConfig, attempts: u32) -> chrono::Duration {
    chrono::Duration::milliseconds(backoff_millis(config, attempts) as i64)
}

fn retry_backoff_std(config: &SyncConfig, attempts: u32) -> Duration {
    Duration::from_millis(backoff_millis(config, attempts))
}

fn backoff_millis(config: &SyncConfig, attempts: u32) -> u64 {
    let factor = 1u64 << attempts.min(16);
    config
        .backoff_base_ms
        .saturating_mul(factor)
        .min(config.backoff_cap_ms)
}
