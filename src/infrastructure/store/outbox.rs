use crate::domain::entities::PendingMutation;
use crate::domain::value_objects::{RecordId, ScopeKey};
use crate::infrastructure::database::DbPool;
use crate::infrastructure::store::rows::{mutation_from_row, OutboxRow};
use crate::shared::error::Result;
use chrono::{DateTime, Utc};
use sqlx::Sqlite;
use std::collections::HashSet;
use tracing::warn;

/// What happened to a mutation after a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    Requeued,
    DeadLettered,
}

/// Durable queue of not-yet-acknowledged mutations, FIFO within each scope
/// key. Retries update entries in place; an entry leaves the queue only via
/// `ack` or by moving to the dead-letter state.
#[derive(Clone)]
pub struct Outbox {
    pool: DbPool,
}

impl Outbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, mutation: &PendingMutation) -> Result<()> {
        Self::insert(&self.pool, mutation).await
    }

    pub(crate) async fn insert<'e, E>(executor: E, mutation: &PendingMutation) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let payload = serde_json::to_string(&mutation.payload)?;

        sqlx::query(
            r#"
            INSERT INTO outbox (
                mutation_id, kind, scope_key, payload, status,
                attempt_count, last_error, next_attempt_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(mutation.id.as_str())
        .bind(mutation.kind().as_str())
        .bind(mutation.scope_key().as_str())
        .bind(&payload)
        .bind(mutation.attempt_count as i64)
        .bind(&mutation.last_error)
        .bind(mutation.next_attempt_at.timestamp_millis())
        .bind(mutation.created_at.timestamp_millis())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Assembles the next batch: oldest-first in insertion order, at most
    /// `max` entries, honoring per-scope FIFO. A scope whose head entry is
    /// still waiting on its backoff timer blocks every later entry of that
    /// scope, so a retry can never be overtaken by its successors.
    pub async fn peek_batch(
        &self,
        now: DateTime<Utc>,
        max: usize,
    ) -> Result<Vec<PendingMutation>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT mutation_id, scope_key, payload, status,
                   attempt_count, last_error, next_attempt_at, created_at
            FROM outbox WHERE status = 'pending' ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let now_millis = now.timestamp_millis();
        let mut blocked_scopes: HashSet<String> = HashSet::new();
        let mut batch = Vec::new();

        for row in rows {
            if batch.len() >= max {
                break;
            }
            if blocked_scopes.contains(&row.scope_key) {
                continue;
            }
            if row.next_attempt_at > now_millis {
                blocked_scopes.insert(row.scope_key);
                continue;
            }
            batch.push(mutation_from_row(row)?);
        }

        Ok(batch)
    }

    /// Removes an acknowledged mutation. Acking an id that is no longer
    /// queued is a no-op, so a late duplicate acknowledgment is harmless.
    pub async fn ack(&self, id: &RecordId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM outbox WHERE mutation_id = ?1 AND status = 'pending'")
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a failed delivery attempt. The entry stays queued with an
    /// updated attempt count and backoff deadline until the count exceeds
    /// `max_retries`, at which point it dead-letters.
    pub async fn fail(
        &self,
        id: &RecordId,
        error: &str,
        next_attempt_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Result<Option<FailureDisposition>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT attempt_count FROM outbox WHERE mutation_id = ?1 AND status = 'pending'",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((attempt_count,)) = row else {
            return Ok(None);
        };
        let attempts = attempt_count.max(0) as u32 + 1;

        if attempts > max_retries {
            sqlx::query(
                r#"
                UPDATE outbox
                SET status = 'dead', attempt_count = ?1, last_error = ?2
                WHERE mutation_id = ?3
                "#,
            )
            .bind(attempts as i64)
            .bind(error)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

            warn!(mutation_id = %id, attempts, "mutation dead-lettered after repeated failures");
            return Ok(Some(FailureDisposition::DeadLettered));
        }

        sqlx::query(
            r#"
            UPDATE outbox
            SET attempt_count = ?1, last_error = ?2, next_attempt_at = ?3
            WHERE mutation_id = ?4
            "#,
        )
        .bind(attempts as i64)
        .bind(error)
        .bind(next_attempt_at.timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Some(FailureDisposition::Requeued))
    }

    /// Permanent rejection by the remote system: straight to the dead-letter
    /// state, retained for diagnostics, excluded from automatic retry.
    pub async fn reject(&self, id: &RecordId, message: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE outbox
            SET status = 'dead', last_error = ?1, attempt_count = attempt_count + 1
            WHERE mutation_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(message)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn pending_count(&self) -> Result<u32> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM outbox WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u32)
    }

    pub async fn dead_letter_count(&self) -> Result<u32> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox WHERE status = 'dead'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u32)
    }

    pub async fn dead_letters(&self) -> Result<Vec<PendingMutation>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT mutation_id, scope_key, payload, status,
                   attempt_count, last_error, next_attempt_at, created_at
            FROM outbox WHERE status = 'dead' ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(mutation_from_row).collect()
    }

    /// Pending mutations of one scope, in insertion order. Used by the
    /// coordinator to tell whether a just-acknowledged record still has later
    /// mutations queued against it.
    pub async fn pending_in_scope(&self, scope: &ScopeKey) -> Result<Vec<PendingMutation>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT mutation_id, scope_key, payload, status,
                   attempt_count, last_error, next_attempt_at, created_at
            FROM outbox WHERE status = 'pending' AND scope_key = ?1 ORDER BY seq ASC
            "#,
        )
        .bind(scope.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(mutation_from_row).collect()
    }

    /// Puts a dead-lettered mutation back in the retry set, typically after
    /// the user corrected whatever the server rejected.
    pub async fn requeue_dead_letter(&self, id: &RecordId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE outbox
            SET status = 'pending', attempt_count = 0, last_error = NULL, next_attempt_at = 0
            WHERE mutation_id = ?1 AND status = 'dead'
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
