use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const EVENT_STATUS_PENDING: &str = "pending";
pub const EVENT_STATUS_COMPLETED: &str = "completed";
pub const EVENT_STATUS_FAILED: &str = "failed";

/// Recorded webhook event. The processor's event id is the idempotency key:
/// a legitimately-signed event replayed later resolves to the same row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub signature: Option<String>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Repository for the webhook event ledger
pub struct WebhookEventRepository {
    pool: PgPool,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an incoming event, or return the existing row for a replay.
    ///
    /// The no-op DO UPDATE makes the insert return the stored row (with its
    /// stored status) when the event id was seen before.
    pub async fn log_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DatabaseError> {
        sqlx::query_as::<_, WebhookEvent>(
            "INSERT INTO webhook_events (event_id, event_type, payload, signature, status)
             VALUES ($1, $2, $3, $4, 'pending')
             ON CONFLICT (event_id) DO UPDATE SET event_id = EXCLUDED.event_id
             RETURNING id, event_id, event_type, payload, signature, status,
                       failure_reason, received_at, processed_at",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .bind(signature)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Mark an event as successfully dispatched
    pub async fn mark_processed(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE webhook_events
             SET status = 'completed', processed_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    /// Record a dispatch failure on the event row
    pub async fn record_failure(&self, id: Uuid, reason: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE webhook_events
             SET status = 'failed', failure_reason = $2, processed_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }
}
