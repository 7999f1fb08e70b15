use chrono::{DateTime, Utc};
use event_bus::EventEnvelope;
use serde::Serialize;
use uuid::Uuid;

/// A durable queue entry in `events_outbox`
///
/// `payload` holds the full envelope as written, at `schema_version`.
/// `processed_at` is set once, after a successful publish. `error` carries
/// the reason of the most recent failed attempt; with the default retry
/// policy a record with an error is never fetched again.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OutboxRecord {
    pub record_id: i64,
    pub event_id: Uuid,
    pub event_type: String,
    pub schema_version: i32,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub attempts: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }

    /// Whether a drain cycle running at `now` should pick this record up
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.is_processed() {
            return false;
        }
        match (&self.error, self.next_attempt_at) {
            (None, _) => true,
            (Some(_), Some(retry_at)) => retry_at <= now,
            (Some(_), None) => false,
        }
    }
}

/// A record about to be enqueued; the store assigns `record_id`
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub schema_version: i32,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewOutboxRecord {
    /// Serialize an envelope at its current schema version
    pub fn from_envelope<T: Serialize>(
        envelope: &EventEnvelope<T>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: envelope.event_id,
            event_type: envelope.event_type.clone(),
            schema_version: i32::try_from(envelope.schema_version).unwrap_or(i32::MAX),
            payload: envelope.to_json()?,
            created_at: Utc::now(),
        })
    }

    pub(crate) fn into_record(self, record_id: i64) -> OutboxRecord {
        OutboxRecord {
            record_id,
            event_id: self.event_id,
            event_type: self.event_type,
            schema_version: self.schema_version,
            payload: self.payload,
            created_at: self.created_at,
            processed_at: None,
            error: None,
            attempts: 0,
            next_attempt_at: None,
        }
    }
}
