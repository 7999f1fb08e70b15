//! Outbox persistence
//!
//! Two seams: [`OutboxWriter`] is the enqueue side and is implemented by
//! whatever represents the caller's unit of work (a Postgres transaction, an
//! in-memory unit of work). [`OutboxStore`] is the drain side: fetch a batch,
//! then save every state change of that cycle in one atomic write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_bus::EventEnvelope;
use serde::Serialize;

use crate::error::OutboxError;
use crate::record::{NewOutboxRecord, OutboxRecord};

/// Enqueue side of the outbox, bound to the caller's unit of work
///
/// A record written through a writer becomes visible to the drain loop only
/// when that unit of work commits. Rolling back discards it.
#[async_trait]
pub trait OutboxWriter: Send {
    async fn enqueue(&mut self, record: NewOutboxRecord) -> Result<i64, OutboxError>;
}

/// Drain side of the outbox
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Up to `limit` records due at `now`, oldest `created_at` first
    async fn fetch_batch(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Apply every change staged during one drain cycle atomically
    ///
    /// A change for a record that is already processed is skipped. A change
    /// for a record id the store has never seen rejects the whole batch with
    /// [`OutboxError::UnknownRecord`] and nothing is applied.
    async fn save(&self, changes: BatchChanges) -> Result<(), OutboxError>;
}

/// Serialize an envelope and enqueue it on `writer`
pub async fn enqueue_event<W, T>(
    writer: &mut W,
    envelope: &EventEnvelope<T>,
) -> Result<i64, OutboxError>
where
    W: OutboxWriter + ?Sized,
    T: Serialize + Sync,
{
    let record = NewOutboxRecord::from_envelope(envelope)?;
    let record_id = writer.enqueue(record).await?;

    tracing::debug!(
        record_id,
        event_id = %envelope.event_id,
        event_type = %envelope.event_type,
        schema_version = envelope.schema_version,
        "Event enqueued to outbox"
    );

    Ok(record_id)
}

/// A state transition of one record, staged during a drain cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    Processed {
        record_id: i64,
        at: DateTime<Utc>,
    },
    Failed {
        record_id: i64,
        reason: String,
        retry_at: Option<DateTime<Utc>>,
    },
}

impl RecordChange {
    pub fn record_id(&self) -> i64 {
        match self {
            RecordChange::Processed { record_id, .. } | RecordChange::Failed { record_id, .. } => {
                *record_id
            }
        }
    }
}

/// The unit of work of one drain cycle
///
/// Nothing touches the store until [`OutboxStore::save`] is called with the
/// whole batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchChanges {
    changes: Vec<RecordChange>,
}

impl BatchChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            changes: Vec::with_capacity(capacity),
        }
    }

    pub fn mark_processed(&mut self, record_id: i64, at: DateTime<Utc>) {
        self.changes.push(RecordChange::Processed { record_id, at });
    }

    /// Record a failed attempt; `retry_at = None` makes the failure terminal
    pub fn mark_failed(
        &mut self,
        record_id: i64,
        reason: impl Into<String>,
        retry_at: Option<DateTime<Utc>>,
    ) {
        self.changes.push(RecordChange::Failed {
            record_id,
            reason: reason.into(),
            retry_at,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordChange> {
        self.changes.iter()
    }
}

impl IntoIterator for BatchChanges {
    type Item = RecordChange;
    type IntoIter = std::vec::IntoIter<RecordChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
