//! Outbox drain loop
//!
//! One long-lived task per process. Each cycle fetches the oldest due
//! records, turns every record into a typed event at the current schema
//! version, publishes it, and flushes all resulting record changes in a
//! single save. A record that cannot be delivered is marked failed with the
//! reason; it never aborts the rest of the batch.

use chrono::Utc;
use event_bus::{publish_envelope, validate_envelope_fields, BusError, EventBus, EventEnvelope};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::DrainConfig;
use crate::error::OutboxError;
use crate::record::OutboxRecord;
use crate::registry::EventTypeRegistry;
use crate::store::{BatchChanges, OutboxStore};
use crate::versioning::{VersionError, VersionRegistry};

/// Why a single record could not be delivered
///
/// The display string is what ends up in the record's `error` column.
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("type not found: {0}")]
    TypeNotFound(String),

    #[error("deserialize failed: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("publish failed: {0}")]
    Publish(#[from] BusError),
}

impl DeliveryFailure {
    /// Only transport failures can succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryFailure::Publish(_))
    }
}

/// Outcome counts of one drain cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub fetched: usize,
    pub processed: usize,
    /// Records failed permanently this cycle
    pub failed: usize,
    /// Records failed this cycle but scheduled for another attempt
    pub retry_scheduled: usize,
}

/// Background task moving outbox records onto the event bus
///
/// `E` is the closed set of integration events the owning service
/// publishes; the [`EventTypeRegistry`] says how to decode each of them.
pub struct OutboxDrainLoop<E> {
    store: Arc<dyn OutboxStore>,
    bus: Arc<dyn EventBus>,
    types: Arc<EventTypeRegistry<E>>,
    versions: Arc<VersionRegistry>,
    config: DrainConfig,
}

impl<E> OutboxDrainLoop<E>
where
    E: Serialize + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<dyn OutboxStore>,
        bus: Arc<dyn EventBus>,
        types: Arc<EventTypeRegistry<E>>,
        versions: Arc<VersionRegistry>,
    ) -> Self {
        Self {
            store,
            bus,
            types,
            versions,
            config: DrainConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DrainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Drain until shutdown is signalled
    ///
    /// Shutdown is a message on (or the closing of) the broadcast channel.
    /// It is checked before every fetch and while sleeping between cycles;
    /// a cycle already in progress always runs to its flush, so nothing
    /// published is left unrecorded. Fetch and flush errors are logged and
    /// retried on the next interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            max_attempts = self.config.retry.max_attempts,
            "Starting outbox drain loop"
        );

        let mut cycle: u64 = 0;

        loop {
            if shutdown_requested(&mut shutdown) {
                break;
            }

            cycle += 1;

            match self.drain_once().await {
                Ok(report) if report.fetched > 0 => {
                    tracing::info!(
                        cycle,
                        fetched = report.fetched,
                        processed = report.processed,
                        failed = report.failed,
                        retry_scheduled = report.retry_scheduled,
                        "Outbox drain cycle complete"
                    );
                }
                Ok(_) => {
                    tracing::debug!(cycle, "Outbox drain cycle: nothing pending");
                }
                Err(e) => {
                    tracing::error!(cycle, error = %e, "Outbox drain cycle failed, retrying next interval");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!(cycles = cycle, "Outbox drain loop stopped");
    }

    /// Run a single drain cycle
    pub async fn drain_once(&self) -> Result<DrainReport, OutboxError> {
        let records = self
            .store
            .fetch_batch(self.config.batch_size, Utc::now())
            .await?;

        let mut report = DrainReport {
            fetched: records.len(),
            ..DrainReport::default()
        };

        if records.is_empty() {
            return Ok(report);
        }

        let mut changes = BatchChanges::with_capacity(records.len());

        for record in &records {
            match self.deliver(record).await {
                Ok(()) => {
                    tracing::debug!(
                        record_id = record.record_id,
                        event_id = %record.event_id,
                        event_type = %record.event_type,
                        "Outbox record published"
                    );
                    changes.mark_processed(record.record_id, Utc::now());
                    report.processed += 1;
                }
                Err(failure) => {
                    let failed_attempts = u32::try_from(record.attempts.max(0))
                        .unwrap_or(u32::MAX)
                        .saturating_add(1);
                    let retry_at = if failure.is_retryable() {
                        self.config.retry.next_attempt_at(failed_attempts, Utc::now())
                    } else {
                        None
                    };

                    tracing::warn!(
                        record_id = record.record_id,
                        event_id = %record.event_id,
                        event_type = %record.event_type,
                        attempts = failed_attempts,
                        retry_at = ?retry_at,
                        error = %failure,
                        "Outbox record delivery failed"
                    );

                    if retry_at.is_some() {
                        report.retry_scheduled += 1;
                    } else {
                        report.failed += 1;
                    }
                    changes.mark_failed(record.record_id, failure.to_string(), retry_at);
                }
            }
        }

        self.store.save(changes).await?;

        Ok(report)
    }

    /// Reconstruct the typed event for `record` and publish it
    async fn deliver(&self, record: &OutboxRecord) -> Result<(), DeliveryFailure> {
        let decode = self
            .types
            .resolve(&record.event_type)
            .ok_or_else(|| DeliveryFailure::TypeNotFound(record.event_type.clone()))?;

        validate_envelope_fields(&record.payload).map_err(DeliveryFailure::Deserialize)?;
        let mut stored: EventEnvelope<serde_json::Value> =
            serde_json::from_value(record.payload.clone())
                .map_err(|e| DeliveryFailure::Deserialize(e.to_string()))?;

        let source_version = stored.schema_version;
        let current_version = self.versions.current_version(&record.event_type);
        let body = std::mem::take(&mut stored.payload);

        let body = match source_version.cmp(&current_version) {
            Ordering::Equal => body,
            Ordering::Less => {
                tracing::debug!(
                    record_id = record.record_id,
                    event_type = %record.event_type,
                    from = source_version,
                    to = current_version,
                    "Upgrading stored payload"
                );
                self.versions
                    .upgrade(&record.event_type, body, source_version)?
                    .ok_or_else(|| unsupported(record, source_version, current_version))?
            }
            Ordering::Greater => {
                return Err(unsupported(record, source_version, current_version));
            }
        };

        let event = decode(body).map_err(|e| DeliveryFailure::Deserialize(e.to_string()))?;
        let envelope = stored.replace_payload(event, current_version);

        match self.config.publish_timeout {
            Some(limit) => tokio::time::timeout(limit, publish_envelope(self.bus.as_ref(), &envelope))
                .await
                .map_err(|_| BusError::Timeout(limit))??,
            None => publish_envelope(self.bus.as_ref(), &envelope).await?,
        }

        Ok(())
    }

    /// Spawn [`run`](Self::run) onto the current tokio runtime
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

fn unsupported(record: &OutboxRecord, version: u32, latest: u32) -> DeliveryFailure {
    DeliveryFailure::Version(VersionError::UnsupportedVersion {
        event_type: record.event_type.clone(),
        version,
        latest,
    })
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
