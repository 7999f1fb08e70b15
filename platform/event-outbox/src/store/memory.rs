//! In-memory outbox for tests and single-process development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BatchChanges, OutboxStore, OutboxWriter, RecordChange};
use crate::error::OutboxError;
use crate::record::{NewOutboxRecord, OutboxRecord};

/// Outbox table held in process memory
///
/// Cloning shares the same table. Writes go through [`InMemoryUnitOfWork`],
/// which mirrors a database transaction: staged records appear only on
/// [`commit`](InMemoryUnitOfWork::commit).
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    records: Arc<Mutex<Vec<OutboxRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a unit of work for enqueueing
    pub fn begin(&self) -> InMemoryUnitOfWork {
        InMemoryUnitOfWork {
            store: self.clone(),
            staged: Vec::new(),
        }
    }

    /// Snapshot of every committed record in insertion order
    pub fn records(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        Ok(self.lock()?.clone())
    }

    pub fn get(&self, record_id: i64) -> Result<Option<OutboxRecord>, OutboxError> {
        Ok(self
            .lock()?
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned())
    }

    /// Records neither processed nor failed
    pub fn pending_count(&self) -> Result<usize, OutboxError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| r.processed_at.is_none() && r.error.is_none())
            .count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<OutboxRecord>>, OutboxError> {
        self.records
            .lock()
            .map_err(|_| OutboxError::Unavailable("in-memory outbox lock poisoned".to_string()))
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_batch(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let records = self.lock()?;
        let mut due: Vec<OutboxRecord> = records.iter().filter(|r| r.is_due(now)).cloned().collect();
        due.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.record_id.cmp(&b.record_id))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn save(&self, changes: BatchChanges) -> Result<(), OutboxError> {
        let mut records = self.lock()?;

        // All or nothing: reject the batch before mutating anything
        if let Some(missing) = changes
            .iter()
            .map(RecordChange::record_id)
            .find(|id| !records.iter().any(|r| r.record_id == *id))
        {
            return Err(OutboxError::UnknownRecord(missing));
        }

        for change in changes {
            let Some(record) = records
                .iter_mut()
                .find(|r| r.record_id == change.record_id())
            else {
                continue;
            };
            if record.is_processed() {
                continue;
            }
            match change {
                RecordChange::Processed { at, .. } => {
                    record.processed_at = Some(at);
                    record.error = None;
                    record.next_attempt_at = None;
                }
                RecordChange::Failed {
                    reason, retry_at, ..
                } => {
                    record.error = Some(reason);
                    record.attempts += 1;
                    record.next_attempt_at = retry_at;
                }
            }
        }

        Ok(())
    }
}

/// Staged enqueues awaiting commit
///
/// Dropping a unit of work without committing discards its records, like a
/// transaction rolled back on drop.
pub struct InMemoryUnitOfWork {
    store: InMemoryOutboxStore,
    staged: Vec<OutboxRecord>,
}

impl InMemoryUnitOfWork {
    /// Make every staged record visible to the drain loop at once
    pub fn commit(self) -> Result<usize, OutboxError> {
        let count = self.staged.len();
        self.store.lock()?.extend(self.staged);
        Ok(count)
    }

    pub fn rollback(self) {
        tracing::debug!(discarded = self.staged.len(), "Outbox unit of work rolled back");
    }

    pub fn staged(&self) -> &[OutboxRecord] {
        &self.staged
    }
}

#[async_trait]
impl OutboxWriter for InMemoryUnitOfWork {
    async fn enqueue(&mut self, record: NewOutboxRecord) -> Result<i64, OutboxError> {
        let record_id = self.store.allocate_id();
        self.staged.push(record.into_record(record_id));
        Ok(record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn new_record(event_type: &str, created_at: DateTime<Utc>) -> NewOutboxRecord {
        NewOutboxRecord {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            schema_version: 1,
            payload: json!({}),
            created_at,
        }
    }

    #[tokio::test]
    async fn uncommitted_records_are_invisible() {
        let store = InMemoryOutboxStore::new();
        let mut uow = store.begin();
        uow.enqueue(new_record("ItemCreated", Utc::now()))
            .await
            .unwrap();

        assert!(store.fetch_batch(10, Utc::now()).await.unwrap().is_empty());

        assert_eq!(uow.commit().unwrap(), 1);
        assert_eq!(store.fetch_batch(10, Utc::now()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_records() {
        let store = InMemoryOutboxStore::new();
        let mut uow = store.begin();
        uow.enqueue(new_record("ItemCreated", Utc::now()))
            .await
            .unwrap();
        uow.rollback();

        let mut dropped = store.begin();
        dropped
            .enqueue(new_record("ItemCreated", Utc::now()))
            .await
            .unwrap();
        drop(dropped);

        assert!(store.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_orders_by_created_at_and_respects_limit() {
        let store = InMemoryOutboxStore::new();
        let base = Utc::now();
        let mut uow = store.begin();
        uow.enqueue(new_record("C", base + Duration::seconds(2)))
            .await
            .unwrap();
        uow.enqueue(new_record("A", base)).await.unwrap();
        uow.enqueue(new_record("B", base + Duration::seconds(1)))
            .await
            .unwrap();
        uow.commit().unwrap();

        let batch = store.fetch_batch(2, base + Duration::seconds(5)).await.unwrap();
        let types: Vec<_> = batch.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, ["A", "B"]);
    }

    #[tokio::test]
    async fn save_applies_changes_and_excludes_finished_records() {
        let store = InMemoryOutboxStore::new();
        let mut uow = store.begin();
        let ok_id = uow.enqueue(new_record("A", Utc::now())).await.unwrap();
        let bad_id = uow.enqueue(new_record("B", Utc::now())).await.unwrap();
        uow.commit().unwrap();

        let mut changes = BatchChanges::new();
        changes.mark_processed(ok_id, Utc::now());
        changes.mark_failed(bad_id, "publish failed: bus down", None);
        store.save(changes).await.unwrap();

        let ok = store.get(ok_id).unwrap().unwrap();
        let bad = store.get(bad_id).unwrap().unwrap();
        assert!(ok.processed_at.is_some());
        assert_eq!(bad.error.as_deref(), Some("publish failed: bus down"));
        assert_eq!(bad.attempts, 1);
        assert!(store.fetch_batch(10, Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_is_all_or_nothing() {
        let store = InMemoryOutboxStore::new();
        let mut uow = store.begin();
        let id = uow.enqueue(new_record("A", Utc::now())).await.unwrap();
        uow.commit().unwrap();

        let mut changes = BatchChanges::new();
        changes.mark_processed(id, Utc::now());
        changes.mark_processed(9_999, Utc::now());

        assert!(matches!(
            store.save(changes).await,
            Err(OutboxError::UnknownRecord(9_999))
        ));
        assert!(store.get(id).unwrap().unwrap().processed_at.is_none());
    }

    #[tokio::test]
    async fn processed_at_is_never_overwritten() {
        let store = InMemoryOutboxStore::new();
        let mut uow = store.begin();
        let id = uow.enqueue(new_record("A", Utc::now())).await.unwrap();
        uow.commit().unwrap();

        let first = Utc::now();
        let mut changes = BatchChanges::new();
        changes.mark_processed(id, first);
        store.save(changes).await.unwrap();

        let mut again = BatchChanges::new();
        again.mark_processed(id, first + Duration::seconds(30));
        again.mark_failed(id, "late failure", None);
        store.save(again).await.unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.processed_at, Some(first));
        assert!(record.error.is_none());
    }
}
