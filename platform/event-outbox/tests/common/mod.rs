//! Shared fixtures for outbox integration tests
//!
//! A small catalog of integration events (an `ItemCreated` that evolved from
//! v1 to v2, and a never-versioned `PriceChanged`) plus a scriptable bus.
#![allow(dead_code)]

use async_trait::async_trait;
use event_bus::{BusError, BusMessage, BusResult, EventBus, EventEnvelope, IntegrationEvent};
use event_outbox::versioning::payload_object;
use event_outbox::{
    decode_into, enqueue_event, EventTypeRegistry, InMemoryOutboxStore, StepConverter,
    VersionError, VersionRegistry,
};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCreatedV1 {
    pub item_id: String,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCreatedV2 {
    pub item_id: String,
    pub sku: String,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChanged {
    pub item_id: String,
    pub price_minor: i64,
}

impl IntegrationEvent for ItemCreatedV1 {
    fn event_type(&self) -> &'static str {
        "ItemCreated"
    }
    fn schema_version(&self) -> u32 {
        1
    }
    fn source_module(&self) -> &'static str {
        "inventory"
    }
}

impl IntegrationEvent for ItemCreatedV2 {
    fn event_type(&self) -> &'static str {
        "ItemCreated"
    }
    fn schema_version(&self) -> u32 {
        2
    }
    fn source_module(&self) -> &'static str {
        "inventory"
    }
}

impl IntegrationEvent for PriceChanged {
    fn event_type(&self) -> &'static str {
        "PriceChanged"
    }
    fn schema_version(&self) -> u32 {
        1
    }
    fn source_module(&self) -> &'static str {
        "inventory"
    }
}

/// Typed events the test service publishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEvent {
    ItemCreatedV1(ItemCreatedV1),
    ItemCreated(ItemCreatedV2),
    PriceChanged(PriceChanged),
}

impl From<ItemCreatedV1> for CatalogEvent {
    fn from(e: ItemCreatedV1) -> Self {
        CatalogEvent::ItemCreatedV1(e)
    }
}

impl From<ItemCreatedV2> for CatalogEvent {
    fn from(e: ItemCreatedV2) -> Self {
        CatalogEvent::ItemCreated(e)
    }
}

impl From<PriceChanged> for CatalogEvent {
    fn from(e: PriceChanged) -> Self {
        CatalogEvent::PriceChanged(e)
    }
}

pub fn item_v1(n: u32) -> ItemCreatedV1 {
    ItemCreatedV1 {
        item_id: format!("itm-{n}"),
        sku: format!("SKU-{n}"),
    }
}

pub fn price(n: u32) -> PriceChanged {
    PriceChanged {
        item_id: format!("itm-{n}"),
        price_minor: i64::from(n) * 100,
    }
}

/// Registry where `ItemCreated` has never evolved past v1
pub fn v1_types() -> Arc<EventTypeRegistry<CatalogEvent>> {
    let mut types = EventTypeRegistry::new();
    types
        .register("ItemCreated", decode_into::<ItemCreatedV1, CatalogEvent>)
        .register("PriceChanged", decode_into::<PriceChanged, CatalogEvent>);
    Arc::new(types)
}

/// Registry where `ItemCreated` is at v2
pub fn v2_types() -> Arc<EventTypeRegistry<CatalogEvent>> {
    let mut types = EventTypeRegistry::new();
    types
        .register("ItemCreated", decode_into::<ItemCreatedV2, CatalogEvent>)
        .register("PriceChanged", decode_into::<PriceChanged, CatalogEvent>);
    Arc::new(types)
}

pub fn item_created_v1_to_v2(mut payload: Value) -> Result<Value, VersionError> {
    payload_object(&mut payload, "ItemCreated", 1)?
        .entry("unit_of_measure")
        .or_insert_with(|| Value::String("EA".to_string()));
    Ok(payload)
}

pub fn v2_versions() -> Arc<VersionRegistry> {
    let mut versions = VersionRegistry::new();
    versions.register(
        "ItemCreated",
        StepConverter::new("ItemCreated").step(item_created_v1_to_v2),
    );
    Arc::new(versions)
}

/// Enqueue and commit envelopes in one unit of work, returning record ids
pub async fn enqueue_committed<T>(store: &InMemoryOutboxStore, events: Vec<T>) -> Vec<(i64, Uuid)>
where
    T: IntegrationEvent,
{
    let mut uow = store.begin();
    let mut ids = Vec::new();
    for event in events {
        let envelope = EventEnvelope::for_event("tenant-1", event);
        let record_id = enqueue_event(&mut uow, &envelope).await.unwrap();
        ids.push((record_id, envelope.event_id));
    }
    uow.commit().unwrap();
    ids
}

/// Bus that records publishes and fails on demand
#[derive(Clone, Default)]
pub struct ScriptedBus {
    published: Arc<Mutex<Vec<BusMessage>>>,
    failing_events: Arc<Mutex<HashSet<Uuid>>>,
    fail_next: Arc<AtomicUsize>,
    hang: Arc<Mutex<Option<Duration>>>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always fail publishes of this event
    pub fn fail_event(&self, event_id: Uuid) {
        self.failing_events.lock().unwrap().insert(event_id);
    }

    /// Fail the next `n` publishes, whatever they are
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Make every publish stall for `delay` before succeeding
    pub fn hang_for(&self, delay: Duration) {
        *self.hang.lock().unwrap() = Some(delay);
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_envelopes(&self) -> Vec<EventEnvelope<Value>> {
        self.published()
            .iter()
            .map(|msg| msg.envelope::<Value>().unwrap())
            .collect()
    }
}

#[async_trait]
impl EventBus for ScriptedBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let delay = *self.hang.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(BusError::ConnectionError("bus unreachable".to_string()));
        }

        let envelope: EventEnvelope<Value> = serde_json::from_slice(&payload)
            .map_err(|e| BusError::SerializationError(e.to_string()))?;
        if self.failing_events.lock().unwrap().contains(&envelope.event_id) {
            return Err(BusError::PublishError(format!(
                "rejected {}",
                envelope.event_id
            )));
        }

        self.published
            .lock()
            .unwrap()
            .push(BusMessage::new(subject.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        Err(BusError::SubscribeError(format!(
            "ScriptedBus does not support subscribe ({subject})"
        )))
    }
}
