//! Domain events through the outbox onto the bus

mod common;

use common::*;
use erp_events::contracts::{InvoicePostedV1, ItemCreatedV1};
use erp_events::{
    enqueue_domain_events, version_registry, DispatchContext, DomainEventDispatcher,
    IntegrationEvent,
};
use event_bus::{EventEnvelope, InMemoryBus};
use event_outbox::{enqueue_event, InMemoryOutboxStore, OutboxDrainLoop};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

fn relay(store: &InMemoryOutboxStore, bus: &InMemoryBus) -> OutboxDrainLoop<IntegrationEvent> {
    OutboxDrainLoop::new(
        Arc::new(store.clone()),
        Arc::new(bus.clone()),
        Arc::new(IntegrationEvent::type_registry()),
        Arc::new(version_registry()),
    )
}

fn published(bus: &InMemoryBus) -> Vec<EventEnvelope<Value>> {
    bus.published()
        .unwrap()
        .iter()
        .map(|m| m.envelope::<Value>().unwrap())
        .collect()
}

#[tokio::test]
async fn test_committed_domain_events_reach_the_bus() {
    let store = InMemoryOutboxStore::new();
    let bus = InMemoryBus::new().with_history();
    let ctx = DispatchContext::new("tenant-1").with_causation_id("cmd-42");

    let mut uow = store.begin();
    let envelopes = enqueue_domain_events(
        &mut uow,
        &ctx,
        &[item_created(), lead_score(), invoice_posted(2500)],
    )
    .await
    .unwrap();
    assert_eq!(uow.commit().unwrap(), 2);

    let report = relay(&store, &bus).drain_once().await.unwrap();
    assert_eq!(report.processed, 2);

    let delivered = published(&bus);
    let delivered_ids: Vec<Uuid> = delivered.iter().map(|e| e.event_id).collect();
    let enqueued_ids: Vec<Uuid> = envelopes.iter().map(|e| e.event_id).collect();
    assert_eq!(delivered_ids, enqueued_ids);
    assert!(delivered
        .iter()
        .all(|e| e.causation_id.as_deref() == Some("cmd-42")));
}

#[tokio::test]
async fn test_rolled_back_domain_events_are_never_published() {
    let store = InMemoryOutboxStore::new();
    let bus = InMemoryBus::new().with_history();

    let mut uow = store.begin();
    enqueue_domain_events(&mut uow, &DispatchContext::new("tenant-1"), &[item_created()])
        .await
        .unwrap();
    uow.rollback();

    let report = relay(&store, &bus).drain_once().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert!(bus.published().unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_payloads_are_upgraded() {
    let store = InMemoryOutboxStore::new();
    let bus = InMemoryBus::new().with_history();

    let mut uow = store.begin();
    let item = EventEnvelope::for_event(
        "tenant-1",
        ItemCreatedV1 {
            item_id: Uuid::new_v4(),
            sku: "NUT-M8".to_string(),
            name: "M8 nut".to_string(),
        },
    );
    let invoice = EventEnvelope::for_event(
        "tenant-1",
        InvoicePostedV1 {
            invoice_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            total: 99.95,
            currency: None,
            due_date: None,
        },
    );
    enqueue_event(&mut uow, &item).await.unwrap();
    enqueue_event(&mut uow, &invoice).await.unwrap();
    uow.commit().unwrap();

    let report = relay(&store, &bus).drain_once().await.unwrap();
    assert_eq!(report.processed, 2);

    let delivered = published(&bus);
    assert_eq!(delivered[0].event_id, item.event_id);
    assert_eq!(delivered[0].schema_version, 2);
    assert_eq!(delivered[0].payload["unit_of_measure"], "EA");
    assert_eq!(delivered[0].payload["category"], erp_events::PLACEHOLDER);

    assert_eq!(delivered[1].event_id, invoice.event_id);
    assert_eq!(delivered[1].schema_version, 2);
    assert_eq!(delivered[1].payload["total_minor"], 9995);
    assert_eq!(delivered[1].payload["currency"], "USD");
}

#[tokio::test]
async fn test_best_effort_dispatch_shares_dedup_keys_with_outbox() {
    let store = InMemoryOutboxStore::new();
    let bus = InMemoryBus::new().with_history();

    let mut uow = store.begin();
    let envelopes = enqueue_domain_events(
        &mut uow,
        &DispatchContext::new("tenant-1"),
        &[employee_hired()],
    )
    .await
    .unwrap();
    uow.commit().unwrap();

    // Low-latency path right after commit, then the relay catches up
    DomainEventDispatcher::new(Arc::new(bus.clone()))
        .publish_all(&envelopes)
        .await
        .unwrap();
    relay(&store, &bus).drain_once().await.unwrap();

    let delivered = published(&bus);
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].event_id, delivered[1].event_id);
}
