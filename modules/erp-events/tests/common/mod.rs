//! Shared fixtures for ERP event tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use erp_events::DomainEvent;
use event_bus::{BusError, BusMessage, BusResult, EventBus};
use futures::stream::BoxStream;
use uuid::Uuid;

pub fn item_created() -> DomainEvent {
    DomainEvent::ItemCreated {
        item_id: Uuid::new_v4(),
        sku: "BOLT-M8".to_string(),
        name: "M8 bolt".to_string(),
        unit_of_measure: Some("BOX".to_string()),
    }
}

pub fn invoice_posted(total_minor: i64) -> DomainEvent {
    DomainEvent::InvoicePosted {
        invoice_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        total_minor,
        currency: "EUR".to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 11, 30),
    }
}

pub fn lead_score() -> DomainEvent {
    DomainEvent::LeadScoreRecalculated {
        lead_id: Uuid::new_v4(),
        score: 42,
    }
}

pub fn employee_hired() -> DomainEvent {
    DomainEvent::EmployeeHired {
        employee_id: Uuid::new_v4(),
        full_name: "Grace Hopper".to_string(),
        department: Some("Engineering".to_string()),
        start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap_or_default(),
    }
}

/// Bus whose broker is always down
#[derive(Debug, Clone, Default)]
pub struct UnreachableBus;

#[async_trait]
impl EventBus for UnreachableBus {
    async fn publish(&self, subject: &str, _payload: Vec<u8>) -> BusResult<()> {
        Err(BusError::ConnectionError(format!(
            "no route to broker for {subject}"
        )))
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        Err(BusError::ConnectionError(format!(
            "no route to broker for {subject}"
        )))
    }
}
