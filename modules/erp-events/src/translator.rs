//! Domain event translation and dispatch
//!
//! [`translate`] maps each [`DomainEvent`] to the integration event other
//! services consume, or to nothing when the fact is internal to its module.
//! Two delivery paths share the translation:
//!
//! - **Reliable**: [`enqueue_domain_events`] writes the envelopes into the
//!   caller's unit of work. The outbox drain loop publishes them after
//!   commit, at least once.
//! - **Immediate**: [`DomainEventDispatcher`] publishes straight to the bus.
//!   Failures come back to the caller; nothing is retried.
//!
//! Both paths build envelopes through [`prepare`], so an event sent on both
//! carries the same `event_id` and consumers deduplicate it.

use event_bus::{publish_envelope, BusError, EventBus, EventEnvelope};
use event_outbox::{enqueue_event, OutboxError, OutboxWriter};
use std::sync::Arc;
use thiserror::Error;

use crate::contracts::*;
use crate::domain::DomainEvent;
use crate::versions::DEFAULT_UNIT_OF_MEASURE;

/// Map a domain event to its published contract
///
/// Returns `None` for events that never leave their module.
pub fn translate(event: &DomainEvent) -> Option<IntegrationEvent> {
    let translated: IntegrationEvent = match event.clone() {
        DomainEvent::ItemCreated {
            item_id,
            sku,
            name,
            unit_of_measure,
        } => ItemCreatedV2 {
            item_id,
            sku,
            name,
            unit_of_measure: unit_of_measure
                .unwrap_or_else(|| DEFAULT_UNIT_OF_MEASURE.to_string()),
            // Items are classified after creation
            category: PLACEHOLDER.to_string(),
        }
        .into(),

        DomainEvent::StockAdjusted {
            item_id,
            warehouse_id,
            quantity_delta,
            reason,
        } => StockAdjustedV1 {
            item_id,
            warehouse_id,
            quantity_delta,
            reason,
        }
        .into(),

        DomainEvent::InvoicePosted {
            invoice_id,
            customer_id,
            total_minor,
            currency,
            due_date,
        } => InvoicePostedV2 {
            invoice_id,
            customer_id,
            total_minor,
            currency,
            due_date,
        }
        .into(),

        DomainEvent::PaymentRecorded {
            payment_id,
            invoice_id,
            amount_minor,
            currency,
            method,
        } => PaymentRecordedV1 {
            payment_id,
            invoice_id,
            amount_minor,
            currency,
            method,
        }
        .into(),

        DomainEvent::LeadConverted {
            lead_id,
            customer_id,
            owner_id,
        } => LeadConvertedV1 {
            lead_id,
            customer_id,
            owner_id: owner_id.map_or_else(|| PLACEHOLDER.to_string(), |id| id.to_string()),
        }
        .into(),

        DomainEvent::EmployeeHired {
            employee_id,
            full_name,
            department,
            start_date,
        } => EmployeeHiredV1 {
            employee_id,
            full_name,
            department: department.unwrap_or_else(|| PLACEHOLDER.to_string()),
            start_date,
        }
        .into(),

        DomainEvent::WorkOrderCompleted {
            work_order_id,
            item_id,
            quantity_produced,
        } => WorkOrderCompletedV1 {
            work_order_id,
            item_id,
            quantity_produced,
        }
        .into(),

        DomainEvent::PurchaseOrderApproved {
            purchase_order_id,
            vendor_id,
            total_minor,
            currency,
            approved_by,
        } => PurchaseOrderApprovedV1 {
            purchase_order_id,
            vendor_id,
            total_minor,
            currency,
            approved_by,
        }
        .into(),

        DomainEvent::SaleCompleted {
            sale_id,
            register_id,
            total_minor,
            currency,
            line_count,
        } => SaleCompletedV1 {
            sale_id,
            register_id,
            // The register does not attach customers to walk-in sales
            customer_id: PLACEHOLDER.to_string(),
            total_minor,
            currency,
            line_count,
        }
        .into(),

        DomainEvent::LeadScoreRecalculated { .. } | DomainEvent::CashDrawerCounted { .. } => {
            tracing::debug!(
                domain_event = event.name(),
                "Domain event is internal, not published"
            );
            return None;
        }
    };

    Some(translated)
}

/// Tenant and tracing ids stamped on every envelope of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchContext {
    pub tenant_id: String,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
}

impl DispatchContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Self::default()
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }
}

/// Translate `events` and wrap each published one in a fresh envelope
pub fn prepare(ctx: &DispatchContext, events: &[DomainEvent]) -> Vec<EventEnvelope<IntegrationEvent>> {
    events
        .iter()
        .filter_map(translate)
        .map(|event| {
            EventEnvelope::for_event(ctx.tenant_id.clone(), event)
                .with_source_version(env!("CARGO_PKG_VERSION").to_string())
                .with_correlation_id(ctx.correlation_id.clone())
                .with_causation_id(ctx.causation_id.clone())
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to publish {event_type} ({event_id}): {source}")]
    Publish {
        event_type: String,
        event_id: uuid::Uuid,
        #[source]
        source: BusError,
    },
}

/// Publishes translated domain events straight to the bus
#[derive(Debug, Clone)]
pub struct DomainEventDispatcher {
    bus: Arc<dyn EventBus>,
}

impl DomainEventDispatcher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Translate and publish; returns how many events were published
    ///
    /// Stops at the first failed publish and returns its error. Events
    /// published before it stay published.
    pub async fn dispatch(
        &self,
        ctx: &DispatchContext,
        events: &[DomainEvent],
    ) -> Result<usize, DispatchError> {
        let envelopes = prepare(ctx, events);
        self.publish_all(&envelopes).await
    }

    /// Publish already prepared envelopes, e.g. the ones returned by
    /// [`enqueue_domain_events`] once the unit of work committed
    pub async fn publish_all(
        &self,
        envelopes: &[EventEnvelope<IntegrationEvent>],
    ) -> Result<usize, DispatchError> {
        for envelope in envelopes {
            if let Err(e) = publish_envelope(self.bus.as_ref(), envelope).await {
                tracing::error!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    tenant_id = %envelope.tenant_id,
                    error = %e,
                    "Failed to dispatch domain event"
                );
                return Err(DispatchError::Publish {
                    event_type: envelope.event_type.clone(),
                    event_id: envelope.event_id,
                    source: e,
                });
            }
        }

        Ok(envelopes.len())
    }
}

/// Translate `events` and enqueue them in the caller's unit of work
///
/// Nothing reaches the bus until the unit of work commits and the drain loop
/// picks the records up. The envelopes are returned so the caller may also
/// hand them to [`DomainEventDispatcher::publish_all`] after commit for
/// lower latency.
pub async fn enqueue_domain_events<W>(
    writer: &mut W,
    ctx: &DispatchContext,
    events: &[DomainEvent],
) -> Result<Vec<EventEnvelope<IntegrationEvent>>, OutboxError>
where
    W: OutboxWriter + ?Sized,
{
    let envelopes = prepare(ctx, events);
    for envelope in &envelopes {
        enqueue_event(&mut *writer, envelope).await?;
    }
    Ok(envelopes)
}
