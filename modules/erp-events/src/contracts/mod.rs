//! Integration event contracts
//!
//! The wire shapes other services consume, one struct per event type and
//! schema version. Field names are part of the contract; renaming one is a
//! new schema version with a converter in [`crate::versions`].

pub mod accounting;
pub mod crm;
pub mod hr;
pub mod manufacturing;
pub mod pos;
pub mod procurement;
pub mod stock;

pub use accounting::*;
pub use crm::*;
pub use hr::*;
pub use manufacturing::*;
pub use pos::*;
pub use procurement::*;
pub use stock::*;

use event_bus::IntegrationEvent as EventContract;
use event_outbox::{decode_into, EventTypeRegistry};
use serde::Serialize;

/// Stand-in for contract fields the domain event does not carry
///
/// Consumers must treat this value as "unknown". It marks a known data gap
/// rather than dropping the field from the contract.
pub const PLACEHOLDER: &str = "unknown";

/// Every integration event the ERP modules publish
///
/// Serializes as the bare contract body, so an
/// `EventEnvelope<IntegrationEvent>` has the same payload as the envelope
/// of the concrete contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IntegrationEvent {
    ItemCreated(ItemCreatedV2),
    /// Legacy shape, only produced by writers that predate v2
    ItemCreatedV1(ItemCreatedV1),
    StockAdjusted(StockAdjustedV1),
    InvoicePosted(InvoicePostedV2),
    /// Legacy shape, only produced by writers that predate v2
    InvoicePostedV1(InvoicePostedV1),
    PaymentRecorded(PaymentRecordedV1),
    LeadConverted(LeadConvertedV1),
    EmployeeHired(EmployeeHiredV1),
    WorkOrderCompleted(WorkOrderCompletedV1),
    PurchaseOrderApproved(PurchaseOrderApprovedV1),
    SaleCompleted(SaleCompletedV1),
}

/// Implements the envelope contract for a payload struct and lifts it into
/// [`IntegrationEvent`]
macro_rules! contract {
    ($payload:ident => $variant:ident, $event_type:literal, $version:literal, $module:literal) => {
        impl EventContract for $payload {
            fn event_type(&self) -> &'static str {
                $event_type
            }
            fn schema_version(&self) -> u32 {
                $version
            }
            fn source_module(&self) -> &'static str {
                $module
            }
        }

        impl From<$payload> for IntegrationEvent {
            fn from(event: $payload) -> Self {
                IntegrationEvent::$variant(event)
            }
        }
    };
}

contract!(ItemCreatedV1 => ItemCreatedV1, "ItemCreated", 1, "stock");
contract!(ItemCreatedV2 => ItemCreated, "ItemCreated", 2, "stock");
contract!(StockAdjustedV1 => StockAdjusted, "StockAdjusted", 1, "stock");
contract!(InvoicePostedV1 => InvoicePostedV1, "InvoicePosted", 1, "accounting");
contract!(InvoicePostedV2 => InvoicePosted, "InvoicePosted", 2, "accounting");
contract!(PaymentRecordedV1 => PaymentRecorded, "PaymentRecorded", 1, "accounting");
contract!(LeadConvertedV1 => LeadConverted, "LeadConverted", 1, "crm");
contract!(EmployeeHiredV1 => EmployeeHired, "EmployeeHired", 1, "hr");
contract!(WorkOrderCompletedV1 => WorkOrderCompleted, "WorkOrderCompleted", 1, "manufacturing");
contract!(PurchaseOrderApprovedV1 => PurchaseOrderApproved, "PurchaseOrderApproved", 1, "procurement");
contract!(SaleCompletedV1 => SaleCompleted, "SaleCompleted", 1, "pos");

/// Run `$body` against whichever contract struct `$event` holds
macro_rules! with_contract {
    ($event:expr, $contract:ident => $body:expr) => {
        match $event {
            IntegrationEvent::ItemCreated($contract) => $body,
            IntegrationEvent::ItemCreatedV1($contract) => $body,
            IntegrationEvent::StockAdjusted($contract) => $body,
            IntegrationEvent::InvoicePosted($contract) => $body,
            IntegrationEvent::InvoicePostedV1($contract) => $body,
            IntegrationEvent::PaymentRecorded($contract) => $body,
            IntegrationEvent::LeadConverted($contract) => $body,
            IntegrationEvent::EmployeeHired($contract) => $body,
            IntegrationEvent::WorkOrderCompleted($contract) => $body,
            IntegrationEvent::PurchaseOrderApproved($contract) => $body,
            IntegrationEvent::SaleCompleted($contract) => $body,
        }
    };
}

impl IntegrationEvent {
    /// Decoders for every published event type at its current version
    ///
    /// Legacy shapes are not registered: their payloads are upgraded by
    /// [`crate::versions::version_registry`] before decoding.
    pub fn type_registry() -> EventTypeRegistry<IntegrationEvent> {
        let mut types = EventTypeRegistry::new();
        types
            .register("ItemCreated", decode_into::<ItemCreatedV2, Self>)
            .register("StockAdjusted", decode_into::<StockAdjustedV1, Self>)
            .register("InvoicePosted", decode_into::<InvoicePostedV2, Self>)
            .register("PaymentRecorded", decode_into::<PaymentRecordedV1, Self>)
            .register("LeadConverted", decode_into::<LeadConvertedV1, Self>)
            .register("EmployeeHired", decode_into::<EmployeeHiredV1, Self>)
            .register("WorkOrderCompleted", decode_into::<WorkOrderCompletedV1, Self>)
            .register("PurchaseOrderApproved", decode_into::<PurchaseOrderApprovedV1, Self>)
            .register("SaleCompleted", decode_into::<SaleCompletedV1, Self>);
        types
    }
}

impl EventContract for IntegrationEvent {
    fn event_type(&self) -> &'static str {
        with_contract!(self, e => e.event_type())
    }

    fn schema_version(&self) -> u32 {
        with_contract!(self, e => e.schema_version())
    }

    fn source_module(&self) -> &'static str {
        with_contract!(self, e => e.source_module())
    }
}
