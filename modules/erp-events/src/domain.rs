//! Domain events raised inside the ERP modules
//!
//! These are the in-process facts each module records when its state
//! changes. They are shaped for the module that raises them, not for
//! consumers: some carry fields the outside world never sees, some lack
//! fields the published contract requires. [`crate::translator`] bridges
//! the two.

use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    // Stock
    ItemCreated {
        item_id: Uuid,
        sku: String,
        name: String,
        unit_of_measure: Option<String>,
    },
    StockAdjusted {
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity_delta: i64,
        reason: String,
    },

    // Accounting
    InvoicePosted {
        invoice_id: Uuid,
        customer_id: Uuid,
        total_minor: i64,
        currency: String,
        due_date: Option<NaiveDate>,
    },
    PaymentRecorded {
        payment_id: Uuid,
        invoice_id: Uuid,
        amount_minor: i64,
        currency: String,
        method: String,
    },

    // CRM
    LeadConverted {
        lead_id: Uuid,
        customer_id: Uuid,
        owner_id: Option<Uuid>,
    },
    /// Internal scoring bookkeeping; never leaves the CRM module
    LeadScoreRecalculated { lead_id: Uuid, score: i32 },

    // HR
    EmployeeHired {
        employee_id: Uuid,
        full_name: String,
        department: Option<String>,
        start_date: NaiveDate,
    },

    // Manufacturing
    WorkOrderCompleted {
        work_order_id: Uuid,
        item_id: Uuid,
        quantity_produced: i64,
    },

    // Procurement
    PurchaseOrderApproved {
        purchase_order_id: Uuid,
        vendor_id: Uuid,
        total_minor: i64,
        currency: String,
        approved_by: Uuid,
    },

    // POS
    SaleCompleted {
        sale_id: Uuid,
        register_id: Uuid,
        total_minor: i64,
        currency: String,
        line_count: u32,
    },
    /// Drawer reconciliation stays inside the POS module
    CashDrawerCounted {
        register_id: Uuid,
        counted_minor: i64,
    },
}

impl DomainEvent {
    /// Variant name, for logs
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ItemCreated { .. } => "ItemCreated",
            DomainEvent::StockAdjusted { .. } => "StockAdjusted",
            DomainEvent::InvoicePosted { .. } => "InvoicePosted",
            DomainEvent::PaymentRecorded { .. } => "PaymentRecorded",
            DomainEvent::LeadConverted { .. } => "LeadConverted",
            DomainEvent::LeadScoreRecalculated { .. } => "LeadScoreRecalculated",
            DomainEvent::EmployeeHired { .. } => "EmployeeHired",
            DomainEvent::WorkOrderCompleted { .. } => "WorkOrderCompleted",
            DomainEvent::PurchaseOrderApproved { .. } => "PurchaseOrderApproved",
            DomainEvent::SaleCompleted { .. } => "SaleCompleted",
            DomainEvent::CashDrawerCounted { .. } => "CashDrawerCounted",
        }
    }
}
