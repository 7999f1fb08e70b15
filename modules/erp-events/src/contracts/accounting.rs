//! Accounting module contracts

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `InvoicePosted` as first published: decimal total, optional currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoicePostedV1 {
    pub invoice_id: Uuid,
    pub customer_id: Uuid,

    /// Invoice total in major units (e.g. 12.50)
    pub total: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Current `InvoicePosted` contract: amounts in minor units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoicePostedV2 {
    pub invoice_id: Uuid,
    pub customer_id: Uuid,

    /// Invoice total in minor units (cents)
    pub total_minor: i64,

    /// ISO 4217 currency code (e.g., "USD", "EUR")
    pub currency: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecordedV1 {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,

    /// Payment method as recorded by the cashier or gateway
    pub method: String,
}
