//! Point-of-sale contracts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleCompletedV1 {
    pub sale_id: Uuid,
    pub register_id: Uuid,

    /// Customer on the receipt; [`super::PLACEHOLDER`] for walk-in sales,
    /// which the register does not attach to a customer
    pub customer_id: String,

    pub total_minor: i64,
    pub currency: String,
    pub line_count: u32,
}
