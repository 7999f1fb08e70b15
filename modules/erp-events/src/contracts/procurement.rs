use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrderApprovedV1 {
    pub purchase_order_id: Uuid,
    pub vendor_id: Uuid,
    pub total_minor: i64,
    pub currency: String,
    pub approved_by: Uuid,
}
