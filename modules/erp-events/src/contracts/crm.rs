use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadConvertedV1 {
    pub lead_id: Uuid,
    pub customer_id: Uuid,

    /// Sales owner id, or [`super::PLACEHOLDER`] for unassigned leads
    pub owner_id: String,
}
