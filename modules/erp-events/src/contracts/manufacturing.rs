use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrderCompletedV1 {
    pub work_order_id: Uuid,

    /// Finished good produced by the work order
    pub item_id: Uuid,

    pub quantity_produced: i64,
}
