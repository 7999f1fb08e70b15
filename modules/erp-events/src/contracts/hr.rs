use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeHiredV1 {
    pub employee_id: Uuid,
    pub full_name: String,

    /// [`super::PLACEHOLDER`] when hired before a department was assigned
    pub department: String,

    pub start_date: NaiveDate,
}
