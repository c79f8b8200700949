use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{staff, transaction, StaffStatus};
use crate::models::NumberInput;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub cnic: String,
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    pub salary: Option<NumberInput>,
    pub date_of_hiring: Option<String>,
    pub status: Option<StaffStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub cnic: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone: Option<String>,
    pub salary: Option<NumberInput>,
    pub date_of_hiring: Option<String>,
    pub status: Option<StaffStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffView {
    #[serde(flatten)]
    pub staff: staff::Model,
    pub transaction_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDetailView {
    #[serde(flatten)]
    pub staff: staff::Model,
    pub transactions: Vec<transaction::Model>,
}
