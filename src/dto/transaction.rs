use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{cattle, staff, transaction};
use crate::models::NumberInput;

/// Raw ledger payload. Which fields matter depends on `category`:
/// milk sales read `litres`/`pricePerLitre`/`session`, cattle purchases
/// read the `cattle*` fields, everything else reads `amount`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    pub date: Option<String>,
    pub amount: Option<NumberInput>,
    pub litres: Option<NumberInput>,
    pub price_per_litre: Option<NumberInput>,
    #[validate(length(max = 32))]
    pub session: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub cattle_name: Option<String>,
    #[validate(length(max = 100))]
    pub cattle_type: Option<String>,
    pub cattle_age: Option<NumberInput>,
    pub market_price: Option<NumberInput>,
    pub cattle_id: Option<NumberInput>,
    pub staff_id: Option<NumberInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cattle_id: Option<i32>,
    pub staff_id: Option<i32>,
}

/// A ledger entry joined with the cattle and staff it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: transaction::Model,
    pub cattle: Option<cattle::Model>,
    pub staff: Option<staff::Model>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}
