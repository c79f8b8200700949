use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{cattle, transaction, CattleStatus};
use crate::models::NumberInput;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCattleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(max = 100))]
    pub cattle_type: Option<String>,
    pub age: Option<NumberInput>,
    #[serde(alias = "price")]
    pub purchase_price: Option<NumberInput>,
    #[serde(alias = "date")]
    pub purchase_date: Option<String>,
    pub market_price: Option<NumberInput>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCattleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub cattle_type: Option<String>,
    pub age: Option<NumberInput>,
    #[serde(alias = "price")]
    pub purchase_price: Option<NumberInput>,
    #[serde(alias = "date")]
    pub purchase_date: Option<String>,
    pub market_price: Option<NumberInput>,
    pub status: Option<CattleStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CattleListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleView {
    #[serde(flatten)]
    pub cattle: cattle::Model,
    pub transaction_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleDetailView {
    #[serde(flatten)]
    pub cattle: cattle::Model,
    pub transactions: Vec<transaction::Model>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleDeletion {
    pub id: i32,
    /// True when ledger entries still reference the animal and it was only marked deleted.
    pub soft_deleted: bool,
}
