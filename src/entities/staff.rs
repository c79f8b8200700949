use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(ascii_case_insensitive)]
pub enum StaffStatus {
    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    #[strum(serialize = "active")]
    Active,
    #[sea_orm(string_value = "on-leave")]
    #[serde(rename = "on-leave")]
    #[strum(serialize = "on-leave")]
    OnLeave,
    #[sea_orm(string_value = "relieved")]
    #[serde(rename = "relieved")]
    #[strum(serialize = "relieved")]
    Relieved,
    #[sea_orm(string_value = "terminated")]
    #[serde(rename = "terminated")]
    #[strum(serialize = "terminated")]
    Terminated,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// National identity card number
    pub cnic: String,
    pub phone: String,
    pub salary: i64,
    pub date_of_hiring: Date,
    pub status: StaffStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(StaffStatus::Active);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
