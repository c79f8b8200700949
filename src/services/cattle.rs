use std::{str::FromStr, sync::Arc, time::Instant};

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::{self, db_failure},
    dto::cattle::{
        CattleDeletion, CattleDetailView, CattleListQuery, CattleView, CreateCattleRequest,
        UpdateCattleRequest,
    },
    entities::{cattle, transaction, CattleStatus},
    errors::ServiceError,
    models::input,
    services::{ledger::DEFAULT_CATTLE_TYPE, transaction_counts},
};

/// Herd records. Purchases made through the ledger also land here.
#[derive(Debug, Clone)]
pub struct CattleService {
    db: Arc<DatabaseConnection>,
}

impl CattleService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists cattle by name, each with the number of ledger entries referencing it.
    /// Soft-deleted animals only show up when asked for by status.
    #[instrument(skip(self))]
    pub async fn list_cattle(&self, query: &CattleListQuery) -> Result<Vec<CattleView>, ServiceError> {
        let db = &*self.db;
        let mut select = cattle::Entity::find();

        select = match input::non_blank(query.status.as_deref()) {
            Some(raw) => {
                let status = CattleStatus::from_str(&raw).map_err(|_| {
                    ServiceError::ValidationError(format!("unknown cattle status '{}'", raw))
                })?;
                select.filter(cattle::Column::Status.eq(status))
            }
            None => select.filter(cattle::Column::Status.ne(CattleStatus::Deleted)),
        };

        let herd = select
            .order_by(
                Expr::expr(Func::lower(Expr::col((cattle::Entity, cattle::Column::Name)))),
                Order::Asc,
            )
            .order_by_asc(cattle::Column::Id)
            .all(db)
            .await
            .map_err(db_failure("Failed to list cattle"))?;

        let ids = herd.iter().map(|c| c.id).collect();
        let counts = transaction_counts(db, transaction::Column::CattleId, ids).await?;

        Ok(herd
            .into_iter()
            .map(|cattle| CattleView {
                transaction_count: counts.get(&cattle.id).copied().unwrap_or(0),
                cattle,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_cattle(&self, id: i32) -> Result<CattleDetailView, ServiceError> {
        let db = &*self.db;
        let cattle = find_cattle(db, id).await?;

        let transactions = cattle
            .find_related(transaction::Entity)
            .order_by_desc(transaction::Column::Date)
            .order_by_desc(transaction::Column::Id)
            .all(db)
            .await
            .map_err(db_failure("Failed to load cattle ledger entries"))?;

        Ok(CattleDetailView {
            cattle,
            transactions,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_cattle(&self, request: CreateCattleRequest) -> Result<cattle::Model, ServiceError> {
        request.validate()?;

        let name = input::non_blank(Some(&request.name))
            .ok_or_else(|| ServiceError::ValidationError("name is required".into()))?;
        let purchase_date = input::optional_date("purchaseDate", request.purchase_date.as_deref())?
            .unwrap_or_else(|| Utc::now().date_naive());

        let model = cattle::ActiveModel {
            name: Set(name),
            cattle_type: Set(input::non_blank(request.cattle_type.as_deref())
                .unwrap_or_else(|| DEFAULT_CATTLE_TYPE.to_string())),
            age: Set(input::whole_number("age", request.age.as_ref())?.unwrap_or(0)),
            purchase_price: Set(
                input::optional_units("purchasePrice", request.purchase_price.as_ref())?
                    .unwrap_or(0),
            ),
            purchase_date: Set(purchase_date),
            status: Set(CattleStatus::Active),
            market_price: Set(input::optional_units("marketPrice", request.market_price.as_ref())?),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(db_failure("Failed to create cattle"))?;

        info!(cattle_id = model.id, "Cattle created");
        Ok(model)
    }

    /// Replaces only the fields present in `request`.
    #[instrument(skip(self, request))]
    pub async fn update_cattle(
        &self,
        id: i32,
        request: UpdateCattleRequest,
    ) -> Result<cattle::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let mut active: cattle::ActiveModel = find_cattle(db, id).await?.into();

        if let Some(name) = input::non_blank(request.name.as_deref()) {
            active.name = Set(name);
        }
        if let Some(cattle_type) = input::non_blank(request.cattle_type.as_deref()) {
            active.cattle_type = Set(cattle_type);
        }
        if let Some(age) = input::whole_number("age", request.age.as_ref())? {
            active.age = Set(age);
        }
        if let Some(price) = input::optional_units("purchasePrice", request.purchase_price.as_ref())? {
            active.purchase_price = Set(price);
        }
        if let Some(date) = input::optional_date("purchaseDate", request.purchase_date.as_deref())? {
            active.purchase_date = Set(date);
        }
        if let Some(price) = input::optional_units("marketPrice", request.market_price.as_ref())? {
            active.market_price = Set(Some(price));
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        let updated = active
            .update(db)
            .await
            .map_err(db_failure("Failed to update cattle"))?;

        info!(cattle_id = id, "Cattle updated");
        Ok(updated)
    }

    /// Removes an animal. One still referenced by ledger entries is only
    /// marked `deleted`, so the history keeps resolving.
    #[instrument(skip(self))]
    pub async fn delete_cattle(&self, id: i32) -> Result<CattleDeletion, ServiceError> {
        let started = Instant::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_failure("Failed to start cattle delete"))?;

        match remove_cattle(&txn, id).await {
            Ok(outcome) => {
                db::commit(txn, "cattle.delete", started).await?;
                info!(cattle_id = id, soft_deleted = outcome.soft_deleted, "Cattle deleted");
                Ok(outcome)
            }
            Err(e) => Err(db::rollback(txn, "cattle.delete", e).await),
        }
    }
}

async fn find_cattle<C: ConnectionTrait>(conn: &C, id: i32) -> Result<cattle::Model, ServiceError> {
    cattle::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_failure("Failed to fetch cattle"))?
        .ok_or_else(|| ServiceError::not_found("Cattle", id))
}

async fn remove_cattle<C: ConnectionTrait>(conn: &C, id: i32) -> Result<CattleDeletion, ServiceError> {
    let animal = find_cattle(conn, id).await?;

    let references = transaction::Entity::find()
        .filter(transaction::Column::CattleId.eq(id))
        .count(conn)
        .await
        .map_err(db_failure("Failed to count cattle ledger entries"))?;

    if references > 0 {
        let mut active: cattle::ActiveModel = animal.into();
        active.status = Set(CattleStatus::Deleted);
        active
            .update(conn)
            .await
            .map_err(db_failure("Failed to soft delete cattle"))?;
        return Ok(CattleDeletion {
            id,
            soft_deleted: true,
        });
    }

    animal
        .delete(conn)
        .await
        .map_err(db_failure("Failed to delete cattle"))?;
    Ok(CattleDeletion {
        id,
        soft_deleted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::transaction::TransactionRequest, models::NumberInput,
        services::{test_support::memory_db, LedgerService},
    };
    use assert_matches::assert_matches;

    fn cow(name: &str) -> CreateCattleRequest {
        CreateCattleRequest {
            name: name.to_string(),
            cattle_type: Some("Holstein".into()),
            age: Some(NumberInput::from("3")),
            purchase_price: Some(NumberInput::from(120000)),
            purchase_date: Some("2024-01-15".into()),
            market_price: None,
        }
    }

    #[tokio::test]
    async fn lists_by_name_with_transaction_counts() {
        let db = memory_db().await;
        let service = CattleService::new(db.clone());
        let ledger = LedgerService::new(db);

        let zara = service.create_cattle(cow("Zara")).await.unwrap();
        service.create_cattle(cow("Abby")).await.unwrap();

        ledger
            .create_transaction(TransactionRequest {
                category: "cattle_food".into(),
                date: Some("2024-02-01".into()),
                amount: Some(NumberInput::from(500)),
                cattle_id: Some(NumberInput::from(zara.id as i64)),
                ..Default::default()
            })
            .await
            .unwrap();

        let listed = service.list_cattle(&CattleListQuery::default()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|v| v.cattle.name.as_str()).collect();
        assert_eq!(names, ["Abby", "Zara"]);
        assert_eq!(listed[0].transaction_count, 0);
        assert_eq!(listed[1].transaction_count, 1);
    }

    #[tokio::test]
    async fn name_order_ignores_case() {
        let service = CattleService::new(memory_db().await);
        for name in ["Zara", "abby", "Bella"] {
            service.create_cattle(cow(name)).await.unwrap();
        }

        let listed = service.list_cattle(&CattleListQuery::default()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|v| v.cattle.name.as_str()).collect();
        assert_eq!(names, ["abby", "Bella", "Zara"]);
    }

    #[tokio::test]
    async fn delete_is_soft_only_when_referenced() {
        let db = memory_db().await;
        let service = CattleService::new(db.clone());
        let ledger = LedgerService::new(db);

        let kept = service.create_cattle(cow("Daisy")).await.unwrap();
        let gone = service.create_cattle(cow("Rosie")).await.unwrap();
        ledger
            .create_transaction(TransactionRequest {
                category: "cattle_food".into(),
                date: Some("2024-02-01".into()),
                amount: Some(NumberInput::from(250)),
                cattle_id: Some(NumberInput::from(kept.id as i64)),
                ..Default::default()
            })
            .await
            .unwrap();

        let soft = service.delete_cattle(kept.id).await.unwrap();
        assert!(soft.soft_deleted);
        let detail = service.get_cattle(kept.id).await.unwrap();
        assert_eq!(detail.cattle.status, CattleStatus::Deleted);
        assert_eq!(detail.transactions.len(), 1);

        let hard = service.delete_cattle(gone.id).await.unwrap();
        assert!(!hard.soft_deleted);
        assert_matches!(
            service.get_cattle(gone.id).await,
            Err(ServiceError::NotFound(_))
        );

        // soft-deleted animals leave the default listing
        let listed = service.list_cattle(&CattleListQuery::default()).await.unwrap();
        assert!(listed.is_empty());
        let deleted = service
            .list_cattle(&CattleListQuery {
                status: Some("deleted".into()),
            })
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_only_given_fields() {
        let db = memory_db().await;
        let service = CattleService::new(db);
        let created = service.create_cattle(cow("Bella")).await.unwrap();

        let updated = service
            .update_cattle(
                created.id,
                UpdateCattleRequest {
                    market_price: Some(NumberInput::from("135000")),
                    age: Some(NumberInput::from(4)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Bella");
        assert_eq!(updated.cattle_type, "Holstein");
        assert_eq!(updated.age, 4);
        assert_eq!(updated.market_price, Some(135000));
        assert_eq!(updated.purchase_price, 120000);
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let db = memory_db().await;
        let service = CattleService::new(db);

        let mut bad_age = cow("Molly");
        bad_age.age = Some(NumberInput::from("-1"));
        assert_matches!(
            service.create_cattle(bad_age).await,
            Err(ServiceError::ValidationError(_))
        );

        assert_matches!(
            service
                .list_cattle(&CattleListQuery {
                    status: Some("grazing".into())
                })
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            service.delete_cattle(999).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
