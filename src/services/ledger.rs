use std::{
    collections::{BTreeSet, HashMap},
    str::FromStr,
    sync::Arc,
    time::Instant,
};

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::{self, db_failure},
    dto::transaction::{TransactionListQuery, TransactionRequest, TransactionView},
    entities::{cattle, staff, transaction, CattleStatus, TransactionKind},
    errors::ServiceError,
    models::{
        input, CattleDetails, CattlePurchaseDetails, MilkSaleDetails, TransactionCategory,
        TransactionDetails,
    },
};

/// Breed recorded when a purchase entry names an animal but not its type.
pub const DEFAULT_CATTLE_TYPE: &str = "Unknown";

/// Largest amount a single entry may carry, in whole currency units.
const MAX_AMOUNT: f64 = 1e13;

/// A validated ledger entry with its amount and details derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEntry {
    pub name: String,
    pub kind: TransactionKind,
    pub category: TransactionCategory,
    pub amount: i64,
    pub date: NaiveDate,
    pub details: Option<TransactionDetails>,
    pub cattle_id: Option<i32>,
    pub staff_id: Option<i32>,
    /// Animal to register with a purchase entry.
    pub purchase: Option<CattleDetails>,
}

impl PreparedEntry {
    /// Validates `request` and derives amount and details from its category.
    /// Milk sales always price at `litres * pricePerLitre`; a client `amount` is ignored.
    pub fn from_request(request: &TransactionRequest) -> Result<Self, ServiceError> {
        request.validate()?;

        let category = TransactionCategory::from(request.category.as_str());
        if category.as_str().is_empty() {
            return Err(ServiceError::ValidationError("category is required".into()));
        }

        let kind = match input::non_blank(request.kind.as_deref()) {
            Some(raw) => TransactionKind::from_str(&raw).map_err(|_| {
                ServiceError::ValidationError("type must be 'income' or 'expense'".into())
            })?,
            None => category.default_kind().ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "type is required for category '{}'",
                    category
                ))
            })?,
        };

        let date = input::required_date("date", request.date.as_deref())?;
        let name = input::non_blank(request.name.as_deref()).unwrap_or_else(|| category.label());
        let description = input::non_blank(request.description.as_deref());

        let (amount, mut details) = match category {
            TransactionCategory::MilkSales => {
                let litres = input::required_number("litres", request.litres.as_ref())?;
                let price_per_litre =
                    input::required_number("pricePerLitre", request.price_per_litre.as_ref())?;
                let milk = MilkSaleDetails {
                    litres,
                    price_per_litre,
                    session: input::non_blank(request.session.as_deref()),
                };
                (
                    checked_units(litres * price_per_litre)?,
                    Some(TransactionDetails::MilkSale(milk)),
                )
            }
            _ => {
                let amount = input::required_number("amount", request.amount.as_ref())?;
                (
                    checked_units(amount)?,
                    TransactionDetails::description(description.clone()),
                )
            }
        };

        let purchase = match (
            &category,
            input::non_blank(request.cattle_name.as_deref()),
        ) {
            (TransactionCategory::CattlePurchase, Some(cattle_name)) => Some(CattleDetails {
                name: cattle_name,
                cattle_type: input::non_blank(request.cattle_type.as_deref())
                    .unwrap_or_else(|| DEFAULT_CATTLE_TYPE.to_string()),
                age: input::whole_number("cattleAge", request.cattle_age.as_ref())?.unwrap_or(0),
                market_price: input::optional_units("marketPrice", request.market_price.as_ref())?,
            }),
            _ => None,
        };

        if let Some(cattle_details) = &purchase {
            details = Some(TransactionDetails::CattlePurchase(CattlePurchaseDetails {
                description,
                cattle_details: cattle_details.clone(),
            }));
        }

        Ok(Self {
            name,
            kind,
            category,
            amount,
            date,
            details,
            cattle_id: input::optional_id("cattleId", request.cattle_id.as_ref())?,
            staff_id: input::optional_id("staffId", request.staff_id.as_ref())?,
            purchase,
        })
    }
}

fn checked_units(value: f64) -> Result<i64, ServiceError> {
    if value > MAX_AMOUNT {
        return Err(ServiceError::ValidationError("amount is too large".into()));
    }
    Ok(input::to_units(value))
}

/// Ledger operations. Creation is the only path that touches cattle rows.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Arc<DatabaseConnection>,
}

impl LedgerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records an entry and its cattle side effects in one database transaction:
    /// a purchase with a cattle name registers the animal, a sale marks the
    /// referenced animal sold. Any failure leaves no trace of the call.
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionView, ServiceError> {
        let entry = PreparedEntry::from_request(&request)?;
        crate::tracing::with_metrics("ledger.create", || self.persist_new(entry)).await
    }

    async fn persist_new(&self, entry: PreparedEntry) -> Result<TransactionView, ServiceError> {
        let started = Instant::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_failure("Failed to start ledger transaction"))?;

        match apply_new_entry(&txn, entry).await {
            Ok(view) => {
                db::commit(txn, "ledger.create", started).await?;
                info!(
                    transaction_id = view.transaction.id,
                    category = %view.transaction.category,
                    amount = view.transaction.amount,
                    cattle_id = ?view.transaction.cattle_id,
                    "Ledger entry created"
                );
                Ok(view)
            }
            Err(e) => Err(db::rollback(txn, "ledger.create", e).await),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(&self, id: i32) -> Result<TransactionView, ServiceError> {
        let db = &*self.db;
        let row = transaction::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(db_failure("Failed to fetch ledger entry"))?
            .ok_or_else(|| ServiceError::not_found("Transaction", id))?;

        let mut views = load_views(db, vec![row]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("Transaction", id))
    }

    /// Lists entries newest first; entries on the same date come back in
    /// reverse creation order.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        query: &TransactionListQuery,
    ) -> Result<Vec<TransactionView>, ServiceError> {
        let db = &*self.db;
        let mut select = transaction::Entity::find();

        if let Some(raw) = input::non_blank(query.kind.as_deref()) {
            let kind = TransactionKind::from_str(&raw).map_err(|_| {
                ServiceError::ValidationError("type must be 'income' or 'expense'".into())
            })?;
            select = select.filter(transaction::Column::Kind.eq(kind));
        }
        if let Some(category) = input::non_blank(query.category.as_deref()) {
            select = select.filter(transaction::Column::Category.eq(category));
        }

        let from = input::optional_date("from", query.from.as_deref())?;
        let to = input::optional_date("to", query.to.as_deref())?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "from must not be after to".into(),
                ));
            }
        }
        if let Some(from) = from {
            select = select.filter(transaction::Column::Date.gte(from));
        }
        if let Some(to) = to {
            select = select.filter(transaction::Column::Date.lte(to));
        }
        if let Some(cattle_id) = query.cattle_id {
            select = select.filter(transaction::Column::CattleId.eq(cattle_id));
        }
        if let Some(staff_id) = query.staff_id {
            select = select.filter(transaction::Column::StaffId.eq(staff_id));
        }

        let rows = select
            .order_by_desc(transaction::Column::Date)
            .order_by_desc(transaction::Column::Id)
            .all(db)
            .await
            .map_err(db_failure("Failed to list ledger entries"))?;

        load_views(db, rows).await
    }

    /// Replaces the derivable fields of an entry. Purchase and sale side
    /// effects are not replayed on edit.
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn update_transaction(
        &self,
        id: i32,
        request: TransactionRequest,
    ) -> Result<TransactionView, ServiceError> {
        let entry = PreparedEntry::from_request(&request)?;
        let started = Instant::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_failure("Failed to start ledger transaction"))?;

        match apply_update(&txn, id, entry).await {
            Ok(view) => {
                db::commit(txn, "ledger.update", started).await?;
                info!(transaction_id = id, "Ledger entry updated");
                Ok(view)
            }
            Err(e) => Err(db::rollback(txn, "ledger.update", e).await),
        }
    }

    /// Removes an entry. Cattle it referenced keep their current status.
    #[instrument(skip(self))]
    pub async fn delete_transaction(&self, id: i32) -> Result<(), ServiceError> {
        let result = transaction::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(db_failure("Failed to delete ledger entry"))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Transaction", id));
        }
        info!(transaction_id = id, "Ledger entry deleted");
        Ok(())
    }
}

async fn apply_new_entry<C: ConnectionTrait>(
    conn: &C,
    mut entry: PreparedEntry,
) -> Result<TransactionView, ServiceError> {
    if let Some(purchase) = entry.purchase.take() {
        let created = cattle::ActiveModel {
            name: Set(purchase.name),
            cattle_type: Set(purchase.cattle_type),
            age: Set(purchase.age),
            purchase_price: Set(entry.amount),
            purchase_date: Set(entry.date),
            status: Set(CattleStatus::Active),
            market_price: Set(purchase.market_price),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(db_failure("Failed to register purchased cattle"))?;

        info!(cattle_id = created.id, "Registered cattle from purchase entry");
        entry.cattle_id = Some(created.id);
    }

    ensure_links(conn, entry.cattle_id, entry.staff_id).await?;

    let is_sale = entry.category == TransactionCategory::CattleSales;
    let cattle_id = entry.cattle_id;

    let row = transaction::ActiveModel {
        name: Set(entry.name),
        kind: Set(entry.kind),
        category: Set(entry.category.to_string()),
        amount: Set(entry.amount),
        date: Set(entry.date),
        details: Set(entry.details.as_ref().map(TransactionDetails::encode)),
        cattle_id: Set(entry.cattle_id),
        staff_id: Set(entry.staff_id),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(db_failure("Failed to insert ledger entry"))?;

    if let (true, Some(cattle_id)) = (is_sale, cattle_id) {
        mark_sold(conn, cattle_id).await?;
    }

    let id = row.id;
    load_views(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Transaction", id))
}

async fn apply_update<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    entry: PreparedEntry,
) -> Result<TransactionView, ServiceError> {
    let existing = transaction::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_failure("Failed to fetch ledger entry"))?
        .ok_or_else(|| ServiceError::not_found("Transaction", id))?;

    ensure_links(conn, entry.cattle_id, entry.staff_id).await?;

    let mut active: transaction::ActiveModel = existing.into();
    active.name = Set(entry.name);
    active.kind = Set(entry.kind);
    active.category = Set(entry.category.to_string());
    active.amount = Set(entry.amount);
    active.date = Set(entry.date);
    active.details = Set(entry.details.as_ref().map(TransactionDetails::encode));
    active.cattle_id = Set(entry.cattle_id);
    active.staff_id = Set(entry.staff_id);

    let row = active
        .update(conn)
        .await
        .map_err(db_failure("Failed to update ledger entry"))?;

    load_views(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Transaction", id))
}

async fn ensure_links<C: ConnectionTrait>(
    conn: &C,
    cattle_id: Option<i32>,
    staff_id: Option<i32>,
) -> Result<(), ServiceError> {
    if let Some(id) = cattle_id {
        let found = cattle::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_failure("Failed to look up linked cattle"))?;
        if found.is_none() {
            return Err(ServiceError::not_found("Cattle", id));
        }
    }
    if let Some(id) = staff_id {
        let found = staff::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_failure("Failed to look up linked staff"))?;
        if found.is_none() {
            return Err(ServiceError::not_found("Staff", id));
        }
    }
    Ok(())
}

async fn mark_sold<C: ConnectionTrait>(conn: &C, cattle_id: i32) -> Result<(), ServiceError> {
    let animal = cattle::Entity::find_by_id(cattle_id)
        .one(conn)
        .await
        .map_err(db_failure("Failed to fetch sold cattle"))?
        .ok_or_else(|| ServiceError::not_found("Cattle", cattle_id))?;

    if animal.status == CattleStatus::Deleted {
        return Err(ServiceError::ValidationError(format!(
            "cattle {} has been deleted and cannot be sold",
            cattle_id
        )));
    }

    let mut active: cattle::ActiveModel = animal.into();
    active.status = Set(CattleStatus::Sold);
    active
        .update(conn)
        .await
        .map_err(db_failure("Failed to mark cattle sold"))?;

    info!(cattle_id, "Cattle marked sold");
    Ok(())
}

/// Joins ledger rows with the cattle and staff they reference, preserving row order.
pub(crate) async fn load_views<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<transaction::Model>,
) -> Result<Vec<TransactionView>, ServiceError> {
    let cattle_ids: BTreeSet<i32> = rows.iter().filter_map(|row| row.cattle_id).collect();
    let staff_ids: BTreeSet<i32> = rows.iter().filter_map(|row| row.staff_id).collect();

    let cattle_by_id: HashMap<i32, cattle::Model> = if cattle_ids.is_empty() {
        HashMap::new()
    } else {
        cattle::Entity::find()
            .filter(cattle::Column::Id.is_in(cattle_ids))
            .all(conn)
            .await
            .map_err(db_failure("Failed to load linked cattle"))?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let staff_by_id: HashMap<i32, staff::Model> = if staff_ids.is_empty() {
        HashMap::new()
    } else {
        staff::Entity::find()
            .filter(staff::Column::Id.is_in(staff_ids))
            .all(conn)
            .await
            .map_err(db_failure("Failed to load linked staff"))?
            .into_iter()
            .map(|s| (s.id, s))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|row| TransactionView {
            cattle: row.cattle_id.and_then(|id| cattle_by_id.get(&id).cloned()),
            staff: row.staff_id.and_then(|id| staff_by_id.get(&id).cloned()),
            transaction: row,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumberInput;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn request(category: &str) -> TransactionRequest {
        TransactionRequest {
            category: category.to_string(),
            date: Some("2024-03-01".into()),
            ..Default::default()
        }
    }

    #[test]
    fn milk_sale_amount_is_litres_times_price() {
        let mut req = request("milk_sales");
        req.litres = Some(NumberInput::from(30));
        req.price_per_litre = Some(NumberInput::from("150"));
        req.session = Some("morning".into());
        req.amount = Some(NumberInput::from(1));

        let entry = PreparedEntry::from_request(&req).unwrap();
        assert_eq!(entry.amount, 4500);
        assert_eq!(entry.kind, TransactionKind::Income);
        assert_eq!(entry.name, "Milk Sales");
        assert_eq!(
            entry.details.unwrap().encode(),
            serde_json::json!({"litres": 30, "pricePerLitre": 150, "session": "morning"})
        );
    }

    #[test]
    fn milk_sale_requires_both_factors() {
        let mut req = request("milk_sales");
        req.litres = Some(NumberInput::from(30));
        assert_matches!(
            PreparedEntry::from_request(&req),
            Err(ServiceError::ValidationError(msg)) if msg.contains("pricePerLitre")
        );
    }

    #[test]
    fn purchase_with_name_prepares_cattle() {
        let mut req = request("cattle_purchase");
        req.amount = Some(NumberInput::from(150000));
        req.cattle_name = Some("Bessie".into());
        req.cattle_type = Some("Jersey".into());
        req.cattle_age = Some(NumberInput::from("4"));

        let entry = PreparedEntry::from_request(&req).unwrap();
        let purchase = entry.purchase.clone().unwrap();
        assert_eq!(purchase.name, "Bessie");
        assert_eq!(purchase.age, 4);
        assert_eq!(entry.kind, TransactionKind::Expense);
        assert_matches!(entry.details, Some(TransactionDetails::CattlePurchase(_)));
    }

    #[test]
    fn purchase_without_name_is_plain_expense() {
        let mut req = request("cattle_purchase");
        req.amount = Some(NumberInput::from(9000));
        req.description = Some("Feed trough".into());

        let entry = PreparedEntry::from_request(&req).unwrap();
        assert!(entry.purchase.is_none());
        assert_eq!(
            entry.details,
            Some(TransactionDetails::Note {
                description: "Feed trough".into()
            })
        );
    }

    #[test]
    fn rejects_bad_inputs_before_any_write() {
        let mut req = request("cattle_food");
        req.amount = Some(NumberInput::from("lots"));
        assert_matches!(
            PreparedEntry::from_request(&req),
            Err(ServiceError::ValidationError(_))
        );

        let mut req = request("cattle_food");
        req.amount = Some(NumberInput::from(10));
        req.kind = Some("transfer".into());
        assert_matches!(
            PreparedEntry::from_request(&req),
            Err(ServiceError::ValidationError(_))
        );

        let mut req = request("vet_bills");
        req.amount = Some(NumberInput::from(10));
        assert_matches!(
            PreparedEntry::from_request(&req),
            Err(ServiceError::ValidationError(msg)) if msg.contains("type")
        );

        let mut req = request("cattle_food");
        req.amount = Some(NumberInput::from(10));
        req.date = None;
        assert_matches!(
            PreparedEntry::from_request(&req),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn free_text_category_with_type_is_accepted() {
        let mut req = request("vet_bills");
        req.kind = Some("expense".into());
        req.amount = Some(NumberInput::from("2500.4"));
        req.cattle_id = Some(NumberInput::from(""));

        let entry = PreparedEntry::from_request(&req).unwrap();
        assert_eq!(entry.category.to_string(), "vet_bills");
        assert_eq!(entry.amount, 2500);
        assert_eq!(entry.cattle_id, None);
        assert_eq!(entry.name, "Vet Bills");
    }

    mod persisted {
        use super::*;
        use crate::services::test_support::memory_db;
        use sea_orm::PaginatorTrait;

        fn purchase(name: &str) -> TransactionRequest {
            TransactionRequest {
                category: "cattle_purchase".into(),
                date: Some("2024-03-01".into()),
                amount: Some(NumberInput::from("150000")),
                cattle_name: Some(name.into()),
                cattle_type: Some("Jersey".into()),
                cattle_age: Some(NumberInput::from(4)),
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn purchase_registers_linked_cattle() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());

            let view = ledger.create_transaction(purchase("Bessie")).await.unwrap();
            let animal = view.cattle.expect("joined cattle");
            assert_eq!(view.transaction.cattle_id, Some(animal.id));
            assert_eq!(animal.name, "Bessie");
            assert_eq!(animal.cattle_type, "Jersey");
            assert_eq!(animal.age, 4);
            assert_eq!(animal.purchase_price, 150000);
            assert_eq!(animal.purchase_date, view.transaction.date);
            assert_eq!(animal.status, CattleStatus::Active);
            assert_eq!(
                view.transaction.details,
                Some(serde_json::json!({
                    "cattleDetails": {"name": "Bessie", "type": "Jersey", "age": 4}
                }))
            );
            assert_eq!(cattle::Entity::find().count(&*db).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn sale_marks_cattle_sold_and_delete_keeps_it() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());

            let bought = ledger.create_transaction(purchase("Bessie")).await.unwrap();
            let before = bought.cattle.unwrap();

            let sale = ledger
                .create_transaction(TransactionRequest {
                    category: "cattle_sales".into(),
                    date: Some("2024-06-01".into()),
                    amount: Some(NumberInput::from(200000)),
                    cattle_id: Some(NumberInput::from(before.id as i64)),
                    ..Default::default()
                })
                .await
                .unwrap();
            let after = sale.cattle.unwrap();
            assert_eq!(after.status, CattleStatus::Sold);
            assert_eq!(after.name, before.name);
            assert_eq!(after.purchase_price, before.purchase_price);
            assert_eq!(after.market_price, before.market_price);

            ledger.delete_transaction(sale.transaction.id).await.unwrap();
            let still = cattle::Entity::find_by_id(before.id)
                .one(&*db)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(still.status, CattleStatus::Sold);
        }

        #[tokio::test]
        async fn failed_create_leaves_nothing_behind() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());

            let mut request = purchase("Ghost");
            request.staff_id = Some(NumberInput::from(42));
            assert_matches!(
                ledger.create_transaction(request).await,
                Err(ServiceError::NotFound(_))
            );

            assert_eq!(cattle::Entity::find().count(&*db).await.unwrap(), 0);
            assert_eq!(transaction::Entity::find().count(&*db).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn list_orders_by_date_then_newest_first() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db);

            let mut ids = Vec::new();
            for date in ["2024-03-01", "2024-03-05", "2024-03-01"] {
                let view = ledger
                    .create_transaction(TransactionRequest {
                        category: "fuel_expense".into(),
                        date: Some(date.into()),
                        amount: Some(NumberInput::from(100)),
                        ..Default::default()
                    })
                    .await
                    .unwrap();
                ids.push(view.transaction.id);
            }

            let listed = ledger
                .list_transactions(&TransactionListQuery::default())
                .await
                .unwrap();
            let order: Vec<_> = listed.iter().map(|v| v.transaction.id).collect();
            assert_eq!(order, [ids[1], ids[2], ids[0]]);

            let early = ledger
                .list_transactions(&TransactionListQuery {
                    to: Some("2024-03-01".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(early.len(), 2);
        }

        #[tokio::test]
        async fn update_replaces_fields_without_side_effects() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());

            let entry = ledger
                .create_transaction(TransactionRequest {
                    category: "other_expense".into(),
                    date: Some("2024-03-01".into()),
                    amount: Some(NumberInput::from(100)),
                    description: Some("misc".into()),
                    ..Default::default()
                })
                .await
                .unwrap();

            let mut edit = purchase("Phantom");
            edit.name = Some("Heifer deposit".into());
            let updated = ledger
                .update_transaction(entry.transaction.id, edit)
                .await
                .unwrap();

            assert_eq!(updated.transaction.name, "Heifer deposit");
            assert_eq!(updated.transaction.category, "cattle_purchase");
            assert_eq!(updated.transaction.amount, 150000);
            assert_eq!(updated.transaction.cattle_id, None);
            assert_eq!(cattle::Entity::find().count(&*db).await.unwrap(), 0);

            assert_matches!(
                ledger.update_transaction(999, purchase("x")).await,
                Err(ServiceError::NotFound(_))
            );
            assert_matches!(
                ledger.delete_transaction(999).await,
                Err(ServiceError::NotFound(_))
            );
        }

        #[tokio::test]
        async fn update_switches_shape_without_selling() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());

            let bought = ledger.create_transaction(purchase("Bessie")).await.unwrap();
            let cow = bought.cattle.unwrap();
            let entry = ledger
                .create_transaction(TransactionRequest {
                    category: "other_expense".into(),
                    date: Some("2024-03-01".into()),
                    amount: Some(NumberInput::from(100)),
                    ..Default::default()
                })
                .await
                .unwrap();
            let id = entry.transaction.id;

            let mut milk = request("milk_sales");
            milk.litres = Some(NumberInput::from(30));
            milk.price_per_litre = Some(NumberInput::from(150));
            milk.amount = Some(NumberInput::from(1));
            let updated = ledger.update_transaction(id, milk).await.unwrap();
            assert_eq!(updated.transaction.amount, 4500);
            assert_eq!(updated.transaction.kind, TransactionKind::Income);
            assert_eq!(
                updated.transaction.details,
                Some(serde_json::json!({"litres": 30, "pricePerLitre": 150}))
            );

            let mut sale = request("cattle_sales");
            sale.amount = Some(NumberInput::from(200000));
            sale.cattle_id = Some(NumberInput::from(cow.id as i64));
            let updated = ledger.update_transaction(id, sale).await.unwrap();
            assert_eq!(updated.transaction.cattle_id, Some(cow.id));
            assert_eq!(updated.cattle.unwrap().status, CattleStatus::Active);

            let mut plain = request("other_expense");
            plain.amount = Some(NumberInput::from(250));
            plain.description = Some("gate latch".into());
            let updated = ledger.update_transaction(id, plain).await.unwrap();
            assert_eq!(updated.transaction.amount, 250);
            assert_eq!(updated.transaction.cattle_id, None);
            assert_eq!(
                updated.transaction.details,
                Some(serde_json::json!({"description": "gate latch"}))
            );

            let still = cattle::Entity::find_by_id(cow.id)
                .one(&*db)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(still.status, CattleStatus::Active);
        }

        #[tokio::test]
        async fn sale_of_deleted_cattle_is_rejected() {
            let db = memory_db().await;
            let ledger = LedgerService::new(db.clone());
            let herd = crate::services::CattleService::new(db.clone());

            let bought = ledger.create_transaction(purchase("Bessie")).await.unwrap();
            let cow = bought.cattle.unwrap();
            let removed = herd.delete_cattle(cow.id).await.unwrap();
            assert!(removed.soft_deleted);

            let mut sale = request("cattle_sales");
            sale.amount = Some(NumberInput::from(200000));
            sale.cattle_id = Some(NumberInput::from(cow.id as i64));
            assert_matches!(
                ledger.create_transaction(sale).await,
                Err(ServiceError::ValidationError(msg)) if msg.contains("deleted")
            );

            let still = cattle::Entity::find_by_id(cow.id)
                .one(&*db)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(still.status, CattleStatus::Deleted);
            assert_eq!(transaction::Entity::find().count(&*db).await.unwrap(), 1);
        }
    }

    #[test]
    fn fractional_milk_amounts_round_half_up() {
        let mut req = request("milk_sales");
        req.litres = Some(NumberInput::from("12.5"));
        req.price_per_litre = Some(NumberInput::from("0.1"));
        assert_eq!(PreparedEntry::from_request(&req).unwrap().amount, 1);

        let mut req = request("milk_sales");
        req.litres = Some(NumberInput::from("2.5"));
        req.price_per_litre = Some(NumberInput::from(1));
        assert_eq!(PreparedEntry::from_request(&req).unwrap().amount, 3);

        let mut req = request("milk_sales");
        req.litres = Some(NumberInput::from("0.49"));
        req.price_per_litre = Some(NumberInput::from(1));
        assert_eq!(PreparedEntry::from_request(&req).unwrap().amount, 0);
    }

    proptest! {
        #[test]
        fn milk_amount_matches_product(litres in 0u32..10_000, price in 0u32..10_000) {
            let mut req = request("milk_sales");
            req.litres = Some(NumberInput::from(litres as i64));
            req.price_per_litre = Some(NumberInput::Text(price.to_string()));
            req.amount = Some(NumberInput::from(7));

            let entry = PreparedEntry::from_request(&req).unwrap();
            prop_assert_eq!(entry.amount, litres as i64 * price as i64);
        }
    }
}
