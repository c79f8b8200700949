use std::{str::FromStr, sync::Arc, time::Instant};

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, Order, QueryFilter, QueryOrder, Set, TransactionTrait, Value,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::{self, db_failure},
    dto::staff::{
        CreateStaffRequest, StaffDetailView, StaffListQuery, StaffView, UpdateStaffRequest,
    },
    entities::{staff, transaction, StaffStatus},
    errors::ServiceError,
    models::input,
    services::transaction_counts,
};

#[derive(Debug, Clone)]
pub struct StaffService {
    db: Arc<DatabaseConnection>,
}

impl StaffService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_staff(&self, query: &StaffListQuery) -> Result<Vec<StaffView>, ServiceError> {
        let db = &*self.db;
        let mut select = staff::Entity::find();

        if let Some(raw) = input::non_blank(query.status.as_deref()) {
            let status = StaffStatus::from_str(&raw).map_err(|_| {
                ServiceError::ValidationError(format!("unknown staff status '{}'", raw))
            })?;
            select = select.filter(staff::Column::Status.eq(status));
        }

        let members = select
            .order_by(
                Expr::expr(Func::lower(Expr::col((staff::Entity, staff::Column::Name)))),
                Order::Asc,
            )
            .order_by_asc(staff::Column::Id)
            .all(db)
            .await
            .map_err(db_failure("Failed to list staff"))?;

        let ids = members.iter().map(|s| s.id).collect();
        let counts = transaction_counts(db, transaction::Column::StaffId, ids).await?;

        Ok(members
            .into_iter()
            .map(|staff| StaffView {
                transaction_count: counts.get(&staff.id).copied().unwrap_or(0),
                staff,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_staff(&self, id: i32) -> Result<StaffDetailView, ServiceError> {
        let db = &*self.db;
        let staff = find_staff(db, id).await?;
        let transactions = staff
            .find_related(transaction::Entity)
            .order_by_desc(transaction::Column::Date)
            .order_by_desc(transaction::Column::Id)
            .all(db)
            .await
            .map_err(db_failure("Failed to load staff ledger entries"))?;

        Ok(StaffDetailView {
            staff,
            transactions,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<staff::Model, ServiceError> {
        request.validate()?;

        let name = input::non_blank(Some(&request.name))
            .ok_or_else(|| ServiceError::ValidationError("name is required".into()))?;
        let date_of_hiring = input::optional_date("dateOfHiring", request.date_of_hiring.as_deref())?
            .unwrap_or_else(|| Utc::now().date_naive());

        let model = staff::ActiveModel {
            name: Set(name),
            cnic: Set(request.cnic.trim().to_string()),
            phone: Set(request.phone.trim().to_string()),
            salary: Set(input::optional_units("salary", request.salary.as_ref())?.unwrap_or(0)),
            date_of_hiring: Set(date_of_hiring),
            status: Set(request.status.unwrap_or(StaffStatus::Active)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(db_failure("Failed to create staff"))?;

        info!(staff_id = model.id, "Staff member created");
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn update_staff(
        &self,
        id: i32,
        request: UpdateStaffRequest,
    ) -> Result<staff::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let mut active: staff::ActiveModel = find_staff(db, id).await?.into();

        if let Some(name) = input::non_blank(request.name.as_deref()) {
            active.name = Set(name);
        }
        if let Some(cnic) = input::non_blank(request.cnic.as_deref()) {
            active.cnic = Set(cnic);
        }
        if let Some(phone) = input::non_blank(request.phone.as_deref()) {
            active.phone = Set(phone);
        }
        if let Some(salary) = input::optional_units("salary", request.salary.as_ref())? {
            active.salary = Set(salary);
        }
        if let Some(date) = input::optional_date("dateOfHiring", request.date_of_hiring.as_deref())? {
            active.date_of_hiring = Set(date);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        let updated = active
            .update(db)
            .await
            .map_err(db_failure("Failed to update staff"))?;

        info!(staff_id = id, "Staff member updated");
        Ok(updated)
    }

    /// Deletes a staff member; ledger entries that referenced them keep their
    /// amounts and lose the link.
    #[instrument(skip(self))]
    pub async fn delete_staff(&self, id: i32) -> Result<(), ServiceError> {
        let started = Instant::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_failure("Failed to start staff delete"))?;

        match remove_staff(&txn, id).await {
            Ok(unlinked) => {
                db::commit(txn, "staff.delete", started).await?;
                info!(staff_id = id, unlinked, "Staff member deleted");
                Ok(())
            }
            Err(e) => Err(db::rollback(txn, "staff.delete", e).await),
        }
    }
}

async fn find_staff<C: ConnectionTrait>(conn: &C, id: i32) -> Result<staff::Model, ServiceError> {
    staff::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_failure("Failed to fetch staff"))?
        .ok_or_else(|| ServiceError::not_found("Staff", id))
}

/// Returns how many ledger entries were unlinked.
async fn remove_staff<C: ConnectionTrait>(conn: &C, id: i32) -> Result<u64, ServiceError> {
    let member = find_staff(conn, id).await?;

    // SQLite only enforces ON DELETE SET NULL with foreign_keys on; do it explicitly.
    let unlinked = transaction::Entity::update_many()
        .col_expr(transaction::Column::StaffId, Expr::value(Value::Int(None)))
        .filter(transaction::Column::StaffId.eq(id))
        .exec(conn)
        .await
        .map_err(db_failure("Failed to unlink staff ledger entries"))?
        .rows_affected;

    member
        .delete(conn)
        .await
        .map_err(db_failure("Failed to delete staff"))?;
    Ok(unlinked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::transaction::TransactionRequest,
        models::NumberInput,
        services::{test_support::memory_db, LedgerService},
    };
    use assert_matches::assert_matches;

    fn hire(name: &str, status: Option<StaffStatus>) -> CreateStaffRequest {
        CreateStaffRequest {
            name: name.to_string(),
            cnic: "35202-1234567-1".into(),
            phone: "0300-1234567".into(),
            salary: Some(NumberInput::from("45000")),
            date_of_hiring: Some("2023-06-01".into()),
            status,
        }
    }

    #[tokio::test]
    async fn filters_by_status_and_orders_by_name() {
        let db = memory_db().await;
        let service = StaffService::new(db);
        service.create_staff(hire("Usman", None)).await.unwrap();
        service
            .create_staff(hire("Ahmed", Some(StaffStatus::OnLeave)))
            .await
            .unwrap();
        service.create_staff(hire("bilal", None)).await.unwrap();

        let all = service.list_staff(&StaffListQuery::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|v| v.staff.name.as_str()).collect();
        assert_eq!(names, ["Ahmed", "bilal", "Usman"]);

        let on_leave = service
            .list_staff(&StaffListQuery {
                status: Some("on-leave".into()),
            })
            .await
            .unwrap();
        assert_eq!(on_leave.len(), 1);
        assert_eq!(on_leave[0].staff.salary, 45000);
    }

    #[tokio::test]
    async fn delete_keeps_salary_entries_unlinked() {
        let db = memory_db().await;
        let service = StaffService::new(db.clone());
        let ledger = LedgerService::new(db);

        let member = service.create_staff(hire("Kamran", None)).await.unwrap();
        let entry = ledger
            .create_transaction(TransactionRequest {
                category: "staff_salary".into(),
                date: Some("2024-03-31".into()),
                amount: Some(NumberInput::from(45000)),
                staff_id: Some(NumberInput::from(member.id as i64)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entry.staff.as_ref().map(|s| s.id), Some(member.id));

        service.delete_staff(member.id).await.unwrap();
        assert_matches!(
            service.get_staff(member.id).await,
            Err(ServiceError::NotFound(_))
        );

        let after = ledger.get_transaction(entry.transaction.id).await.unwrap();
        assert_eq!(after.transaction.staff_id, None);
        assert_eq!(after.transaction.amount, 45000);
        assert!(after.staff.is_none());
    }

    #[tokio::test]
    async fn update_changes_status() {
        let db = memory_db().await;
        let service = StaffService::new(db);
        let member = service.create_staff(hire("Nadia", None)).await.unwrap();

        let updated = service
            .update_staff(
                member.id,
                UpdateStaffRequest {
                    status: Some(StaffStatus::Relieved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, StaffStatus::Relieved);
        assert_eq!(updated.cnic, member.cnic);

        assert_matches!(
            service.update_staff(404, UpdateStaffRequest::default()).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
