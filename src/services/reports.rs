use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    db::db_failure,
    dto::transaction::SummaryQuery,
    entities::{cattle, staff, transaction, CattleStatus, StaffStatus, TransactionKind},
    errors::ServiceError,
    models::{input, TransactionCategory, TransactionDetails},
};

/// Totals for one ledger category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub total: i64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total_income: i64,
    pub total_expense: i64,
    pub net: i64,
    pub transaction_count: u64,
    pub milk_litres: f64,
    pub milk_revenue: i64,
    pub categories: Vec<CategoryTotal>,
}

impl LedgerSummary {
    /// Folds ledger rows into totals. Categories come back sorted by tag,
    /// income before expense where a tag carries both.
    pub fn from_rows(rows: &[transaction::Model]) -> Self {
        let mut summary = Self::default();
        let mut by_category: BTreeMap<(String, &'static str), CategoryTotal> = BTreeMap::new();

        for row in rows {
            match row.kind {
                TransactionKind::Income => summary.total_income += row.amount,
                TransactionKind::Expense => summary.total_expense += row.amount,
            }
            summary.transaction_count += 1;

            let category = TransactionCategory::from(row.category.as_str());
            if category == TransactionCategory::MilkSales {
                summary.milk_revenue += row.amount;
                summary.milk_litres += TransactionDetails::decode(&category, row.details.as_ref())
                    .and_then(|d| d.litres())
                    .unwrap_or(0.0);
            }

            let kind_key = match row.kind {
                TransactionKind::Income => "income",
                TransactionKind::Expense => "expense",
            };
            let entry = by_category
                .entry((row.category.clone(), kind_key))
                .or_insert_with(|| CategoryTotal {
                    category: row.category.clone(),
                    kind: row.kind,
                    total: 0,
                    count: 0,
                });
            entry.total += row.amount;
            entry.count += 1;
        }

        summary.net = summary.total_income - summary.total_expense;
        summary.categories = by_category.into_values().collect();
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HerdSummary {
    pub total: u64,
    pub active: u64,
    pub sold: u64,
    pub deleted: u64,
    /// Sum of purchase prices of active cattle.
    pub purchase_value: i64,
    /// Sum of market prices of active cattle; animals without one are skipped.
    pub market_value: i64,
}

impl HerdSummary {
    pub fn from_rows(rows: &[cattle::Model]) -> Self {
        rows.iter().fold(Self::default(), |mut herd, animal| {
            herd.total += 1;
            match animal.status {
                CattleStatus::Active => {
                    herd.active += 1;
                    herd.purchase_value += animal.purchase_price;
                    herd.market_value += animal.market_price.unwrap_or(0);
                }
                CattleStatus::Sold => herd.sold += 1,
                CattleStatus::Deleted => herd.deleted += 1,
            }
            herd
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSummary {
    pub total_staff: u64,
    pub active_staff: u64,
    /// Monthly salary total of active staff.
    pub monthly_payroll: i64,
}

impl PayrollSummary {
    pub fn from_rows(rows: &[staff::Model]) -> Self {
        rows.iter().fold(Self::default(), |mut payroll, member| {
            payroll.total_staff += 1;
            if member.status == StaffStatus::Active {
                payroll.active_staff += 1;
                payroll.monthly_payroll += member.salary;
            }
            payroll
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSummary {
    pub ledger: LedgerSummary,
    pub herd: HerdSummary,
    pub payroll: PayrollSummary,
}

/// Read-only aggregation over stored rows.
#[derive(Debug, Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn ledger_summary(&self, query: &SummaryQuery) -> Result<LedgerSummary, ServiceError> {
        let from = input::optional_date("from", query.from.as_deref())?;
        let to = input::optional_date("to", query.to.as_deref())?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "from must not be after to".into(),
                ));
            }
        }

        let mut select = transaction::Entity::find();
        if let Some(from) = from {
            select = select.filter(transaction::Column::Date.gte(from));
        }
        if let Some(to) = to {
            select = select.filter(transaction::Column::Date.lte(to));
        }

        let rows = select
            .order_by_asc(transaction::Column::Date)
            .all(&*self.db)
            .await
            .map_err(db_failure("Failed to load ledger for summary"))?;

        let mut summary = LedgerSummary::from_rows(&rows);
        summary.from = from;
        summary.to = to;
        debug!(rows = rows.len(), net = summary.net, "Ledger summary computed");
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn farm_summary(&self) -> Result<FarmSummary, ServiceError> {
        let db = &*self.db;
        let ledger = self.ledger_summary(&SummaryQuery::default()).await?;

        let herd = cattle::Entity::find()
            .all(db)
            .await
            .map_err(db_failure("Failed to load cattle for summary"))?;
        let team = staff::Entity::find()
            .all(db)
            .await
            .map_err(db_failure("Failed to load staff for summary"))?;

        Ok(FarmSummary {
            ledger,
            herd: HerdSummary::from_rows(&herd),
            payroll: PayrollSummary::from_rows(&team),
        })
    }
}
