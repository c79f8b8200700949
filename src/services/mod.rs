// Farm records
pub mod cattle;
pub mod staff;

// Ledger and reporting
pub mod ledger;
pub mod reports;

pub use cattle::CattleService;
pub use ledger::LedgerService;
pub use reports::ReportService;
pub use staff::StaffService;

use std::collections::HashMap;

use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};

use crate::{db::db_failure, entities::transaction, errors::ServiceError};

/// Number of ledger entries referencing each id in `ids` through `column`.
/// Ids without entries are absent from the map.
pub(crate) async fn transaction_counts<C: ConnectionTrait>(
    conn: &C,
    column: transaction::Column,
    ids: Vec<i32>,
) -> Result<HashMap<i32, u64>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, i64)> = transaction::Entity::find()
        .select_only()
        .column(column)
        .column_as(Expr::col(transaction::Column::Id).count(), "count")
        .filter(column.is_in(ids))
        .group_by(column)
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_failure("Failed to count ledger references"))?;

    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use sea_orm::DatabaseConnection;

    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};

    /// Migrated in-memory SQLite. One connection, so every handle sees the same database.
    pub async fn memory_db() -> Arc<DatabaseConnection> {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&config)
            .await
            .expect("in-memory sqlite");
        run_migrations(&db).await.expect("migrations");
        Arc::new(db)
    }
}
