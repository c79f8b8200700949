pub mod auth;
pub mod cattle;
pub mod common;
pub mod dashboard;
pub mod staff;
pub mod transactions;

use crate::db::DbPool;
use crate::services::{CattleService, LedgerService, ReportService, StaffService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub ledger: Arc<LedgerService>,
    pub cattle: Arc<CattleService>,
    pub staff: Arc<StaffService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            ledger: Arc::new(LedgerService::new(db_pool.clone())),
            cattle: Arc::new(CattleService::new(db_pool.clone())),
            staff: Arc::new(StaffService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool)),
        }
    }
}
