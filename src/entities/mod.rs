pub mod cattle;
pub mod staff;
pub mod transaction;

pub use cattle::CattleStatus;
pub use staff::StaffStatus;
pub use transaction::TransactionKind;
