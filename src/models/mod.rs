pub mod category;
pub mod details;
pub mod input;

pub use category::TransactionCategory;
pub use details::{CattleDetails, CattlePurchaseDetails, MilkSaleDetails, TransactionDetails};
pub use input::NumberInput;
