pub mod cattle;
pub mod staff;
pub mod transaction;
