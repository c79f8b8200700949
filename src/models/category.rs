use crate::entities::TransactionKind;
use std::fmt;

/// Ledger category. Categories are free text in storage; the tags the
/// ledger treats specially get their own variant, anything else is kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionCategory {
    MilkSales,
    CattleSales,
    CattlePurchase,
    CattleFood,
    StaffSalary,
    FuelExpense,
    OtherIncome,
    OtherExpense,
    Other(String),
}

impl TransactionCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MilkSales => "milk_sales",
            Self::CattleSales => "cattle_sales",
            Self::CattlePurchase => "cattle_purchase",
            Self::CattleFood => "cattle_food",
            Self::StaffSalary => "staff_salary",
            Self::FuelExpense => "fuel_expense",
            Self::OtherIncome => "other_income",
            Self::OtherExpense => "other_expense",
            Self::Other(tag) => tag,
        }
    }

    /// Human label, used as the entry name when the client sends none.
    pub fn label(&self) -> String {
        match self {
            Self::MilkSales => "Milk Sales".to_string(),
            Self::CattleSales => "Cattle Sales".to_string(),
            Self::CattlePurchase => "Cattle Purchase".to_string(),
            Self::CattleFood => "Cattle Food".to_string(),
            Self::StaffSalary => "Staff Salary".to_string(),
            Self::FuelExpense => "Fuel Expense".to_string(),
            Self::OtherIncome => "Other Income".to_string(),
            Self::OtherExpense => "Other Expense".to_string(),
            Self::Other(tag) => tag
                .split(['_', '-', ' '])
                .filter(|w| !w.is_empty())
                .map(|w| {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Direction money usually flows for this category; `None` for unknown tags.
    pub fn default_kind(&self) -> Option<TransactionKind> {
        match self {
            Self::MilkSales | Self::CattleSales | Self::OtherIncome => Some(TransactionKind::Income),
            Self::CattlePurchase
            | Self::CattleFood
            | Self::StaffSalary
            | Self::FuelExpense
            | Self::OtherExpense => Some(TransactionKind::Expense),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for TransactionCategory {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "milk_sales" => Self::MilkSales,
            "cattle_sales" => Self::CattleSales,
            "cattle_purchase" => Self::CattlePurchase,
            "cattle_food" => Self::CattleFood,
            "staff_salary" => Self::StaffSalary,
            "fuel_expense" => Self::FuelExpense,
            "other_income" => Self::OtherIncome,
            "other_expense" => Self::OtherExpense,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
