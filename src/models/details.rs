use super::category::TransactionCategory;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value as Json};

/// Category-shaped payload stored in `transactions.details`. The shape is
/// keyed by the row's category, not by a tag inside the JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionDetails {
    MilkSale(MilkSaleDetails),
    CattlePurchase(CattlePurchaseDetails),
    Note { description: String },
    /// Stored JSON that does not match the shape its category expects.
    Unknown(Json),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkSaleDetails {
    pub litres: f64,
    pub price_per_litre: f64,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattlePurchaseDetails {
    #[serde(default)]
    pub description: Option<String>,
    pub cattle_details: CattleDetails,
}

/// Snapshot of the animal created by a purchase entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleDetails {
    pub name: String,
    #[serde(rename = "type")]
    pub cattle_type: String,
    pub age: i32,
    #[serde(default)]
    pub market_price: Option<i64>,
}

/// Emits whole floats as JSON integers so `30 * 150` reads back as `30`, not `30.0`.
fn number(value: f64) -> Json {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

impl TransactionDetails {
    pub fn description(text: Option<String>) -> Option<Self> {
        text.map(|description| Self::Note { description })
    }

    /// Reads stored JSON back into the shape `category` implies.
    pub fn decode(category: &TransactionCategory, raw: Option<&Json>) -> Option<Self> {
        let raw = match raw {
            None | Some(Json::Null) => return None,
            Some(value) => value,
        };

        let decoded = match category {
            TransactionCategory::MilkSales => serde_json::from_value::<MilkSaleDetails>(raw.clone())
                .ok()
                .map(Self::MilkSale),
            TransactionCategory::CattlePurchase if raw.get("cattleDetails").is_some() => {
                serde_json::from_value::<CattlePurchaseDetails>(raw.clone())
                    .ok()
                    .map(Self::CattlePurchase)
            }
            _ => None,
        };

        decoded
            .or_else(|| {
                let object = raw.as_object()?;
                match (object.len(), object.get("description")) {
                    (1, Some(Json::String(description))) => Some(Self::Note {
                        description: description.clone(),
                    }),
                    _ => None,
                }
            })
            .or_else(|| Some(Self::Unknown(raw.clone())))
    }

    pub fn encode(&self) -> Json {
        match self {
            Self::MilkSale(milk) => {
                let mut object = Map::new();
                object.insert("litres".into(), number(milk.litres));
                object.insert("pricePerLitre".into(), number(milk.price_per_litre));
                if let Some(session) = &milk.session {
                    object.insert("session".into(), json!(session));
                }
                Json::Object(object)
            }
            Self::CattlePurchase(purchase) => {
                let cattle = &purchase.cattle_details;
                let mut details = Map::new();
                details.insert("name".into(), json!(cattle.name));
                details.insert("type".into(), json!(cattle.cattle_type));
                details.insert("age".into(), json!(cattle.age));
                if let Some(price) = cattle.market_price {
                    details.insert("marketPrice".into(), json!(price));
                }

                let mut object = Map::new();
                if let Some(description) = &purchase.description {
                    object.insert("description".into(), json!(description));
                }
                object.insert("cattleDetails".into(), Json::Object(details));
                Json::Object(object)
            }
            Self::Note { description } => json!({ "description": description }),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Litres sold, when this is a milk sale.
    pub fn litres(&self) -> Option<f64> {
        match self {
            Self::MilkSale(milk) => Some(milk.litres),
            _ => None,
        }
    }
}

impl Serialize for TransactionDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode().serialize(serializer)
    }
}
