//! Lenient scalar inputs. Form posts deliver numbers as strings, so request
//! bodies accept either representation and normalise here.

use crate::errors::ServiceError;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Upper bound for any monetary or quantity input, keeps `i64` conversion exact.
const MAX_INPUT: f64 = 1e13;

/// A numeric field that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumberInput {
    /// Parses to a finite, non-negative value. Blank strings count as absent.
    pub fn parse(&self, field: &str) -> Result<Option<f64>, ServiceError> {
        let value = match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed.parse::<f64>().ok()
            }
        };

        match value {
            Some(v) if v.is_finite() && (0.0..=MAX_INPUT).contains(&v) => Ok(Some(v)),
            Some(v) if v.is_finite() && v < 0.0 => Err(ServiceError::ValidationError(format!(
                "{} must not be negative",
                field
            ))),
            Some(v) if v.is_finite() => Err(ServiceError::ValidationError(format!(
                "{} is too large",
                field
            ))),
            _ => Err(ServiceError::ValidationError(format!(
                "{} must be a number",
                field
            ))),
        }
    }
}

impl From<i64> for NumberInput {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for NumberInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Parses an optional numeric field.
pub fn optional_number(field: &str, input: Option<&NumberInput>) -> Result<Option<f64>, ServiceError> {
    match input {
        Some(raw) => raw.parse(field),
        None => Ok(None),
    }
}

/// Parses a numeric field that must be present.
pub fn required_number(field: &str, input: Option<&NumberInput>) -> Result<f64, ServiceError> {
    optional_number(field, input)?
        .ok_or_else(|| ServiceError::ValidationError(format!("{} is required", field)))
}

/// Rounds to whole currency units.
pub fn to_units(value: f64) -> i64 {
    value.round() as i64
}

/// Parses an optional monetary field into whole currency units.
pub fn optional_units(field: &str, input: Option<&NumberInput>) -> Result<Option<i64>, ServiceError> {
    Ok(optional_number(field, input)?.map(to_units))
}

/// Parses a field that must be a whole number (ages).
pub fn whole_number(field: &str, input: Option<&NumberInput>) -> Result<Option<i32>, ServiceError> {
    match optional_number(field, input)? {
        Some(v) if v.fract() != 0.0 => Err(ServiceError::ValidationError(format!(
            "{} must be a whole number",
            field
        ))),
        Some(v) if v > i32::MAX as f64 => Err(ServiceError::ValidationError(format!(
            "{} is too large",
            field
        ))),
        Some(v) => Ok(Some(v as i32)),
        None => Ok(None),
    }
}

/// Parses a reference to another row; form posts send ids as strings.
pub fn optional_id(field: &str, input: Option<&NumberInput>) -> Result<Option<i32>, ServiceError> {
    match whole_number(field, input)? {
        Some(0) => Err(ServiceError::ValidationError(format!(
            "{} must be a positive id",
            field
        ))),
        other => Ok(other),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept).
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ServiceError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| {
            ServiceError::ValidationError(format!(
                "{} must be a date in YYYY-MM-DD format",
                field
            ))
        })
}

/// Parses a date field that must be present and non-blank.
pub fn required_date(field: &str, raw: Option<&str>) -> Result<NaiveDate, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date(field, value),
        None => Err(ServiceError::ValidationError(format!(
            "{} is required",
            field
        ))),
    }
}

/// Parses an optional date field; blank strings count as absent.
pub fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date(field, value).map(Some),
        None => Ok(None),
    }
}

/// Trims an optional text field; blank strings count as absent.
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(serde_json::json!(30), Some(30.0))]
    #[case(serde_json::json!(12.5), Some(12.5))]
    #[case(serde_json::json!("150"), Some(150.0))]
    #[case(serde_json::json!(" 2.25 "), Some(2.25))]
    #[case(serde_json::json!(""), None)]
    fn accepts_numbers_and_numeric_strings(
        #[case] raw: serde_json::Value,
        #[case] expected: Option<f64>,
    ) {
        let input: NumberInput = serde_json::from_value(raw).unwrap();
        assert_eq!(input.parse("amount").unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("-5")]
    #[case("NaN")]
    #[case("inf")]
    #[case("1e300")]
    fn rejects_invalid_numbers(#[case] raw: &str) {
        let input = NumberInput::from(raw);
        assert_matches!(input.parse("litres"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn required_number_reports_missing_field() {
        let err = required_number("pricePerLitre", None).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("pricePerLitre"));
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(to_units(4499.5), 4500);
        assert_eq!(to_units(0.4), 0);
    }

    #[test]
    fn whole_number_rejects_fractions() {
        assert_eq!(whole_number("age", Some(&NumberInput::from(4))).unwrap(), Some(4));
        assert_matches!(
            whole_number("age", Some(&NumberInput::from("4.5"))),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn parses_plain_and_rfc3339_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("date", "2024-03-01").unwrap(), expected);
        assert_eq!(
            parse_date("date", "2024-03-01T08:30:00Z").unwrap(),
            expected
        );
        assert!(parse_date("date", "01/03/2024").is_err());
        assert!(required_date("date", Some("  ")).is_err());
        assert_eq!(optional_date("date", Some("")).unwrap(), None);
    }
}
