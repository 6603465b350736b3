//! Validation rules for a single field

use chrono::NaiveDate;
use serde_json::Value;

pub const REQUIRED: &str = "Required";
pub const NOT_A_NUMBER: &str = "Must be a number";
pub const NOT_POSITIVE: &str = "Must be a number greater than zero";
pub const INVALID_DATE: &str = "This date is not valid";

/// Validation rules for a field
/// Copy trait for efficient passing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValidationRules {
    pub required: bool,
    pub numeric: bool,
    pub positive: bool,
    pub date: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl ValidationRules {
    /// Create empty validation rules (all optional, no constraints)
    pub const fn none() -> Self {
        Self {
            required: false,
            numeric: false,
            positive: false,
            date: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
        }
    }

    /// Create validation rules for required field
    pub const fn required() -> Self {
        Self {
            required: true,
            numeric: false,
            positive: false,
            date: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn and_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn and_numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    pub fn and_positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn and_date(mut self) -> Self {
        self.date = true;
        self
    }

    pub fn and_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn and_length(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Check if field is required
    pub const fn is_required(&self) -> bool {
        self.required
    }

    fn checks_number(&self) -> bool {
        self.numeric || self.positive || self.min.is_some() || self.max.is_some()
    }

    /// Validate the value found at a field path (`None` when the path is absent)
    pub fn validate(&self, value: Option<&Value>) -> Result<(), String> {
        let Some(value) = value.filter(|v| !is_blank(v)) else {
            return if self.required {
                Err(REQUIRED.to_string())
            } else {
                Ok(())
            };
        };

        if let Value::String(s) = value {
            self.validate_string(s)?;
        }

        if self.checks_number() {
            let number = as_number(value).ok_or_else(|| NOT_A_NUMBER.to_string())?;
            if self.positive && number <= 0.0 {
                return Err(NOT_POSITIVE.to_string());
            }
            self.validate_number(number)?;
        }

        if self.date && value.as_str().and_then(parse_date).is_none() {
            return Err(INVALID_DATE.to_string());
        }

        Ok(())
    }

    /// Validate a string value against the length rules
    pub fn validate_string(&self, value: &str) -> Result<(), String> {
        let length = value.chars().count();

        if let Some(min) = self.min_length {
            if length < min {
                return Err(format!("Must be at least {} characters", min));
            }
        }

        if let Some(max) = self.max_length {
            if length > max {
                return Err(format!("Must be at most {} characters", max));
            }
        }

        Ok(())
    }

    /// Validate a numeric value against min/max rules
    pub fn validate_number(&self, value: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if value < min {
                return Err(format!("Must be at least {}", min));
            }
        }

        if let Some(max) = self.max {
            if value > max {
                return Err(format!("Must be at most {}", max));
            }
        }

        Ok(())
    }
}

/// `null` or a whitespace-only string
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numbers and numeric strings (form inputs deliver both)
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// `YYYY-MM-DD` or `YYYYMMDD`; impossible dates (February 30) are rejected
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        let rules = ValidationRules::required();
        assert_eq!(rules.validate(None), Err(REQUIRED.to_string()));
        assert_eq!(rules.validate(Some(&json!("  "))), Err(REQUIRED.to_string()));
        assert_eq!(rules.validate(Some(&json!(null))), Err(REQUIRED.to_string()));
        assert_eq!(rules.validate(Some(&json!("x"))), Ok(()));
        assert_eq!(ValidationRules::none().validate(None), Ok(()));
    }

    #[test]
    fn test_numeric_and_positive() {
        let rules = ValidationRules::none().and_positive();
        assert_eq!(rules.validate(Some(&json!("abc"))), Err(NOT_A_NUMBER.to_string()));
        assert_eq!(rules.validate(Some(&json!(0))), Err(NOT_POSITIVE.to_string()));
        assert_eq!(rules.validate(Some(&json!("12.5"))), Ok(()));

        let ranged = ValidationRules::none().and_range(Some(-90.0), Some(90.0));
        assert_eq!(ranged.validate(Some(&json!(45))), Ok(()));
        assert_eq!(
            ranged.validate(Some(&json!(91))),
            Err("Must be at most 90".to_string())
        );
        assert_eq!(
            ranged.validate(Some(&json!(-91))),
            Err("Must be at least -90".to_string())
        );
    }

    #[test]
    fn test_length() {
        let rules = ValidationRules::none().and_length(Some(2), Some(4));
        assert!(rules.validate(Some(&json!("a"))).is_err());
        assert!(rules.validate(Some(&json!("abcd"))).is_ok());
        assert!(rules.validate(Some(&json!("abcde"))).is_err());
    }

    #[test]
    fn test_dates() {
        let rules = ValidationRules::none().and_date();
        assert_eq!(rules.validate(Some(&json!("2024-02-29"))), Ok(()));
        assert_eq!(rules.validate(Some(&json!("20240301"))), Ok(()));
        assert_eq!(
            rules.validate(Some(&json!("2023-02-30"))),
            Err(INVALID_DATE.to_string())
        );
        assert_eq!(rules.validate(Some(&json!(20240101))), Err(INVALID_DATE.to_string()));
    }
}
