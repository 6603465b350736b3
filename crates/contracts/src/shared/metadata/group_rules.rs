//! Rules spanning several fields (rows of a table, a pair of dates)

use serde_json::Value;

use super::validation::{as_number, is_blank, parse_date, REQUIRED};
use crate::shared::field_path::FieldPath;
use crate::shared::json_tree;

/// Sums are compared after rounding to this many decimals
const SUM_PRECISION: i32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum GroupRule {
    /// `property` over all rows of `items` must add up to `target`
    Sum {
        items: FieldPath,
        property: FieldPath,
        target: f64,
    },
    /// `property` must differ between rows of `items`
    UniqueInArray { items: FieldPath, property: FieldPath },
    /// `end` must not precede `start`
    DateOrder { start: FieldPath, end: FieldPath },
    /// No row of `items` may carry `excluded` in `property`
    NumberNotIn {
        items: FieldPath,
        property: FieldPath,
        excluded: f64,
    },
    /// Per row, the listed fields are either all null or all set
    AllOrNone {
        items: FieldPath,
        properties: Vec<FieldPath>,
    },
    /// At least one row has a non-empty `property`
    AnyNotEmpty { items: FieldPath, property: FieldPath },
}

impl GroupRule {
    /// Path the failure is reported against
    pub fn target(&self) -> &FieldPath {
        match self {
            Self::Sum { items, .. }
            | Self::UniqueInArray { items, .. }
            | Self::NumberNotIn { items, .. }
            | Self::AllOrNone { items, .. }
            | Self::AnyNotEmpty { items, .. } => items,
            Self::DateOrder { end, .. } => end,
        }
    }

    pub fn check(&self, record: &Value) -> Result<(), String> {
        match self {
            Self::Sum {
                items,
                property,
                target,
            } => {
                let rows = rows(record, items);
                if rows.is_empty() {
                    return Ok(());
                }
                let total: f64 = rows
                    .iter()
                    .map(|row| {
                        json_tree::get(row, property)
                            .and_then(as_number)
                            .unwrap_or(f64::NAN)
                    })
                    .sum();
                let factor = 10f64.powi(SUM_PRECISION);
                let rounded = (total * factor).round() / factor;
                if rounded.is_nan() || (rounded - target).abs() > f64::EPSILON {
                    return Err(format!("Values should add up to {}.", target));
                }
                Ok(())
            }
            Self::UniqueInArray { items, property } => {
                let values: Vec<&Value> = rows(record, items)
                    .into_iter()
                    .map(|row| json_tree::get(row, property).unwrap_or(&Value::Null))
                    .collect();
                let duplicated = values
                    .iter()
                    .enumerate()
                    .any(|(i, value)| values[..i].contains(value));
                if duplicated {
                    return Err("These must be unique values".to_string());
                }
                Ok(())
            }
            Self::DateOrder { start, end } => {
                let date_at = |path: &FieldPath| {
                    json_tree::get(record, path)
                        .and_then(Value::as_str)
                        .and_then(parse_date)
                };
                match (date_at(start), date_at(end)) {
                    (Some(start), Some(end)) if end < start => {
                        Err("The start date must occur before the end date".to_string())
                    }
                    (None, Some(_)) => Err("An end date must have a valid start date".to_string()),
                    _ => Ok(()),
                }
            }
            Self::NumberNotIn {
                items,
                property,
                excluded,
            } => {
                let hit = rows(record, items).iter().any(|row| {
                    json_tree::get(row, property)
                        .and_then(as_number)
                        .is_some_and(|n| (n - excluded).abs() < f64::EPSILON)
                });
                if hit {
                    return Err(format!("A {} cannot be {}", property, excluded));
                }
                Ok(())
            }
            Self::AllOrNone { items, properties } => {
                let mixed = rows(record, items).iter().any(|row| {
                    let nulls: Vec<bool> = properties
                        .iter()
                        .map(|p| json_tree::get(row, p).map_or(true, Value::is_null))
                        .collect();
                    nulls.iter().any(|n| *n) && nulls.iter().any(|n| !*n)
                });
                if mixed {
                    return Err("There is a missing value".to_string());
                }
                Ok(())
            }
            Self::AnyNotEmpty { items, property } => {
                let found = rows(record, items).iter().any(|row| {
                    json_tree::get(row, property)
                        .is_some_and(|v| v.is_string() && !is_blank(v))
                });
                if found {
                    Ok(())
                } else {
                    Err(REQUIRED.to_string())
                }
            }
        }
    }
}

fn rows<'a>(record: &'a Value, items: &FieldPath) -> Vec<&'a Value> {
    match json_tree::get(record, items) {
        Some(Value::Array(rows)) => rows.iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn sum_rule() -> GroupRule {
        GroupRule::Sum {
            items: path("sectors"),
            property: path("percentage"),
            target: 100.0,
        }
    }

    #[test]
    fn test_sum_rounds_floating_point() {
        let record = json!({"sectors": [
            {"percentage": 33.333},
            {"percentage": 33.333},
            {"percentage": "33.334"}
        ]});
        assert_eq!(sum_rule().check(&record), Ok(()));

        let record = json!({"sectors": [{"percentage": 60}, {"percentage": 30}]});
        assert_eq!(
            sum_rule().check(&record),
            Err("Values should add up to 100.".to_string())
        );

        // empty tables are not checked
        assert_eq!(sum_rule().check(&json!({"sectors": []})), Ok(()));
        assert_eq!(sum_rule().target(), &path("sectors"));
    }

    #[test]
    fn test_sum_with_missing_value_fails() {
        let record = json!({"sectors": [{"percentage": 100}, {"code": 1}]});
        assert!(sum_rule().check(&record).is_err());
    }

    #[test]
    fn test_unique_in_array() {
        let rule = GroupRule::UniqueInArray {
            items: path("sectors"),
            property: path("code"),
        };
        assert!(rule.check(&json!({"sectors": [{"code": 1}, {"code": 2}]})).is_ok());
        assert!(rule.check(&json!({"sectors": [{"code": 1}, {"code": 1}]})).is_err());
    }

    #[test]
    fn test_date_order() {
        let rule = GroupRule::DateOrder {
            start: path("start"),
            end: path("end"),
        };
        assert!(rule
            .check(&json!({"start": "2024-01-01", "end": "2024-06-01"}))
            .is_ok());
        assert_eq!(
            rule.check(&json!({"start": "2024-06-01", "end": "2024-01-01"})),
            Err("The start date must occur before the end date".to_string())
        );
        assert_eq!(
            rule.check(&json!({"start": "", "end": "2024-01-01"})),
            Err("An end date must have a valid start date".to_string())
        );
        assert!(rule.check(&json!({"start": "2024-01-01"})).is_ok());
        assert_eq!(rule.target(), &path("end"));
    }

    #[test]
    fn test_number_not_in() {
        let rule = GroupRule::NumberNotIn {
            items: path("transactions"),
            property: path("value"),
            excluded: 0.0,
        };
        assert!(rule.check(&json!({"transactions": [{"value": 5}]})).is_ok());
        assert_eq!(
            rule.check(&json!({"transactions": [{"value": "0"}]})),
            Err("A value cannot be 0".to_string())
        );
    }

    #[test]
    fn test_all_or_none() {
        let rule = GroupRule::AllOrNone {
            items: path("locations"),
            properties: vec![path("latitude"), path("longitude")],
        };
        assert!(rule
            .check(&json!({"locations": [{"latitude": null, "longitude": null}]}))
            .is_ok());
        assert!(rule
            .check(&json!({"locations": [{"latitude": 1, "longitude": 2}]}))
            .is_ok());
        assert!(rule
            .check(&json!({"locations": [{"latitude": 1, "longitude": null}]}))
            .is_err());
    }

    #[test]
    fn test_any_not_empty() {
        let rule = GroupRule::AnyNotEmpty {
            items: path("titles"),
            property: path("title"),
        };
        assert!(rule
            .check(&json!({"titles": [{"title": ""}, {"title": "Water"}]}))
            .is_ok());
        assert_eq!(
            rule.check(&json!({"titles": [{"title": ""}]})),
            Err(REQUIRED.to_string())
        );
    }
}
