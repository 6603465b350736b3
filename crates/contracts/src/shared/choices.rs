//! Reference data for coded fields (statuses, sector codes, currencies ...)
//!
//! Choices arrive once, server-rendered, either as `[code, label]` pairs or as
//! `{"code": .., "name": ..}` objects. Codes are normalised to strings so a
//! numeric sector code and its string form resolve to the same entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub code: String,
    pub label: String,
}

impl Choice {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoice {
    Pair(Value, Option<String>),
    Named {
        code: Value,
        #[serde(alias = "label")]
        name: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Choice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (code, label) = match RawChoice::deserialize(deserializer)? {
            RawChoice::Pair(code, label) => (code, label),
            RawChoice::Named { code, name } => (code, name),
        };
        Ok(Choice {
            code: code_to_string(&code),
            label: label.unwrap_or_default(),
        })
    }
}

/// Canonical string form of a code value
pub fn code_to_string(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Field name -> ordered allowed values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceSet {
    categories: BTreeMap<String, Vec<Choice>>,
}

impl ChoiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn with_category(mut self, category: impl Into<String>, choices: Vec<Choice>) -> Self {
        self.categories.insert(category.into(), choices);
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn choices(&self, category: &str) -> &[Choice] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn find(&self, category: &str, code: &str) -> Option<&Choice> {
        self.choices(category).iter().find(|c| c.code == code)
    }

    pub fn contains(&self, category: &str, code: &str) -> bool {
        self.find(category, code).is_some()
    }

    /// Label for `code`; the code itself when the label is blank
    pub fn label<'a>(&'a self, category: &str, code: &'a str) -> Option<&'a str> {
        self.find(category, code).map(|choice| {
            if choice.label.is_empty() {
                code
            } else {
                choice.label.as_str()
            }
        })
    }

    pub fn label_for_value(&self, category: &str, code: &Value) -> Option<String> {
        let code = code_to_string(code);
        self.label(category, &code).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_pairs_and_objects() {
        let set = ChoiceSet::from_json(&json!({
            "activity_status": [["1", "Pipeline"], ["2", "Implementation"]],
            "sector": [{"code": 11110, "name": "Education policy"}, {"code": "12220", "label": ""}]
        }))
        .unwrap();

        assert_eq!(set.choices("activity_status").len(), 2);
        assert_eq!(set.label("activity_status", "2"), Some("Implementation"));
        assert_eq!(set.label("sector", "11110"), Some("Education policy"));
        // blank label falls back to the code
        assert_eq!(set.label("sector", "12220"), Some("12220"));
        assert_eq!(set.label("sector", "99999"), None);
        assert_eq!(set.label("unknown", "1"), None);
        assert!(set.choices("unknown").is_empty());
    }

    #[test]
    fn test_label_for_numeric_code() {
        let set = ChoiceSet::new().with_category("sector", vec![Choice::new("11110", "Education")]);
        assert_eq!(
            set.label_for_value("sector", &json!(11110)),
            Some("Education".to_string())
        );
        assert!(set.contains("sector", "11110"));
    }

    #[test]
    fn test_serialize_round_shape() {
        let set = ChoiceSet::new().with_category("currency", vec![Choice::new("USD", "US Dollar")]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, json!({"currency": [{"code": "USD", "label": "US Dollar"}]}));
        assert_eq!(ChoiceSet::from_json(&json).unwrap(), set);
    }
}
