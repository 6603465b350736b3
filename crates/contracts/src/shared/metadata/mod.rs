//! Locally-known constraints on records
//!
//! A [`RuleSet`] attaches [`ValidationRules`] to field patterns and adds
//! [`GroupRule`]s that span several fields. The same rule set runs in the
//! client store (to flag fields as they are edited) and in the persistence
//! endpoint (to reject bad writes).
//!
//! ## Usage
//!
//! ```rust
//! use contracts::shared::field_path::PathPattern;
//! use contracts::shared::metadata::{RuleSet, ValidationRules};
//! use serde_json::json;
//!
//! let rules = RuleSet::new().with_field(
//!     PathPattern::root().key("sectors").any().key("percentage"),
//!     ValidationRules::required().and_positive(),
//! );
//! let errors = rules.validate(&json!({"sectors": [{"percentage": 0}]}));
//! assert_eq!(errors.len(), 1);
//! ```

mod errors;
mod group_rules;
mod validation;

use serde_json::Value;

use crate::shared::field_path::PathPattern;
use crate::shared::json_tree;

pub use errors::ValidationErrors;
pub use group_rules::GroupRule;
pub use validation::{as_number, is_blank, parse_date, ValidationRules};

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: Vec<(PathPattern, ValidationRules)>,
    groups: Vec<GroupRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, pattern: PathPattern, rules: ValidationRules) -> Self {
        self.fields.push((pattern, rules));
        self
    }

    pub fn with_group(mut self, rule: GroupRule) -> Self {
        self.groups.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    /// Run every rule against `record`
    pub fn validate(&self, record: &Value) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for (pattern, rules) in &self.fields {
            // a plain path is checked even when absent so `required` can fire
            let paths = match pattern.to_field_path() {
                Some(path) => vec![path],
                None => json_tree::expand_pattern(record, pattern),
            };
            for path in paths {
                if let Err(message) = rules.validate(json_tree::get(record, &path)) {
                    errors.add(path, message);
                }
            }
        }

        for rule in &self.groups {
            if let Err(message) = rule.check(record) {
                errors.add(rule.target().clone(), message);
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::field_path::FieldPath;
    use serde_json::json;

    #[test]
    fn test_rule_set_collects_field_and_group_failures() {
        let rules = RuleSet::new()
            .with_field(PathPattern::root().key("title"), ValidationRules::required())
            .with_field(
                PathPattern::root().key("sectors").any().key("percentage"),
                ValidationRules::none().and_positive(),
            )
            .with_group(GroupRule::Sum {
                items: FieldPath::key("sectors"),
                property: FieldPath::key("percentage"),
                target: 100.0,
            });

        let errors = rules.validate(&json!({
            "sectors": [{"percentage": 50}, {"percentage": -1}]
        }));

        assert!(errors.contains(&FieldPath::key("title")));
        assert!(errors.contains(&FieldPath::parse("sectors[1].percentage").unwrap()));
        assert!(errors.contains(&FieldPath::key("sectors")));
        assert_eq!(errors.len(), 3);

        let clean = rules.validate(&json!({
            "title": "Water",
            "sectors": [{"percentage": 60}, {"percentage": 40}]
        }));
        assert!(clean.is_empty());
    }
}
