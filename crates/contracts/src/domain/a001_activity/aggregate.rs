use serde_json::{json, Value};

use crate::shared::choices::{Choice, ChoiceSet};
use crate::shared::field_path::{FieldPath, PathPattern};
use crate::shared::form_settings::{ComparisonExclusion, FormSection, FormSettings};
use crate::shared::metadata::{GroupRule, RuleSet, ValidationRules};

// ============================================================================
// Metadata
// ============================================================================

/// Индекс агрегата в системе
pub const AGGREGATE_INDEX: &str = "a001";

/// Имя коллекции (сегмент URL ресурса)
pub const COLLECTION_NAME: &str = "activity";

/// Ключ идентификатора записи
pub const ID_KEY: &str = "id";

/// Ключ отметки времени, которую проставляет сервер
pub const MODIFIED_KEY: &str = "modified";

/// Вкладки формы редактирования
pub mod sections {
    pub const GENERAL: &str = "general";
    pub const SECTORS: &str = "sectors";
    pub const LOCATIONS: &str = "locations";
    pub const FINANCES: &str = "finances";
}

// ============================================================================
// Form definition
// ============================================================================

/// Разделы формы и пути, которые каждый из них сохраняет
pub fn form_sections() -> Vec<FormSection> {
    vec![
        FormSection::new(
            sections::GENERAL,
            vec![
                FieldPath::key("titles"),
                FieldPath::key("description"),
                FieldPath::key("activity_status"),
                FieldPath::key("start_planned"),
                FieldPath::key("end_planned"),
            ],
        ),
        FormSection::new(sections::SECTORS, vec![FieldPath::key("sectors")]),
        FormSection::new(sections::LOCATIONS, vec![FieldPath::key("locations")]),
        FormSection::new(sections::FINANCES, vec![FieldPath::key("transactions")]),
    ]
}

/// Поля, не влияющие на признак изменения формы
pub fn exclusions() -> Vec<ComparisonExclusion> {
    vec![
        ComparisonExclusion::IgnoreKey(MODIFIED_KEY.into()),
        ComparisonExclusion::IgnoreEmpty("title".into()),
    ]
}

pub fn form_settings() -> FormSettings {
    FormSettings {
        form_key: COLLECTION_NAME.into(),
        sections: form_sections(),
        exclusions: exclusions(),
    }
}

/// Правила валидации (общие для клиента и сервера)
pub fn rule_set() -> RuleSet {
    let sectors = || PathPattern::root().key("sectors").any();
    let locations = || PathPattern::root().key("locations").any();
    let transactions = || PathPattern::root().key("transactions").any();

    RuleSet::new()
        // General
        .with_group(GroupRule::AnyNotEmpty {
            items: FieldPath::key("titles"),
            property: FieldPath::key("title"),
        })
        .with_field(
            PathPattern::root().key("activity_status").key("code"),
            ValidationRules::required(),
        )
        .with_field(
            PathPattern::root().key("start_planned"),
            ValidationRules::none().and_date(),
        )
        .with_field(
            PathPattern::root().key("end_planned"),
            ValidationRules::none().and_date(),
        )
        .with_group(GroupRule::DateOrder {
            start: FieldPath::key("start_planned"),
            end: FieldPath::key("end_planned"),
        })
        // Sectors
        .with_field(sectors().key("code"), ValidationRules::required())
        .with_field(
            sectors().key("percentage"),
            ValidationRules::required()
                .and_positive()
                .and_range(None, Some(100.0)),
        )
        .with_group(GroupRule::Sum {
            items: FieldPath::key("sectors"),
            property: FieldPath::key("percentage"),
            target: 100.0,
        })
        .with_group(GroupRule::UniqueInArray {
            items: FieldPath::key("sectors"),
            property: FieldPath::key("code"),
        })
        // Locations
        .with_field(locations().key("name"), ValidationRules::required())
        .with_field(
            locations().key("latitude"),
            ValidationRules::none().and_range(Some(-90.0), Some(90.0)),
        )
        .with_field(
            locations().key("longitude"),
            ValidationRules::none().and_range(Some(-180.0), Some(180.0)),
        )
        .with_group(GroupRule::AllOrNone {
            items: FieldPath::key("locations"),
            properties: vec![FieldPath::key("latitude"), FieldPath::key("longitude")],
        })
        // Finances
        .with_field(
            transactions().key("transaction_type").key("code"),
            ValidationRules::required(),
        )
        .with_field(
            transactions().key("value"),
            ValidationRules::required().and_positive(),
        )
        .with_field(
            transactions().key("transaction_date"),
            ValidationRules::required().and_date(),
        )
}

/// Справочники кодированных полей
pub fn choices() -> ChoiceSet {
    ChoiceSet::new()
        .with_category(
            "activity_status",
            vec![
                Choice::new("1", "Pipeline/identification"),
                Choice::new("2", "Implementation"),
                Choice::new("3", "Finalisation"),
                Choice::new("4", "Closed"),
            ],
        )
        .with_category(
            "sector",
            vec![
                Choice::new("11110", "Education policy and administrative management"),
                Choice::new("12220", "Basic health care"),
                Choice::new("14030", "Basic drinking water supply and basic sanitation"),
            ],
        )
        .with_category(
            "transaction_type",
            vec![
                Choice::new("2", "Outgoing Commitment"),
                Choice::new("3", "Disbursement"),
                Choice::new("4", "Expenditure"),
            ],
        )
        .with_category(
            "currency",
            vec![Choice::new("USD", "US Dollar"), Choice::new("EUR", "Euro")],
        )
}

/// Пример записи для тестовых данных (без идентификатора)
pub fn sample() -> Value {
    json!({
        "titles": [{"title": "Rural water supply", "language": "en"}],
        "description": "Boreholes and hand pumps for rural communities",
        "activity_status": {"code": "2"},
        "start_planned": "2024-01-15",
        "end_planned": "2026-12-31",
        "sectors": [
            {"code": "14030", "percentage": 70},
            {"code": "12220", "percentage": 30}
        ],
        "locations": [
            {"name": "Baucau", "latitude": -8.47, "longitude": 126.45}
        ],
        "transactions": [
            {
                "transaction_type": {"code": "3"},
                "value": 25000,
                "currency": "USD",
                "transaction_date": "2024-03-01"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::json_tree;

    #[test]
    fn test_sample_is_valid() {
        let errors = rule_set().validate(&sample());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_sections_resolve_in_sample() {
        let record = sample();
        for section in form_sections() {
            for path in &section.paths {
                assert!(
                    json_tree::contains(&record, path),
                    "{} missing from sample",
                    path
                );
            }
        }
    }

    #[test]
    fn test_sector_percentages_must_total_100() {
        let mut record = sample();
        json_tree::assign(
            &mut record,
            &FieldPath::parse("sectors[0].percentage").unwrap(),
            serde_json::json!(60),
        )
        .unwrap();
        let errors = rule_set().validate(&record);
        assert!(errors.contains(&FieldPath::key("sectors")));
    }

    #[test]
    fn test_choice_labels() {
        let choices = choices();
        assert_eq!(choices.label("activity_status", "2"), Some("Implementation"));
        assert_eq!(choices.label("currency", "EUR"), Some("Euro"));
    }
}
