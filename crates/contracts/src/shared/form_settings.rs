use serde::{Deserialize, Serialize};

use super::field_path::FieldPath;

/// A form tab: the set of paths saved and discarded together
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormSection {
    pub key: String,
    pub paths: Vec<FieldPath>,
}

impl FormSection {
    pub fn new(key: impl Into<String>, paths: Vec<FieldPath>) -> Self {
        Self {
            key: key.into(),
            paths,
        }
    }
}

/// Keys hidden from dirty comparison
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ComparisonExclusion {
    /// Ignore the key wherever it appears (server timestamps and the like)
    IgnoreKey(String),
    /// Treat the key as absent while it is `""` or `null`
    IgnoreEmpty(String),
}

impl ComparisonExclusion {
    pub fn key(&self) -> &str {
        match self {
            Self::IgnoreKey(key) | Self::IgnoreEmpty(key) => key,
        }
    }
}

/// Everything a form needs besides the record itself
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FormSettings {
    pub form_key: String,
    #[serde(default)]
    pub sections: Vec<FormSection>,
    #[serde(default)]
    pub exclusions: Vec<ComparisonExclusion>,
}
