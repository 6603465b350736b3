use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub record: RecordConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the persistence endpoint, e.g. `http://127.0.0.1:3000/api`
    pub base_url: String,
    /// Resource segment, e.g. `activity`
    pub resource: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent as `X-CSRFToken` when present
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    #[default]
    Object,
    Array,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RecordConfig {
    #[serde(default = "default_id_key")]
    pub id_key: String,
    #[serde(default)]
    pub root: RootKind,
    /// Array roots are sorted by this key on load
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            id_key: default_id_key(),
            root: RootKind::default(),
            sort_by: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_id_key() -> String {
    "id".to_string()
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[api]
base_url = "http://127.0.0.1:3000/api"
resource = "activity"
timeout_secs = 30

[record]
id_key = "id"
root = "object"
"#;

impl StoreConfig {
    /// Config for `resource` at `base_url`, everything else default
    pub fn for_resource(base_url: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                resource: resource.into(),
                timeout_secs: default_timeout_secs(),
                csrf_token: None,
            },
            record: RecordConfig::default(),
        }
    }
}

pub fn from_toml_str(contents: &str) -> anyhow::Result<StoreConfig> {
    Ok(toml::from_str(contents)?)
}

/// Load store configuration
///
/// Reads `path` when given and present, otherwise falls back to the embedded
/// default config.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StoreConfig> {
    if let Some(config_path) = path {
        if config_path.exists() {
            tracing::info!("Loading store config from: {}", config_path.display());
            let contents = std::fs::read_to_string(config_path)?;
            return from_toml_str(&contents);
        }
        tracing::warn!("store config not found at: {}", config_path.display());
    }

    tracing::info!("Using default embedded store configuration");
    from_toml_str(DEFAULT_CONFIG)
}
