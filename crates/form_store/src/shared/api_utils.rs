//! API utilities for store-backend communication
//!
//! Provides helper functions for constructing resource URLs and reading a
//! record's identity.

use serde_json::Value;

use super::config::ApiConfig;

/// Build the collection URL (`POST` target)
///
/// # Example
/// ```rust
/// use form_store::shared::api_utils::collection_url;
/// use form_store::shared::config::StoreConfig;
///
/// let config = StoreConfig::for_resource("http://127.0.0.1:3000/api/", "activity");
/// assert_eq!(collection_url(&config.api), "http://127.0.0.1:3000/api/activity");
/// ```
pub fn collection_url(api: &ApiConfig) -> String {
    format!(
        "{}/{}",
        api.base_url.trim_end_matches('/'),
        api.resource.trim_matches('/')
    )
}

/// Build the URL of one record (`PUT` target)
pub fn record_url(api: &ApiConfig, id: &Value) -> String {
    let id = match id {
        Value::String(s) => urlencoding::encode(s).into_owned(),
        other => other.to_string(),
    };
    format!("{}/{}", collection_url(api), id)
}

/// Identity of an object-rooted record; `null` and `""` count as absent
pub fn identity<'a>(record: &'a Value, id_key: &str) -> Option<&'a Value> {
    record
        .as_object()
        .and_then(|map| map.get(id_key))
        .filter(|id| !id.is_null() && id.as_str() != Some(""))
}
