use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

use super::{PersistRequest, PersistResponse, PersistenceTransport, RequestMethod, TransportError};
use crate::shared::config::ApiConfig;

/// Header Django expects the CSRF token in
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP транспорт на базе reqwest
pub struct ReqwestTransport {
    client: reqwest::Client,
    csrf_token: Option<String>,
}

impl ReqwestTransport {
    /// Создать транспорт по настройкам API
    pub fn new(api: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            csrf_token: api.csrf_token.clone(),
        })
    }

    /// Использовать готовый клиент
    pub fn with_client(client: reqwest::Client, csrf_token: Option<String>) -> Self {
        Self { client, csrf_token }
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl PersistenceTransport for ReqwestTransport {
    async fn send(&self, request: PersistRequest) -> Result<PersistResponse, TransportError> {
        let builder = match request.method {
            RequestMethod::Get => self.client.get(&request.url),
            RequestMethod::Post => self.client.post(&request.url),
            RequestMethod::Put => self.client.put(&request.url),
            RequestMethod::Delete => self.client.delete(&request.url),
        };
        let mut builder = builder.header(ACCEPT, "application/json");
        if request.method.has_body() {
            builder = builder.json(&request.body);
        }
        if let Some(token) = &self.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }

        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify)?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(body) => body,
                // error pages are often HTML; keep the text for the failure report
                Err(_) if !status.is_success() => {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                Err(e) => {
                    return Err(TransportError::Decode(format!(
                        "status {}: {}",
                        status.as_u16(),
                        e
                    )))
                }
            }
        };

        Ok(PersistResponse {
            status: status.as_u16(),
            body,
        })
    }
}
