//! Persistence transport seam
//!
//! The store never talks HTTP directly: it hands a [`PersistRequest`] to a
//! [`PersistenceTransport`] and interprets the [`PersistResponse`].

mod http;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use http::ReqwestTransport;

/// Ошибки транспорта
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// GET and DELETE go out without a body
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

/// One request as it goes over the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub method: RequestMethod,
    pub url: String,
    pub body: Value,
}

impl PersistRequest {
    /// Request without a body (GET, DELETE)
    pub fn bare(method: RequestMethod, url: String) -> Self {
        Self {
            method,
            url,
            body: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` when the body was empty
    pub body: Value,
}

impl PersistResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Трейт для транспорта сохранения
#[async_trait]
pub trait PersistenceTransport: Send + Sync {
    /// Отправка запроса к ресурсу
    async fn send(&self, request: PersistRequest) -> Result<PersistResponse, TransportError>;
}
