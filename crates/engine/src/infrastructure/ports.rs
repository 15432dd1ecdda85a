//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Outbound HTTP, one port per verb (could swap reqwest -> recording double)
//! - Key-value store connections (could swap SQLite -> in-memory double)
//! - Clock (for testing)
//!
//! Every outbound port reports a [`BindingKind`] so the isolation guard can
//! tell live implementations from substitutes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hermetic_domain::{BindingKind, BindingName};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("{bound} binding cannot send a {requested} request")]
    MethodMismatch {
        bound: HttpMethod,
        requested: HttpMethod,
    },
    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Store error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KvError {
    pub fn database(e: impl std::fmt::Display) -> Self {
        Self::Database(e.to_string())
    }
}

// =============================================================================
// HTTP Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn all() -> [HttpMethod; 5] {
        [
            HttpMethod::Get,
            HttpMethod::Put,
            HttpMethod::Post,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ]
    }

    /// The environment binding this verb occupies.
    pub fn binding(&self) -> BindingName {
        match self {
            HttpMethod::Get => BindingName::HttpGet,
            HttpMethod::Put => BindingName::HttpPut,
            HttpMethod::Post => BindingName::HttpPost,
            HttpMethod::Patch => BindingName::HttpPatch,
            HttpMethod::Delete => BindingName::HttpDelete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outbound request handed to an HTTP verb port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::InvalidBody(e.to_string()))?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(body))
    }
}

/// Response returned by an HTTP verb port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::InvalidBody(e.to_string()))?;
        let mut response = Self::new(status, body);
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(response)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Result<String, HttpError> {
        String::from_utf8(self.body.clone()).map_err(|e| HttpError::InvalidBody(e.to_string()))
    }

    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::InvalidBody(e.to_string()))
    }
}

// =============================================================================
// Outbound Ports
// =============================================================================

/// One HTTP verb binding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpVerbPort: Send + Sync {
    /// The verb this binding serves.
    fn method(&self) -> HttpMethod;
    /// Whether this binding performs real I/O.
    fn kind(&self) -> BindingKind;
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Key-value store client constructor.
///
/// The guard inspects the connector itself, never a store it produced.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvConnectorPort: Send + Sync {
    fn kind(&self) -> BindingKind;
    async fn connect(&self, url: &str) -> Result<Arc<dyn KvStorePort>, KvError>;
}

/// A connected key-value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStorePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;
    /// Store a value, replacing any existing one. `ttl` of `None` never expires.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError>;
    /// Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, KvError>;
    async fn exists(&self, key: &str) -> Result<bool, KvError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
