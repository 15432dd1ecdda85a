//! Live HTTP verbs backed by reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use hermetic_domain::BindingKind;
use reqwest::Client;

use crate::infrastructure::config::EnvironmentConfig;
use crate::infrastructure::ports::{
    HttpError, HttpMethod, HttpRequest, HttpResponse, HttpVerbPort,
};

/// One HTTP verb over a shared reqwest client. Performs real network I/O.
#[derive(Clone)]
pub struct ReqwestVerb {
    client: Client,
    method: HttpMethod,
}

impl ReqwestVerb {
    pub fn new(client: Client, method: HttpMethod) -> Self {
        Self { client, method }
    }

    /// Build a client from config.
    pub fn client(config: &EnvironmentConfig) -> Client {
        Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    /// All five verbs sharing one connection pool, in `HttpMethod::all()` order.
    pub fn verbs(config: &EnvironmentConfig) -> [Arc<dyn HttpVerbPort>; 5] {
        let client = Self::client(config);
        HttpMethod::all().map(|method| {
            Arc::new(Self::new(client.clone(), method)) as Arc<dyn HttpVerbPort>
        })
    }

    fn reqwest_method(&self) -> reqwest::Method {
        match self.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpVerbPort for ReqwestVerb {
    fn method(&self) -> HttpMethod {
        self.method
    }

    fn kind(&self) -> BindingKind {
        BindingKind::Live
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if request.method != self.method {
            return Err(HttpError::MethodMismatch {
                bound: self.method,
                requested: request.method,
            });
        }

        let mut builder = self.client.request(self.reqwest_method(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!(method = %self.method, url = %request.url, "Sending live HTTP request");

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?
            .to_vec();

        if !(200..300).contains(&status) {
            tracing::warn!(method = %self.method, url = %request.url, status, "HTTP request returned non-success status");
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
