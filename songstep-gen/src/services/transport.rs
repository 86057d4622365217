//! Upstream HTTP transport
//!
//! One outbound call per invocation, no retries. Every call resolves to a
//! [`TransportOutcome`]; network faults never escape as errors.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use serde_json::Value;
use songstep_common::secrets::mask_key;
use std::time::Duration;

const USER_AGENT: &str = concat!("songstep-gen/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Credential header attached to a call
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHeader {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `X-API-Key: <key>`
    ApiKey(String),
}

impl AuthHeader {
    fn key(&self) -> &str {
        match self {
            AuthHeader::Bearer(key) | AuthHeader::ApiKey(key) => key,
        }
    }
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthHeader::Bearer(key) => write!(f, "Bearer({})", mask_key(key)),
            AuthHeader::ApiKey(key) => write!(f, "ApiKey({})", mask_key(key)),
        }
    }
}

/// Fully built outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamCall {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub auth: Option<AuthHeader>,
}

impl UpstreamCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            auth: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Option<AuthHeader>) -> Self {
        self.auth = auth;
        self
    }
}

/// Normalized result of one outbound call
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutcome {
    /// No response obtained (connect refused, DNS, timeout)
    Failure(String),
    /// Non-2xx status; body kept verbatim
    Rejected { status: u16, body: String },
    /// 2xx status
    Completed { status: u16, body: String },
}

impl TransportOutcome {
    /// Classify into a parsed JSON body or a normalized error
    pub fn into_json(self) -> CoreResult<(u16, Value)> {
        match self {
            TransportOutcome::Failure(detail) => Err(CoreError::TransportFailure(detail)),
            TransportOutcome::Rejected { status, body } => {
                Err(CoreError::UpstreamRejected { status, body })
            }
            TransportOutcome::Completed { status, body } => serde_json::from_str(&body)
                .map(|json| (status, json))
                .map_err(|_| CoreError::UpstreamMalformed(body)),
        }
    }
}

/// Outbound network capability used by provider adapters and the store
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Perform one JSON call
    async fn execute(&self, call: UpstreamCall) -> TransportOutcome;

    /// Fetch a remote artifact's raw bytes
    async fn download(&self, url: &str) -> CoreResult<Vec<u8>>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::TransportFailure(format!("HTTP client setup: {}", e)))?;
        Ok(Self { client })
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {}", err)
    } else if err.is_connect() {
        format!("connect: {}", err)
    } else {
        err.to_string()
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn execute(&self, call: UpstreamCall) -> TransportOutcome {
        let mut request = match call.method {
            HttpMethod::Get => self.client.get(&call.url),
            HttpMethod::Post => self.client.post(&call.url),
        };
        request = request.header(reqwest::header::ACCEPT, "*/*");

        match &call.auth {
            Some(AuthHeader::Bearer(key)) => request = request.bearer_auth(key),
            Some(AuthHeader::ApiKey(key)) => request = request.header("X-API-Key", key),
            None => tracing::warn!(url = %call.url, "Upstream call without credentials"),
        }

        if let Some(body) = &call.body {
            let text = body.to_string();
            tracing::debug!(url = %call.url, body_len = text.len(), "Upstream request");
            tracing::trace!(body = %text, "Upstream request body");
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(text);
        } else {
            tracing::debug!(url = %call.url, "Upstream request");
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let detail = describe(&e);
                tracing::error!(url = %call.url, error = %detail, "Upstream call failed");
                return TransportOutcome::Failure(detail);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let detail = describe(&e);
                tracing::error!(url = %call.url, error = %detail, "Upstream body read failed");
                return TransportOutcome::Failure(detail);
            }
        };

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let key = call.auth.as_ref().map(AuthHeader::key).unwrap_or_default();
            tracing::error!(
                url = %call.url,
                key = %mask_key(key),
                key_len = key.len(),
                body = %body,
                "Upstream rejected credentials (401)"
            );
        }

        if status.is_success() {
            tracing::info!(url = %call.url, status = status.as_u16(), "Upstream response");
            TransportOutcome::Completed {
                status: status.as_u16(),
                body,
            }
        } else {
            tracing::warn!(
                url = %call.url,
                status = status.as_u16(),
                "Upstream returned error status"
            );
            TransportOutcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    async fn download(&self, url: &str) -> CoreResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::TransportFailure(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::UpstreamRejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::TransportFailure(describe(&e)))?;
        tracing::debug!(url = %url, bytes = bytes.len(), "Downloaded artifact");
        Ok(bytes.to_vec())
    }
}
