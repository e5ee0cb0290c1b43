//! Request/response seam between the adapter and the engine.
//!
//! Every engine interaction is one [`EsRequest`] answered by one
//! [`EsResponse`]. Request bodies and paths are fully shaped by the dialect
//! shim before they reach the transport, so the transport never needs to know
//! which API dialect is active.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::headers::{CONTENT_TYPE, HeaderMap, HeaderValue};
use elasticsearch::http::request::{JsonBody, NdBody};
use elasticsearch::http::transport::{
    MultiNodeConnectionPool, SingleNodeConnectionPool, TransportBuilder,
};
use elasticsearch::http::{Method, Url};
use serde_json::Value;

use crate::error::{BackendError, StorageResult};

use super::backend::{ElasticsearchAuth, ElasticsearchConfig};

/// HTTP verb of an engine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

/// Body of an engine request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// A single JSON document.
    Json(Value),
    /// Newline-delimited JSON lines (bulk requests).
    NdJson(Vec<Value>),
}

/// A fully shaped engine request.
#[derive(Debug, Clone, PartialEq)]
pub struct EsRequest {
    /// Short operation name used in logs and errors (`"search"`, `"bulk"`, ...).
    pub operation: &'static str,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Absolute path, starting with `/`.
    pub path: String,
    /// Request body.
    pub body: RequestBody,
}

impl EsRequest {
    /// Creates a request without a body.
    pub fn new(operation: &'static str, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    /// Attaches a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attaches newline-delimited JSON lines.
    pub fn nd_json(mut self, lines: Vec<Value>) -> Self {
        self.body = RequestBody::NdJson(lines);
        self
    }

    /// Returns the JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(body) => Some(body),
            _ => None,
        }
    }
}

/// An engine response: HTTP status plus parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct EsResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body ([`Value::Null`] when empty).
    pub body: Value,
}

impl EsResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The engine's error type (`error.type`), if the body carries one.
    pub fn error_type(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str)
    }

    /// Returns the body of a successful response, or a transport failure.
    pub fn into_success(self, operation: &str) -> StorageResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(BackendError::rejected(operation, self.status, self.body.to_string()).into())
        }
    }
}

/// Sends shaped requests to the engine.
///
/// Implementations own connection pooling and any retry policy; the adapter
/// issues each request exactly once.
#[async_trait]
pub trait EsTransport: Send + Sync + Debug {
    /// Sends one request and awaits its response.
    ///
    /// Only failures to obtain a response are errors; non-2xx statuses are
    /// returned as responses.
    async fn send(&self, request: EsRequest) -> Result<EsResponse, BackendError>;
}

/// [`EsTransport`] over the official Elasticsearch client.
#[derive(Debug, Clone)]
pub struct ElasticsearchTransport {
    client: Elasticsearch,
}

impl ElasticsearchTransport {
    /// Builds the client from configuration.
    ///
    /// One host uses a single-node pool; several hosts are load balanced
    /// round-robin.
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, BackendError> {
        let mut urls = Vec::with_capacity(config.hosts.len());
        for host in &config.hosts {
            let url: Url = host.parse().map_err(|e| BackendError::ConnectionFailed {
                backend_name: "elasticsearch".to_string(),
                message: format!("Invalid URL {}: {}", host, e),
            })?;
            urls.push(url);
        }

        let mut builder = match urls.len() {
            0 => {
                return Err(BackendError::ConnectionFailed {
                    backend_name: "elasticsearch".to_string(),
                    message: "no hosts configured".to_string(),
                });
            }
            1 => TransportBuilder::new(SingleNodeConnectionPool::new(urls.remove(0))),
            _ => TransportBuilder::new(MultiNodeConnectionPool::round_robin(urls, None)),
        }
        .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder.build().map_err(|e| BackendError::ConnectionFailed {
            backend_name: "elasticsearch".to_string(),
            message: format!("Failed to build transport: {}", e),
        })?;

        Ok(Self {
            client: Elasticsearch::new(transport),
        })
    }
}

#[async_trait]
impl EsTransport for ElasticsearchTransport {
    async fn send(&self, request: EsRequest) -> Result<EsResponse, BackendError> {
        let method = match request.method {
            HttpMethod::Get => Method::Get,
            HttpMethod::Post => Method::Post,
            HttpMethod::Put => Method::Put,
            HttpMethod::Delete => Method::Delete,
        };
        let operation = request.operation;
        let path = request.path;
        let mut headers = HeaderMap::new();

        tracing::trace!(operation, path = %path, "Sending Elasticsearch request");

        let sent = match request.body {
            RequestBody::Empty => {
                self.client
                    .send::<JsonBody<Value>, ()>(method, &path, headers, None, None, None)
                    .await
            }
            RequestBody::Json(body) => {
                self.client
                    .send::<_, ()>(method, &path, headers, None, Some(JsonBody::new(body)), None)
                    .await
            }
            RequestBody::NdJson(lines) => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-ndjson"),
                );
                let body = NdBody::new(lines.into_iter().map(JsonBody::new).collect());
                self.client
                    .send::<_, ()>(method, &path, headers, None, Some(body), None)
                    .await
            }
        };

        let response = sent.map_err(|e| {
            tracing::error!(operation, path = %path, error = %e, "Elasticsearch request failed");
            BackendError::transport(operation, e)
        })?;

        let status = response.status_code().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::transport(operation, e))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::trace!(operation, status, "Received Elasticsearch response");
        Ok(EsResponse { status, body })
    }
}
