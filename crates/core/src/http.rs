//! One request, one `(status, body)` pair
//!
//! Every HTTP status, 5xx included, comes back as a normal
//! [`HttpResponse`]. Only failures to get a response at all (refused
//! connection, DNS, timeout) surface as a [`TransportError`].

use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

use crate::action::HttpMethod;
use crate::body::ResponseBody;
use crate::error::Result;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// A captured response with its round-trip time
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub latency: Duration,
}

impl HttpResponse {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

/// Thin wrapper over a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Issue one request. A JSON `body` is serialized with a JSON content
    /// type; the response is always asked for as JSON.
    pub async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut request = self
            .client
            .request(method.into(), url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| classify(e, timeout))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| classify(e, timeout))?;
        let latency = started.elapsed();

        trace!(%method, url, status, bytes = text.len(), "response received");

        Ok(HttpResponse {
            status,
            body: ResponseBody::parse(&text),
            latency,
        })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::from(err)
    }
}

/// Strip trailing slashes so paths can be appended directly
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
