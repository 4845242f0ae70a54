//! HTTP client wrapper for workload requests.
//!
//! Thin layer over `reqwest` that turns every call into a structured
//! `HttpResponse` carrying status, raw body, and timing. Body parsing is
//! lazy and failure-tolerant: `HttpResponse::json()` returns `None` for a
//! malformed body instead of surfacing a parse error to the scenario.

use serde_json::Value;
use std::time::{Duration, Instant};

/// A completed HTTP interaction as observed by a virtual user.
///
/// Transport failures (connection refused, timeout) are represented as a
/// response with status 0 and an empty body rather than an error, so the
/// scenario loop continues and checks against the response simply fail.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code; 0 when the request never produced a response.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Wall time from send to last byte.
    pub duration: Duration,
    /// Whether the request failed at the transport level.
    pub transport_failed: bool,
}

impl HttpResponse {
    /// A placeholder response for a request that failed in transport.
    pub fn failed(duration: Duration) -> Self {
        Self {
            status: 0,
            body: String::new(),
            duration,
            transport_failed: true,
        }
    }

    /// Parse the body as JSON, returning `None` if it is not valid JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Whether the status is a 2xx success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is a 5xx server error.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// HTTP client bound to a target service base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client for the given base URL (trailing slash stripped).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a client with a custom reqwest client (for custom timeouts).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET to a path relative to the base URL.
    ///
    /// Never returns an error: transport failures become a placeholder
    /// response with `transport_failed` set.
    pub async fn get(&self, path: &str) -> HttpResponse {
        let url = format!("{}{path}", self.base_url);
        let start = Instant::now();

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                HttpResponse {
                    status,
                    body,
                    duration: start.elapsed(),
                    transport_failed: false,
                }
            }
            Err(_) => HttpResponse::failed(start.elapsed()),
        }
    }
}
