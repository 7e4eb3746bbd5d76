//! Transport boundary
//!
//! The core only needs one operation from the network: send a request and
//! get back a status plus a parsed body. [`HttpTransport`] is the reqwest
//! implementation; tests plug in scripted transports instead.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default user agent for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!("resgraph/", env!("CARGO_PKG_VERSION"));

/// Media type for request and response bodies
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: &str, query: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            query,
            body: None,
        }
    }

    /// Value of a query parameter, if set
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Status and parsed body of a response. `body` is `None` when the server
/// sent nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

/// Sends requests on behalf of the client
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token: None,
        })
    }

    /// Send `token` as a bearer credential on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        tracing::debug!("{:?} {} {:?}", request.method, request.url, request.query);

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .header(reqwest::header::ACCEPT, MEDIA_TYPE)
            .query(&request.query);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            let encoded = serde_json::to_vec(body).context("Failed to encode request body")?;
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, MEDIA_TYPE)
                .body(encoded);
        }

        let response = builder.send().await.context("Failed to send request")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error bodies
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
        }

        // Handle empty response
        if text.trim().is_empty() {
            return Ok(Response {
                status: status.as_u16(),
                body: None,
            });
        }

        let body = match serde_json::from_str(&text) {
            Ok(body) => Some(body),
            // Error pages are often HTML; keep the status and drop the body
            Err(_) if !status.is_success() => None,
            Err(e) => return Err(e).context("Failed to parse response JSON"),
        };

        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}
