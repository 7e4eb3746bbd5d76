//! API Client
//!
//! Combines a transport, a model registry and a base URL. Single-resource
//! reads and writes live here; paginated collection reads are in
//! [`crate::fetcher`].

use crate::document::{Cardinality, Document};
use crate::error::{Error, Result};
use crate::pagination::PageRequest;
use crate::query::Query;
use crate::registry::ModelRegistry;
use crate::resource::Resource;
use crate::transport::{HttpTransport, Method, Request, Response, Transport};
use crate::wire::{errors_from_value, WireDocument};
use std::sync::Arc;
use url::Url;

/// Status expected for reads
pub const STATUS_OK: &[u16] = &[200];
/// Status expected for creates
pub const STATUS_CREATED: &[u16] = &[201];
/// Statuses accepted for updates
pub const STATUS_UPDATED: &[u16] = &[200, 201];
/// Status expected for deletes
pub const STATUS_DELETED: &[u16] = &[204];

/// Main API client
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    registry: Arc<ModelRegistry>,
    base_url: Url,
    page_limit: Option<u64>,
}

impl Client {
    /// Create a client over any transport.
    ///
    /// Paths passed to request methods are resolved relative to `base_url`,
    /// which is treated as a directory even without a trailing slash.
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<ModelRegistry>,
        base_url: &str,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            transport,
            registry,
            base_url,
            page_limit: None,
        })
    }

    /// Create a client using the reqwest transport
    pub fn http(
        registry: Arc<ModelRegistry>,
        base_url: &str,
        token: Option<&str>,
        user_agent: &str,
    ) -> anyhow::Result<Self> {
        let mut transport = HttpTransport::new(user_agent)?;
        if let Some(token) = token {
            transport = transport.with_token(token);
        }
        Ok(Self::new(Arc::new(transport), registry, base_url)?)
    }

    /// Page size requested when the caller does not pick one
    pub fn with_page_limit(mut self, limit: u64) -> Self {
        self.page_limit = (limit > 0).then_some(limit);
        self
    }

    pub fn page_limit(&self) -> Option<u64> {
        self.page_limit
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path (or absolute URL) against the base URL
    pub fn url(&self, path: &str) -> Result<String> {
        Ok(self
            .base_url
            .join(path.trim_start_matches('/'))?
            .to_string())
    }

    /// Fetch a single resource
    pub async fn get_one(&self, path: &str, query: &Query) -> Result<Document> {
        let request = Request::get(&self.url(path)?, query.to_pairs());
        self.request_document(request, STATUS_OK, Cardinality::One)
            .await
    }

    /// Fetch one page of a collection
    pub async fn get_page(&self, path: &str, query: &Query, page: PageRequest) -> Result<Document> {
        let url = self.url(path)?;
        self.fetch_page(&url, query, page).await
    }

    /// Create a resource; the server answers with the stored resource
    pub async fn create(&self, path: &str, resource: Arc<dyn Resource>) -> Result<Document> {
        tracing::info!("Creating {}", resource.identity());
        let body = encode_body(resource)?;
        let request = Request {
            method: Method::Post,
            url: self.url(path)?,
            query: Vec::new(),
            body: Some(body),
        };
        self.request_document(request, STATUS_CREATED, Cardinality::One)
            .await
    }

    /// Update a resource
    pub async fn update(&self, path: &str, resource: Arc<dyn Resource>) -> Result<Document> {
        tracing::info!("Updating {}", resource.identity());
        let body = encode_body(resource)?;
        let request = Request {
            method: Method::Patch,
            url: self.url(path)?,
            query: Vec::new(),
            body: Some(body),
        };
        self.request_document(request, STATUS_UPDATED, Cardinality::One)
            .await
    }

    /// Delete a resource
    pub async fn delete(&self, path: &str) -> Result<()> {
        tracing::info!("Deleting {}", path);
        let request = Request {
            method: Method::Delete,
            url: self.url(path)?,
            query: Vec::new(),
            body: None,
        };
        self.send_expecting(request, STATUS_DELETED).await?;
        Ok(())
    }

    pub(crate) async fn fetch_page(
        &self,
        url: &str,
        query: &Query,
        page: PageRequest,
    ) -> Result<Document> {
        let request = Request::get(url, query.to_pairs_with_page(&page));
        self.request_document(request, STATUS_OK, Cardinality::Many)
            .await
    }

    async fn request_document(
        &self,
        request: Request,
        expected: &[u16],
        cardinality: Cardinality,
    ) -> Result<Document> {
        let body = self.send_expecting(request, expected).await?;
        let wire: WireDocument = match body {
            Some(body) => serde_json::from_value(body)?,
            None => WireDocument::default(),
        };
        Document::wrap(wire, cardinality, &self.registry)
    }

    /// Send and check the status, returning the body on success
    async fn send_expecting(
        &self,
        request: Request,
        expected: &[u16],
    ) -> Result<Option<serde_json::Value>> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(Error::Transport)?;
        check_status(response, expected)
    }
}

/// Request body for a create or update
fn encode_body(resource: Arc<dyn Resource>) -> Result<serde_json::Value> {
    let identity = resource.identity().clone();
    let wire = Document::one(resource).unwrap()?;
    serde_json::to_value(wire).map_err(|source| Error::Encode { identity, source })
}

/// Map a response to its body or the matching error.
///
/// An unexpected status surfaces the document's `errors` when there are
/// any, and a plain status mismatch otherwise.
pub fn check_status(response: Response, expected: &[u16]) -> Result<Option<serde_json::Value>> {
    if expected.contains(&response.status) {
        return Ok(response.body);
    }

    let errors = response
        .body
        .and_then(|mut body| body.get_mut("errors").map(serde_json::Value::take))
        .and_then(errors_from_value)
        .unwrap_or_default();

    if errors.is_empty() {
        Err(Error::UnexpectedStatus {
            status: response.status,
            expected: expected.to_vec(),
        })
    } else {
        Err(Error::Api {
            status: response.status,
            errors,
        })
    }
}
