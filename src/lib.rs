//! Client-side data access for paginated, linked REST resources
//!
//! Fetches collections of linked resources, normalizes them into a
//! de-duplicated in-memory graph and resolves relationships against it.
//!
//! # Module Structure
//!
//! - [`pagination`] - offset/limit windows and page arithmetic
//! - [`reference`] - resource identities, references and relationships
//! - [`resource`] - the [`Resource`] capability and the generic [`Record`]
//! - [`identity_map`] - `type -> id -> resource` map, last write wins
//! - [`registry`] - dispatch from wire type (and view) to a factory
//! - [`document`] - wrap, merge and unwrap of response documents
//! - [`client`] - single-resource reads and writes
//! - [`fetcher`] - batch and incremental collection fetches
//! - [`transport`] - the network seam and its reqwest implementation
//! - [`query`] - filter, sort, include and page parameters
//! - [`wire`] - serde shapes of request and response documents
//! - [`config`] - persisted defaults for the `resgraph` binary
//!
//! # Example
//!
//! ```ignore
//! use resgraph::{Client, ModelRegistry, Query};
//! use std::sync::Arc;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let mut registry = ModelRegistry::new();
//!     registry
//!         .register_record::<Article>("articles")
//!         .register_record::<Person>("people");
//!
//!     let client = Client::http(Arc::new(registry), "https://api.example.com/v1", None, "example")?;
//!     let articles = client
//!         .get_all("articles", &Query::new().include("author"))
//!         .await?;
//!
//!     let graph = articles.to_identity_map();
//!     for article in articles.resources() {
//!         let author = article
//!             .relationships()
//!             .and_then(|r| r.get("author"))
//!             .and_then(|r| r.resolve_one(&graph));
//!         println!("{} by {:?}", article.identity(), author.map(|a| a.identity().clone()));
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod identity_map;
pub mod pagination;
pub mod query;
pub mod reference;
pub mod registry;
pub mod resource;
pub mod transport;
pub mod wire;

pub use client::Client;
pub use document::{Cardinality, Document};
pub use error::{Error, Result};
pub use fetcher::{FetchEvent, FetchState, FetchSummary, IncrementalFetch};
pub use identity_map::IdentityMap;
pub use pagination::{PageRequest, Pagination};
pub use query::{Query, ResourceFilter, SortKey};
pub use reference::{Reference, Relationship, ResourceIdentity};
pub use registry::{FnFactory, ModelRegistry, RecordFactory, ResourceFactory};
pub use resource::{Attributes, Record, Relationships, Resource};
pub use transport::{HttpTransport, Method, Request, Response, Transport};
pub use wire::{ApiError, WireDocument, WireResource};
