//! Resource Fetcher
//!
//! Drives repeated page requests against a collection endpoint. Two
//! strategies share the same first step and the same stop rule:
//!
//! - batch ([`Client::get_all`]): once the first page reveals the total
//!   count, every remaining page is requested at once and the results are
//!   merged in page order into one document.
//! - incremental ([`Client::get_all_incremental`]): one request at a time.
//!   Each page is handed to the caller before the next one is even
//!   computed, and a final [`FetchEvent::Complete`] closes the sequence.
//!
//! A response without usable `meta.pagination` ends the fetch successfully.
//! Any failure aborts the fetch; pages already handed out stay valid.

use crate::client::Client;
use crate::document::{Cardinality, Document};
use crate::error::Result;
use crate::identity_map::IdentityMap;
use crate::pagination::{PageRequest, Pagination};
use crate::query::Query;
use futures::future::try_join_all;
use futures::Stream;
use uuid::Uuid;

/// Orchestration progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Nothing requested yet
    Initial,
    /// First page requested, not yet delivered
    FetchingFirst,
    /// At least one page delivered; the next pull requests the following
    /// page or completes
    FetchingNext,
    /// `Complete` delivered
    Done,
    /// A request failed
    Failed,
}

/// Totals reported when an incremental fetch completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Pages delivered
    pub pages: usize,
    /// Primary resources delivered across all pages
    pub retrieved: u64,
    /// Pagination of the last page, if the server sent any
    pub pagination: Option<Pagination>,
}

/// One step of an incremental fetch
#[derive(Debug)]
pub enum FetchEvent {
    /// A page, delivered as soon as it is wrapped
    Page(Document),
    /// No more pages; always the last event of a successful fetch
    Complete(FetchSummary),
}

/// Pagination to continue from after a page holding `retrieved` items, or
/// `None` when that page was the last one
fn continuation(
    pagination: Option<Pagination>,
    retrieved: u64,
    fetch_id: &Uuid,
) -> Option<Pagination> {
    let Some(pagination) = pagination else {
        tracing::debug!(%fetch_id, "No pagination metadata, treating page as last");
        return None;
    };
    if pagination.is_exhausted(retrieved) {
        return None;
    }
    if retrieved == 0 {
        tracing::warn!(
            %fetch_id,
            "Empty page at offset {} while server reports {} items, stopping",
            pagination.offset,
            pagination.count
        );
        return None;
    }
    Some(pagination)
}

impl Client {
    /// Fetch every page of a collection and merge them into one document.
    pub async fn get_all(&self, path: &str, query: &Query) -> Result<Document> {
        self.get_all_from(path, query, PageRequest::first(self.page_limit()))
            .await
    }

    /// Like [`get_all`](Self::get_all), starting at `first`.
    ///
    /// Remaining pages are requested concurrently; merge order is the page
    /// order, never arrival order. If the server's count changes between
    /// requests the aggregate reflects whatever the pages returned.
    pub async fn get_all_from(
        &self,
        path: &str,
        query: &Query,
        first: PageRequest,
    ) -> Result<Document> {
        let fetch_id = Uuid::new_v4();
        let url = self.url(path)?;
        tracing::debug!(%fetch_id, "Batch fetch of {} from offset {}", url, first.offset);

        let first_page = self.fetch_page(&url, query, first).await?;
        let retrieved = first_page.len() as u64;
        let Some(pagination) = continuation(first_page.pagination(), retrieved, &fetch_id) else {
            tracing::info!(%fetch_id, "Fetched {} items from {} in one page", retrieved, url);
            return Ok(first_page);
        };

        let remaining = pagination.remaining_pages(retrieved);
        tracing::debug!(
            %fetch_id,
            "Requesting {} more pages of {} ({} items total)",
            remaining.len(),
            url,
            pagination.count
        );

        let pages = try_join_all(
            remaining
                .iter()
                .map(|page| self.fetch_page(&url, query, *page)),
        )
        .await
        .inspect_err(|e| tracing::error!(%fetch_id, "Batch fetch of {} failed: {}", url, e))?;

        let page_count = pages.len() + 1;
        let aggregate = first_page.merge_all(pages)?;

        let expected = pagination.count.saturating_sub(pagination.offset);
        if aggregate.len() as u64 != expected {
            tracing::warn!(
                %fetch_id,
                "Collection {} changed during fetch: expected {} items, got {}",
                url,
                expected,
                aggregate.len()
            );
        }
        tracing::info!(
            %fetch_id,
            "Fetched {} items from {} in {} pages",
            aggregate.len(),
            url,
            page_count
        );
        Ok(aggregate)
    }

    /// Batch fetch, then deposit every resource into `map`
    pub async fn get_all_into(
        &self,
        path: &str,
        query: &Query,
        map: &mut IdentityMap,
    ) -> Result<Document> {
        let document = self.get_all(path, query).await?;
        map.deposit(&document);
        Ok(document)
    }

    /// Start an incremental fetch of a collection.
    pub fn get_all_incremental(&self, path: &str, query: &Query) -> Result<IncrementalFetch> {
        self.get_all_incremental_from(path, query, PageRequest::first(self.page_limit()))
    }

    /// Like [`get_all_incremental`](Self::get_all_incremental), starting at
    /// `first`.
    pub fn get_all_incremental_from(
        &self,
        path: &str,
        query: &Query,
        first: PageRequest,
    ) -> Result<IncrementalFetch> {
        Ok(IncrementalFetch {
            client: self.clone(),
            url: self.url(path)?,
            query: query.clone(),
            fetch_id: Uuid::new_v4(),
            state: FetchState::Initial,
            first,
            last_page: None,
            summary: FetchSummary {
                pages: 0,
                retrieved: 0,
                pagination: None,
            },
        })
    }
}

/// Sequential page-by-page fetch.
///
/// Pull-driven: a request is only sent when [`next`](Self::next) is called,
/// so at most one request is ever outstanding and a page is never requested
/// before its predecessor has been returned to the caller.
pub struct IncrementalFetch {
    client: Client,
    url: String,
    query: Query,
    fetch_id: Uuid,
    state: FetchState,
    first: PageRequest,
    /// Pagination and item count of the page most recently delivered
    last_page: Option<(Option<Pagination>, u64)>,
    summary: FetchSummary,
}

impl IncrementalFetch {
    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Advance the fetch by one event.
    ///
    /// Yields each page, then [`FetchEvent::Complete`], then `None`. After an
    /// error it yields `None`.
    pub async fn next(&mut self) -> Option<Result<FetchEvent>> {
        let page = match self.state {
            FetchState::Done | FetchState::Failed => return None,
            FetchState::Initial => {
                self.state = FetchState::FetchingFirst;
                tracing::debug!(
                    fetch_id = %self.fetch_id,
                    "Incremental fetch of {} from offset {}",
                    self.url,
                    self.first.offset
                );
                self.first
            }
            FetchState::FetchingFirst | FetchState::FetchingNext => match self.next_request() {
                Some(page) => page,
                None => {
                    self.state = FetchState::Done;
                    tracing::info!(
                        fetch_id = %self.fetch_id,
                        "Fetched {} items from {} in {} pages",
                        self.summary.retrieved,
                        self.url,
                        self.summary.pages
                    );
                    return Some(Ok(FetchEvent::Complete(self.summary.clone())));
                }
            },
        };

        match self.client.fetch_page(&self.url, &self.query, page).await {
            Ok(document) => {
                let retrieved = document.len() as u64;
                let pagination = document.pagination();
                self.summary.pages += 1;
                self.summary.retrieved += retrieved;
                self.summary.pagination = pagination;
                self.last_page = Some((pagination, retrieved));
                self.state = FetchState::FetchingNext;
                Some(Ok(FetchEvent::Page(document)))
            }
            Err(e) => {
                self.state = FetchState::Failed;
                tracing::error!(
                    fetch_id = %self.fetch_id,
                    "Incremental fetch of {} failed at offset {}: {}",
                    self.url,
                    page.offset,
                    e
                );
                Some(Err(e))
            }
        }
    }

    /// Page following the one last delivered, if any
    fn next_request(&self) -> Option<PageRequest> {
        let (pagination, retrieved) = self.last_page?;
        continuation(pagination, retrieved, &self.fetch_id)?.advance(retrieved, None)
    }

    /// Run to completion, calling `on_page` with each page before the next
    /// one is requested, and return the merged collection.
    pub async fn run<F>(mut self, mut on_page: F) -> Result<Document>
    where
        F: FnMut(&Document),
    {
        let mut pages = Vec::new();
        while let Some(event) = self.next().await {
            match event? {
                FetchEvent::Page(page) => {
                    on_page(&page);
                    pages.push(page);
                }
                FetchEvent::Complete(_) => break,
            }
        }

        let mut pages = pages.into_iter();
        match pages.next() {
            Some(first) => first.merge_all(pages),
            None => Ok(Document::empty(Cardinality::Many)),
        }
    }

    /// Adapt into a stream of events
    pub fn into_stream(self) -> impl Stream<Item = Result<FetchEvent>> {
        futures::stream::unfold(self, |mut fetch| async move {
            let event = fetch.next().await?;
            Some((event, fetch))
        })
    }
}
