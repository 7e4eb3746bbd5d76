//! Property-based tests using proptest
//!
//! These tests check the page arithmetic, document merging, and that the
//! batch and incremental fetch strategies assemble the same collection.

use async_trait::async_trait;
use proptest::prelude::*;
use resgraph::{
    Client, Document, ModelRegistry, PageRequest, Pagination, Query, Record, Request, Resource,
    Response, Transport,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Generate a first window: (offset, limit, count) with offset <= count
fn arb_window() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..500, 1u64..60).prop_flat_map(|(count, limit)| {
        (0..=count).prop_map(move |offset| (offset, limit, count))
    })
}

/// Items a server returns for the window starting at `offset`
fn served(offset: u64, limit: u64, count: u64) -> u64 {
    (offset + limit).min(count).saturating_sub(offset)
}

fn documents(ids: &[Vec<u32>]) -> Vec<Document> {
    ids.iter()
        .map(|page| {
            Document::many(
                page.iter()
                    .map(|id| {
                        Arc::new(Record::new("items", &id.to_string(), json!({})))
                            as Arc<dyn Resource>
                    })
                    .collect(),
            )
        })
        .collect()
}

fn ids(document: &Document) -> Vec<String> {
    document
        .resources()
        .map(|r| r.identity().id.clone())
        .collect()
}

/// Serves `count` items at `limit` per page, ignoring requested sizes
struct ScriptedTransport {
    count: u64,
    limit: u64,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> anyhow::Result<Response> {
        let offset: u64 = request
            .query_param("page[offset]")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let data: Vec<Value> = (offset..offset + served(offset, self.limit, self.count))
            .map(|i| json!({"id": i.to_string(), "type": "items"}))
            .collect();
        Ok(Response {
            status: 200,
            body: Some(json!({
                "data": data,
                "meta": {"pagination": {"offset": offset, "limit": self.limit, "count": self.count}}
            })),
        })
    }
}

fn client(count: u64, limit: u64) -> Client {
    let mut registry = ModelRegistry::new();
    registry.register_record::<Value>("items");
    Client::new(
        Arc::new(ScriptedTransport { count, limit }),
        Arc::new(registry),
        "http://localhost/api",
    )
    .expect("valid base url")
}

proptest! {
    /// The first window plus every remaining page covers [offset, count)
    /// exactly once and in order
    #[test]
    fn remaining_pages_cover_collection((offset, limit, count) in arb_window()) {
        let pagination = Pagination::new(offset, limit, count).unwrap();
        let retrieved = served(offset, limit, count);

        let mut covered: Vec<u64> = (offset..offset + retrieved).collect();
        for page in pagination.remaining_pages(retrieved) {
            prop_assert_eq!(page.limit, Some(limit));
            covered.extend(page.offset..page.offset + served(page.offset, limit, count));
        }

        let expected: Vec<u64> = (offset..count).collect();
        prop_assert_eq!(covered, expected);
    }

    /// Following `advance` page by page visits the same windows the batch
    /// strategy computes up front
    #[test]
    fn advance_chain_matches_remaining_pages((offset, limit, count) in arb_window()) {
        let first = Pagination::new(offset, limit, count).unwrap();
        let retrieved = served(offset, limit, count);

        let mut chain: Vec<PageRequest> = Vec::new();
        let mut current = first;
        let mut step = retrieved;
        while let Some(next) = current.advance(step, None) {
            chain.push(next);
            current = Pagination::new(next.offset, limit, count).unwrap();
            step = served(next.offset, limit, count);
        }

        prop_assert_eq!(chain, first.remaining_pages(retrieved));
    }

    /// A zero-item page never asks for more
    #[test]
    fn exhausted_window_has_no_next_page(count in 0u64..500, limit in 1u64..60) {
        let pagination = Pagination::new(count, limit, count).unwrap();
        prop_assert!(pagination.is_exhausted(0));
        prop_assert!(pagination.advance(0, None).is_none());
        prop_assert!(pagination.remaining_pages(0).is_empty());
    }

    /// Merging is associative and keeps argument order
    #[test]
    fn merge_is_associative(
        pages in prop::collection::vec(prop::collection::vec(any::<u32>(), 0..8), 3)
    ) {
        let docs = documents(&pages);
        let left = docs[0].merge(&docs[1]).unwrap().merge(&docs[2]).unwrap();
        let right = docs[0].merge(&docs[1].merge(&docs[2]).unwrap()).unwrap();

        let expected: Vec<String> = pages.iter().flatten().map(|id| id.to_string()).collect();
        prop_assert_eq!(ids(&left), expected);
        prop_assert_eq!(ids(&left), ids(&right));
    }

    /// Batch and incremental fetches assemble the same collection
    #[test]
    fn strategies_agree(count in 0u64..120, limit in 1u64..25) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (batch, incremental) = runtime.block_on(async {
            let batch = client(count, limit).get_all("items", &Query::new()).await.unwrap();
            let mut pages = 0;
            let incremental = client(count, limit)
                .get_all_incremental("items", &Query::new())
                .unwrap()
                .run(|_| pages += 1)
                .await
                .unwrap();
            assert_eq!(pages as u64, count.div_ceil(limit).max(1));
            (batch, incremental)
        });

        let expected: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        prop_assert_eq!(ids(&batch), expected);
        prop_assert_eq!(ids(&batch), ids(&incremental));
    }
}
