//! Pagination windows
//!
//! A [`PageRequest`] (offset plus optional limit) is enough to ask for a
//! page. A [`Pagination`] adds the total count and only ever comes back from
//! the server; it is what lets us work out which pages are still missing.

use serde_json::{Map, Value};
use std::ops::Range;

/// Query parameter carrying the window offset
pub const OFFSET_PARAM: &str = "page[offset]";
/// Query parameter carrying the window size
pub const LIMIT_PARAM: &str = "page[limit]";

/// Partial pagination: a window that can be requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl PageRequest {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// First page with an optional size
    pub fn first(limit: Option<u64>) -> Self {
        Self { offset: 0, limit }
    }

    /// Query pairs to append to a request
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(OFFSET_PARAM.to_string(), self.offset.to_string())];
        if let Some(limit) = self.limit {
            pairs.push((LIMIT_PARAM.to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Complete pagination as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
    pub count: u64,
}

impl Pagination {
    /// Returns `None` when `limit` is zero.
    pub fn new(offset: u64, limit: u64, count: u64) -> Option<Self> {
        (limit > 0).then_some(Self {
            offset,
            limit,
            count,
        })
    }

    /// Parse `meta.pagination`. Anything missing or not a non-negative
    /// integer is reported as `None`.
    pub fn from_meta(meta: &Map<String, Value>) -> Option<Self> {
        let pagination = meta.get("pagination")?.as_object()?;
        let field = |name: &str| pagination.get(name).and_then(Value::as_u64);
        Self::new(field("offset")?, field("limit")?, field("count")?)
    }

    /// The window as a request
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.offset, Some(self.limit))
    }

    /// True when `retrieved` items from this window reach the end of the
    /// collection.
    pub fn is_exhausted(&self, retrieved: u64) -> bool {
        self.offset.saturating_add(retrieved) >= self.count
    }

    /// The page after skipping `by` items, or `None` at the end.
    pub fn advance(&self, by: u64, limit_override: Option<u64>) -> Option<PageRequest> {
        let next = self.offset.saturating_add(by);
        if next >= self.count {
            return None;
        }
        Some(PageRequest::new(
            next,
            Some(limit_override.unwrap_or(self.limit)),
        ))
    }

    /// Every page still needed once `retrieved` items of this window are in
    /// hand, in collection order.
    pub fn remaining_pages(&self, retrieved: u64) -> Vec<PageRequest> {
        let start = self.offset.saturating_add(retrieved);
        if start >= self.count {
            return Vec::new();
        }
        let pages = (self.count - start).div_ceil(self.limit);
        (0..pages)
            .map(|i| PageRequest::new(start + i * self.limit, Some(self.limit)))
            .collect()
    }

    /// Item range this window covers, clipped to the collection
    pub fn item_range(&self) -> Range<u64> {
        let end = self.offset.saturating_add(self.limit).min(self.count);
        self.offset.min(end)..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_five_items_in_pages_of_two() {
        let first = Pagination::new(0, 2, 5).unwrap();
        assert!(!first.is_exhausted(2));

        let remaining = first.remaining_pages(2);
        assert_eq!(
            remaining,
            vec![PageRequest::new(2, Some(2)), PageRequest::new(4, Some(2))]
        );

        let last = Pagination::new(4, 2, 5).unwrap();
        assert!(last.is_exhausted(1));
        assert_eq!(last.advance(1, None), None);
        assert_eq!(first.advance(5, None), None);
    }

    #[test]
    fn test_advance_uses_override_limit() {
        let page = Pagination::new(0, 10, 100).unwrap();
        assert_eq!(page.advance(10, None), Some(PageRequest::new(10, Some(10))));
        assert_eq!(
            page.advance(10, Some(25)),
            Some(PageRequest::new(10, Some(25)))
        );
    }

    #[test]
    fn test_empty_collection_has_no_remaining_pages() {
        let page = Pagination::new(0, 10, 0).unwrap();
        assert!(page.is_exhausted(0));
        assert!(page.remaining_pages(0).is_empty());
        assert_eq!(page.advance(0, None), None);
    }

    #[test]
    fn test_remaining_pages_from_nonzero_offset() {
        let page = Pagination::new(3, 3, 10).unwrap();
        let remaining = page.remaining_pages(3);
        assert_eq!(
            remaining,
            vec![PageRequest::new(6, Some(3)), PageRequest::new(9, Some(3))]
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(Pagination::new(0, 0, 10).is_none());
    }

    #[test]
    fn test_from_meta() {
        let parsed = Pagination::from_meta(&meta(json!({
            "pagination": {"offset": 4, "limit": 2, "count": 5},
            "other": true
        })));
        assert_eq!(parsed, Pagination::new(4, 2, 5));
    }

    #[test]
    fn test_from_meta_tolerates_garbage() {
        assert!(Pagination::from_meta(&meta(json!({}))).is_none());
        assert!(Pagination::from_meta(&meta(json!({"pagination": "nope"}))).is_none());
        assert!(Pagination::from_meta(&meta(json!({
            "pagination": {"offset": 0, "limit": 2}
        })))
        .is_none());
        assert!(Pagination::from_meta(&meta(json!({
            "pagination": {"offset": -1, "limit": 2, "count": 3}
        })))
        .is_none());
        assert!(Pagination::from_meta(&meta(json!({
            "pagination": {"offset": 0, "limit": 0, "count": 3}
        })))
        .is_none());
    }

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            PageRequest::new(20, Some(10)).query_pairs(),
            vec![
                ("page[offset]".to_string(), "20".to_string()),
                ("page[limit]".to_string(), "10".to_string())
            ]
        );
        assert_eq!(PageRequest::first(None).query_pairs().len(), 1);
    }

    #[test]
    fn test_item_range_is_clipped() {
        assert_eq!(Pagination::new(4, 2, 5).unwrap().item_range(), 4..5);
        assert_eq!(Pagination::new(0, 2, 5).unwrap().item_range(), 0..2);
    }
}
