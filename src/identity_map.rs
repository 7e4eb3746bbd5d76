//! Resource identity map
//!
//! The single source of truth for "have we already seen this resource".
//! Resources are keyed by type, then id. Inserting a resource whose identity
//! is already present replaces the old one whole; fields are never merged.
//!
//! The map is not synchronized. Use one per top-level fetch, or wrap it
//! yourself when sharing across tasks.

use crate::document::Document;
use crate::reference::{Reference, ResourceIdentity};
use crate::resource::Resource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    resource: Arc<dyn Resource>,
    inserted_at: Instant,
}

impl Entry {
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        ttl.map_or(true, |ttl| self.inserted_at.elapsed() < ttl)
    }
}

/// Two-level `type -> id -> resource` map
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    types: HashMap<String, HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map whose entries read as absent once older than `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            types: HashMap::new(),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Insert, replacing any resource with the same identity
    pub fn put(&mut self, resource: Arc<dyn Resource>) {
        let identity = resource.identity().clone();
        let by_id = self.types.entry(identity.resource_type).or_default();
        by_id.insert(
            identity.id,
            Entry {
                resource,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Insert in order; later duplicates win
    pub fn put_all<I>(&mut self, resources: I)
    where
        I: IntoIterator<Item = Arc<dyn Resource>>,
    {
        for resource in resources {
            self.put(resource);
        }
    }

    /// Insert a document's primary data, then its included resources
    pub fn deposit(&mut self, document: &Document) {
        self.put_all(document.resources().cloned());
        self.put_all(document.included().iter().cloned());
    }

    pub fn get(&self, reference: &Reference) -> Option<Arc<dyn Resource>> {
        self.get_identity(reference.identity())
    }

    pub fn get_identity(&self, identity: &ResourceIdentity) -> Option<Arc<dyn Resource>> {
        self.types
            .get(&identity.resource_type)?
            .get(&identity.id)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.resource.clone())
    }

    /// Typed lookup; `None` on a miss or when the stored resource is of a
    /// different Rust type
    pub fn get_as<T: Resource>(&self, reference: &Reference) -> Option<Arc<T>> {
        self.get(reference)?.into_any().downcast::<T>().ok()
    }

    /// Every live resource of one type, in no particular order
    pub fn get_all_of_type(&self, resource_type: &str) -> Vec<Arc<dyn Resource>> {
        self.types
            .get(resource_type)
            .map(|by_id| {
                by_id
                    .values()
                    .filter(|entry| entry.is_fresh(self.ttl))
                    .map(|entry| entry.resource.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.get(reference).is_some()
    }

    pub fn remove(&mut self, reference: &Reference) -> Option<Arc<dyn Resource>> {
        let by_id = self.types.get_mut(reference.resource_type())?;
        by_id.remove(reference.id()).map(|entry| entry.resource)
    }

    /// Types that have seen at least one insertion
    pub fn types(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.types.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.len();
        for by_id in self.types.values_mut() {
            by_id.retain(|_, entry| entry.is_fresh(Some(ttl)));
        }
        let removed = before - self.len();
        if removed > 0 {
            tracing::debug!("Purged {} expired resources", removed);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Record;
    use serde_json::{json, Value};

    fn record(resource_type: &str, id: &str, version: u32) -> Arc<dyn Resource> {
        Arc::new(Record::new(resource_type, id, json!({ "version": version })))
    }

    #[test]
    fn test_put_and_get() {
        let mut map = IdentityMap::new();
        assert!(map.is_empty());

        map.put(record("people", "1", 1));
        map.put(record("articles", "1", 1));

        assert_eq!(map.len(), 2);
        assert!(map.contains(&Reference::new("people", "1")));
        assert!(map.contains(&Reference::new("articles", "1")));
        assert!(map.get(&Reference::new("people", "2")).is_none());
        assert!(map.get(&Reference::new("comments", "1")).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut map = IdentityMap::new();
        map.put_all(vec![
            record("people", "1", 1),
            record("people", "1", 2),
            record("people", "1", 3),
        ]);

        assert_eq!(map.len(), 1);
        let latest = map
            .get_as::<Record<Value>>(&Reference::new("people", "1"))
            .unwrap();
        assert_eq!(latest.attributes["version"], 3);
    }

    #[test]
    fn test_get_all_of_type() {
        let mut map = IdentityMap::new();
        map.put(record("people", "1", 1));
        map.put(record("people", "2", 1));
        map.put(record("articles", "1", 1));

        let mut ids: Vec<String> = map
            .get_all_of_type("people")
            .iter()
            .map(|r| r.identity().id.clone())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(map.get_all_of_type("tags").is_empty());

        let mut types = map.types();
        types.sort();
        assert_eq!(types, vec!["articles", "people"]);
    }

    #[test]
    fn test_get_as_wrong_type_is_none() {
        let mut map = IdentityMap::new();
        map.put(record("people", "1", 1));
        assert!(map
            .get_as::<Record<String>>(&Reference::new("people", "1"))
            .is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut map = IdentityMap::new();
        map.put(record("people", "1", 1));
        map.put(record("people", "2", 1));

        assert!(map.remove(&Reference::new("people", "1")).is_some());
        assert!(map.remove(&Reference::new("people", "1")).is_none());
        assert_eq!(map.len(), 1);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_ttl_hides_and_purges_stale_entries() {
        let mut map = IdentityMap::with_ttl(Duration::from_millis(20));
        map.put(record("people", "1", 1));
        assert!(map.contains(&Reference::new("people", "1")));

        std::thread::sleep(Duration::from_millis(40));
        assert!(!map.contains(&Reference::new("people", "1")));
        assert!(map.get_all_of_type("people").is_empty());
        assert_eq!(map.len(), 1);

        assert_eq!(map.purge_expired(), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn test_purge_without_ttl_is_noop() {
        let mut map = IdentityMap::new();
        map.put(record("people", "1", 1));
        assert_eq!(map.purge_expired(), 0);
        assert_eq!(map.len(), 1);
    }
}
