//! Model Registry - dispatch from resource type to factory
//!
//! Maps a wire `type` (and optionally a `view` discriminator) to the factory
//! that turns wire elements of that type into typed resources. Populate it
//! once before fetching; it is read-only while documents are being wrapped.

use crate::error::{Error, Result};
use crate::resource::{Attributes, Record, Resource};
use crate::wire::WireResource;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Produces a typed resource from wire data
pub trait ResourceFactory: Send + Sync {
    /// Wire `type` this factory handles
    fn resource_type(&self) -> &str;

    /// View discriminator this factory is specific to, if any
    fn view(&self) -> Option<&str> {
        None
    }

    fn build(&self, wire: WireResource) -> Result<Arc<dyn Resource>>;
}

/// Factory building [`Record<A>`] values
pub struct RecordFactory<A> {
    resource_type: String,
    view: Option<String>,
    _attributes: PhantomData<fn() -> A>,
}

impl<A> RecordFactory<A> {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            view: None,
            _attributes: PhantomData,
        }
    }

    /// Factory used only for elements carrying this `view`
    pub fn for_view(resource_type: &str, view: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            view: Some(view.to_string()),
            _attributes: PhantomData,
        }
    }
}

impl<A: Attributes> ResourceFactory for RecordFactory<A> {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    fn build(&self, wire: WireResource) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(Record::<A>::from_wire(wire)?))
    }
}

/// Factory backed by a closure
pub struct FnFactory<F> {
    resource_type: String,
    view: Option<String>,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(WireResource) -> Result<Arc<dyn Resource>> + Send + Sync,
{
    pub fn new(resource_type: &str, build: F) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            view: None,
            build,
        }
    }

    pub fn for_view(resource_type: &str, view: &str, build: F) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            view: Some(view.to_string()),
            build,
        }
    }
}

impl<F> ResourceFactory for FnFactory<F>
where
    F: Fn(WireResource) -> Result<Arc<dyn Resource>> + Send + Sync,
{
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    fn build(&self, wire: WireResource) -> Result<Arc<dyn Resource>> {
        (self.build)(wire)
    }
}

/// Registry of resource factories
#[derive(Clone, Default)]
pub struct ModelRegistry {
    types: HashMap<String, Arc<dyn ResourceFactory>>,
    views: HashMap<(String, String), Arc<dyn ResourceFactory>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a factory. A later registration for the same type (and view)
    /// replaces the earlier one.
    pub fn register<F: ResourceFactory + 'static>(&mut self, factory: F) -> &mut Self {
        let resource_type = factory.resource_type().to_string();
        let factory: Arc<dyn ResourceFactory> = Arc::new(factory);
        let replaced = match factory.view() {
            Some(view) => self
                .views
                .insert((resource_type.clone(), view.to_string()), factory.clone())
                .is_some(),
            None => self
                .types
                .insert(resource_type.clone(), factory.clone())
                .is_some(),
        };
        if replaced {
            tracing::warn!("Replaced model registration for type '{}'", resource_type);
        }
        self
    }

    /// Shorthand for registering a [`RecordFactory`]
    pub fn register_record<A: Attributes>(&mut self, resource_type: &str) -> &mut Self {
        self.register(RecordFactory::<A>::new(resource_type))
    }

    /// Find the factory for a type, preferring a view-specific binding
    pub fn resolve(&self, resource_type: &str, view: Option<&str>) -> Option<&Arc<dyn ResourceFactory>> {
        view.and_then(|view| {
            self.views
                .get(&(resource_type.to_string(), view.to_string()))
        })
        .or_else(|| self.types.get(resource_type))
    }

    /// Dispatch one wire element. A miss is an error.
    pub fn build(&self, wire: WireResource) -> Result<Arc<dyn Resource>> {
        let Some(factory) = self.resolve(&wire.resource_type, wire.view.as_deref()) else {
            return Err(Error::UnregisteredType {
                resource_type: wire.resource_type,
                view: wire.view,
            });
        };
        factory.build(wire)
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.types.contains_key(resource_type)
            || self.views.keys().any(|(t, _)| t == resource_type)
    }

    /// All registered types (for diagnostics)
    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .types
            .keys()
            .map(String::as_str)
            .chain(self.views.keys().map(|(t, _)| t.as_str()))
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("types", &self.registered_types())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ResourceIdentity;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    #[derive(Debug, Serialize, Deserialize)]
    struct Person {
        name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct PersonCard {
        initials: String,
    }

    fn wire(value: Value) -> WireResource {
        serde_json::from_value(value).unwrap()
    }

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register_record::<Person>("people")
            .register(RecordFactory::<PersonCard>::for_view("people", "card"));
        registry
    }

    #[test]
    fn test_type_level_dispatch() {
        let resource = registry()
            .build(wire(json!({"id": "1", "type": "people", "attributes": {"name": "Ada"}})))
            .unwrap();
        let person = resource.as_any().downcast_ref::<Record<Person>>().unwrap();
        assert_eq!(person.attributes.name, "Ada");
    }

    #[test]
    fn test_view_specific_dispatch() {
        let resource = registry()
            .build(wire(json!({
                "id": "1", "type": "people", "view": "card",
                "attributes": {"initials": "AL"}
            })))
            .unwrap();
        assert!(resource.as_any().is::<Record<PersonCard>>());
        assert_eq!(resource.view(), Some("card"));
    }

    #[test]
    fn test_unknown_view_falls_back_to_type() {
        let resource = registry()
            .build(wire(json!({
                "id": "1", "type": "people", "view": "detailed",
                "attributes": {"name": "Ada"}
            })))
            .unwrap();
        assert!(resource.as_any().is::<Record<Person>>());
    }

    #[test]
    fn test_miss_is_fatal() {
        let err = registry()
            .build(wire(json!({"id": "1", "type": "comments"})))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnregisteredType { ref resource_type, view: None } if resource_type == "comments"
        ));
    }

    #[test]
    fn test_view_only_registration_misses_plain_elements() {
        let mut registry = ModelRegistry::new();
        registry.register(RecordFactory::<PersonCard>::for_view("people", "card"));
        assert!(registry.contains("people"));
        assert!(registry.resolve("people", None).is_none());
        assert!(registry.resolve("people", Some("card")).is_some());
    }

    #[test]
    fn test_closure_factory() {
        let mut registry = ModelRegistry::new();
        registry.register(FnFactory::new("tags", |wire: WireResource| {
            let resource: Arc<dyn Resource> =
                Arc::new(Record::new(&wire.resource_type, &wire.id, Value::Null));
            Ok(resource)
        }));

        let resource = registry
            .build(wire(json!({"id": "x", "type": "tags"})))
            .unwrap();
        assert_eq!(resource.identity(), &ResourceIdentity::new("tags", "x"));
    }

    #[test]
    fn test_registered_types_are_sorted_and_unique() {
        assert_eq!(registry().registered_types(), vec!["people"]);
    }
}
