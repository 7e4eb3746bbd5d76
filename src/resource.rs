//! Typed resources
//!
//! [`Resource`] is the capability every in-memory resource provides: an
//! identity, a way back to wire form, and a hook for typed downcasts out of
//! the identity map. [`Record`] is the stock implementation, generic over
//! an attribute struct.

use crate::error::{Error, Result};
use crate::reference::{Relationship, ResourceIdentity};
use crate::wire::{Object, WireRelationship, WireResource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Named relationship fields of a resource
pub type Relationships = BTreeMap<String, Relationship>;

/// Behaviour shared by every in-memory resource
pub trait Resource: Any + Send + Sync + fmt::Debug {
    fn identity(&self) -> &ResourceIdentity;

    /// View discriminator the resource was built from, if any
    fn view(&self) -> Option<&str> {
        None
    }

    fn relationships(&self) -> Option<&Relationships> {
        None
    }

    /// Convert back to wire form for outgoing requests
    fn to_wire(&self) -> Result<WireResource>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Attribute payloads usable inside a [`Record`]
pub trait Attributes: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {}

impl<T> Attributes for T where T: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {}

/// Resource with typed attributes and parsed relationships
#[derive(Debug, Clone, PartialEq)]
pub struct Record<A> {
    pub identity: ResourceIdentity,
    pub view: Option<String>,
    pub attributes: A,
    pub relationships: Relationships,
    pub links: Option<Object>,
}

impl<A> Record<A> {
    pub fn new(resource_type: &str, id: &str, attributes: A) -> Self {
        Self {
            identity: ResourceIdentity::new(resource_type, id),
            view: None,
            attributes,
            relationships: Relationships::new(),
            links: None,
        }
    }

    pub fn with_view(mut self, view: &str) -> Self {
        self.view = Some(view.to_string());
        self
    }

    pub fn with_relationship(mut self, name: &str, relationship: Relationship) -> Self {
        self.relationships.insert(name.to_string(), relationship);
        self
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }
}

impl<A: Attributes> Record<A> {
    /// Build from a wire element. Missing attributes deserialize from an
    /// empty object.
    pub fn from_wire(wire: WireResource) -> Result<Self> {
        let identity = ResourceIdentity::new(&wire.resource_type, &wire.id);
        let factory_error = |source| Error::Factory {
            identity: identity.clone(),
            source,
        };

        let attributes =
            serde_json::from_value(Value::Object(wire.attributes.unwrap_or_default()))
                .map_err(factory_error)?;

        let mut relationships = Relationships::new();
        for (name, value) in wire.relationships.unwrap_or_default() {
            let member: WireRelationship =
                serde_json::from_value(value).map_err(factory_error)?;
            relationships.insert(name, Relationship::from_wire(&member));
        }

        Ok(Self {
            identity,
            view: wire.view,
            attributes,
            relationships,
            links: wire.links,
        })
    }
}

impl<A: Attributes> Resource for Record<A> {
    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    fn relationships(&self) -> Option<&Relationships> {
        Some(&self.relationships)
    }

    fn to_wire(&self) -> Result<WireResource> {
        let encode_error = |source| Error::Encode {
            identity: self.identity.clone(),
            source,
        };

        let attributes = match serde_json::to_value(&self.attributes).map_err(encode_error)? {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(encode_error(serde::ser::Error::custom(format!(
                    "attributes must encode to an object, got {}",
                    other
                ))))
            }
        };

        let relationships = if self.relationships.is_empty() {
            None
        } else {
            let mut map = Map::new();
            for (name, relationship) in &self.relationships {
                let value = serde_json::to_value(relationship.to_wire()).map_err(encode_error)?;
                map.insert(name.clone(), value);
            }
            Some(map)
        };

        Ok(WireResource {
            id: self.identity.id.clone(),
            resource_type: self.identity.resource_type.clone(),
            view: self.view.clone(),
            attributes,
            relationships,
            links: self.links.clone(),
            meta: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
