//! References between resources
//!
//! A [`Reference`] names a resource by identity only. It never owns or
//! points at the target; resolution is an explicit lookup against an
//! [`IdentityMap`] supplied at the point of use, so the same reference can be
//! resolved against different graphs and two resources referencing each
//! other never form a cycle.

use crate::identity_map::IdentityMap;
use crate::resource::Resource;
use crate::wire::{Linkage, ResourceIdentifier, WireRelationship};
use std::fmt;
use std::sync::Arc;

/// `(type, id)` pair naming one logical resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentity {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

impl From<&ResourceIdentifier> for ResourceIdentity {
    fn from(identifier: &ResourceIdentifier) -> Self {
        Self::new(&identifier.resource_type, &identifier.id)
    }
}

/// Pointer to a resource by identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    identity: ResourceIdentity,
}

impl Reference {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            identity: ResourceIdentity::new(resource_type, id),
        }
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    pub fn resource_type(&self) -> &str {
        &self.identity.resource_type
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    /// Look the target up in `map`. A miss is not an error.
    pub fn resolve(&self, map: &IdentityMap) -> Option<Arc<dyn Resource>> {
        map.get(self)
    }

    /// Like [`resolve`](Self::resolve), downcast to a concrete type
    pub fn resolve_as<T: Resource>(&self, map: &IdentityMap) -> Option<Arc<T>> {
        map.get_as::<T>(self)
    }

    pub fn to_identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            resource_type: self.identity.resource_type.clone(),
            id: self.identity.id.clone(),
        }
    }
}

impl From<ResourceIdentity> for Reference {
    fn from(identity: ResourceIdentity) -> Self {
        Self { identity }
    }
}

impl From<&ResourceIdentifier> for Reference {
    fn from(identifier: &ResourceIdentifier) -> Self {
        Self {
            identity: identifier.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}

/// One relationship field of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    /// Optional single reference. `None` means the relationship is empty,
    /// which is different from a reference whose target is not loaded.
    ToOne(Option<Reference>),
    ToMany(Vec<Reference>),
}

impl Relationship {
    pub fn from_wire(wire: &WireRelationship) -> Self {
        match &wire.data {
            None => Relationship::ToOne(None),
            Some(Linkage::One(identifier)) => Relationship::ToOne(Some(identifier.into())),
            Some(Linkage::Many(identifiers)) => {
                Relationship::ToMany(identifiers.iter().map(Reference::from).collect())
            }
        }
    }

    pub fn to_wire(&self) -> WireRelationship {
        let data = match self {
            Relationship::ToOne(reference) => {
                reference.as_ref().map(|r| Linkage::One(r.to_identifier()))
            }
            Relationship::ToMany(references) => Some(Linkage::Many(
                references.iter().map(Reference::to_identifier).collect(),
            )),
        };
        WireRelationship {
            data,
            ..Default::default()
        }
    }

    /// All references held, in order
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Relationship::ToOne(reference) => reference.iter().collect(),
            Relationship::ToMany(references) => references.iter().collect(),
        }
    }

    /// Resolve each reference against `map`, keeping misses as `None`.
    pub fn resolve(&self, map: &IdentityMap) -> Vec<Option<Arc<dyn Resource>>> {
        self.references()
            .into_iter()
            .map(|reference| reference.resolve(map))
            .collect()
    }

    /// Target of a to-one relationship; `None` when empty, unresolved, or
    /// called on a to-many relationship.
    pub fn resolve_one(&self, map: &IdentityMap) -> Option<Arc<dyn Resource>> {
        match self {
            Relationship::ToOne(reference) => reference.as_ref()?.resolve(map),
            Relationship::ToMany(_) => None,
        }
    }
}
