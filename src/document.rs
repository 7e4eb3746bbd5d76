//! Documents
//!
//! A [`Document`] is the typed view of one response: its cardinality, the
//! primary resources, side-loaded (`included`) resources and the meta,
//! links and errors carried through verbatim. Collection documents from
//! successive pages combine with [`Document::merge`].

use crate::error::{Error, Result};
use crate::identity_map::IdentityMap;
use crate::pagination::Pagination;
use crate::reference::Reference;
use crate::registry::ModelRegistry;
use crate::resource::Resource;
use crate::wire::{ApiError, Object, PrimaryData, WireDocument};
use std::collections::HashSet;
use std::sync::Arc;

/// Whether the primary data is one resource or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Typed, normalized response document
#[derive(Debug, Clone)]
pub struct Document {
    cardinality: Cardinality,
    data: Option<Vec<Arc<dyn Resource>>>,
    included: Option<Vec<Arc<dyn Resource>>>,
    meta: Option<Object>,
    links: Option<Object>,
    errors: Option<Vec<ApiError>>,
}

impl Document {
    /// Document with no primary data yet
    pub fn empty(cardinality: Cardinality) -> Self {
        Self {
            cardinality,
            data: None,
            included: None,
            meta: None,
            links: None,
            errors: None,
        }
    }

    pub fn one(resource: Arc<dyn Resource>) -> Self {
        Self {
            data: Some(vec![resource]),
            ..Self::empty(Cardinality::One)
        }
    }

    pub fn many(resources: Vec<Arc<dyn Resource>>) -> Self {
        Self {
            data: Some(resources),
            ..Self::empty(Cardinality::Many)
        }
    }

    pub fn with_included(mut self, included: Vec<Arc<dyn Resource>>) -> Self {
        self.included = Some(included);
        self
    }

    pub fn with_meta(mut self, meta: Object) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Build a typed document from wire form.
    ///
    /// Every element of `data` and `included` goes through `registry`; any
    /// element without a factory fails the whole call. When `data` is
    /// present its shape must match `expected`.
    pub fn wrap(wire: WireDocument, expected: Cardinality, registry: &ModelRegistry) -> Result<Self> {
        let data = match wire.data {
            None => None,
            Some(PrimaryData::One(resource)) => {
                if expected != Cardinality::One {
                    return Err(Error::CardinalityMismatch {
                        expected,
                        found: Cardinality::One,
                    });
                }
                Some(vec![registry.build(*resource)?])
            }
            Some(PrimaryData::Many(resources)) => {
                if expected != Cardinality::Many {
                    return Err(Error::CardinalityMismatch {
                        expected,
                        found: Cardinality::Many,
                    });
                }
                Some(
                    resources
                        .into_iter()
                        .map(|resource| registry.build(resource))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
        };

        let included = wire
            .included
            .map(|resources| {
                resources
                    .into_iter()
                    .map(|resource| registry.build(resource))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(Self {
            cardinality: expected,
            data,
            included,
            meta: wire.meta,
            links: wire.links,
            errors: wire.errors,
        })
    }

    /// Combine two pages of the same collection into a new document.
    ///
    /// `data` and `included` are concatenated in argument order without
    /// de-duplication; meta and links are kept from `self`, errors from
    /// both.
    pub fn merge(&self, other: &Document) -> Result<Document> {
        if self.cardinality != Cardinality::Many || other.cardinality != Cardinality::Many {
            return Err(Error::MergeUnsupported);
        }

        Ok(Document {
            cardinality: Cardinality::Many,
            data: concat(&self.data, &other.data),
            included: concat(&self.included, &other.included),
            meta: self.meta.clone(),
            links: self.links.clone(),
            errors: concat(&self.errors, &other.errors),
        })
    }

    /// Append every page to `self` in order, in one pass.
    ///
    /// Same result as folding [`merge`](Self::merge) over `pages`, without
    /// copying the accumulated vectors at each step.
    pub fn merge_all<I>(mut self, pages: I) -> Result<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        if self.cardinality != Cardinality::Many {
            return Err(Error::MergeUnsupported);
        }

        for page in pages {
            if page.cardinality != Cardinality::Many {
                return Err(Error::MergeUnsupported);
            }
            append(&mut self.data, page.data);
            append(&mut self.included, page.included);
            append(&mut self.errors, page.errors);
        }
        Ok(self)
    }

    /// Primary data back in wire form, for create/update requests
    pub fn unwrap(&self) -> Result<WireDocument> {
        let data = match (&self.data, self.cardinality) {
            (None, _) => None,
            (Some(resources), Cardinality::One) => match resources.first() {
                Some(resource) => Some(PrimaryData::One(Box::new(resource.to_wire()?))),
                None => None,
            },
            (Some(resources), Cardinality::Many) => Some(PrimaryData::Many(
                resources
                    .iter()
                    .map(|resource| resource.to_wire())
                    .collect::<Result<Vec<_>>>()?,
            )),
        };

        Ok(WireDocument {
            data,
            ..Default::default()
        })
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// True once primary data has been received
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Primary resources in order (zero or one for a single document)
    pub fn resources(&self) -> std::slice::Iter<'_, Arc<dyn Resource>> {
        self.data.as_deref().unwrap_or_default().iter()
    }

    /// The resource of a single-resource document
    pub fn primary(&self) -> Option<&Arc<dyn Resource>> {
        match self.cardinality {
            Cardinality::One => self.data.as_ref()?.first(),
            Cardinality::Many => None,
        }
    }

    /// Number of primary resources
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn included(&self) -> &[Arc<dyn Resource>] {
        self.included.as_deref().unwrap_or_default()
    }

    pub fn meta(&self) -> Option<&Object> {
        self.meta.as_ref()
    }

    pub fn links(&self) -> Option<&Object> {
        self.links.as_ref()
    }

    pub fn errors(&self) -> &[ApiError] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Pagination reported in `meta`, if any
    pub fn pagination(&self) -> Option<Pagination> {
        self.meta.as_ref().and_then(Pagination::from_meta)
    }

    /// Fresh identity map holding this document's resources
    pub fn to_identity_map(&self) -> IdentityMap {
        let mut map = IdentityMap::new();
        map.deposit(self);
        map
    }

    /// References held by this document's resources that `map` cannot
    /// resolve, each reported once in first-seen order
    pub fn dangling_references(&self, map: &IdentityMap) -> Vec<Reference> {
        let mut seen = HashSet::new();
        self.resources()
            .chain(self.included())
            .filter_map(|resource| resource.relationships())
            .flat_map(|relationships| relationships.values())
            .flat_map(|relationship| relationship.references())
            .filter(|reference| !map.contains(reference))
            .filter(|reference| seen.insert((*reference).clone()))
            .cloned()
            .collect()
    }
}

fn concat<T: Clone>(first: &Option<Vec<T>>, second: &Option<Vec<T>>) -> Option<Vec<T>> {
    match (first, second) {
        (None, None) => None,
        _ => {
            let mut joined = first.clone().unwrap_or_default();
            joined.extend(second.iter().flatten().cloned());
            Some(joined)
        }
    }
}

fn append<T>(target: &mut Option<Vec<T>>, source: Option<Vec<T>>) {
    if let Some(items) = source {
        target.get_or_insert_with(Vec::new).extend(items);
    }
}
