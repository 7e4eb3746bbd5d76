//! Wire format
//!
//! Serde models of the documents exchanged with the server. These are the
//! untyped shapes; typed resources are produced from them by the model
//! registry.

use crate::pagination::Pagination;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form JSON object (meta, links, attributes)
pub type Object = Map<String, Value>;

/// Top-level wire document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<WireResource>>,
    #[serde(
        default,
        deserialize_with = "lenient_errors",
        skip_serializing_if = "Option::is_none"
    )]
    pub errors: Option<Vec<ApiError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Object>,
}

/// Servers disagree on error member types (`"status": 404` vs `"404"`), so
/// each element is decoded on its own and never fails the document.
fn lenient_errors<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<ApiError>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(errors_from_value))
}

/// Decode an `errors` member leniently. `null` is absent; a lone object is
/// treated as a one-element array.
pub fn errors_from_value(value: Value) -> Option<Vec<ApiError>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.into_iter().map(ApiError::from_value).collect()),
        other => Some(vec![ApiError::from_value(other)]),
    }
}

impl WireDocument {
    /// Pagination reported under `meta.pagination`, if present and valid.
    ///
    /// Absent or malformed metadata yields `None`, which callers treat as
    /// "no further pages".
    pub fn pagination(&self) -> Option<Pagination> {
        self.meta.as_ref().and_then(Pagination::from_meta)
    }

    /// Errors array, empty when absent
    pub fn errors(&self) -> &[ApiError] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// Primary data: a single resource or a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<WireResource>),
    One(Box<WireResource>),
}

/// One resource object as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Object>,
}

impl WireResource {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            view: None,
            attributes: None,
            relationships: None,
            links: None,
            meta: None,
        }
    }
}

/// `(type, id)` pair used inside relationship payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

/// Linkage data of one relationship member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
}

/// One relationship member of a resource object.
///
/// `data: null` and a missing `data` key both mean the relationship holds
/// no reference at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireRelationship {
    #[serde(default)]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Object>,
}

/// Error object from an `errors` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Object>,
}

impl ApiError {
    /// Decode one error element without failing. Text members also accept
    /// numbers and booleans; anything else unusable is dropped. A non-object
    /// element is kept as the `detail`.
    pub fn from_value(value: Value) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Self {
                    detail: Some(scalar_text(other.clone()).unwrap_or_else(|| other.to_string())),
                    ..Default::default()
                }
            }
        };

        Self {
            id: take_text(&mut object, "id"),
            status: take_text(&mut object, "status"),
            code: take_text(&mut object, "code"),
            title: take_text(&mut object, "title"),
            detail: take_text(&mut object, "detail"),
            source: object.remove("source").filter(|v| !v.is_null()),
            meta: match object.remove("meta") {
                Some(Value::Object(meta)) => Some(meta),
                _ => None,
            },
        }
    }

    /// Short human-readable form: detail, else title, else code
    pub fn summary(&self) -> String {
        self.detail
            .as_deref()
            .or(self.title.as_deref())
            .or(self.code.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }
}

fn take_text(object: &mut Object, key: &str) -> Option<String> {
    object.remove(key).and_then(scalar_text)
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
