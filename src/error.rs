//! Error types
//!
//! Every failure the data-access layer can surface to a caller. Transport
//! failures stay opaque; everything else is described precisely enough for
//! a caller to decide whether to retry, report, or give up.

use crate::document::Cardinality;
use crate::reference::ResourceIdentity;
use crate::wire::ApiError;

/// Errors raised while fetching, wrapping or composing documents
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or parse failure reported by the transport collaborator
    #[error("transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// Well-formed response with an unexpected status and an `errors` payload
    #[error("request failed with status {status}: {}", summarize_errors(.errors))]
    Api { status: u16, errors: Vec<ApiError> },

    /// Unexpected status without any `errors` payload
    #[error("unexpected status {status} (expected {expected:?})")]
    UnexpectedStatus { status: u16, expected: Vec<u16> },

    /// No factory is bound for a resource type (or its view)
    #[error("no model registered for type '{resource_type}'{}", view_suffix(.view))]
    UnregisteredType {
        resource_type: String,
        view: Option<String>,
    },

    /// A bound factory rejected the wire element
    #[error("failed to build resource {identity}: {source}")]
    Factory {
        identity: ResourceIdentity,
        #[source]
        source: serde_json::Error,
    },

    /// A resource could not be converted back to wire form
    #[error("failed to encode resource {identity}: {source}")]
    Encode {
        identity: ResourceIdentity,
        #[source]
        source: serde_json::Error,
    },

    /// The primary data shape does not match the requested cardinality
    #[error("expected {expected:?} document, found {found:?}")]
    CardinalityMismatch {
        expected: Cardinality,
        found: Cardinality,
    },

    /// Merge is only defined for collection documents
    #[error("only collection documents can be merged")]
    MergeUnsupported,

    /// Base URL or request path could not be turned into a URL
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A success response whose body is not a wire document
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors carried by an API failure, empty for every other variant
    pub fn api_errors(&self) -> &[ApiError] {
        match self {
            Error::Api { errors, .. } => errors,
            _ => &[],
        }
    }

    /// HTTP status associated with this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn summarize_errors(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ApiError::summary)
        .collect::<Vec<_>>()
        .join("; ")
}

fn view_suffix(view: &Option<String>) -> String {
    match view {
        Some(view) => format!(" (view '{}')", view),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_lists_every_error() {
        let err = Error::Api {
            status: 404,
            errors: vec![
                ApiError {
                    title: Some("Not Found".to_string()),
                    detail: Some("article 7 does not exist".to_string()),
                    ..Default::default()
                },
                ApiError {
                    code: Some("gone".to_string()),
                    ..Default::default()
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("article 7 does not exist"));
        assert!(message.contains("gone"));
        assert_eq!(err.api_errors().len(), 2);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_unregistered_type_mentions_view() {
        let err = Error::UnregisteredType {
            resource_type: "people".to_string(),
            view: Some("compact".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "no model registered for type 'people' (view 'compact')"
        );
        assert!(err.api_errors().is_empty());
        assert_eq!(err.status(), None);
    }
}
