//! Error handling for catalog API operations.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::ProductId;

/// Coarse classification of a [`CatalogClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request did not produce a successful response.
    Network,
    /// The response body was malformed or not what the endpoint promises.
    Parse,
    /// A single-record lookup found nothing.
    NotFound,
}

/// Common error type for catalog API operations.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("could not reach the catalog at {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog responded with {status} for {url}")]
    UnexpectedStatus { url: String, status: StatusCode },
    #[error("could not parse catalog response from {url}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("'{0}' is not a known category")]
    UnknownCategory(String),
    #[error("product {0} not found")]
    NotFound(ProductId),
    #[error("invalid catalog request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogClientError::Transport { .. }
            | CatalogClientError::UnexpectedStatus { .. }
            | CatalogClientError::InvalidRequest(_)
            | CatalogClientError::Other(_) => ErrorKind::Network,
            CatalogClientError::Parse { .. } | CatalogClientError::UnknownCategory(_) => {
                ErrorKind::Parse
            },
            CatalogClientError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// The HTTP status the catalog answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CatalogClientError::UnexpectedStatus { status, .. } => Some(*status),
            CatalogClientError::Transport { source, .. } => source.status(),
            CatalogClientError::NotFound(_) | CatalogClientError::UnknownCategory(_) => {
                Some(StatusCode::NOT_FOUND)
            },
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the mock data variable
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}
