//! Errors raised at the content API boundary

use thiserror::Error;

/// Failure of a content repository operation
#[derive(Debug, Error)]
pub enum ContentError {
    /// No document of the given type carries the requested uid
    #[error("no {doc_type} document with uid {uid:?}")]
    NotFound { doc_type: String, uid: String },

    /// The request never produced a usable HTTP response
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The response body did not match the document schema
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ContentError {
    pub fn not_found(doc_type: &str, uid: &str) -> Self {
        ContentError::NotFound {
            doc_type: doc_type.to_string(),
            uid: uid.to_string(),
        }
    }

    /// Whether this error means the slug does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ContentError::MalformedResponse(err.to_string())
        } else {
            ContentError::NetworkFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        ContentError::MalformedResponse(err.to_string())
    }
}

pub type ContentResult<T> = Result<T, ContentError>;
