//! Typed documents as returned by the Prismic REST API
//!
//! Decoding goes through serde, so a body that does not fit this schema is
//! rejected at the adapter boundary as [`ContentError::MalformedResponse`]
//! instead of leaking half-read values into the pages. Fields the blog reads
//! are all optional: a document that simply lacks one still decodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ContentResult;
use crate::richtext::RichTextNode;

/// A single document from the content repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Repository-wide document id
    pub id: String,

    /// Unique identifier within the custom type (the slug)
    #[serde(default)]
    pub uid: Option<String>,

    /// Custom type name, e.g. `post`
    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// ISO-8601 timestamp, `None` for documents never published
    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub data: DocumentData,
}

impl RawDocument {
    /// Decode one document from a JSON body
    pub fn from_json(bytes: &[u8]) -> ContentResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Custom fields of a post document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<Banner>,
    pub content: Option<Vec<ContentSection>>,

    /// Any other custom field, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image field; Prismic sends `{}` for an empty image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// One group of the `content` repeatable zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub heading: Option<String>,
    pub body: Vec<RichTextNode>,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub results_size: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,

    /// Absolute URL of the next page, `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,

    pub results: Vec<RawDocument>,
}

impl ResponsePage {
    /// Decode a search response body
    pub fn from_json(bytes: &[u8]) -> ContentResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
