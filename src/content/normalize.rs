//! View-models handed to the pages
//!
//! The projections here are the information-hiding boundary between the
//! content API and rendering: only the listed fields survive, everything
//! else on a raw document is dropped.

use serde::{Deserialize, Serialize};

use super::document::{ContentSection, RawDocument, ResponsePage};
use crate::richtext;

/// A post as shown in the listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPost {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: ListPostData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPostData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
}

/// One page of the listing plus the cursor to the next one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPagination {
    /// `None` once the last page has been loaded
    pub next_page: Option<String>,
    pub results: Vec<ListPost>,
}

impl PostPagination {
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// A post as shown on its own page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailPost {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: DetailPostData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailPostData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: BannerView,
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BannerView {
    pub url: Option<String>,
}

impl DetailPost {
    /// Words in every heading and body block
    pub fn word_count(&self) -> usize {
        self.data
            .content
            .iter()
            .map(|section| {
                let heading = section
                    .heading
                    .as_deref()
                    .map(|h| h.split_whitespace().count())
                    .unwrap_or(0);
                heading + richtext::as_text(&section.body).split_whitespace().count()
            })
            .sum()
    }

    /// Estimated reading time in whole minutes, rounded up
    pub fn reading_minutes(&self, words_per_minute: usize) -> usize {
        self.word_count().div_ceil(words_per_minute.max(1))
    }
}

/// Project a search response onto the listing view-model
pub fn normalize_list_page(page: ResponsePage) -> PostPagination {
    PostPagination {
        next_page: page.next_page,
        results: page.results.into_iter().map(list_post).collect(),
    }
}

fn list_post(doc: RawDocument) -> ListPost {
    ListPost {
        uid: doc.uid,
        first_publication_date: doc.first_publication_date,
        data: ListPostData {
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        },
    }
}

/// Project a single document onto the detail view-model
pub fn normalize_detail(doc: RawDocument) -> DetailPost {
    DetailPost {
        uid: doc.uid,
        first_publication_date: doc.first_publication_date,
        data: DetailPostData {
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
            banner: BannerView {
                url: doc.data.banner.and_then(|b| b.url),
            },
            content: doc.data.content.unwrap_or_default(),
        },
    }
}
