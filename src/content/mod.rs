//! Content module - fetches documents from the content API and maps them to view-models

mod client;
mod document;
mod error;
pub mod memory;
mod normalize;
pub mod query;

pub use client::{ContentRepository, PrismicClient};
pub use document::{Banner, ContentSection, DocumentData, RawDocument, ResponsePage};
pub use error::{ContentError, ContentResult};
pub use memory::MemoryRepository;
pub use normalize::{
    normalize_detail, normalize_list_page, BannerView, DetailPost, DetailPostData, ListPost,
    ListPostData, PostPagination,
};
pub use query::{Ordering, Predicate, QueryOptions};
