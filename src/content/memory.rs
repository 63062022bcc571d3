//! In-memory content repository
//!
//! Evaluates queries over a fixed document set with the same paging
//! behaviour as the remote API, including fetchable `next_page` URLs.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::ContentRepository;
use super::document::{RawDocument, ResponsePage};
use super::error::{ContentError, ContentResult};
use super::query::{data_field, Direction, Ordering, Predicate, QueryOptions};

const PAGE_URL_PREFIX: &str = "memory://search/";

/// Page size the API applies when none is requested
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A repository backed by a vector of documents
pub struct MemoryRepository {
    documents: Vec<RawDocument>,
    /// Every query served, indexed by the id in its `next_page` URLs.
    /// Entries are never evicted; this is a fixture for short-lived runs.
    queries: Mutex<Vec<(Vec<Predicate>, QueryOptions)>>,
    calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            queries: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of repository calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn remember(&self, predicates: &[Predicate], options: &QueryOptions) -> usize {
        let mut queries = self.queries.lock().unwrap_or_else(|e| e.into_inner());
        queries.push((predicates.to_vec(), options.clone()));
        queries.len() - 1
    }

    fn run(&self, query_id: usize, predicates: &[Predicate], options: &QueryOptions) -> ResponsePage {
        let mut matched: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|doc| predicates.iter().all(|p| p.matches(doc)))
            .collect();

        // Stable sorts, least significant key first
        for ordering in options.orderings.iter().rev() {
            matched.sort_by(|a, b| compare(a, b, ordering));
        }

        let size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1) as usize;
        let page = options.page.unwrap_or(1).max(1) as usize;
        let total = matched.len();
        let total_pages = total.div_ceil(size);

        let results: Vec<RawDocument> = matched
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect();

        let page_url = |n: usize| format!("{}{}?page={}", PAGE_URL_PREFIX, query_id, n);

        ResponsePage {
            page: page as u32,
            results_per_page: size as u32,
            results_size: results.len() as u32,
            total_results_size: total as u32,
            total_pages: total_pages as u32,
            next_page: (page < total_pages).then(|| page_url(page + 1)),
            prev_page: (page > 1).then(|| page_url(page - 1)),
            results,
        }
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> ContentResult<ResponsePage> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let id = self.remember(predicates, options);
        Ok(self.run(id, predicates, options))
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> ContentResult<RawDocument> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.documents
            .iter()
            .find(|doc| doc.doc_type == doc_type && doc.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| ContentError::not_found(doc_type, uid))
    }

    async fn fetch_page(&self, url: &str) -> ContentResult<ResponsePage> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let unreachable = || ContentError::NetworkFailure(format!("cannot fetch {}", url));

        let rest = url.strip_prefix(PAGE_URL_PREFIX).ok_or_else(unreachable)?;
        let (id, page) = rest.split_once("?page=").ok_or_else(unreachable)?;
        let id: usize = id.parse().map_err(|_| unreachable())?;
        let page: u32 = page.parse().map_err(|_| unreachable())?;

        let stored = {
            let queries = self.queries.lock().unwrap_or_else(|e| e.into_inner());
            queries.get(id).cloned()
        };
        let (predicates, options) = stored.ok_or_else(unreachable)?;
        Ok(self.run(id, &predicates, &options.page(page)))
    }
}

fn compare(a: &RawDocument, b: &RawDocument, ordering: &Ordering) -> CmpOrdering {
    let ord = sort_key(a, &ordering.field).cmp(&sort_key(b, &ordering.field));
    match ordering.direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}

fn sort_key(doc: &RawDocument, field: &str) -> Option<String> {
    match field {
        "document.first_publication_date" => doc.first_publication_date.clone(),
        "document.last_publication_date" => doc.last_publication_date.clone(),
        "document.id" => Some(doc.id.clone()),
        _ => {
            let mut parts = field.splitn(3, '.');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("my"), Some(_), Some(name)) => data_field(doc, name),
                _ => None,
            }
        }
    }
}
