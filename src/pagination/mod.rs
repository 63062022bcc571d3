//! Incremental "load more" pagination over the post listing
//!
//! [`PostListController`] is the synchronous state machine: it hands out at
//! most one [`PageRequest`] at a time and only applies the result that
//! carries the current ticket. [`IncrementalList`] drives it against a
//! [`ContentRepository`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::content::{
    normalize_list_page, ContentError, ContentRepository, ContentResult, ListPost,
    PostPagination, ResponsePage,
};

/// Identifies one outstanding page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// A page fetch the caller should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub ticket: Ticket,
}

/// Answer to a load-more trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMore {
    Request(PageRequest),
    /// No further page exists
    Exhausted,
    /// A request is already in flight
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Loading(Ticket),
}

/// Accumulated posts plus the cursor to the next page
#[derive(Debug)]
pub struct PostListController {
    posts: Vec<ListPost>,
    next_page: Option<String>,
    state: State,
    issued: u64,
}

impl PostListController {
    /// Start from the listing's initial props
    pub fn new(initial: PostPagination) -> Self {
        Self {
            posts: initial.results,
            next_page: initial.next_page,
            state: State::Idle,
            issued: 0,
        }
    }

    pub fn posts(&self) -> &[ListPost] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Loading(_))
    }

    /// Trigger the next page
    pub fn load_more(&mut self) -> LoadMore {
        if self.is_loading() {
            return LoadMore::Busy;
        }
        let Some(url) = self.next_page.clone() else {
            return LoadMore::Exhausted;
        };

        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.state = State::Loading(ticket);
        LoadMore::Request(PageRequest { url, ticket })
    }

    /// Apply a fetched page. Returns false when the ticket is stale and the
    /// page was discarded.
    pub fn complete(&mut self, ticket: Ticket, page: ResponsePage) -> bool {
        if self.state != State::Loading(ticket) {
            tracing::debug!("Discarding page for stale ticket {:?}", ticket);
            return false;
        }

        let page = normalize_list_page(page);
        self.posts.extend(page.results);
        self.next_page = page.next_page;
        self.state = State::Idle;
        true
    }

    /// Give up on a failed request, keeping posts and cursor
    pub fn fail(&mut self, ticket: Ticket) -> bool {
        if self.state != State::Loading(ticket) {
            return false;
        }
        self.state = State::Idle;
        true
    }

    /// Drop the outstanding request; its result will be discarded
    pub fn cancel(&mut self) {
        if let State::Loading(ticket) = self.state {
            tracing::debug!("Cancelled page request {:?}", ticket);
        }
        self.state = State::Idle;
    }
}

/// What one `load_more` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Number of posts appended
    Loaded(usize),
    Exhausted,
    Busy,
    /// The request was cancelled while in flight
    Discarded,
}

type SharedController = Arc<Mutex<PostListController>>;

fn lock(controller: &Mutex<PostListController>) -> MutexGuard<'_, PostListController> {
    controller.lock().unwrap_or_else(|e| e.into_inner())
}

/// Releases the ticket if the fetch never reaches completion
struct InFlight {
    controller: SharedController,
    ticket: Option<Ticket>,
}

impl InFlight {
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            if lock(&self.controller).fail(ticket) {
                tracing::debug!("Page request {:?} dropped mid-fetch", ticket);
            }
        }
    }
}

/// Async driver binding a controller to a content repository
pub struct IncrementalList<R: ContentRepository + ?Sized> {
    repo: Arc<R>,
    controller: SharedController,
}

impl<R: ContentRepository + ?Sized + 'static> IncrementalList<R> {
    pub fn new(repo: Arc<R>, initial: PostPagination) -> Self {
        Self {
            repo,
            controller: Arc::new(Mutex::new(PostListController::new(initial))),
        }
    }

    /// Fetch and append the next page
    ///
    /// Dropping the returned future mid-fetch cancels the request.
    pub async fn load_more(&self) -> ContentResult<LoadOutcome> {
        drive(self.repo.clone(), self.controller.clone()).await
    }

    /// Run `load_more` on the runtime; dropping the handle aborts it
    pub fn spawn_load_more(&self) -> LoadHandle {
        let task = tokio::spawn(drive(self.repo.clone(), self.controller.clone()));
        LoadHandle { task: Some(task) }
    }

    /// Cancel whatever request is outstanding
    pub fn cancel(&self) {
        lock(&self.controller).cancel();
    }

    pub fn posts(&self) -> Vec<ListPost> {
        lock(&self.controller).posts().to_vec()
    }

    pub fn next_page(&self) -> Option<String> {
        lock(&self.controller).next_page().map(str::to_string)
    }

    pub fn has_more(&self) -> bool {
        lock(&self.controller).has_more()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.controller).is_loading()
    }
}

async fn drive<R: ContentRepository + ?Sized>(
    repo: Arc<R>,
    controller: SharedController,
) -> ContentResult<LoadOutcome> {
    let request = match lock(&controller).load_more() {
        LoadMore::Request(request) => request,
        LoadMore::Exhausted => return Ok(LoadOutcome::Exhausted),
        LoadMore::Busy => return Ok(LoadOutcome::Busy),
    };

    let ticket = request.ticket;
    let mut in_flight = InFlight {
        controller: controller.clone(),
        ticket: Some(ticket),
    };
    tracing::debug!("Fetching next page: {}", request.url);
    let result = repo.fetch_page(&request.url).await;
    in_flight.disarm();

    let mut controller = lock(&controller);
    match result {
        Ok(page) => {
            let count = page.results.len();
            if controller.complete(ticket, page) {
                Ok(LoadOutcome::Loaded(count))
            } else {
                Ok(LoadOutcome::Discarded)
            }
        }
        Err(e) => {
            controller.fail(ticket);
            Err(e)
        }
    }
}

/// A spawned page load, aborted when dropped
pub struct LoadHandle {
    task: Option<tokio::task::JoinHandle<ContentResult<LoadOutcome>>>,
}

impl LoadHandle {
    /// Wait for the load to finish
    pub async fn join(mut self) -> ContentResult<LoadOutcome> {
        let Some(task) = self.task.take() else {
            return Ok(LoadOutcome::Discarded);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(LoadOutcome::Discarded),
            Err(e) => Err(ContentError::NetworkFailure(format!(
                "page load task failed: {}",
                e
            ))),
        }
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListingConfig;
    use crate::content::{DocumentData, MemoryRepository, Predicate, QueryOptions, RawDocument};
    use crate::generator::generate_listing_page;
    use async_trait::async_trait;
    use std::time::Duration;

    fn post(uid: &str, date: &str) -> RawDocument {
        let mut data = DocumentData {
            title: Some(uid.to_string()),
            ..Default::default()
        };
        data.extra
            .insert("date".to_string(), serde_json::json!(date));
        RawDocument {
            id: uid.to_string(),
            uid: Some(uid.to_string()),
            doc_type: "post".to_string(),
            tags: Vec::new(),
            first_publication_date: None,
            last_publication_date: None,
            lang: None,
            data,
        }
    }

    fn uids(posts: &[ListPost]) -> Vec<String> {
        posts.iter().filter_map(|p| p.uid.clone()).collect()
    }

    async fn three_posts() -> (Arc<MemoryRepository>, PostPagination) {
        let repo = Arc::new(MemoryRepository::new(vec![
            post("c", "2021-03-01"),
            post("a", "2021-01-01"),
            post("b", "2021-02-01"),
        ]));
        let initial = generate_listing_page(repo.as_ref(), &ListingConfig::default())
            .await
            .unwrap();
        (repo, initial)
    }

    /// Never answers a page fetch
    struct StalledRepository;

    #[async_trait]
    impl ContentRepository for StalledRepository {
        async fn query(
            &self,
            _predicates: &[Predicate],
            _options: &QueryOptions,
        ) -> ContentResult<ResponsePage> {
            Err(ContentError::NetworkFailure("offline".to_string()))
        }

        async fn get_by_uid(&self, doc_type: &str, uid: &str) -> ContentResult<RawDocument> {
            Err(ContentError::not_found(doc_type, uid))
        }

        async fn fetch_page(&self, _url: &str) -> ContentResult<ResponsePage> {
            std::future::pending().await
        }
    }

    fn stalled_list() -> IncrementalList<StalledRepository> {
        IncrementalList::new(
            Arc::new(StalledRepository),
            PostPagination {
                next_page: Some("https://stalled/page/2".to_string()),
                results: Vec::new(),
            },
        )
    }

    fn page(uids: &[&str], next_page: Option<&str>) -> ResponsePage {
        ResponsePage {
            page: 2,
            results_per_page: 1,
            results_size: uids.len() as u32,
            total_results_size: 3,
            total_pages: 3,
            next_page: next_page.map(str::to_string),
            prev_page: None,
            results: uids.iter().map(|u| post(u, "2021-01-01")).collect(),
        }
    }

    #[tokio::test]
    async fn test_successive_pages_append_in_order() {
        let (repo, initial) = three_posts().await;
        let list = IncrementalList::new(repo.clone(), initial);
        assert_eq!(uids(&list.posts()), vec!["c"]);

        assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Loaded(1));
        assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Loaded(1));
        assert_eq!(uids(&list.posts()), vec!["c", "b", "a"]);
        assert!(!list.has_more());
    }

    #[tokio::test]
    async fn test_exhausted_issues_no_fetch() {
        let (repo, mut initial) = three_posts().await;
        initial.next_page = None;
        let list = IncrementalList::new(repo.clone(), initial);
        let calls = repo.calls();

        assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(repo.calls(), calls);
        assert_eq!(uids(&list.posts()), vec!["c"]);
        assert_eq!(list.next_page(), None);
    }

    #[test]
    fn test_second_trigger_is_busy() {
        let mut controller = PostListController::new(PostPagination {
            next_page: Some("https://next".to_string()),
            results: Vec::new(),
        });

        let LoadMore::Request(request) = controller.load_more() else {
            panic!("expected a page request");
        };
        assert_eq!(request.url, "https://next");
        assert_eq!(controller.load_more(), LoadMore::Busy);

        assert!(controller.complete(request.ticket, page(&["x"], None)));
        assert_eq!(controller.load_more(), LoadMore::Exhausted);
    }

    #[test]
    fn test_cancelled_result_is_discarded() {
        let mut controller = PostListController::new(PostPagination {
            next_page: Some("https://next".to_string()),
            results: Vec::new(),
        });

        let LoadMore::Request(stale) = controller.load_more() else {
            panic!("expected a page request");
        };
        controller.cancel();
        assert!(!controller.is_loading());

        assert!(!controller.complete(stale.ticket, page(&["late"], None)));
        assert!(controller.posts().is_empty());
        assert_eq!(controller.next_page(), Some("https://next"));

        // A fresh request gets a new ticket; the old one stays dead
        let LoadMore::Request(fresh) = controller.load_more() else {
            panic!("expected a page request");
        };
        assert_ne!(fresh.ticket, stale.ticket);
        assert!(!controller.complete(stale.ticket, page(&["late"], None)));
        assert!(controller.complete(fresh.ticket, page(&["x"], Some("https://more"))));
        assert_eq!(uids(controller.posts()), vec!["x"]);
    }

    #[test]
    fn test_fail_keeps_state() {
        let mut controller = PostListController::new(PostPagination {
            next_page: Some("https://next".to_string()),
            results: Vec::new(),
        });
        let LoadMore::Request(request) = controller.load_more() else {
            panic!("expected a page request");
        };
        assert!(controller.fail(request.ticket));
        assert!(!controller.is_loading());
        assert_eq!(controller.next_page(), Some("https://next"));
    }

    #[tokio::test]
    async fn test_fetch_error_returns_to_idle() {
        let list = IncrementalList::new(
            Arc::new(MemoryRepository::new(Vec::new())),
            PostPagination {
                next_page: Some("https://unknown/page/2".to_string()),
                results: Vec::new(),
            },
        );
        let err = list.load_more().await.unwrap_err();
        assert!(matches!(err, ContentError::NetworkFailure(_)));
        assert!(!list.is_loading());
        assert!(list.has_more());
    }

    #[tokio::test]
    async fn test_dropped_future_cancels_request() {
        let list = stalled_list();
        let result = tokio::time::timeout(Duration::from_millis(20), list.load_more()).await;
        assert!(result.is_err());
        assert!(!list.is_loading());
        assert!(list.has_more());
    }

    #[tokio::test]
    async fn test_dropped_handle_aborts_load() {
        let list = stalled_list();
        let handle = list.spawn_load_more();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !list.is_loading() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), async {
            while list.is_loading() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(list.posts().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_load_joins() {
        let (repo, initial) = three_posts().await;
        let list = IncrementalList::new(repo, initial);
        let outcome = list.spawn_load_more().join().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded(1));
        assert_eq!(uids(&list.posts()), vec!["c", "b"]);
    }
}
