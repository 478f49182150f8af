use super::criteria::{Mode, SearchCriteria};
use super::pagination::{self, PaginationCursor};
use super::types::{Article, Category, TitleSuggestion};
use crate::api::{or_fallback, retry, ApiClient};
use crate::config::Config;
use crate::observable::Observable;
use crate::transfer::{StateKey, TransferState};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use tokio::task::JoinHandle;

/// Transfer-state slot holding the category list fetched by the first process.
pub const CATEGORIES_KEY: StateKey<Vec<Category>> = StateKey::new("categories");

const ARTICLE_LIST_PATH: &str = "/article/list";
const ARTICLE_SEARCH_PATH: &str = "/article/search";
const CATEGORY_PATH: &str = "/category";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Articles added to the browse window per page.
    pub page_size: u32,
    /// Extra attempts for browse and category requests.
    pub max_retries: u32,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            page_size: 5,
            max_retries: 3,
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            max_retries: config.max_retries,
        }
    }
}

/// Mutable bookkeeping behind the published channels.
///
/// Generations stamp every browse and search request. A completion only
/// lands if its stamp is still the latest one for its controller.
#[derive(Debug)]
struct State {
    mode: Mode,
    cursor: PaginationCursor,
    criteria: SearchCriteria,
    /// Set once any browse response has landed; later pages load silently.
    first_page_resolved: bool,
    browse_spinner: bool,
    search_pending: bool,
    browse_generation: u64,
    search_generation: u64,
}

struct Inner {
    client: ApiClient,
    transfer: TransferState,
    max_retries: u32,
    state: Mutex<State>,
    articles: Observable<Arc<Vec<Article>>>,
    search_results: Observable<Arc<Vec<Article>>>,
    feed: Observable<Arc<Vec<Article>>>,
    is_loading: Observable<bool>,
    exhausted: Observable<bool>,
    categories: Observable<Option<Arc<Vec<Category>>>>,
    /// Background `/category` fetch, aborted when the last handle drops.
    category_task: OnceLock<JoinHandle<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.category_task.get() {
            task.abort();
        }
    }
}

/// Article feed and search state for one view.
///
/// Cloning yields another handle to the same state. Methods take `&self` and
/// may be awaited concurrently; the internal lock is never held across a
/// request, so e.g. [`BlogService::restore`] can run while a page is loading.
#[derive(Clone)]
pub struct BlogService {
    inner: Arc<Inner>,
}

impl BlogService {
    /// Create the service and resolve the category list.
    ///
    /// If `transfer` already holds [`CATEGORIES_KEY`] the categories are
    /// published before this returns and no request is made. Otherwise the
    /// fetch is spawned on the current Tokio runtime and its result is written
    /// back into `transfer` for the next process. The fetch holds no strong
    /// reference to the service and is cancelled when the service is dropped.
    ///
    /// Outside a runtime nothing can be fetched: an empty list is published
    /// and `transfer` is left untouched.
    pub fn new(client: ApiClient, transfer: TransferState, options: ServiceOptions) -> Self {
        let service = Self {
            inner: Arc::new(Inner {
                client,
                transfer,
                max_retries: options.max_retries,
                state: Mutex::new(State {
                    mode: Mode::Browsing,
                    cursor: PaginationCursor::new(options.page_size),
                    criteria: SearchCriteria::default(),
                    first_page_resolved: false,
                    browse_spinner: false,
                    search_pending: false,
                    browse_generation: 0,
                    search_generation: 0,
                }),
                articles: Observable::new(Arc::default()),
                search_results: Observable::new(Arc::default()),
                feed: Observable::new(Arc::default()),
                is_loading: Observable::new(false),
                exhausted: Observable::new(false),
                categories: Observable::new(None),
                category_task: OnceLock::new(),
            }),
        };

        match service.inner.transfer.get(&CATEGORIES_KEY) {
            Some(categories) => {
                tracing::info!(
                    count = categories.len(),
                    "Adopted categories from transfer state"
                );
                service.inner.categories.publish(Some(Arc::new(categories)));
            }
            None => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let task = runtime.spawn(load_categories(Arc::downgrade(&service.inner)));
                    let _ = service.inner.category_task.set(task);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "No Tokio runtime, categories not fetched");
                    service.inner.categories.publish(Some(Arc::default()));
                }
            },
        }

        service
    }

    // ========================================================================
    // Observable channels
    // ========================================================================

    /// The active sequence: browse articles or search results, per [`Mode`].
    pub fn feed(&self) -> &Observable<Arc<Vec<Article>>> {
        &self.inner.feed
    }

    /// Accumulated browse window.
    pub fn articles(&self) -> &Observable<Arc<Vec<Article>>> {
        &self.inner.articles
    }

    pub fn search_results(&self) -> &Observable<Arc<Vec<Article>>> {
        &self.inner.search_results
    }

    pub fn is_loading(&self) -> &Observable<bool> {
        &self.inner.is_loading
    }

    /// Latches to `true` once a browse page comes back no larger than the
    /// window already held.
    pub fn exhausted(&self) -> &Observable<bool> {
        &self.inner.exhausted
    }

    /// `None` until the category list has been adopted or fetched.
    pub fn categories(&self) -> &Observable<Option<Arc<Vec<Category>>>> {
        &self.inner.categories
    }

    /// Wait until the category list is available.
    pub async fn wait_for_categories(&self) -> Arc<Vec<Category>> {
        let mut rx = self.inner.categories.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(categories) = current {
                return categories;
            }
            if rx.changed().await.is_err() {
                return Arc::default();
            }
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.lock().cursor
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.lock().criteria.clone()
    }

    /// The store categories are written to, for serializing the handoff payload.
    pub fn transfer_state(&self) -> &TransferState {
        &self.inner.transfer
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Merge `patch` into the current criteria. Does not fetch.
    pub fn update_criteria(&self, patch: SearchCriteria) {
        let mut state = self.lock();
        state.criteria.merge(patch);
        tracing::debug!(criteria = ?state.criteria, "Criteria updated");
    }

    /// Recompute the mode from the current criteria, then load.
    ///
    /// Searching with `criteria` runs a search; searching without it does
    /// nothing. Browsing loads the next page from the current cursor.
    pub async fn request_list(&self, criteria: Option<SearchCriteria>) {
        let mode = {
            let mut state = self.lock();
            let mode = Mode::for_criteria(&state.criteria);
            if state.mode != mode {
                tracing::debug!(from = ?state.mode, to = ?mode, "Mode changed");
                state.mode = mode;
                self.publish_feed(&state);
            }
            mode
        };

        match (mode, criteria) {
            (Mode::Searching, Some(criteria)) => self.execute_search(criteria).await,
            (Mode::Searching, None) => {
                tracing::debug!("Searching without request criteria, nothing to load");
            }
            (Mode::Browsing, _) => self.request_next_page().await,
        }
    }

    /// Fetch the browse window for the current cursor and store it.
    ///
    /// No-op while searching. Retries, then falls back to an empty page. A
    /// page the same size as the held window latches [`Self::exhausted`];
    /// any other size advances the cursor.
    pub async fn request_next_page(&self) {
        const CALL_SITE: &str = "request_next_page";

        let (generation, params) = {
            let mut state = self.lock();
            if state.mode == Mode::Searching {
                tracing::debug!("Skipping browse fetch while searching");
                return;
            }
            state.browse_generation += 1;
            if !state.first_page_resolved {
                state.browse_spinner = true;
            }
            if !self.inner.search_results.get().is_empty() {
                self.inner.search_results.publish(Arc::default());
            }
            self.sync_loading(&state);
            (state.browse_generation, state.cursor.request_params())
        };

        let client = &self.inner.client;
        let params = &params;
        let result = retry(self.inner.max_retries, CALL_SITE, move || {
            client.get::<Vec<Article>>(CALL_SITE, ARTICLE_LIST_PATH, params)
        })
        .await;
        let page = or_fallback(CALL_SITE, result, Vec::new());

        let mut state = self.lock();
        if generation != state.browse_generation {
            tracing::debug!(
                expected = state.browse_generation,
                got = generation,
                "Ignoring stale browse page (generation mismatch)"
            );
            return;
        }

        let held = self.inner.articles.get().len();
        if pagination::is_exhausted(held, page.len()) {
            tracing::debug!(count = page.len(), "Browse feed exhausted");
            self.inner.exhausted.publish_if_changed(true);
        } else {
            state.cursor.advance();
            tracing::debug!(
                count = page.len(),
                next_index = state.cursor.index(),
                "Browse page loaded"
            );
        }

        self.inner.articles.publish(Arc::new(page));
        state.first_page_resolved = true;
        state.browse_spinner = false;
        self.sync_loading(&state);
        self.publish_feed(&state);
    }

    /// Look up title suggestions. Does not touch service state or retry.
    pub async fn title_query(&self, text: &str) -> Vec<TitleSuggestion> {
        const CALL_SITE: &str = "title_query";

        let result = self
            .inner
            .client
            .get(CALL_SITE, ARTICLE_SEARCH_PATH, &[("title", text.to_string())])
            .await;
        or_fallback(CALL_SITE, result, Vec::new())
    }

    /// Reset the cursor, browse window, and criteria.
    ///
    /// Categories, mode, and the exhaustion latch are kept. A browse page
    /// still in flight is discarded when it lands.
    pub fn restore(&self) {
        let mut state = self.lock();
        state.cursor.reset();
        state.criteria = SearchCriteria::default();
        state.browse_generation += 1;
        state.browse_spinner = false;
        self.inner.articles.publish(Arc::default());
        self.sync_loading(&state);
        self.publish_feed(&state);
        tracing::debug!("Feed state restored");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run one search with the current criteria overlaid by `requested`.
    ///
    /// Dropped when issued outside search mode, and its result is dropped if
    /// the mode has reverted to browsing by the time it lands.
    async fn execute_search(&self, requested: SearchCriteria) {
        const CALL_SITE: &str = "search";

        let (generation, params) = {
            let mut state = self.lock();
            if state.mode != Mode::Searching {
                return;
            }
            state.search_generation += 1;
            state.search_pending = true;
            self.sync_loading(&state);
            (
                state.search_generation,
                state.criteria.merged(&requested).query_params(),
            )
        };

        let result = self
            .inner
            .client
            .get::<Vec<Article>>(CALL_SITE, ARTICLE_SEARCH_PATH, &params)
            .await;
        let results = or_fallback(CALL_SITE, result, Vec::new());

        let mut state = self.lock();
        if generation != state.search_generation {
            tracing::debug!(
                expected = state.search_generation,
                got = generation,
                "Ignoring stale search result (generation mismatch)"
            );
            return;
        }

        state.search_pending = false;
        if state.mode != Mode::Searching {
            tracing::debug!("Dropping search result that landed after leaving search mode");
            self.sync_loading(&state);
            return;
        }

        tracing::debug!(count = results.len(), "Search completed");
        self.inner.search_results.publish(Arc::new(results));
        self.sync_loading(&state);
        self.publish_feed(&state);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_feed(&self, state: &State) {
        let active = match state.mode {
            Mode::Browsing => self.inner.articles.get(),
            Mode::Searching => self.inner.search_results.get(),
        };
        self.inner.feed.publish(active);
    }

    fn sync_loading(&self, state: &State) {
        self.inner
            .is_loading
            .publish_if_changed(state.browse_spinner || state.search_pending);
    }
}

/// Fetch `/category`, store it for the next process, and publish it.
///
/// Upgrades `service` only around synchronous sections, so an abandoned
/// service is freed while the request is still running.
async fn load_categories(service: Weak<Inner>) {
    const CALL_SITE: &str = "load_categories";

    let Some((client, transfer, max_retries)) = service
        .upgrade()
        .map(|inner| (inner.client.clone(), inner.transfer.clone(), inner.max_retries))
    else {
        return;
    };

    let client = &client;
    let result = retry(max_retries, CALL_SITE, move || {
        client.get::<Vec<Category>>(CALL_SITE, CATEGORY_PATH, &[])
    })
    .await;
    let categories = or_fallback(CALL_SITE, result, Vec::new());

    if let Err(e) = transfer.set(&CATEGORIES_KEY, &categories) {
        tracing::warn!(error = %e, "Failed to store categories in transfer state");
    }
    tracing::debug!(count = categories.len(), "Categories loaded");
    match service.upgrade() {
        Some(inner) => inner.categories.publish(Some(Arc::new(categories))),
        None => tracing::debug!("Service dropped before categories landed"),
    }
}
