use super::api::{Catalog, CatalogEntry, LatestPage};
use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingState {
    #[default]
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Initial,
    More,
}

/// A page fetch the controller wants issued. Hand it back to
/// [`ListingController::apply`] together with the fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub kind: RequestKind,
    pub page: u32,
    pub per_page: u32,
    epoch: u64,
}

/// Home feed bookkeeping: first page, "load more" appends, has-more tracking.
///
/// The controller never performs I/O itself. `start` and `load_more` return
/// the request to run (or `None` when the call is a no-op) and `apply` folds
/// the result back in. While a request is outstanding the state is
/// `LoadingInitial` or `LoadingMore`, so a second `load_more` cannot issue
/// another fetch until the first one is applied.
#[derive(Debug)]
pub struct ListingController {
    state: ListingState,
    items: Vec<CatalogEntry>,
    current_page: u32,
    has_more: bool,
    per_page: u32,
    epoch: u64,
}

impl ListingController {
    pub fn new(per_page: u32) -> Self {
        Self {
            state: ListingState::Idle,
            items: Vec::new(),
            current_page: 1,
            has_more: true,
            per_page: per_page.max(1),
            epoch: 0,
        }
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    pub fn items(&self) -> &[CatalogEntry] {
        &self.items
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_initial(&self) -> bool {
        self.state == ListingState::LoadingInitial
    }

    pub fn is_loading_more(&self) -> bool {
        self.state == ListingState::LoadingMore
    }

    pub fn start(&mut self) -> Option<PageRequest> {
        if self.state != ListingState::Idle {
            return None;
        }

        self.state = ListingState::LoadingInitial;
        Some(self.request(RequestKind::Initial, 1))
    }

    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.state != ListingState::Ready || !self.has_more {
            return None;
        }

        self.state = ListingState::LoadingMore;
        Some(self.request(RequestKind::More, self.current_page + 1))
    }

    /// Drops all items and returns to `Idle`. Results of requests issued
    /// before the reset are ignored when they arrive.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = ListingState::Idle;
        self.items.clear();
        self.current_page = 1;
        self.has_more = true;
    }

    /// Returns `false` when the result was stale and left the state untouched.
    pub fn apply(&mut self, request: PageRequest, result: Result<LatestPage, ApiError>) -> bool {
        let expected = match request.kind {
            RequestKind::Initial => ListingState::LoadingInitial,
            RequestKind::More => ListingState::LoadingMore,
        };
        if request.epoch != self.epoch || self.state != expected {
            log::debug!("dropping stale listing result for page {}", request.page);
            return false;
        }

        match (request.kind, result) {
            (RequestKind::Initial, Ok(page)) => {
                self.items = page.entries;
                self.current_page = request.page;
                self.settle(page.has_more);
            }
            (RequestKind::More, Ok(page)) => {
                log::info!(
                    "appending {} entries from page {}",
                    page.entries.len(),
                    request.page
                );
                self.items.extend(page.entries);
                self.current_page = request.page;
                self.settle(page.has_more);
            }
            (RequestKind::Initial, Err(e)) => {
                log::warn!("failed to load latest comics: {}", e);
                self.items.clear();
                self.state = ListingState::Ready;
            }
            (RequestKind::More, Err(e)) => {
                log::warn!("failed to load page {}: {}", request.page, e);
                self.state = ListingState::Ready;
            }
        }
        true
    }

    fn settle(&mut self, has_more: bool) {
        // Once the server reports the end, the feed stays closed.
        self.has_more = self.has_more && has_more;
        self.state = if self.has_more {
            ListingState::Ready
        } else {
            ListingState::Exhausted
        };
    }

    fn request(&self, kind: RequestKind, page: u32) -> PageRequest {
        PageRequest {
            kind,
            page,
            per_page: self.per_page,
            epoch: self.epoch,
        }
    }
}

pub async fn fetch_page<C: Catalog>(
    catalog: &C,
    request: PageRequest,
) -> Result<LatestPage, ApiError> {
    catalog.fetch_latest(request.page, request.per_page).await
}
