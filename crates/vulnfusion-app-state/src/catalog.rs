use async_trait::async_trait;

use vulnfusion_client_core::{
    ConsoleApi, ConsoleError, NoticeSummary, Page, VulnerabilitySummary,
};

use crate::filter::{FilterEdit, FilterState};

/// A paginated, filterable backend catalog. The controller below is generic
/// over this so the vulnerability and security-notice lists share one
/// implementation.
#[async_trait]
pub trait Catalog: Send + Sync {
    type Row: Send + Sync;
    const NAME: &'static str;

    async fn fetch(
        api: &dyn ConsoleApi,
        query: &[(String, String)],
    ) -> Result<Page<Self::Row>, ConsoleError>;
}

pub struct VulnCatalog;

#[async_trait]
impl Catalog for VulnCatalog {
    type Row = VulnerabilitySummary;
    const NAME: &'static str = "vulns";

    async fn fetch(
        api: &dyn ConsoleApi,
        query: &[(String, String)],
    ) -> Result<Page<Self::Row>, ConsoleError> {
        api.list_vulnerabilities(query).await
    }
}

pub struct NoticeCatalog;

#[async_trait]
impl Catalog for NoticeCatalog {
    type Row = NoticeSummary;
    const NAME: &'static str = "sec_notices";

    async fn fetch(
        api: &dyn ConsoleApi,
        query: &[(String, String)],
    ) -> Result<Page<Self::Row>, ConsoleError> {
        api.list_notices(query).await
    }
}

/// A scheduled fetch: the filter snapshot frozen into request parameters,
/// tagged with the sequence number that decides whether its response may
/// still be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    query: Vec<(String, String)>,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Owns the filter state and the visible result set, and enforces the race
/// rule: a response lands only if it carries the highest sequence number
/// issued so far, so the displayed page always reflects the most recently
/// requested filter state rather than the most recently completed call.
pub struct CatalogController<C: Catalog> {
    filter: FilterState,
    rows: Vec<C::Row>,
    total_count: i64,
    last_seq: u64,
    loading: bool,
    loaded_once: bool,
    error: Option<String>,
}

impl<C: Catalog> Default for CatalogController<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Catalog> CatalogController<C> {
    pub fn new() -> Self {
        Self {
            filter: FilterState::default(),
            rows: Vec::new(),
            total_count: 0,
            last_seq: 0,
            loading: false,
            loaded_once: false,
            error: None,
        }
    }

    /// Schedules the initial (or a manual) fetch of the current filter state.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue()
    }

    /// Applies a user edit and schedules exactly one fetch for the resulting
    /// state. Returns `None` without touching anything when the edit is not a
    /// change, or when it is a page navigation outside `[1, total_pages]`.
    pub fn edit(&mut self, edit: FilterEdit) -> Option<FetchTicket> {
        if let FilterEdit::Page(page) = &edit {
            if !self.page_reachable(*page) {
                return None;
            }
        }
        if !self.filter.differs(&edit) {
            return None;
        }
        self.filter.apply(edit);
        Some(self.issue())
    }

    /// Applies a completed fetch. Stale responses (any ticket but the latest)
    /// are discarded unconditionally, even if they complete after newer ones.
    pub fn apply_success(&mut self, seq: u64, page: Page<C::Row>) -> bool {
        if seq != self.last_seq {
            tracing::debug!(
                catalog = C::NAME,
                seq,
                latest = self.last_seq,
                "discarding stale catalog response"
            );
            return false;
        }
        self.rows = page.data;
        self.total_count = page.total_count.max(0);
        self.loading = false;
        self.loaded_once = true;
        true
    }

    /// A failed fetch keeps the previous result set visible; only the error
    /// message changes. `AuthExpired` is not surfaced here, the session hook
    /// already handled it.
    pub fn apply_failure(&mut self, seq: u64, err: &ConsoleError) -> bool {
        if seq != self.last_seq {
            tracing::debug!(
                catalog = C::NAME,
                seq,
                latest = self.last_seq,
                "discarding stale catalog failure"
            );
            return false;
        }
        self.loading = false;
        if !matches!(err, ConsoleError::AuthExpired) {
            self.error = Some(err.user_message());
        }
        true
    }

    /// Convenience driver for shells that fetch serially.
    pub async fn run(&mut self, api: &dyn ConsoleApi, ticket: FetchTicket) {
        match C::fetch(api, ticket.query()).await {
            Ok(page) => {
                self.apply_success(ticket.seq(), page);
            }
            Err(err) => {
                self.apply_failure(ticket.seq(), &err);
            }
        }
    }

    fn issue(&mut self) -> FetchTicket {
        self.last_seq += 1;
        self.loading = true;
        self.error = None;
        FetchTicket {
            seq: self.last_seq,
            query: self.filter.query_params(),
        }
    }

    fn page_reachable(&self, page: u32) -> bool {
        if page < 1 {
            return false;
        }
        // Bounds apply once the total is known.
        !self.loaded_once || page <= self.total_pages()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn rows(&self) -> &[C::Row] {
        &self.rows
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        let page_size = u64::from(self.filter.page_size.max(1));
        let total = self.total_count.max(0) as u64;
        total.div_ceil(page_size) as u32
    }

    pub fn can_prev(&self) -> bool {
        self.filter.page_no > 1
    }

    pub fn can_next(&self) -> bool {
        self.loaded_once && self.filter.page_no < self.total_pages()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
