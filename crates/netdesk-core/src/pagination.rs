// ── Pagination state ──
//
// Owns the (page, page_size, search) query, the last applied page and
// the last fetch error. Every query change issues a `FetchTicket`
// carrying a monotonically increasing sequence number; a result is
// applied only if its ticket is still the latest one issued.

use std::sync::Arc;

use tracing::debug;

use crate::error::CoreError;
use crate::model::page::total_pages_for;
use crate::model::{Entity, Page, PageQuery};

/// A request to fetch `query`, stamped with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: PageQuery,
}

/// What happened when a fetch result was handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page replaced the displayed one.
    Applied { ordering_changed: bool },
    /// The fetch failed; the previous page stays visible.
    Failed,
    /// A newer request was issued meanwhile; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct PaginationController<T> {
    query: PageQuery,
    max_page_size: u32,
    current: Option<Arc<Page<T>>>,
    error: Option<CoreError>,
    issued: u64,
    loading: bool,
}

impl<T: Entity> PaginationController<T> {
    pub fn new(page_size: u32, max_page_size: u32) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            query: PageQuery::new(page_size.min(max_page_size)),
            max_page_size,
            current: None,
            error: None,
            issued: 0,
            loading: false,
        }
    }

    // ── Query changes ────────────────────────────────────────────────

    /// Apply a new search term and restart at page 1.
    pub fn set_search_term(&mut self, term: &str) -> FetchTicket {
        self.query.search = term.trim().to_owned();
        self.query.page = 1;
        self.issue()
    }

    pub fn set_page_size(&mut self, size: u32) -> Result<FetchTicket, CoreError> {
        if size == 0 || size > self.max_page_size {
            return Err(CoreError::validation(format!(
                "page size must be between 1 and {}, got {size}",
                self.max_page_size
            )));
        }
        self.query.page_size = size;
        self.query.page = 1;
        Ok(self.issue())
    }

    /// Jump to page `n`. Out-of-range pages leave the query untouched.
    pub fn go_to_page(&mut self, n: u32) -> Result<FetchTicket, CoreError> {
        let total_pages = self.total_pages();
        if n < 1 || n > total_pages {
            return Err(CoreError::validation(format!(
                "page {n} is out of range (1..={total_pages})"
            )));
        }
        self.query.page = n;
        Ok(self.issue())
    }

    /// Refetch the current query unchanged.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue()
    }

    /// After a resync shrank the collection below the current page,
    /// issue a ticket for the new last page.
    pub fn overflow_ticket(&mut self) -> Option<FetchTicket> {
        let page = self.current.as_ref()?;
        if !page.is_past_end() || self.query.page != page.page() {
            return None;
        }
        self.query.page = page.total_pages();
        Some(self.issue())
    }

    fn issue(&mut self) -> FetchTicket {
        self.issued += 1;
        self.loading = true;
        FetchTicket {
            seq: self.issued,
            query: self.query.clone(),
        }
    }

    // ── Results ──────────────────────────────────────────────────────

    /// Hand back the result of the fetch described by `ticket`.
    pub fn apply(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Page<T>, CoreError>,
    ) -> FetchOutcome {
        if ticket.seq != self.issued {
            debug!(
                seq = ticket.seq,
                latest = self.issued,
                "discarding stale page response"
            );
            return FetchOutcome::Superseded;
        }
        self.loading = false;

        match result {
            Ok(page) => {
                let ordering_changed = self
                    .current
                    .as_ref()
                    .is_none_or(|previous| previous.ids() != page.ids());
                self.current = Some(Arc::new(page));
                self.error = None;
                FetchOutcome::Applied { ordering_changed }
            }
            Err(err) => {
                self.error = Some(err.into_fetch(ticket.query.page));
                FetchOutcome::Failed
            }
        }
    }

    /// Apply `patch` to every loaded item whose id is in `ids`.
    ///
    /// Returns `false` without changing anything if some matching item
    /// rejected the patch (the caller should refetch instead).
    pub fn patch_items(&mut self, ids: &[T::Id], patch: impl Fn(&mut T) -> bool) -> bool {
        let Some(current) = self.current.as_ref() else {
            return true;
        };
        let mut page = Page::clone(current);
        for item in page.items_mut() {
            if ids.contains(&item.id()) && !patch(item) {
                return false;
            }
        }
        self.current = Some(Arc::new(page));
        true
    }

    /// Record a non-fetch error next to the current page.
    pub fn set_error(&mut self, err: CoreError) {
        self.error = Some(err);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn query(&self) -> &PageQuery {
        &self.query
    }

    pub fn current(&self) -> Option<&Arc<Page<T>>> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Page count of the current query: the last known row count over the
    /// requested page size, which may not be the loaded page's size yet.
    pub fn total_pages(&self) -> u32 {
        self.current.as_ref().map_or(1, |page| {
            total_pages_for(page.total_count(), self.query.page_size)
        })
    }

    /// Ids of the displayed page, in order.
    pub fn visible_ids(&self) -> Vec<T::Id> {
        self.current.as_ref().map(|page| page.ids()).unwrap_or_default()
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        active: bool,
    }

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }

        fn active(&self) -> Option<bool> {
            Some(self.active)
        }

        fn set_active(&mut self, active: bool) -> bool {
            self.active = active;
            true
        }
    }

    fn rows(ids: &[u32]) -> Vec<Row> {
        ids.iter().map(|&id| Row { id, active: true }).collect()
    }

    fn loaded(total: u64) -> PaginationController<Row> {
        let mut pager = PaginationController::new(10, 100);
        let ticket = pager.refresh();
        pager.apply(&ticket, Ok(Page::new(rows(&[1, 2, 3]), 1, 10, total)));
        pager
    }

    #[test]
    fn search_resets_to_first_page() {
        let mut pager = loaded(50);
        pager.go_to_page(3).unwrap();
        let ticket = pager.set_search_term("  lab ");
        assert_eq!(ticket.query.page, 1);
        assert_eq!(ticket.query.search, "lab");
    }

    #[test]
    fn page_size_change_resets_page_and_validates() {
        let mut pager = loaded(50);
        pager.go_to_page(2).unwrap();

        let ticket = pager.set_page_size(25).unwrap();
        assert_eq!(ticket.query.page, 1);
        assert_eq!(ticket.query.page_size, 25);

        assert!(matches!(
            pager.set_page_size(0),
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            pager.set_page_size(101),
            Err(CoreError::Validation { .. })
        ));
        assert_eq!(pager.query().page_size, 25);
    }

    #[test]
    fn out_of_range_page_is_rejected_without_change() {
        let mut pager = loaded(25);
        assert_eq!(pager.total_pages(), 3);
        let issued_before = pager.refresh().seq;

        assert!(matches!(
            pager.go_to_page(0),
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            pager.go_to_page(4),
            Err(CoreError::Validation { .. })
        ));
        assert_eq!(pager.query().page, 1);

        let ticket = pager.go_to_page(3).unwrap();
        assert_eq!(ticket.seq, issued_before + 1);
        assert_eq!(ticket.query.page, 3);
    }

    #[test]
    fn page_range_follows_requested_page_size() {
        let mut pager = loaded(25);
        let ticket = pager.set_page_size(5).unwrap();
        pager.apply(&ticket, Err(CoreError::Internal("unreachable".into())));

        // The loaded page is still the 10-row one, but the query pages by 5.
        assert_eq!(pager.current().unwrap().page_size(), 10);
        assert_eq!(pager.total_pages(), 5);
        assert_eq!(pager.go_to_page(4).unwrap().query.page, 4);
        assert!(matches!(
            pager.go_to_page(6),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn stale_result_is_superseded() {
        let mut pager: PaginationController<Row> = PaginationController::new(10, 100);
        let first = pager.set_search_term("a");
        let second = pager.set_search_term("b");

        let outcome = pager.apply(&second, Ok(Page::new(rows(&[2]), 1, 10, 1)));
        assert_eq!(
            outcome,
            FetchOutcome::Applied {
                ordering_changed: true
            }
        );

        let outcome = pager.apply(&first, Ok(Page::new(rows(&[1]), 1, 10, 1)));
        assert_eq!(outcome, FetchOutcome::Superseded);
        assert_eq!(pager.visible_ids(), vec![2]);
    }

    #[test]
    fn stale_error_is_superseded_too() {
        let mut pager: PaginationController<Row> = PaginationController::new(10, 100);
        let first = pager.refresh();
        let second = pager.refresh();
        assert_eq!(
            pager.apply(&first, Err(CoreError::Internal("late".into()))),
            FetchOutcome::Superseded
        );
        assert!(pager.is_loading());
        pager.apply(&second, Ok(Page::empty(10)));
        assert!(pager.error().is_none());
        assert!(!pager.is_loading());
    }

    #[test]
    fn failed_fetch_keeps_previous_page() {
        let mut pager = loaded(3);
        let ticket = pager.refresh();
        let outcome = pager.apply(
            &ticket,
            Err(CoreError::Api {
                message: "down".into(),
                code: None,
                status: Some(502),
            }),
        );
        assert_eq!(outcome, FetchOutcome::Failed);
        assert_eq!(pager.visible_ids(), vec![1, 2, 3]);
        assert!(matches!(
            pager.error(),
            Some(CoreError::Fetch {
                page: 1,
                status: Some(502),
                ..
            })
        ));
    }

    #[test]
    fn same_ordering_is_reported_unchanged() {
        let mut pager = loaded(3);
        let ticket = pager.refresh();
        let outcome = pager.apply(&ticket, Ok(Page::new(rows(&[1, 2, 3]), 1, 10, 3)));
        assert_eq!(
            outcome,
            FetchOutcome::Applied {
                ordering_changed: false
            }
        );
    }

    #[test]
    fn patch_items_updates_matching_rows() {
        let mut pager = loaded(3);
        assert!(pager.patch_items(&[1, 3], |row| row.set_active(false)));
        let page = pager.current().unwrap();
        let flags: Vec<bool> = page.items().iter().map(|r| r.active).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn overflow_ticket_steps_back_to_last_page() {
        let mut pager = loaded(30);
        let ticket = pager.go_to_page(3).unwrap();
        // Everything on page 3 was deleted; the server now reports 20 items.
        pager.apply(&ticket, Ok(Page::new(Vec::new(), 3, 10, 20)));

        let back = pager.overflow_ticket().unwrap();
        assert_eq!(back.query.page, 2);
        assert_eq!(pager.query().page, 2);
    }

    #[test]
    fn no_overflow_ticket_within_range() {
        let mut pager = loaded(30);
        assert!(pager.overflow_ticket().is_none());
    }
}
