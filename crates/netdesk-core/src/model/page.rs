// ── Page and query types ──

use serde::Serialize;

use super::Entity;

/// The `(page, page_size, search)` triple that identifies one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: String,
}

impl PageQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search: String::new(),
        }
    }

    pub fn as_params(&self) -> netdesk_api::ListParams<'_> {
        netdesk_api::ListParams {
            page: self.page,
            page_size: self.page_size,
            search: &self.search,
        }
    }
}

/// One server page of `T`, in server-defined order.
///
/// Invariants: `page >= 1`, `page_size >= 1`, `items.len() <= page_size`,
/// `total_pages == max(1, ceil(total_count / page_size))`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    items: Vec<T>,
    page: u32,
    page_size: u32,
    total_count: u64,
    total_pages: u32,
}

impl<T> Page<T> {
    /// Build a page, normalising values that would break the invariants.
    pub fn new(mut items: Vec<T>, page: u32, page_size: u32, total_count: u64) -> Self {
        let page_size = page_size.max(1);
        items.truncate(usize::try_from(page_size).unwrap_or(usize::MAX));
        Self {
            items,
            page: page.max(1),
            page_size,
            total_count,
            total_pages: total_pages_for(total_count, page_size),
        }
    }

    pub fn empty(page_size: u32) -> Self {
        Self::new(Vec::new(), 1, page_size, 0)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` when this page lies past the last page (e.g. after deletes).
    pub fn is_past_end(&self) -> bool {
        self.page > self.total_pages
    }

    pub(crate) fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T: Entity> Page<T> {
    /// Ids in display order.
    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(Entity::id).collect()
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }
}

impl<T> From<netdesk_api::PageResponse<T>> for Page<T> {
    fn from(resp: netdesk_api::PageResponse<T>) -> Self {
        // `totalPages` is derived locally; the server's value is advisory.
        Self::new(resp.items, resp.page, resp.page_size, resp.total_count)
    }
}

pub(crate) fn total_pages_for(total_count: u64, page_size: u32) -> u32 {
    let pages = total_count.div_ceil(u64::from(page_size.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 25).total_pages(), 3);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 30).total_pages(), 3);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 31).total_pages(), 4);
    }

    #[test]
    fn empty_collection_still_has_one_page() {
        let page = Page::<u8>::empty(20);
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.total_count(), 0);
        assert!(!page.is_past_end());
    }

    #[test]
    fn oversized_item_list_is_truncated() {
        let page = Page::new(vec![1, 2, 3, 4], 1, 3, 4);
        assert_eq!(page.items(), &[1, 2, 3]);
        assert_eq!(page.total_pages(), 2);
    }

    #[test]
    fn zero_page_and_size_are_clamped() {
        let page = Page::<u8>::new(vec![], 0, 0, 5);
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), 1);
        assert_eq!(page.total_pages(), 5);
    }

    #[test]
    fn page_beyond_total_is_past_end() {
        let page = Page::<u8>::new(vec![], 4, 10, 30);
        assert!(page.is_past_end());
    }
}
