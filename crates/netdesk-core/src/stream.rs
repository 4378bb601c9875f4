// ── Reactive view snapshots ──
//
// Every state change of a `ResourceController` publishes an immutable
// `ViewSnapshot` through a `watch` channel. Renderers hold a
// `ViewStream` and redraw on `changed()`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::CoreError;
use crate::model::{Entity, Page, PageQuery};

/// Everything a renderer needs to draw one resource view.
#[derive(Debug, Clone)]
pub struct ViewSnapshot<T: Entity> {
    pub query: PageQuery,
    /// Last successfully applied page; kept while a refetch fails.
    pub page: Option<Arc<Page<T>>>,
    /// Selected ids in ascending order, including ids on other pages.
    pub selected: Vec<T::Id>,
    pub anchor: Option<T::Id>,
    /// Latest non-fatal error (fetch, export, partial bulk failure).
    pub error: Option<CoreError>,
    pub loading: bool,
}

impl<T: Entity> ViewSnapshot<T> {
    pub(crate) fn initial(query: PageQuery) -> Self {
        Self {
            query,
            page: None,
            selected: Vec::new(),
            anchor: None,
            error: None,
            loading: false,
        }
    }

    pub fn items(&self) -> &[T] {
        self.page.as_deref().map(Page::items).unwrap_or_default()
    }

    pub fn is_selected(&self, id: T::Id) -> bool {
        self.selected.binary_search(&id).is_ok()
    }

    /// Selected rows of the visible page, in display order.
    pub fn selected_on_page(&self) -> Vec<T::Id> {
        self.items()
            .iter()
            .map(Entity::id)
            .filter(|id| self.is_selected(*id))
            .collect()
    }

    /// Selected ids that are not on the visible page.
    pub fn selected_off_page(&self) -> usize {
        self.selected.len().saturating_sub(self.selected_on_page().len())
    }

    pub fn total_pages(&self) -> u32 {
        self.page.as_ref().map_or(1, |page| page.total_pages())
    }
}

/// A subscription to one controller's view.
pub struct ViewStream<T: Entity> {
    current: Arc<ViewSnapshot<T>>,
    receiver: watch::Receiver<Arc<ViewSnapshot<T>>>,
}

impl<T: Entity> ViewStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<ViewSnapshot<T>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<ViewSnapshot<T>> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<ViewSnapshot<T>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the controller has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<ViewSnapshot<T>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> ViewWatchStream<T> {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ViewWatchStream<T: Entity> {
    inner: WatchStream<Arc<ViewSnapshot<T>>>,
}

impl<T: Entity> Stream for ViewWatchStream<T> {
    type Item = Arc<ViewSnapshot<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Arc<_> is Unpin, so WatchStream is too.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row(u32);

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.0
        }
    }

    fn snapshot(rows: Vec<Row>, selected: Vec<u32>) -> ViewSnapshot<Row> {
        let mut snap = ViewSnapshot::initial(PageQuery::new(10));
        let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        snap.page = Some(Arc::new(Page::new(rows, 1, 10, total)));
        snap.selected = selected;
        snap
    }

    #[test]
    fn off_page_count_excludes_visible_rows() {
        let snap = snapshot(vec![Row(1), Row(2), Row(3)], vec![2, 7, 9]);
        assert_eq!(snap.selected_on_page(), vec![2]);
        assert_eq!(snap.selected_off_page(), 2);
    }

    #[test]
    fn repeated_row_ids_do_not_underflow_off_page_count() {
        let snap = snapshot(vec![Row(4), Row(4), Row(4)], vec![4]);
        assert_eq!(snap.selected_on_page(), vec![4, 4, 4]);
        assert_eq!(snap.selected_off_page(), 0);
    }
}
