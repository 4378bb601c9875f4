// ── Selection model ──
//
// Pure in-memory state machine for multi-selection over a paginated
// list. The anchor is the pivot for shift-click range selection and is
// only meaningful relative to the item ordering it was set against.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::EntityKey;

/// How a plain (unmodified) click affects the existing selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ClickMode {
    /// Flip the clicked row; other rows stay selected.
    #[default]
    Toggle,
    /// Select only the clicked row.
    Replace,
}

/// Keyboard modifiers held during a row click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
    };
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
    };
}

/// Selected ids plus the range-selection anchor.
///
/// The anchor may name an id that is no longer selected (the last
/// touched row was a deselect). Selection survives page turns; the
/// anchor does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel<Id: EntityKey> {
    selected: BTreeSet<Id>,
    anchor: Option<Id>,
}

impl<Id: EntityKey> Default for SelectionModel<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: EntityKey> SelectionModel<Id> {
    pub fn new() -> Self {
        Self {
            selected: BTreeSet::new(),
            anchor: None,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Plain click: flip membership of `id` and make it the anchor.
    pub fn toggle(&mut self, id: Id) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.anchor = Some(id);
    }

    /// Ctrl/⌘ click. Same transition as [`toggle`](Self::toggle); it never
    /// clears other rows, whatever the plain-click mode is.
    pub fn toggle_independent(&mut self, id: Id) {
        self.toggle(id);
    }

    /// Replace the whole selection with `id`.
    pub fn select_only(&mut self, id: Id) {
        self.selected.clear();
        self.selected.insert(id);
        self.anchor = Some(id);
    }

    /// Shift click: add every id between the anchor and `id` in `order`.
    ///
    /// An `id` absent from `order` is a no-op. Without a usable anchor
    /// this degrades to [`toggle`](Self::toggle).
    pub fn select_range(&mut self, id: Id, order: &[Id]) {
        let Some(target) = order.iter().position(|candidate| *candidate == id) else {
            return;
        };

        let pivot = self
            .anchor
            .and_then(|anchor| order.iter().position(|candidate| *candidate == anchor));

        let Some(pivot) = pivot else {
            self.toggle(id);
            return;
        };

        let (start, end) = if pivot <= target {
            (pivot, target)
        } else {
            (target, pivot)
        };
        self.selected
            .extend(order.iter().skip(start).take(end - start + 1).copied());
        self.anchor = Some(id);
    }

    /// Drop `id` from the selection (e.g. after it was deleted). The
    /// anchor is left alone.
    pub fn deselect(&mut self, id: Id) {
        self.selected.remove(&id);
    }

    /// Select every id of `order` (header checkbox). The anchor is kept.
    pub fn select_all(&mut self, order: &[Id]) {
        self.selected.extend(order.iter().copied());
    }

    /// Deselect every id of `order`, leaving off-page selections alone.
    pub fn deselect_all(&mut self, order: &[Id]) {
        for id in order {
            self.selected.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Forget the anchor after the visible ordering changed.
    pub fn invalidate_anchor(&mut self) {
        self.anchor = None;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn anchor(&self) -> Option<Id> {
        self.anchor
    }

    pub fn selected(&self) -> &BTreeSet<Id> {
        &self.selected
    }

    pub fn selected_ids(&self) -> Vec<Id> {
        self.selected.iter().copied().collect()
    }

    pub fn is_selected(&self, id: Id) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids that appear in `order`, in display order.
    pub fn selected_in(&self, order: &[Id]) -> Vec<Id> {
        order
            .iter()
            .filter(|id| self.selected.contains(id))
            .copied()
            .collect()
    }

    /// `true` when every id of a non-empty `order` is selected.
    pub fn all_selected(&self, order: &[Id]) -> bool {
        !order.is_empty() && order.iter().all(|id| self.selected.contains(id))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
