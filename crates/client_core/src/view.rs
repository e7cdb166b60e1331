use std::collections::HashSet;

use shared::{
    domain::{Item, ItemId},
    protocol::ItemPage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Fetching,
    Exhausted,
}

/// Minted by [`ListView::begin_fetch`] and handed back with the outcome.
/// The epoch pins the response to the filter generation it was requested
/// under; a reset in between makes the ticket stale and its result is
/// dropped instead of merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub page: u32,
    pub filter: String,
}

/// A completed drag gesture: move `moved` to the position `target`
/// currently occupies. The gesture recognizer only emits pairs with
/// distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragMove {
    pub moved: ItemId,
    pub target: ItemId,
}

/// Geometry of the rendering window, in pixels. Row count arithmetic lives
/// here so the fetch triggers stay independent of any widget library.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub row_height: u32,
    pub height: u32,
    pub lookahead_rows: u32,
}

impl Viewport {
    pub fn rows_visible(&self) -> usize {
        if self.row_height == 0 {
            return 0;
        }
        (self.height as usize).div_ceil(self.row_height as usize)
    }

    /// True while fewer rows are materialized than the window can show.
    pub fn wants_fill(&self, materialized: usize) -> bool {
        materialized < self.rows_visible()
    }

    /// True once the scroll position is within the lookahead buffer of the
    /// end of the materialized content.
    pub fn near_end(&self, scroll_offset: u32, materialized: usize) -> bool {
        let content = materialized as u64 * u64::from(self.row_height);
        let reach = u64::from(scroll_offset)
            + u64::from(self.height)
            + u64::from(self.lookahead_rows) * u64::from(self.row_height);
        reach >= content
    }
}

/// Client-side mirror of the windowed listing: the materialized rows, the
/// fetch cursor, the active filter and the selection mirror. Purely
/// synchronous; the async driver in `lib.rs` owns the I/O.
#[derive(Debug)]
pub struct ListView {
    items: Vec<Item>,
    present: HashSet<ItemId>,
    selection: HashSet<ItemId>,
    phase: FetchPhase,
    cursor_page: u32,
    has_more: bool,
    filter: String,
    epoch: u64,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ListView {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            present: HashSet::new(),
            selection: HashSet::new(),
            phase: FetchPhase::Idle,
            cursor_page: 1,
            has_more: true,
            filter: String::new(),
            epoch: 0,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn cursor_page(&self) -> u32 {
        self.cursor_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selection_snapshot(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.selection.iter().copied().collect();
        ids.sort();
        ids
    }

    pub fn can_fetch(&self) -> bool {
        self.phase == FetchPhase::Idle && self.has_more
    }

    /// Starts a fetch cycle. Refuses while one is already in flight and
    /// after exhaustion.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.can_fetch() {
            return None;
        }
        self.phase = FetchPhase::Fetching;
        Some(FetchTicket {
            epoch: self.epoch,
            page: self.cursor_page,
            filter: self.filter.clone(),
        })
    }

    /// Merges a successful page response. Page 1 replaces the materialized
    /// rows outright and adopts the server's selection snapshot; later pages
    /// drop ids already present and append the rest in server order.
    pub fn absorb_page(&mut self, ticket: &FetchTicket, page: ItemPage) {
        if ticket.epoch != self.epoch {
            return;
        }
        if ticket.page == 1 {
            self.items = page.data;
            self.present = self.items.iter().map(|item| item.id).collect();
            self.selection = page.selected.iter().copied().collect();
        } else {
            for item in page.data {
                if self.present.insert(item.id) {
                    self.items.push(item);
                }
            }
        }
        self.has_more = page.has_more;
        if page.has_more {
            self.cursor_page = ticket.page + 1;
            self.phase = FetchPhase::Idle;
        } else {
            self.phase = FetchPhase::Exhausted;
        }
    }

    /// Failure path: the cursor does not advance, so the same page can be
    /// requested again.
    pub fn abort_fetch(&mut self, ticket: &FetchTicket) {
        if ticket.epoch != self.epoch {
            return;
        }
        self.phase = FetchPhase::Idle;
    }

    pub fn set_filter(&mut self, filter: &str) {
        if filter == self.filter {
            return;
        }
        self.filter = filter.to_string();
        self.reset();
    }

    /// Full reset: rewinds the cursor, clears the materialized rows and
    /// invalidates any in-flight fetch by bumping the epoch. The selection
    /// mirror survives; selection is filter-independent.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.items.clear();
        self.present.clear();
        self.cursor_page = 1;
        self.has_more = true;
        self.phase = FetchPhase::Idle;
    }

    /// Optimistic local reorder. Returns the full id sequence to submit as
    /// the new manual order, or `None` when either end of the gesture is
    /// not materialized.
    pub fn apply_drag(&mut self, drag: DragMove) -> Option<Vec<ItemId>> {
        if drag.moved == drag.target {
            return None;
        }
        let from = self.items.iter().position(|item| item.id == drag.moved)?;
        let to = self.items.iter().position(|item| item.id == drag.target)?;
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Some(self.items.iter().map(|item| item.id).collect())
    }

    /// Flips local membership and returns the full mirror snapshot to
    /// submit as the new selection.
    pub fn toggle_selection(&mut self, id: ItemId) -> Vec<ItemId> {
        if !self.selection.insert(id) {
            self.selection.remove(&id);
        }
        self.selection_snapshot()
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
