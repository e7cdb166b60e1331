use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use shared::domain::{Item, ItemId};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub has_more: bool,
}

/// Authoritative server-side state: the fixed item catalog, the manual
/// ordering overlay and the selection set. The latter two are only ever
/// replaced wholesale.
#[derive(Debug, Default)]
pub struct CatalogStore {
    items: Vec<Item>,
    manual_order: Vec<ItemId>,
    selection: HashSet<ItemId>,
}

impl CatalogStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            manual_order: Vec::new(),
            selection: HashSet::new(),
        }
    }

    /// Seeds `Item 1..=count`, the bootstrap shape the demo server ships with.
    pub fn seed(count: u32) -> Self {
        let items = (1..=i64::from(count))
            .map(|i| Item::new(i, format!("Item {i}")))
            .collect();
        Self::new(items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn query(&self, filter: &str, page: u32, limit: u32) -> QueryPage {
        let rows = self.derived_rows(filter);
        let start = (page.max(1) as usize - 1) * limit as usize;
        let end = start + limit as usize;
        let total = rows.len();
        let items = rows
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        QueryPage {
            items,
            has_more: end < total,
        }
    }

    /// The ordered sequence a query paginates over, recomputed on every call.
    ///
    /// A non-empty filter selects name matches in catalog order and ignores
    /// the manual ordering entirely. Under the empty filter, explicitly
    /// placed items come first (ids no longer in the catalog are skipped),
    /// followed by every unplaced item in catalog order.
    fn derived_rows(&self, filter: &str) -> Vec<&Item> {
        if !filter.is_empty() {
            let needle = filter.to_lowercase();
            return self
                .items
                .iter()
                .filter(|item| item.name.to_lowercase().contains(&needle))
                .collect();
        }
        if self.manual_order.is_empty() {
            return self.items.iter().collect();
        }

        let mut unplaced: HashMap<ItemId, &Item> =
            self.items.iter().map(|item| (item.id, item)).collect();
        let mut rows = Vec::with_capacity(self.items.len());
        for id in &self.manual_order {
            if let Some(item) = unplaced.remove(id) {
                rows.push(item);
            }
        }
        rows.extend(
            self.items
                .iter()
                .filter(|item| unplaced.contains_key(&item.id)),
        );
        rows
    }

    pub fn replace_order(&mut self, order: Vec<ItemId>) {
        self.manual_order = order;
    }

    pub fn manual_order(&self) -> &[ItemId] {
        &self.manual_order
    }

    pub fn replace_selection(&mut self, selected: HashSet<ItemId>) {
        self.selection = selected;
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selection_snapshot(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.selection.iter().copied().collect();
        ids.sort();
        ids
    }
}

/// Cloneable handle to the process-wide store, passed into request handlers
/// instead of living in a hidden static. Locks are never held across an
/// await, so every mutation stays atomic at request granularity.
#[derive(Clone)]
pub struct CatalogHandle {
    inner: Arc<RwLock<CatalogStore>>,
}

impl CatalogHandle {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query(&self, filter: &str, page: u32, limit: u32) -> QueryPage {
        self.read().query(filter, page, limit)
    }

    pub fn replace_order(&self, order: Vec<ItemId>) {
        self.write().replace_order(order);
    }

    pub fn manual_order_snapshot(&self) -> Vec<ItemId> {
        self.read().manual_order().to_vec()
    }

    pub fn replace_selection(&self, selected: HashSet<ItemId>) {
        self.write().replace_selection(selected);
    }

    pub fn selection_snapshot(&self) -> Vec<ItemId> {
        self.read().selection_snapshot()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
