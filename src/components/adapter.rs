use crate::backend::types::FeedItem;
use crate::backend::{FeedEvent, LoadState, LoadStates};
use indexmap::IndexMap;

/// Grid columns taken by the cell at `index`.
///
/// The footer cell sits right after the content and spans the whole row, but
/// only when there is content above it.
pub fn span_size(index: usize, content_count: usize, columns: usize) -> usize {
    if index == content_count && content_count > 0 {
        columns
    } else {
        1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Footer {
    Hidden,
    Loading,
    Retry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Item(usize),
    Footer,
}

/// Items of the current feed, keyed by id, plus the footer state.
pub struct ListAdapter {
    items: IndexMap<String, FeedItem>,
    states: LoadStates,
    columns: usize,
    prefetch_distance: usize,
}

impl ListAdapter {
    pub fn new(columns: usize, prefetch_distance: usize) -> Self {
        Self {
            items: IndexMap::new(),
            states: LoadStates::default(),
            columns: columns.max(1),
            prefetch_distance,
        }
    }
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Reset => self.clear(),
            FeedEvent::Page(items) => {
                for item in items {
                    if self.items.contains_key(&item.id) {
                        log::debug!("skip duplicated item {}", item.id);
                        continue;
                    }
                    self.items.insert(item.id.clone(), item);
                }
            }
            FeedEvent::LoadState(states) => self.states = states,
        }
    }
    pub fn clear(&mut self) {
        self.items.clear();
        self.states = LoadStates::default();
    }
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&FeedItem> {
        self.items.get_index(index).map(|(_, item)| item)
    }
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }
    pub fn items(&self) -> impl Iterator<Item = &FeedItem> {
        self.items.values()
    }
    pub fn remove(&mut self, id: &str) -> Option<FeedItem> {
        self.items.shift_remove(id)
    }
    pub fn states(&self) -> &LoadStates {
        &self.states
    }
    pub fn columns(&self) -> usize {
        self.columns
    }
    /// The state shown at the tail of the list.
    fn tail_state(&self) -> &LoadState {
        if self.items.is_empty() && !self.states.refresh.is_idle() {
            &self.states.refresh
        } else {
            &self.states.append
        }
    }
    pub fn footer(&self) -> Footer {
        match self.tail_state() {
            LoadState::Loading => Footer::Loading,
            LoadState::Error(e) => Footer::Retry(e.to_string()),
            LoadState::NotLoading { .. } => Footer::Hidden,
        }
    }
    pub fn span_size(&self, index: usize) -> usize {
        span_size(index, self.items.len(), self.columns)
    }
    /// Whether binding `index` should trigger loading the next page.
    pub fn needs_more(&self, index: usize) -> bool {
        !self.items.is_empty()
            && index + self.prefetch_distance + 1 >= self.items.len()
            && self.states.append.is_idle()
            && !self.states.append.is_end_of_stream()
    }
    /// Lays out the cells into grid rows.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        let count = self.items.len();
        let total = match self.footer() {
            Footer::Hidden => count,
            _ => count + 1,
        };
        let (mut rows, mut row, mut used) = (Vec::new(), Vec::new(), 0);
        for index in 0..total {
            let span = self.span_size(index).min(self.columns);
            if used + span > self.columns {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(if index < count {
                Cell::Item(index)
            } else {
                Cell::Footer
            });
            used += span;
        }
        if !row.is_empty() {
            rows.push(row);
        }
        rows
    }
}
