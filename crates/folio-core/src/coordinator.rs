//! Filter coordinator: the single owner of the view state.
//!
//! Every mutation goes through one of the operations below. Each operation
//! updates the state, performs exactly one recomputation of the visible set
//! (skipped when the filter-relevant fields did not change) and of the window,
//! and returns the result before control goes back to the caller.
//!
//! Filtering order:
//! 1. Collection scope: the selected node and all its descendants; an item is
//!    kept when its memberships intersect that scope
//! 2. Query: kept when present in the query engine's match set
//! 3. Sort: stable, by the current key and direction
//!
//! Any operation other than a position change moves the position back to the
//! first page or a zero offset.

use crate::codec::StateCodec;
use crate::index::SearchIndex;
use crate::query::{MatchSet, Query, QueryEngine};
use crate::sort::SortSpec;
use crate::state::{FilterKey, Position, ViewState};
use crate::store::ItemStore;
use crate::types::{CollectionId, Item, ItemId};
use crate::window::{page_count, paged_range, virtual_range, ViewMode, Window};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a state mutation, handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewUpdate {
    /// Size of the visible set
    pub visible_count: usize,
    /// Materialized slice for the current position
    pub window: Window,
}

/// Owns the view state and derives the visible set and window from it.
#[derive(Debug)]
pub struct FilterCoordinator {
    store: Arc<ItemStore>,
    engine: QueryEngine,
    codec: StateCodec,
    mode: ViewMode,
    state: ViewState,

    /// Store positions of the visible set, in display order
    visible: Vec<usize>,
    /// Filter fields `visible` was computed for
    visible_key: Option<FilterKey>,

    window: Window,
}

impl FilterCoordinator {
    /// Create a coordinator over a built index, starting from the default state.
    pub fn new(
        store: Arc<ItemStore>,
        index: Arc<SearchIndex>,
        mode: ViewMode,
        default_sort: SortSpec,
    ) -> Self {
        Self::with_engine(store, QueryEngine::new(index), mode, default_sort)
    }

    /// Create a coordinator whose index is still being built.
    ///
    /// Until [`attach_index`](Self::attach_index) is called every query,
    /// including the empty one, matches nothing.
    pub fn pending(store: Arc<ItemStore>, mode: ViewMode, default_sort: SortSpec) -> Self {
        Self::with_engine(store, QueryEngine::pending(), mode, default_sort)
    }

    fn with_engine(
        store: Arc<ItemStore>,
        engine: QueryEngine,
        mode: ViewMode,
        default_sort: SortSpec,
    ) -> Self {
        let mut coordinator = FilterCoordinator {
            store,
            engine,
            codec: StateCodec::new(default_sort),
            mode,
            state: ViewState::new(default_sort, origin(mode)),
            visible: Vec::new(),
            visible_key: None,
            window: Window::default(),
        };
        coordinator.refresh();
        info!(
            items = coordinator.store.len(),
            virtual_mode = mode.is_virtual(),
            ready = coordinator.is_ready(),
            "Filter coordinator started"
        );
        coordinator
    }

    /// Supply the index once it has been built and recompute.
    pub fn attach_index(&mut self, index: Arc<SearchIndex>) -> ViewUpdate {
        self.engine.attach(index);
        self.visible_key = None;
        self.refresh()
    }

    /// Restrict to a collection and its descendants, or lift the restriction.
    ///
    /// Unknown ids are ignored and treated as no selection.
    pub fn select_collection(&mut self, collection: Option<CollectionId>) -> ViewUpdate {
        self.state.collection = self.validate_collection(collection);
        self.reset_position();
        self.refresh()
    }

    /// Set the search text (stored trimmed and case-folded).
    pub fn set_search_text(&mut self, text: &str) -> ViewUpdate {
        self.state.set_query(text);
        self.reset_position();
        self.refresh()
    }

    /// Set the sort key and direction.
    pub fn set_sort(&mut self, sort: SortSpec) -> ViewUpdate {
        self.state.sort = sort;
        self.reset_position();
        self.refresh()
    }

    /// Move to a page (paged mode). The page is clamped to the existing range.
    pub fn set_page(&mut self, page: usize) -> ViewUpdate {
        if self.mode.is_virtual() {
            debug!(page, "Ignoring page change in virtual mode");
            return self.update();
        }
        self.state.position = Position::Page(page);
        self.rewindow();
        self.update()
    }

    /// Scroll to an offset (virtual mode). The offset is clamped to the list.
    pub fn set_scroll_offset(&mut self, offset: u64) -> ViewUpdate {
        if !self.mode.is_virtual() {
            debug!(offset, "Ignoring scroll offset in paged mode");
            return self.update();
        }
        self.state.position = Position::Offset(offset);
        self.rewindow();
        self.update()
    }

    /// Resize the viewport (virtual mode). Keeps the position.
    pub fn set_viewport_height(&mut self, height: u32) -> ViewUpdate {
        match self.mode {
            ViewMode::Virtual(ref mut layout) => {
                layout.viewport_height = height;
                self.rewindow();
            }
            ViewMode::Paged { .. } => debug!(height, "Ignoring viewport height in paged mode"),
        }
        self.update()
    }

    /// Reset every field to its default in one recomputation.
    pub fn clear_all(&mut self) -> ViewUpdate {
        self.state = ViewState::new(self.codec.default_sort(), self.state.position);
        self.refresh()
    }

    /// The shareable encoding of the current state.
    pub fn encoded_state(&self) -> String {
        self.codec.encode(&self.state)
    }

    /// Replace the state with a decoded shareable encoding.
    ///
    /// Never fails; malformed fields, unknown collections and pages past the
    /// last one fall back to defaults. Returns whether anything about the
    /// state changed.
    pub fn apply_encoded(&mut self, encoded: &str) -> bool {
        let shared = self.codec.decode(encoded);
        let mut next = shared.to_state(self.state.position);
        next.collection = self.validate_collection(next.collection);

        // A virtual offset is not shared; keep it if the filters are the same
        if self.mode.is_virtual() && next.filter_key() == self.state.filter_key() {
            next.position = self.state.position;
        }

        let before = self.state.clone();
        self.state = next;
        self.recompute_visible();

        // A shared page past the end is dropped, not clamped
        if let (ViewMode::Paged { page_size }, Some(page)) = (self.mode, self.state.position.page()) {
            if page > page_count(self.visible.len(), page_size).max(1) {
                debug!(page, "Dropping out-of-range page from encoded state");
                self.state.position = Position::Page(1);
            }
        }
        self.rewindow();

        let changed = self.state != before;
        debug!(changed, encoded = %encoded, "Applied encoded state");
        changed
    }

    /// Check if the search index is available.
    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// The current view state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// The window mode chosen at startup.
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Size of the visible set.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Ids of the whole visible set, in display order.
    pub fn visible_ids(&self) -> Vec<&ItemId> {
        self.visible
            .iter()
            .filter_map(|&pos| self.store.at(pos).map(|item| &item.id))
            .collect()
    }

    /// The current window.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Records in the current window, in display order.
    pub fn window_items(&self) -> Vec<&Item> {
        self.window
            .items
            .iter()
            .filter_map(|id| self.store.get(id))
            .collect()
    }

    /// The underlying store.
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// The codec used for shareable encodings.
    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    /// The current visible count and window.
    pub fn update(&self) -> ViewUpdate {
        ViewUpdate {
            visible_count: self.visible.len(),
            window: self.window.clone(),
        }
    }

    fn validate_collection(&self, collection: Option<CollectionId>) -> Option<CollectionId> {
        match collection {
            Some(id) if !self.store.forest().contains(&id) => {
                warn!(collection = %id, "Unknown collection, clearing selection");
                None
            }
            other => other,
        }
    }

    fn reset_position(&mut self) {
        self.state.position = self.state.position.first();
    }

    /// Recompute the visible set if its filter fields changed, then the window.
    fn refresh(&mut self) -> ViewUpdate {
        self.recompute_visible();
        self.rewindow();
        self.update()
    }

    fn recompute_visible(&mut self) {
        let key = self.state.filter_key();
        if self.visible_key.as_ref() != Some(&key) {
            let started = Instant::now();
            self.visible = self.compute_visible();
            self.visible_key = Some(key);
            debug!(
                visible = self.visible.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "Visible set recomputed"
            );
        }
    }

    fn compute_visible(&self) -> Vec<usize> {
        let scope: Option<HashSet<CollectionId>> = self
            .state
            .collection
            .as_ref()
            .map(|id| self.store.forest().subtree(id).into_iter().collect());

        let candidates: Vec<usize> = match self.engine.run(&Query::parse(&self.state.query)) {
            MatchSet::All => (0..self.store.len()).collect(),
            MatchSet::Positions(positions) => positions,
        };

        let mut visible: Vec<usize> = candidates
            .into_iter()
            .filter(|&pos| match (&scope, self.store.at(pos)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(scope), Some(item)) => item.collections.iter().any(|c| scope.contains(c)),
            })
            .collect();

        self.state.sort.sort_positions(&self.store, &mut visible);
        visible
    }

    /// Re-slice the visible set for the current position without re-filtering.
    fn rewindow(&mut self) {
        let total = self.visible.len();

        let (range, page, content_height) = match self.mode {
            ViewMode::Paged { page_size } => {
                let requested = self.state.position.page().unwrap_or(1);
                let (range, info) = paged_range(total, requested, page_size);
                self.state.position = Position::Page(info.page);
                (range, Some(info), None)
            }
            ViewMode::Virtual(layout) => {
                let requested = self.state.position.offset().unwrap_or(0);
                let offset = requested.min(layout.max_offset(total));
                self.state.position = Position::Offset(offset);
                (
                    virtual_range(total, offset, &layout),
                    None,
                    Some(layout.content_height(total)),
                )
            }
        };

        let items = self.visible[range.start..range.end]
            .iter()
            .filter_map(|&pos| self.store.at(pos).map(|item| item.id.clone()))
            .collect();

        self.window = Window {
            start: range.start,
            total,
            items,
            page,
            content_height,
        };
    }
}

/// The first position for a window mode.
fn origin(mode: ViewMode) -> Position {
    match mode {
        ViewMode::Paged { .. } => Position::Page(1),
        ViewMode::Virtual(_) => Position::Offset(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::CollectionDataset;
    use crate::sort::{SortDirection, SortKey};
    use crate::types::{Author, CollectionRecord};
    use crate::window::VirtualLayout;

    fn make_store() -> Arc<ItemStore> {
        let items = vec![
            Item::new("A", "Deep Learning")
                .with_year(2020)
                .with_author(Author::new("Yann", "LeCun"))
                .in_collection("ml"),
            Item::new("B", "Shallow Parsing")
                .with_year(2019)
                .in_collection("nlp"),
            Item::new("C", "Deep Parsing")
                .with_year(2021)
                .in_collection("nlp"),
            Item::new("D", "Attention Is All You Need").with_year(2017),
        ];
        let collections = CollectionDataset::new(
            vec![
                CollectionRecord::new("ml", "Machine Learning").with_child("nlp"),
                CollectionRecord::new("nlp", "NLP").with_parent("ml"),
            ],
            vec![CollectionId::new("ml")],
        );
        Arc::new(ItemStore::new(items, collections))
    }

    fn make_coordinator(store: Arc<ItemStore>, mode: ViewMode) -> FilterCoordinator {
        let index = Arc::new(SearchIndex::build(&store));
        FilterCoordinator::new(store, index, mode, SortSpec::default())
    }

    fn make_large(count: usize, mode: ViewMode) -> FilterCoordinator {
        let items = (0..count)
            .map(|i| Item::new(format!("i{:04}", i), format!("Record {:04}", i)))
            .collect();
        make_coordinator(Arc::new(ItemStore::new(items, CollectionDataset::default())), mode)
    }

    fn ids(coordinator: &FilterCoordinator) -> Vec<&str> {
        coordinator.visible_ids().into_iter().map(|i| i.as_str()).collect()
    }

    fn nlp() -> Option<CollectionId> {
        Some(CollectionId::new("nlp"))
    }

    #[test]
    fn test_query_scenario() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));

        coordinator.set_search_text("deep");
        assert_eq!(ids(&coordinator), vec!["A", "C"]);

        coordinator.set_search_text("deep parsing");
        assert_eq!(ids(&coordinator), vec!["C"]);

        coordinator.set_search_text("");
        coordinator.select_collection(nlp());
        let update = coordinator.set_search_text("deep");
        assert_eq!(update.visible_count, 1);
        assert_eq!(update.window.items, vec![ItemId::new("C")]);
    }

    #[test]
    fn test_collection_includes_descendants() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));
        let update = coordinator.select_collection(Some(CollectionId::new("ml")));
        assert_eq!(update.visible_count, 3);
        assert_eq!(ids(&coordinator), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_empty_query_is_default_order() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));
        coordinator.set_search_text("   ");
        assert_eq!(ids(&coordinator), vec!["D", "A", "C", "B"]);
        assert_eq!(coordinator.state().query, "");
    }

    #[test]
    fn test_title_word_finds_item() {
        let store = make_store();
        let mut coordinator = make_coordinator(store.clone(), ViewMode::paged(10));
        for item in store.items() {
            for word in item.title.split_whitespace() {
                coordinator.set_search_text(word);
                assert!(
                    coordinator.visible_ids().contains(&&item.id),
                    "{} not found by {}",
                    item.id,
                    word
                );
            }
        }
    }

    #[test]
    fn test_select_then_clear_restores() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));
        coordinator.set_sort(SortSpec::new(SortKey::Year, SortDirection::Desc));
        let before: Vec<String> = ids(&coordinator).iter().map(|s| s.to_string()).collect();

        coordinator.select_collection(nlp());
        assert_eq!(coordinator.visible_count(), 2);

        coordinator.select_collection(None);
        assert_eq!(ids(&coordinator), before);
    }

    #[test]
    fn test_filter_order_independent() {
        let mut a = make_coordinator(make_store(), ViewMode::paged(10));
        a.set_search_text("parsing");
        a.select_collection(nlp());

        let mut b = make_coordinator(make_store(), ViewMode::paged(10));
        b.select_collection(nlp());
        b.set_search_text("parsing");

        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_unknown_collection_ignored() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));
        let update = coordinator.select_collection(Some(CollectionId::new("ghost")));
        assert!(coordinator.state().collection.is_none());
        assert_eq!(update.visible_count, 4);
    }

    #[test]
    fn test_page_clamped() {
        let mut coordinator = make_large(40, ViewMode::paged(25));
        let update = coordinator.set_page(5);
        assert_eq!(coordinator.state().position, Position::Page(2));
        assert_eq!(update.window.start, 25);
        assert_eq!(update.window.items.len(), 15);
        assert_eq!(update.window.page.map(|p| p.page_count), Some(2));
    }

    #[test]
    fn test_mutations_reset_position() {
        let mut coordinator = make_large(100, ViewMode::paged(10));
        coordinator.set_page(4);
        assert_eq!(coordinator.state().position, Position::Page(4));

        coordinator.set_sort(SortSpec::new(SortKey::Title, SortDirection::Desc));
        assert_eq!(coordinator.state().position, Position::Page(1));

        coordinator.set_page(3);
        coordinator.set_search_text("record");
        assert_eq!(coordinator.state().position, Position::Page(1));
    }

    #[test]
    fn test_clear_all() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(1));
        coordinator.select_collection(nlp());
        coordinator.set_search_text("parsing");
        coordinator.set_sort(SortSpec::new(SortKey::Year, SortDirection::Desc));
        coordinator.set_page(2);

        let update = coordinator.clear_all();
        assert_eq!(
            coordinator.state(),
            &ViewState::new(SortSpec::default(), Position::Page(1))
        );
        assert_eq!(update.visible_count, 4);
        assert_eq!(coordinator.encoded_state(), "");
    }

    #[test]
    fn test_virtual_mode_window() {
        let layout = VirtualLayout::new(10, 100, 5);
        let mut coordinator = make_large(300, ViewMode::Virtual(layout));

        let update = coordinator.update();
        assert_eq!(update.window.start, 0);
        assert_eq!(update.window.items.len(), 15);
        assert_eq!(update.window.content_height, Some(3000));

        let update = coordinator.set_scroll_offset(1000);
        assert_eq!(update.window.start, 95);
        assert_eq!(update.window.items.first(), Some(&ItemId::new("i0095")));

        // clamped to the last screenful
        coordinator.set_scroll_offset(1_000_000);
        assert_eq!(coordinator.state().position, Position::Offset(2900));
        assert_eq!(coordinator.window().start + coordinator.window().items.len(), 300);

        // page changes do not apply to virtual mode
        coordinator.set_page(3);
        assert_eq!(coordinator.state().position, Position::Offset(2900));
    }

    #[test]
    fn test_virtual_start_monotonic() {
        let mut coordinator = make_large(250, ViewMode::Virtual(VirtualLayout::new(48, 720, 5)));
        let mut last = 0;
        for offset in (0..15_000).step_by(97) {
            let update = coordinator.set_scroll_offset(offset);
            assert!(update.window.start >= last);
            last = update.window.start;
        }
    }

    #[test]
    fn test_viewport_resize_keeps_position() {
        let layout = VirtualLayout::new(10, 100, 0);
        let mut coordinator = make_large(300, ViewMode::Virtual(layout));
        coordinator.set_scroll_offset(500);

        let update = coordinator.set_viewport_height(200);
        assert_eq!(coordinator.state().position, Position::Offset(500));
        assert_eq!(update.window.start, 50);
        assert_eq!(update.window.items.len(), 20);
    }

    #[test]
    fn test_encoded_round_trip() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(1));
        coordinator.select_collection(Some(CollectionId::new("ml")));
        coordinator.set_search_text("Deep");
        coordinator.set_sort(SortSpec::new(SortKey::Year, SortDirection::Desc));
        coordinator.set_page(2);

        let encoded = coordinator.encoded_state();
        assert_eq!(encoded, "q=deep&collection=ml&sort=year&dir=desc&page=2");

        let mut other = make_coordinator(make_store(), ViewMode::paged(1));
        assert!(other.apply_encoded(&encoded));
        assert_eq!(other.state(), coordinator.state());
        assert_eq!(other.window(), coordinator.window());

        // applying the same encoding again changes nothing
        assert!(!other.apply_encoded(&encoded));
    }

    #[test]
    fn test_malformed_encoding_yields_default() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(10));
        let changed = coordinator.apply_encoded("page=-3&collection=ghost&sort=%%&zzz");
        assert!(!changed);
        assert_eq!(
            coordinator.state(),
            &ViewState::new(SortSpec::default(), Position::Page(1))
        );
        assert_eq!(coordinator.visible_count(), 4);

        // parseable but past the last page
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(1));
        let changed = coordinator.apply_encoded("page=99&collection=ghost");
        assert!(!changed);
        assert_eq!(
            coordinator.state(),
            &ViewState::new(SortSpec::default(), Position::Page(1))
        );
        assert_eq!(coordinator.window().start, 0);
    }

    #[test]
    fn test_encoded_page_in_range_kept() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(1));
        assert!(coordinator.apply_encoded("page=4"));
        assert_eq!(coordinator.state().position, Position::Page(4));

        // explicit page requests still clamp
        coordinator.set_page(99);
        assert_eq!(coordinator.state().position, Position::Page(4));
    }

    #[test]
    fn test_pending_index() {
        let store = make_store();
        let mut coordinator =
            FilterCoordinator::pending(store.clone(), ViewMode::paged(10), SortSpec::default());
        assert!(!coordinator.is_ready());
        assert_eq!(coordinator.visible_count(), 0);

        let update = coordinator.attach_index(Arc::new(SearchIndex::build(&store)));
        assert!(coordinator.is_ready());
        assert_eq!(update.visible_count, 4);
    }

    #[test]
    fn test_window_items() {
        let mut coordinator = make_coordinator(make_store(), ViewMode::paged(2));
        coordinator.set_page(2);
        let titles: Vec<&str> = coordinator
            .window_items()
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Deep Parsing", "Shallow Parsing"]);
    }
}
