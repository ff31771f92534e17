//! Application state management.

use anyhow::Context;
use folio_core::{Config, FilterCoordinator, ItemStore, SearchIndex};
use std::sync::Arc;
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The loaded records and collection forest
    pub store: Arc<ItemStore>,

    /// Search index over the store
    pub index: Arc<SearchIndex>,
}

impl App {
    /// Load the datasets and build the search index.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let items_path = config.items_path()?;
        let collections_path = config.collections_path()?;

        let store = Arc::new(
            ItemStore::load(&items_path, &collections_path).with_context(|| {
                format!(
                    "Failed to load datasets {} and {}",
                    items_path.display(),
                    collections_path.display()
                )
            })?,
        );
        let index = Arc::new(SearchIndex::build(&store));

        info!(
            items = store.len(),
            collections = store.forest().len(),
            words = index.stats().words,
            trigrams = index.stats().trigrams,
            "Application initialized"
        );

        Ok(App {
            config,
            store,
            index,
        })
    }

    /// Create a coordinator over the loaded data, in the mode the config picks.
    pub fn coordinator(&self) -> FilterCoordinator {
        FilterCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.index),
            self.config.view_mode(self.store.len()),
            self.config.default_sort(),
        )
    }
}

