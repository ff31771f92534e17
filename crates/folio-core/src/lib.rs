//! # Folio Core Library
//!
//! This crate provides the in-memory search, filter, sort and windowing engine
//! behind the Folio bibliography browser. It consumes two immutable datasets
//! (records and a collection forest) once at startup and exposes a small
//! mutation API over a single canonical view state.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Records, authors, collection records, statistics
//! - **Hierarchy** (`hierarchy`): Validated collection forest and traversal
//! - **Store** (`store`): Dataset loading and membership reconciliation
//! - **Index** (`index`): Word and trigram indices over searchable text
//! - **Query** (`query`): Conjunctive term matching against the indices
//! - **Sort** (`sort`): Deterministic, stable ordering
//! - **State** (`state`): The canonical view state
//! - **Window** (`window`): Paged and virtual window calculation
//! - **Codec** (`codec`): Shareable `key=value` state encoding
//! - **Coordinator** (`coordinator`): Owns the state and recomputes the view
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_core::{Config, FilterCoordinator, ItemStore, SearchIndex};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let store = Arc::new(ItemStore::load(&config.items_path()?, &config.collections_path()?)?);
//! let index = Arc::new(SearchIndex::build(&store));
//! let mode = config.view_mode(store.len());
//!
//! let mut view = FilterCoordinator::new(store, index, mode, config.default_sort());
//! let update = view.set_search_text("deep parsing");
//! for item in view.window_items() {
//!     println!("{}", item.title);
//! }
//! println!("{} matches, share as ?{}", update.visible_count, view.encoded_state());
//! ```

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod query;
pub mod sort;
pub mod state;
pub mod store;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use codec::{SharedState, StateCodec};
pub use config::Config;
pub use coordinator::{FilterCoordinator, ViewUpdate};
pub use error::{FolioError, Result};
pub use hierarchy::{CollectionDataset, CollectionForest, CollectionNode, HierarchyWarning};
pub use index::{IndexStats, SearchIndex};
pub use query::{MatchSet, Query, QueryEngine};
pub use sort::{SortDirection, SortKey, SortSpec};
pub use state::{Position, ViewState};
pub use store::ItemStore;
pub use types::{Author, CollectionId, CollectionRecord, Item, ItemId, ItemType, StoreStats};
pub use window::{PageInfo, ViewMode, VirtualLayout, Window, WindowRange};
