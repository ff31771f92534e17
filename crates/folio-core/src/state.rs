//! Canonical view state.
//!
//! The one authoritative record of what the user is looking at: selected
//! collection, normalized search text, sort, and position. It is owned by the
//! [`FilterCoordinator`](crate::coordinator::FilterCoordinator) and only
//! changes through its operations.

use crate::query::normalize_query;
use crate::sort::SortSpec;
use crate::types::CollectionId;
use serde::{Deserialize, Serialize};

/// Where in the visible set the user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// 1-based page index (paged mode)
    Page(usize),
    /// Scroll offset in pixels from the top of the list (virtual mode)
    Offset(u64),
}

impl Position {
    /// The page index, if this is a paged position.
    pub fn page(&self) -> Option<usize> {
        match self {
            Position::Page(page) => Some(*page),
            Position::Offset(_) => None,
        }
    }

    /// The scroll offset, if this is a virtual position.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Position::Page(_) => None,
            Position::Offset(offset) => Some(*offset),
        }
    }

    /// The first position of the same kind.
    pub fn first(&self) -> Self {
        match self {
            Position::Page(_) => Position::Page(1),
            Position::Offset(_) => Position::Offset(0),
        }
    }

    /// Check if this is the first page or a zero offset.
    pub fn is_first(&self) -> bool {
        *self == self.first()
    }
}

/// Filter and sort fields: the part of the state the visible set depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterKey {
    pub collection: Option<CollectionId>,
    pub query: String,
    pub sort: SortSpec,
}

/// The canonical view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Selected collection, or none for the whole library
    pub collection: Option<CollectionId>,

    /// Trimmed, case-folded search text
    pub query: String,

    /// Current sort
    pub sort: SortSpec,

    /// Current page or scroll offset
    pub position: Position,
}

impl ViewState {
    /// Default state for a session starting at `position`'s origin.
    pub fn new(sort: SortSpec, position: Position) -> Self {
        ViewState {
            collection: None,
            query: String::new(),
            sort,
            position: position.first(),
        }
    }

    /// Set the search text, normalizing it.
    pub fn set_query(&mut self, text: &str) {
        self.query = normalize_query(text);
    }

    /// The filter-relevant fields.
    pub fn filter_key(&self) -> FilterKey {
        FilterKey {
            collection: self.collection.clone(),
            query: self.query.clone(),
            sort: self.sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDirection, SortKey};

    #[test]
    fn test_position_first() {
        assert_eq!(Position::Page(7).first(), Position::Page(1));
        assert_eq!(Position::Offset(900).first(), Position::Offset(0));
        assert!(Position::Page(1).is_first());
        assert!(!Position::Offset(3).is_first());
        assert_eq!(Position::Page(3).page(), Some(3));
        assert_eq!(Position::Page(3).offset(), None);
    }

    #[test]
    fn test_new_state_starts_at_origin() {
        let state = ViewState::new(SortSpec::default(), Position::Offset(120));
        assert_eq!(state.position, Position::Offset(0));
        assert!(state.collection.is_none());
        assert!(state.query.is_empty());
    }

    #[test]
    fn test_query_normalized() {
        let mut state = ViewState::new(SortSpec::default(), Position::Page(1));
        state.set_query("  Deep LEARNING \n");
        assert_eq!(state.query, "deep learning");
    }

    #[test]
    fn test_filter_key_ignores_position() {
        let mut a = ViewState::new(SortSpec::new(SortKey::Year, SortDirection::Desc), Position::Page(1));
        let mut b = a.clone();
        a.position = Position::Page(4);
        b.position = Position::Page(2);
        assert_eq!(a.filter_key(), b.filter_key());

        b.set_query("x");
        assert_ne!(a.filter_key(), b.filter_key());
    }
}
