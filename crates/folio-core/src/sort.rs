//! Deterministic ordering of the visible set.
//!
//! String keys compare case-insensitively, numeric keys numerically, and a
//! missing value sorts as the lowest possible value (first when ascending,
//! last when descending). Sorting is stable over dataset order, so equal keys
//! keep the order the records were loaded in.

use crate::store::ItemStore;
use crate::types::Item;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field the visible set is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Title,
    Author,
    Year,
    Venue,
    Type,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Title,
        SortKey::Author,
        SortKey::Year,
        SortKey::Venue,
        SortKey::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Author => "author",
            SortKey::Year => "year",
            SortKey::Venue => "venue",
            SortKey::Type => "type",
        }
    }

    fn value(&self, item: &Item) -> SortValue {
        fn text(s: &str) -> SortValue {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                SortValue::Text(None)
            } else {
                SortValue::Text(Some(trimmed.to_lowercase()))
            }
        }

        match self {
            SortKey::Title => text(&item.title),
            SortKey::Author => text(item.primary_author().unwrap_or_default()),
            SortKey::Year => SortValue::Number(item.year.map(i64::from)),
            SortKey::Venue => text(&item.venue),
            SortKey::Type => SortValue::Text(Some(item.item_type.as_str().to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "author" | "authors" => Ok(SortKey::Author),
            "year" | "date" => Ok(SortKey::Year),
            "venue" => Ok(SortKey::Venue),
            "type" => Ok(SortKey::Type),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// The opposite direction
    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(format!("Unknown sort direction: {}", s)),
        }
    }
}

/// Sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        SortSpec { key, direction }
    }

    /// Order two records by this spec (no tie-breaking).
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let ordering = self.key.value(a).cmp(&self.key.value(b));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Sort store positions in place.
    ///
    /// Keys are extracted once per record; the sort is stable, so positions
    /// with equal keys stay in their incoming (dataset) order.
    pub fn sort_positions(&self, store: &ItemStore, positions: &mut Vec<usize>) {
        let mut keyed: Vec<(SortValue, usize)> = positions
            .iter()
            .filter_map(|&pos| store.at(pos).map(|item| (self.key.value(item), pos)))
            .collect();

        match self.direction {
            SortDirection::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            SortDirection::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        positions.clear();
        positions.extend(keyed.into_iter().map(|(_, pos)| pos));
    }
}

/// Comparable value extracted from a record. `None` orders lowest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Text(Option<String>),
    Number(Option<i64>),
}
