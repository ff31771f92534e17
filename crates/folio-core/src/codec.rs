//! Shareable state encoding.
//!
//! The view state is mirrored into a compact `key=value` string joined by
//! `&`, suitable for a URL query or fragment. Only whitelisted fields are
//! written, and a field at its default value is omitted entirely:
//!
//! | key          | field                 | written when        |
//! |--------------|-----------------------|---------------------|
//! | `q`          | search text           | non-empty           |
//! | `collection` | selected collection   | one is selected     |
//! | `sort`       | sort key              | not the default key |
//! | `dir`        | sort direction        | not the default     |
//! | `page`       | page index            | greater than one    |
//!
//! Values are percent-encoded. Decoding is total: unknown keys, undecodable
//! values and out-of-range numbers are dropped and the field keeps its default.

use crate::query::normalize_query;
use crate::sort::{SortDirection, SortKey, SortSpec};
use crate::state::{Position, ViewState};
use crate::types::CollectionId;
use tracing::debug;

pub const KEY_QUERY: &str = "q";
pub const KEY_COLLECTION: &str = "collection";
pub const KEY_SORT: &str = "sort";
pub const KEY_DIRECTION: &str = "dir";
pub const KEY_PAGE: &str = "page";

const PAIR_SEPARATOR: char = '&';

/// The whitelisted, shareable subset of the view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedState {
    pub collection: Option<CollectionId>,
    pub query: String,
    pub sort: SortSpec,
    pub page: usize,
}

impl SharedState {
    /// Default shareable state for a given default sort.
    pub fn new(default_sort: SortSpec) -> Self {
        SharedState {
            collection: None,
            query: String::new(),
            sort: default_sort,
            page: 1,
        }
    }

    /// Project a view state onto its shareable fields.
    pub fn from_state(state: &ViewState) -> Self {
        SharedState {
            collection: state.collection.clone(),
            query: state.query.clone(),
            sort: state.sort,
            page: state.position.page().unwrap_or(1),
        }
    }

    /// Build a view state from these fields.
    ///
    /// `origin` picks the position kind; the page only applies to paged
    /// positions, virtual positions start at the top.
    pub fn to_state(&self, origin: Position) -> ViewState {
        let position = match origin {
            Position::Page(_) => Position::Page(self.page.max(1)),
            Position::Offset(_) => Position::Offset(0),
        };
        ViewState {
            collection: self.collection.clone(),
            query: self.query.clone(),
            sort: self.sort,
            position,
        }
    }
}

/// Encodes and decodes shareable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCodec {
    default_sort: SortSpec,
}

impl StateCodec {
    /// Create a codec that omits `default_sort` from encodings.
    pub fn new(default_sort: SortSpec) -> Self {
        StateCodec { default_sort }
    }

    pub fn default_sort(&self) -> SortSpec {
        self.default_sort
    }

    /// Encode the shareable fields of a view state.
    pub fn encode(&self, state: &ViewState) -> String {
        self.encode_shared(&SharedState::from_state(state))
    }

    /// Encode a shareable state.
    pub fn encode_shared(&self, shared: &SharedState) -> String {
        let mut pairs: Vec<String> = Vec::with_capacity(5);

        let query = normalize_query(&shared.query);
        if !query.is_empty() {
            pairs.push(pair(KEY_QUERY, &query));
        }
        if let Some(collection) = shared.collection.as_ref().filter(|c| !c.as_str().is_empty()) {
            pairs.push(pair(KEY_COLLECTION, collection.as_str()));
        }
        if shared.sort.key != self.default_sort.key {
            pairs.push(pair(KEY_SORT, shared.sort.key.as_str()));
        }
        if shared.sort.direction != self.default_sort.direction {
            pairs.push(pair(KEY_DIRECTION, shared.sort.direction.as_str()));
        }
        if shared.page > 1 {
            pairs.push(pair(KEY_PAGE, &shared.page.to_string()));
        }

        pairs.join("&")
    }

    /// Decode an encoding. Never fails.
    ///
    /// A leading `?` or `#` is ignored. When a key repeats, the last valid
    /// value wins.
    pub fn decode(&self, encoded: &str) -> SharedState {
        let mut shared = SharedState::new(self.default_sort);
        let encoded = encoded.trim().trim_start_matches(['?', '#']);

        for raw_pair in encoded.split(PAIR_SEPARATOR).filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = raw_pair.split_once('=').unwrap_or((raw_pair, ""));
            let (Some(key), Some(value)) = (percent_decode(raw_key), percent_decode(raw_value)) else {
                debug!(pair = %raw_pair, "Dropping undecodable state pair");
                continue;
            };

            match key.as_str() {
                KEY_QUERY => shared.query = normalize_query(&value),
                KEY_COLLECTION => {
                    shared.collection = (!value.is_empty()).then(|| CollectionId::new(value));
                }
                KEY_SORT => match value.parse::<SortKey>() {
                    Ok(key) => shared.sort.key = key,
                    Err(e) => debug!(error = %e, "Dropping sort key"),
                },
                KEY_DIRECTION => match value.parse::<SortDirection>() {
                    Ok(direction) => shared.sort.direction = direction,
                    Err(e) => debug!(error = %e, "Dropping sort direction"),
                },
                KEY_PAGE => match value.trim().parse::<usize>() {
                    Ok(page) if page >= 1 => shared.page = page,
                    _ => debug!(value = %value, "Dropping out-of-range page"),
                },
                other => debug!(key = %other, "Ignoring unknown state key"),
            }
        }

        shared
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{}={}", key, urlencoding::encode(value))
}

/// Percent-decode a component, treating `+` as a space.
fn percent_decode(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}
